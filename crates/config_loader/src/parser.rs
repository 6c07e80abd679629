//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON 格式。

use contracts::{ContractError, RuntimeBlueprint};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<RuntimeBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => toml::from_str(content).map_err(|e| ContractError::ConfigParse {
            message: format!("TOML parse error: {e}"),
            source: Some(Box::new(e)),
        }),
        ConfigFormat::Json => {
            serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
                message: format!("JSON parse error: {e}"),
                source: Some(Box::new(e)),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::FeedKind;
    use std::time::Duration;

    #[test]
    fn test_parse_toml_feeds() {
        let content = r#"
[dispatcher]
tick_interval = "250ms"

[[feeds]]
name = "inbox"
kind = "mailbox"

[[feeds]]
name = "mentions"
kind = "social"
screen_name = "pumpkin"
poll_interval = "30s"
"#;
        let bp = parse(content, ConfigFormat::Toml).unwrap();
        assert_eq!(bp.dispatcher.tick_interval, Duration::from_millis(250));
        assert_eq!(bp.feeds.len(), 2);
        assert_eq!(bp.feeds[1].kind, FeedKind::Social);
        assert_eq!(
            bp.feeds[1].effective_poll_interval(),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_parse_json_feeds() {
        let content = r#"{
            "liveness": { "enabled": false },
            "feeds": [{ "name": "inbox", "kind": "mailbox", "outbound_wait": "1s" }]
        }"#;
        let bp = parse(content, ConfigFormat::Json).unwrap();
        assert!(!bp.liveness.enabled);
        assert_eq!(bp.feeds[0].outbound_wait, Duration::from_secs(1));
    }

    #[test]
    fn test_parse_rejects_bad_duration() {
        let content = r#"
[[feeds]]
name = "inbox"
kind = "mailbox"
backoff = "soon"
"#;
        let err = parse(content, ConfigFormat::Toml).unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let err = parse("invalid toml [[[", ConfigFormat::Toml).unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
