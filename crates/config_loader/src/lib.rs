//! # Config Loader
//!
//! Loads the runtime configuration once at startup.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate feeds, intervals and the liveness target
//! - Produce a `RuntimeBlueprint`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("pumpkin.toml")).unwrap();
//! println!("feeds: {}", blueprint.feeds.len());
//! ```

mod parser;
mod validator;

pub use contracts::RuntimeBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Format is chosen by extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse or validation failure
    pub fn load_from_path(path: &Path) -> Result<RuntimeBlueprint, ContractError> {
        let format = Self::detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<RuntimeBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Validate an already-built blueprint
    pub fn validate(blueprint: &RuntimeBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }

    /// Serialize to TOML string
    pub fn to_toml(blueprint: &RuntimeBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize to JSON string
    pub fn to_json(blueprint: &RuntimeBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }

    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    const SAMPLE_TOML: &str = r#"
[dispatcher]
tick_interval = "200ms"

[dispatcher.output]
rate = 150
voice = "english-us"

[liveness]
feed = "inbox"
min_period = "2m"

[[feeds]]
name = "inbox"
kind = "mailbox"
credentials = { user = "pumpkin@example.org", secret = "s3cret" }

[[feeds.script]]
text = "Hello there rate:100 delay:2s"
after = "1s"

[[feeds]]
name = "mentions"
kind = "social"
screen_name = "PiPumpkin"
acknowledge = false
"#;

    #[test]
    fn test_load_from_str_toml() {
        let bp = ConfigLoader::load_from_str(SAMPLE_TOML, ConfigFormat::Toml).unwrap();
        assert_eq!(bp.dispatcher.output.rate, 150);
        assert_eq!(bp.dispatcher.output.volume, 1.0);
        assert_eq!(bp.liveness.min_period, Duration::from_secs(120));
        assert_eq!(bp.feeds[0].script.len(), 1);
        assert_eq!(bp.feeds[0].script[0].after, Duration::from_secs(1));
        assert!(!bp.feeds[1].acknowledge);
    }

    #[test]
    fn test_toml_reserializes_to_same_blueprint() {
        let bp = ConfigLoader::load_from_str(SAMPLE_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&bp).unwrap();
        let again = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(again.feeds.len(), 2);
        assert_eq!(again.dispatcher.tick_interval, Duration::from_millis(200));
        assert_eq!(again.feeds[1].screen_name.as_deref(), Some("PiPumpkin"));
    }

    #[test]
    fn test_json_output_is_loadable() {
        let bp = ConfigLoader::load_from_str(SAMPLE_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&bp).unwrap();
        let again = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(again.liveness.feed.as_deref(), Some("inbox"));
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[[feeds]]
name = "inbox"
kind = "mailbox"

[[feeds]]
name = "inbox"
kind = "mailbox"
"#;
        let err = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_load_from_path_detects_format() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(SAMPLE_TOML.as_bytes()).unwrap();

        let bp = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(bp.feeds[0].name, "inbox");
    }

    #[test]
    fn test_load_from_path_rejects_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = ConfigLoader::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported"));
    }
}
