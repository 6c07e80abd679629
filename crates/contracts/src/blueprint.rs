//! RuntimeBlueprint - Config Loader 输出
//!
//! 描述完整的运行配置：分发器、心跳策略、消息源。

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{humane, OutputParams, ParamValue};

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的运行配置蓝图
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 分发器设置
    #[serde(default)]
    pub dispatcher: DispatcherSettings,

    /// 心跳设置
    #[serde(default)]
    pub liveness: LivenessSettings,

    /// 消息源列表
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
}

impl RuntimeBlueprint {
    /// 按名称查找消息源
    pub fn feed(&self, name: &str) -> Option<&FeedConfig> {
        self.feeds.iter().find(|f| f.name == name)
    }
}

/// 分发器设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherSettings {
    /// 空闲时两次 tick 的间隔
    #[serde(default = "default_tick_interval", with = "humane")]
    pub tick_interval: Duration,

    /// 输出参数默认值
    #[serde(default)]
    pub output: OutputDefaults,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            tick_interval: default_tick_interval(),
            output: OutputDefaults::default(),
        }
    }
}

fn default_tick_interval() -> Duration {
    Duration::from_millis(500)
}

/// 输出参数默认值 (每条消息发送后恢复)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDefaults {
    /// 语速 (words per minute)
    #[serde(default = "default_rate")]
    pub rate: i64,

    /// 音量 (0.0 - 1.0)
    #[serde(default = "default_volume")]
    pub volume: f64,

    /// 语音名称
    #[serde(default = "default_voice")]
    pub voice: String,
}

impl Default for OutputDefaults {
    fn default() -> Self {
        Self {
            rate: default_rate(),
            volume: default_volume(),
            voice: default_voice(),
        }
    }
}

impl OutputDefaults {
    /// 转换为参数表
    pub fn to_params(&self) -> OutputParams {
        let mut params = OutputParams::new();
        params.insert("rate".to_string(), ParamValue::Int(self.rate));
        params.insert("volume".to_string(), ParamValue::Float(self.volume));
        params.insert("voice".to_string(), ParamValue::Text(self.voice.clone()));
        params
    }
}

fn default_rate() -> i64 {
    135
}

fn default_volume() -> f64 {
    1.0
}

fn default_voice() -> String {
    "english".to_string()
}

/// 心跳设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessSettings {
    /// 是否启用
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// 心跳发往的消息源 (None = 第一个消息源)
    #[serde(default)]
    pub feed: Option<String>,

    /// 失败后的最短周期
    #[serde(default = "default_min_period", with = "humane")]
    pub min_period: Duration,

    /// 稳态周期上限
    #[serde(default = "default_max_period", with = "humane")]
    pub max_period: Duration,
}

impl Default for LivenessSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            feed: None,
            min_period: default_min_period(),
            max_period: default_max_period(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_min_period() -> Duration {
    Duration::from_secs(60)
}

fn default_max_period() -> Duration {
    Duration::from_secs(30 * 60)
}

/// 消息源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    /// 邮箱 (依赖服务端 seen 标记)
    Mailbox,
    /// 社交网络 @ 提及
    Social,
}

impl FeedKind {
    /// 默认轮询间隔
    pub fn default_poll_interval(self) -> Duration {
        match self {
            Self::Mailbox => Duration::from_secs(1),
            Self::Social => Duration::from_secs(10),
        }
    }

    /// 默认重连等待
    pub fn default_backoff(self) -> Duration {
        match self {
            Self::Mailbox => Duration::from_secs(1),
            Self::Social => Duration::from_secs(10),
        }
    }
}

/// 登录凭据 (只在构造时读取一次)
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub user: String,
    #[serde(default)]
    pub secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// 单个消息源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// 唯一名称
    pub name: String,

    /// 消息源类型
    pub kind: FeedKind,

    /// 轮询间隔 (None = 类型默认值)
    #[serde(
        default,
        with = "humane::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub poll_interval: Option<Duration>,

    /// 瞬时错误后的等待 (None = 类型默认值)
    #[serde(
        default,
        with = "humane::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub backoff: Option<Duration>,

    /// 出站队列最长等待
    #[serde(default = "default_outbound_wait", with = "humane")]
    pub outbound_wait: Duration,

    /// 入队后是否回执
    #[serde(default = "default_true")]
    pub acknowledge: bool,

    /// 心跳邮件主题 (仅 Mailbox)
    #[serde(default = "default_heartbeat_subject")]
    pub heartbeat_subject: String,

    /// 账号名 (仅 Social，用于去掉 @ 前缀)
    #[serde(default)]
    pub screen_name: Option<String>,

    /// 登录凭据
    #[serde(default)]
    pub credentials: Option<Credentials>,

    /// 脚本化消息 (内置 mock 传输使用)
    #[serde(default)]
    pub script: Vec<ScriptedMessage>,
}

impl FeedConfig {
    /// 最小配置
    pub fn new(name: impl Into<String>, kind: FeedKind) -> Self {
        Self {
            name: name.into(),
            kind,
            poll_interval: None,
            backoff: None,
            outbound_wait: default_outbound_wait(),
            acknowledge: true,
            heartbeat_subject: default_heartbeat_subject(),
            screen_name: None,
            credentials: None,
            script: Vec::new(),
        }
    }

    /// 生效的轮询间隔
    pub fn effective_poll_interval(&self) -> Duration {
        self.poll_interval
            .unwrap_or_else(|| self.kind.default_poll_interval())
    }

    /// 生效的重连等待
    pub fn effective_backoff(&self) -> Duration {
        self.backoff.unwrap_or_else(|| self.kind.default_backoff())
    }
}

fn default_outbound_wait() -> Duration {
    Duration::from_secs(2)
}

/// 心跳邮件的保留主题
pub const DEFAULT_HEARTBEAT_SUBJECT: &str = "pipumpkin heartbeat";

fn default_heartbeat_subject() -> String {
    DEFAULT_HEARTBEAT_SUBJECT.to_string()
}

/// 脚本化消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptedMessage {
    /// 消息正文
    pub text: String,

    /// 主题 (可选)
    #[serde(default)]
    pub subject: Option<String>,

    /// 启动后多久出现
    #[serde(default = "default_after", with = "humane")]
    pub after: Duration,
}

fn default_after() -> Duration {
    Duration::ZERO
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let bp: RuntimeBlueprint = toml::from_str("").unwrap();
        assert!(bp.feeds.is_empty());
        assert_eq!(bp.dispatcher.tick_interval, Duration::from_millis(500));
        assert_eq!(bp.dispatcher.output.rate, 135);
        assert_eq!(bp.liveness.max_period, Duration::from_secs(1800));
    }

    #[test]
    fn test_feed_effective_intervals() {
        let mut feed = FeedConfig::new("mail", FeedKind::Mailbox);
        assert_eq!(feed.effective_poll_interval(), Duration::from_secs(1));
        feed.poll_interval = Some(Duration::from_secs(5));
        assert_eq!(feed.effective_poll_interval(), Duration::from_secs(5));
        assert_eq!(
            FeedConfig::new("tw", FeedKind::Social).effective_backoff(),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn test_feed_toml_humane_durations() {
        let content = r#"
[[feeds]]
name = "inbox"
kind = "mailbox"
poll_interval = "3s"
outbound_wait = "500ms"

[[feeds.script]]
text = "hello delay:1m"
after = "2s"
"#;
        let bp: RuntimeBlueprint = toml::from_str(content).unwrap();
        let feed = bp.feed("inbox").unwrap();
        assert_eq!(feed.poll_interval, Some(Duration::from_secs(3)));
        assert_eq!(feed.outbound_wait, Duration::from_millis(500));
        assert_eq!(feed.script[0].after, Duration::from_secs(2));
        assert_eq!(feed.heartbeat_subject, DEFAULT_HEARTBEAT_SUBJECT);
    }

    #[test]
    fn test_output_defaults_params() {
        let params = OutputDefaults::default().to_params();
        assert_eq!(params.get("rate"), Some(&ParamValue::Int(135)));
        assert_eq!(
            params.get("voice"),
            Some(&ParamValue::Text("english".into()))
        );
    }

    #[test]
    fn test_credentials_debug_redacted() {
        let creds = Credentials {
            user: "pumpkin".into(),
            secret: "hunter2".into(),
        };
        assert!(!format!("{creds:?}").contains("hunter2"));
    }
}
