//! ScheduledMessage - Ingestion 输出 / Dispatcher 输入
//!
//! 解析后的待发送消息。

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 墙钟时间戳 (UTC)
pub type Timestamp = DateTime<Utc>;

/// 指令表：小写 key -> 原始 value
///
/// 有序 map，保证回执文本稳定。
pub type Directives = BTreeMap<String, String>;

/// 待发送消息
///
/// 由 FeedAdapter 解析生成，由 Dispatcher 消费一次。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledMessage {
    /// 最早可发送时间
    pub release_time: Timestamp,

    /// 去除指令后的正文
    pub text: String,

    /// 嵌入指令
    pub directives: Directives,

    /// 来源 adapter 名称 (仅用于诊断)
    pub source: String,
}

impl ScheduledMessage {
    /// 创建新消息
    pub fn new(
        release_time: Timestamp,
        text: impl Into<String>,
        directives: Directives,
        source: impl Into<String>,
    ) -> Self {
        Self {
            release_time,
            text: text.into(),
            directives,
            source: source.into(),
        }
    }

    /// `release_time <= now`
    #[inline]
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.release_time <= now
    }
}
