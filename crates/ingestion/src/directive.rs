//! DirectiveParser - `key:value` 指令提取
//!
//! 纯函数，无共享状态，永不失败：无法识别的 `delay` 被替换为 `"?"`，
//! 其它格式错误的指令原样保留在 map 中，由下游忽略。

use std::sync::LazyLock;

use chrono::TimeDelta;
use contracts::{Directives, ScheduledMessage, TimeUnit, Timestamp};
use regex::Regex;
use serde::Serialize;

/// 延迟指令的 key
pub const DELAY_KEY: &str = "delay";

/// 被拒绝的延迟值
pub const REJECTED_VALUE: &str = "?";

// Constant pattern, verified by the tests below
#[allow(clippy::expect_used)]
static DIRECTIVE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+):(\S+)").expect("constant regex pattern is valid"));

/// 解析结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedMessage {
    /// 去除全部指令并 trim 后的正文
    pub clean_text: String,
    /// `received_at` 加上延迟
    pub release_time: Timestamp,
    /// 小写 key -> value (`delay` 已改写为可读形式)
    pub directives: Directives,
}

impl ParsedMessage {
    /// 附上来源，生成可入队的消息
    pub fn into_scheduled(self, source: impl Into<String>) -> ScheduledMessage {
        ScheduledMessage::new(self.release_time, self.clean_text, self.directives, source)
    }
}

/// 指令解析器
pub struct DirectiveParser;

impl DirectiveParser {
    /// 解析一段原始文本
    ///
    /// 匹配 `(\w+):(\S+)`，key 转小写，后出现的同名 key 覆盖先前的值。
    pub fn parse(raw_text: &str, received_at: Timestamp) -> ParsedMessage {
        let mut directives = Directives::new();
        for caps in DIRECTIVE_PATTERN.captures_iter(raw_text) {
            directives.insert(caps[1].to_lowercase(), caps[2].to_string());
        }

        let clean_text = DIRECTIVE_PATTERN
            .replace_all(raw_text, "")
            .trim()
            .to_string();

        let mut release_time = received_at;
        if let Some(value) = directives.get_mut(DELAY_KEY) {
            match parse_delay(value).and_then(|(offset, human)| {
                received_at
                    .checked_add_signed(offset)
                    .map(|time| (time, human))
            }) {
                Some((time, human)) => {
                    release_time = time;
                    *value = human;
                }
                None => *value = REJECTED_VALUE.to_string(),
            }
        }

        ParsedMessage {
            clean_text,
            release_time,
            directives,
        }
    }
}

/// `^\d+[smh]$` -> (offset, "2 seconds")
fn parse_delay(value: &str) -> Option<(TimeDelta, String)> {
    let unit_letter = value.chars().last()?;
    let digits = &value[..value.len() - unit_letter.len_utf8()];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let unit = TimeUnit::from_letter(unit_letter)?;
    let amount: u64 = digits.parse().ok()?;
    let offset = TimeDelta::from_std(unit.duration(amount)?).ok()?;
    Some((offset, format!("{amount} {}", unit.name())))
}

/// 渲染为 `k=v, k=v` (map 顺序)
pub fn format_directives(directives: &Directives) -> String {
    directives
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(", ")
}
