//! Mock 消息源
//!
//! 脚本化的 `SourcePoller + OutboundSender`，用于测试和无网络环境运行。
//! 支持故障注入：前 N 次 connect / fetch 失败、限流、认证失败、发送失败。
//! 默认按邮箱语义保存服务端 seen 标记；`cursor_only` 模式下去重完全依赖游标。

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use contracts::{
    Cursor, OutboundItem, OutboundSender, RawItem, ScriptedMessage, SourceError, SourcePoller,
    Timestamp,
};
use tracing::{debug, trace};

#[derive(Debug)]
struct Entry {
    item: RawItem,
    /// 之前不可见
    visible_at: Timestamp,
    seen: bool,
    /// 启动前已存在 (初始游标之前)
    history: bool,
}

#[derive(Debug, Default)]
struct MockState {
    entries: Vec<Entry>,
    /// 首次连接成功后才排期
    script: Vec<ScriptedMessage>,
    next_id: u64,
    connected: bool,
    connect_attempts: u32,
    fetch_calls: u32,
    fail_connects: u32,
    fail_fetches: u32,
    rate_limit: Option<Option<Duration>>,
    reject_credentials: bool,
    fail_sends: bool,
    /// 不保存 seen 标记 (社交源)
    cursor_only: bool,
    sent: Vec<OutboundItem>,
}

impl MockState {
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }

    fn add(
        &mut self,
        body: &str,
        subject: Option<&str>,
        visible_at: Timestamp,
        history: bool,
    ) -> String {
        let id = self.allocate_id();
        let mut item = RawItem::new(id.clone(), body, visible_at);
        item.subject = subject.map(str::to_string);
        self.entries.push(Entry {
            item,
            visible_at,
            seen: false,
            history,
        });
        id
    }

    fn schedule_script(&mut self, epoch: Timestamp) {
        for message in std::mem::take(&mut self.script) {
            let offset = TimeDelta::from_std(message.after).unwrap_or(TimeDelta::MAX);
            let at = epoch.checked_add_signed(offset).unwrap_or(epoch);
            self.add(&message.text, message.subject.as_deref(), at, false);
        }
    }
}

/// 脚本化 Mock 消息源
///
/// 可 clone：测试持有一份，adapter 持有另一份，共享同一状态。
#[derive(Debug, Clone, Default)]
pub struct MockSource {
    state: Arc<Mutex<MockState>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从配置脚本创建；`after` 相对首次连接成功的时间
    pub fn from_script(script: &[ScriptedMessage]) -> Self {
        let source = Self::new();
        source.lock().script = script.to_vec();
        source
    }

    /// 立即可见的新消息，返回 source id
    pub fn push(&self, body: &str) -> String {
        self.lock().add(body, None, Utc::now(), false)
    }

    /// 带主题的新消息
    pub fn push_with_subject(&self, body: &str, subject: &str) -> String {
        self.lock().add(body, Some(subject), Utc::now(), false)
    }

    /// 启动前就存在的消息 (社交源的初始游标会跳过它们)
    pub fn seed_history(&self, body: &str) -> String {
        let at = Utc::now() - TimeDelta::hours(1);
        self.lock().add(body, None, at, true)
    }

    /// 前 `n` 次 connect 返回瞬时错误
    pub fn fail_connects(&self, n: u32) -> &Self {
        self.lock().fail_connects = n;
        self
    }

    /// 前 `n` 次 fetch 返回瞬时错误
    pub fn fail_fetches(&self, n: u32) -> &Self {
        self.lock().fail_fetches = n;
        self
    }

    /// 下一次 fetch 返回限流错误
    pub fn rate_limit_once(&self, retry_after: Option<Duration>) -> &Self {
        self.lock().rate_limit = Some(retry_after);
        self
    }

    /// 所有 connect 返回认证错误
    pub fn reject_credentials(&self) -> &Self {
        self.lock().reject_credentials = true;
        self
    }

    /// 忽略 seen 标记：只有游标能阻止重复投递
    pub fn cursor_only(&self) -> &Self {
        self.lock().cursor_only = true;
        self
    }

    /// 出站发送全部失败
    pub fn fail_sends(&self, fail: bool) -> &Self {
        self.lock().fail_sends = fail;
        self
    }

    /// 已成功发送的出站条目
    pub fn sent(&self) -> Vec<OutboundItem> {
        self.lock().sent.clone()
    }

    pub fn connect_attempts(&self) -> u32 {
        self.lock().connect_attempts
    }

    pub fn fetch_calls(&self) -> u32 {
        self.lock().fetch_calls
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    /// 已标记 seen 的条目数
    pub fn seen_count(&self) -> usize {
        self.lock().entries.iter().filter(|e| e.seen).count()
    }

    /// 模拟连接断开
    pub fn drop_connection(&self) {
        self.lock().connected = false;
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn id_after(id: &str, cursor: &Cursor) -> bool {
    match cursor.position() {
        None => true,
        Some(position) => match (id.parse::<u64>(), position.parse::<u64>()) {
            (Ok(id), Ok(position)) => id > position,
            _ => id > position,
        },
    }
}

impl SourcePoller for MockSource {
    fn connect(&mut self) -> Result<(), SourceError> {
        let mut state = self.lock();
        state.connect_attempts += 1;
        if state.reject_credentials {
            return Err(SourceError::authentication("mock credentials rejected"));
        }
        if state.fail_connects > 0 {
            state.fail_connects -= 1;
            return Err(SourceError::transient("mock connect refused"));
        }
        if !state.script.is_empty() {
            state.schedule_script(Utc::now());
        }
        state.connected = true;
        debug!(attempt = state.connect_attempts, "mock source connected");
        Ok(())
    }

    fn initial_cursor(&mut self) -> Result<Cursor, SourceError> {
        let state = self.lock();
        Ok(state
            .entries
            .iter()
            .filter(|e| e.history)
            .last()
            .map(|e| Cursor::After(e.item.source_id.clone()))
            .unwrap_or_default())
    }

    fn fetch_new_items(&mut self, cursor: &Cursor) -> Result<Vec<RawItem>, SourceError> {
        let mut state = self.lock();
        state.fetch_calls += 1;
        if !state.connected {
            return Err(SourceError::transient("mock source not connected"));
        }
        if let Some(retry_after) = state.rate_limit.take() {
            return Err(SourceError::RateLimited { retry_after });
        }
        if state.fail_fetches > 0 {
            state.fail_fetches -= 1;
            state.connected = false;
            return Err(SourceError::transient("mock fetch failed"));
        }

        let now = Utc::now();
        let ignore_seen = state.cursor_only;
        let items: Vec<RawItem> = state
            .entries
            .iter()
            .filter(|e| {
                (ignore_seen || !e.seen)
                    && e.visible_at <= now
                    && id_after(&e.item.source_id, cursor)
            })
            .map(|e| e.item.clone())
            .collect();
        trace!(count = items.len(), ?cursor, "mock fetch");
        Ok(items)
    }

    fn mark_seen(&mut self, item: &RawItem) -> Result<(), SourceError> {
        let mut state = self.lock();
        if state.cursor_only {
            return Ok(());
        }
        if let Some(entry) = state
            .entries
            .iter_mut()
            .find(|e| e.item.source_id == item.source_id)
        {
            entry.seen = true;
        }
        Ok(())
    }
}

impl OutboundSender for MockSource {
    fn send(&mut self, item: &OutboundItem) -> bool {
        let mut state = self.lock();
        if state.fail_sends || !state.connected {
            return false;
        }
        state.sent.push(item.clone());
        true
    }
}
