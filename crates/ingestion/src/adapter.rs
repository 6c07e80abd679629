//! 通用消息源适配器
//!
//! `FeedAdapter<C, S>`：驱动一个 `SourcePoller + OutboundSender` 客户端，
//! 由 `FeedStrategy` 决定游标推进、过滤和回执。
//!
//! 状态机：
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> Polling ─┐
//!       ^                                             │ transient error
//!       └──────────────── Backoff <───────────────────┘
//! 任意状态 --stop--> Stopped        致命错误 --> Failed
//! ```

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use chrono::{TimeDelta, Utc};
use contracts::{Cursor, FeedConfig, OutboundSender, SourceError, SourcePoller, Timestamp};
use scheduler::{OutboundQueue, ReleaseQueue, StopSignal, DEFAULT_SLEEP_SLICE};
use tracing::{debug, info, instrument, warn};

use crate::directive::DirectiveParser;
use crate::error::{IngestionError, Result};
use crate::metrics::AdapterMetrics;
use crate::strategy::{Admission, FeedStrategy, SkipReason};

/// Adapter 生命周期阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterPhase {
    Disconnected,
    Connecting,
    Connected,
    Polling,
    Backoff,
    Stopped,
    Failed,
}

/// Adapter 运行状态
#[derive(Debug, Clone)]
pub struct FeedAdapterState {
    pub phase: AdapterPhase,
    pub connected: bool,
    pub last_poll_time: Option<Timestamp>,
    pub poll_interval: Duration,
    pub backoff_until: Option<Timestamp>,
    /// 仅由 strategy 推进
    pub cursor: Cursor,
    pub consecutive_failures: u32,
}

/// Adapter 运行参数
#[derive(Debug, Clone)]
pub struct FeedAdapterSettings {
    pub name: String,
    pub poll_interval: Duration,
    pub backoff: Duration,
    /// 单次出站等待上限
    pub outbound_wait: Duration,
    /// 入队后是否回执
    pub acknowledge: bool,
}

impl From<&FeedConfig> for FeedAdapterSettings {
    fn from(config: &FeedConfig) -> Self {
        Self {
            name: config.name.clone(),
            poll_interval: config.effective_poll_interval(),
            backoff: config.effective_backoff(),
            outbound_wait: config.outbound_wait,
            acknowledge: config.acknowledge,
        }
    }
}

/// 通用消息源适配器
pub struct FeedAdapter<C, S> {
    settings: FeedAdapterSettings,
    client: C,
    strategy: S,
    queue: Arc<ReleaseQueue>,
    outbound: Arc<OutboundQueue>,
    stop: StopSignal,
    state: FeedAdapterState,
    metrics: Arc<AdapterMetrics>,
    cursor_initialized: bool,
    ever_connected: bool,
}

impl<C, S> FeedAdapter<C, S>
where
    C: SourcePoller + OutboundSender,
    S: FeedStrategy,
{
    pub fn new(
        settings: FeedAdapterSettings,
        client: C,
        strategy: S,
        queue: Arc<ReleaseQueue>,
        stop: StopSignal,
    ) -> Self {
        let state = FeedAdapterState {
            phase: AdapterPhase::Disconnected,
            connected: false,
            last_poll_time: None,
            poll_interval: settings.poll_interval,
            backoff_until: None,
            cursor: Cursor::Beginning,
            consecutive_failures: 0,
        };
        Self {
            settings,
            client,
            strategy,
            queue,
            outbound: Arc::new(OutboundQueue::default()),
            stop,
            state,
            metrics: Arc::new(AdapterMetrics::new()),
            cursor_initialized: false,
            ever_connected: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn state(&self) -> &FeedAdapterState {
        &self.state
    }

    /// 出站队列句柄 (Dispatcher / 心跳写入)
    pub fn outbound(&self) -> Arc<OutboundQueue> {
        Arc::clone(&self.outbound)
    }

    pub fn metrics(&self) -> Arc<AdapterMetrics> {
        Arc::clone(&self.metrics)
    }

    /// 建立会话
    ///
    /// 首次成功时向消息源请求初始游标，之后重连保留已有游标。
    #[instrument(name = "feed_connect", skip(self), fields(adapter = %self.settings.name))]
    pub fn connect(&mut self) -> std::result::Result<(), SourceError> {
        self.state.phase = AdapterPhase::Connecting;
        let result = self.client.connect().and_then(|()| {
            if !self.cursor_initialized {
                self.state.cursor = self.client.initial_cursor()?;
                self.cursor_initialized = true;
            }
            Ok(())
        });

        match result {
            Ok(()) => {
                self.state.connected = true;
                self.state.phase = AdapterPhase::Connected;
                self.state.consecutive_failures = 0;
                if self.ever_connected {
                    self.metrics.record_reconnect();
                }
                self.ever_connected = true;
                observability::record_adapter_connect(&self.settings.name, true);
                info!(cursor = ?self.state.cursor, "feed connected");
                Ok(())
            }
            Err(e) => {
                self.state.connected = false;
                self.state.phase = AdapterPhase::Disconnected;
                observability::record_adapter_connect(&self.settings.name, false);
                Err(e)
            }
        }
    }

    /// 拉取一次新消息并入队，返回入队数量
    ///
    /// 每条消息先 `mark_seen` 并推进游标，再入队，因此同一条目不会被重复入队。
    pub fn poll_once(&mut self, now: Timestamp) -> std::result::Result<usize, SourceError> {
        self.state.phase = AdapterPhase::Polling;
        self.state.last_poll_time = Some(now);

        let items = self.client.fetch_new_items(&self.state.cursor)?;
        self.metrics.record_fetched(items.len());

        let mut queued = 0;
        for item in items {
            self.client.mark_seen(&item)?;
            self.strategy.advance_cursor(&mut self.state.cursor, &item);

            let body = match self.strategy.admit(&item) {
                Admission::Accept(body) => body,
                Admission::Skip(reason) => {
                    match reason {
                        SkipReason::Empty => warn!(
                            adapter = %self.settings.name,
                            source_id = %item.source_id,
                            "skipping empty message"
                        ),
                        SkipReason::Heartbeat => debug!(
                            adapter = %self.settings.name,
                            source_id = %item.source_id,
                            "own heartbeat filtered"
                        ),
                    }
                    self.metrics.record_filtered();
                    observability::record_message_filtered(&self.settings.name, reason.as_str());
                    continue;
                }
            };

            let parsed = DirectiveParser::parse(&body, item.received_at);
            let ack = self
                .settings
                .acknowledge
                .then(|| self.strategy.acknowledgement(&item, &parsed));

            info!(
                adapter = %self.settings.name,
                source_id = %item.source_id,
                release_time = %parsed.release_time,
                text = %parsed.clean_text,
                "message queued"
            );
            self.queue
                .push(parsed.into_scheduled(self.settings.name.clone()));
            self.metrics.record_queued();
            observability::record_message_queued(&self.settings.name);
            queued += 1;

            if let Some(ack) = ack {
                self.outbound.push(ack);
            }
        }

        self.state.phase = AdapterPhase::Connected;
        Ok(queued)
    }

    /// 发送出站条目：最多等待 `wait` 取第一条，其余不等待
    ///
    /// 发送失败只记录，不重试。返回处理条目数。
    pub fn drain_outbound(&mut self, wait: Duration) -> usize {
        let Some(first) = self.outbound.pop_blocking(wait) else {
            return 0;
        };
        let mut handled = 0;
        let mut next = Some(first);
        while let Some(item) = next {
            let delivered = self.client.send(&item);
            if item.is_heartbeat() {
                self.outbound.report_heartbeat(delivered);
            }
            self.metrics.record_outbound(delivered);
            observability::record_outbound_sent(
                &self.settings.name,
                item.is_heartbeat(),
                delivered,
            );
            if !delivered {
                warn!(adapter = %self.settings.name, kind = ?item.kind, "outbound send failed");
            }
            handled += 1;
            next = self.outbound.try_pop();
        }
        handled
    }

    /// 进入 backoff 并可中断地等待
    fn backoff(&mut self, error: &SourceError) {
        let wait = error.retry_after().unwrap_or(self.settings.backoff);
        self.state.connected = false;
        self.state.phase = AdapterPhase::Backoff;
        self.state.consecutive_failures += 1;
        self.state.backoff_until =
            TimeDelta::from_std(wait).ok().map(|delta| Utc::now() + delta);
        self.metrics.record_failure();
        observability::record_adapter_backoff(&self.settings.name, wait.as_secs_f64() * 1000.0);
        warn!(
            adapter = %self.settings.name,
            error = %error,
            wait_ms = wait.as_millis() as u64,
            failures = self.state.consecutive_failures,
            "feed error, backing off"
        );

        self.stop.sleep(wait);
        self.state.backoff_until = None;
        self.state.phase = AdapterPhase::Disconnected;
    }

    fn fail(&mut self, error: SourceError) -> IngestionError {
        self.state.connected = false;
        self.state.phase = AdapterPhase::Failed;
        tracing::error!(adapter = %self.settings.name, error = %error, "feed failed");
        IngestionError::fatal(self.settings.name.clone(), error)
    }

    /// Adapter 主循环，直到停止信号或致命错误
    #[instrument(name = "feed_adapter", skip(self), fields(adapter = %self.settings.name))]
    pub fn run(&mut self) -> Result<()> {
        info!(
            poll_interval_ms = self.settings.poll_interval.as_millis() as u64,
            "feed adapter started"
        );

        while !self.stop.is_stopped() {
            if !self.state.connected {
                match self.connect() {
                    Ok(()) => {}
                    Err(e) if e.is_fatal() => return Err(self.fail(e)),
                    Err(e) => {
                        self.backoff(&e);
                        continue;
                    }
                }
            }

            let started = Instant::now();
            match self.poll_once(Utc::now()) {
                Ok(_) => {}
                Err(e) if e.is_fatal() => return Err(self.fail(e)),
                Err(e) => {
                    self.backoff(&e);
                    continue;
                }
            }

            // Keep the poll cadence while serving outbound traffic
            let deadline = started + self.settings.poll_interval;
            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() || self.stop.is_stopped() {
                    break;
                }
                let wait = remaining
                    .min(self.settings.outbound_wait)
                    .min(DEFAULT_SLEEP_SLICE);
                self.drain_outbound(wait);
            }
        }

        // Flush what is already queued without waiting
        if self.state.connected {
            self.drain_outbound(Duration::ZERO);
        }
        self.state.phase = AdapterPhase::Stopped;
        info!("feed adapter stopped");
        Ok(())
    }
}

impl<C, S> FeedAdapter<C, S>
where
    C: SourcePoller + OutboundSender + 'static,
    S: FeedStrategy + 'static,
{
    /// 在独立线程中运行
    pub fn spawn(mut self) -> Result<JoinHandle<Result<()>>> {
        let name = self.settings.name.clone();
        std::thread::Builder::new()
            .name(format!("feed-{name}"))
            .spawn(move || self.run())
            .map_err(|source| IngestionError::Spawn {
                adapter: name,
                source,
            })
    }
}
