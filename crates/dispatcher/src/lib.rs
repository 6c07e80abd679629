//! # Dispatcher
//!
//! 消息分发模块。
//!
//! 负责：
//! - 从 `ReleaseQueue` 取出到期消息 (单消费者)
//! - 将指令映射为输出参数，覆盖在默认值之上
//! - 驱动 `OutputAction` 渲染，按 `is_idle` 节流
//! - 在同一循环中发送心跳

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod liveness;
pub mod metrics;
pub mod output;
pub mod params;

pub use contracts::{OutputAction, ScheduledMessage};
pub use dispatcher::{DispatchOutcome, Dispatcher, BUSY_POLL_INTERVAL};
pub use error::DispatcherError;
pub use handle::DispatcherHandle;
pub use liveness::{HostIdentity, LivenessReporter, ALIVE_TEXT, STARTUP_TEXT};
pub use metrics::{DispatcherMetrics, MetricsSnapshot};
pub use output::{LogOutput, RenderLog, RenderedMessage};
pub use params::{directives_to_params, merge_over_defaults, ParamMapping};
