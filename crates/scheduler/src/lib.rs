//! # Scheduler
//!
//! 消息调度原语：所有跨线程通信只经过这里的队列。
//!
//! 负责：
//! - 按 release time 排序的发送队列 (多生产者 / 单消费者)
//! - 每个消息源的出站队列 (回执、心跳)
//! - 协作式停止信号
//!
//! ## 使用示例
//!
//! ```ignore
//! use scheduler::ReleaseQueue;
//!
//! let queue = ReleaseQueue::new();
//! queue.push(message);
//!
//! // Dispatcher side
//! if let Some(due) = queue.try_pop_due(Utc::now()) {
//!     // render it
//! }
//! ```

mod outbound_queue;
mod release_queue;
mod stop;

pub use outbound_queue::{OutboundQueue, DEFAULT_OUTBOUND_CAPACITY};
pub use release_queue::{QueueStats, ReleaseQueue};
pub use stop::{StopSignal, DEFAULT_SLEEP_SLICE};

// Re-export contracts types
pub use contracts::{OutboundItem, ScheduledMessage, Timestamp};
