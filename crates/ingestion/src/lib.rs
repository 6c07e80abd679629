//! # Ingestion
//!
//! Message ingestion: polling feed adapters and the directive parser.
//!
//! Responsibilities:
//! - Extract `key:value` directives and compute release times
//! - Poll each source on its own thread with reconnect / backoff
//! - Push parsed messages into the shared `ReleaseQueue`
//! - Send acknowledgements and heartbeats back through the source
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{IngestionPipeline, MockSource};
//! use scheduler::{ReleaseQueue, StopSignal};
//!
//! let queue = Arc::new(ReleaseQueue::new());
//! let mut pipeline = IngestionPipeline::new(queue.clone(), StopSignal::new());
//! pipeline.register_feed(&feed_config, MockSource::from_script(&feed_config.script));
//! pipeline.start_all()?;
//! ```

mod adapter;
mod directive;
mod error;
mod metrics;
mod mock;
mod pipeline;
mod strategy;

// Re-exports
pub use adapter::{AdapterPhase, FeedAdapter, FeedAdapterSettings, FeedAdapterState};
pub use directive::{format_directives, DirectiveParser, ParsedMessage, DELAY_KEY, REJECTED_VALUE};
pub use error::{IngestionError, Result};
pub use metrics::{AdapterMetrics, AdapterMetricsSnapshot};
pub use mock::MockSource;
pub use pipeline::IngestionPipeline;
pub use strategy::{
    acknowledgement_text, strategy_for, Admission, FeedStrategy, MailboxStrategy, SkipReason,
    SocialFeedStrategy, SOCIAL_REPLY_LIMIT,
};
