//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only, never on each other's internals.
//!
//! ## Time Model
//! - Wall-clock UTC timestamps (`chrono::DateTime<Utc>`) are the only clock
//! - A message is due when `release_time <= now`

mod blueprint;
mod duration;
mod error;
mod message;
mod outbound;
mod output;
mod source;

pub use blueprint::*;
pub use duration::{format_duration, humane, parse_duration, TimeUnit};
pub use error::*;
pub use message::*;
pub use outbound::*;
pub use output::*;
pub use source::{Cursor, OutboundSender, RawItem, SourcePoller};
