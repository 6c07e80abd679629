//! Output action implementations

mod log;

pub use self::log::{LogOutput, RenderLog, RenderedMessage};
