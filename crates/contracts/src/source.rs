//! SourcePoller / OutboundSender - feed collaborator abstraction
//!
//! The wire protocols (mailbox access, social-feed API) live behind these
//! traits. Adapters drive them; they never see a socket directly.

use serde::{Deserialize, Serialize};

use crate::{OutboundItem, SourceError, Timestamp};

/// One message as fetched from a source, before directive parsing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    /// Source-assigned identifier (mail UID, mention id, ...)
    pub source_id: String,

    /// Plain-text body
    pub body_text: String,

    /// When the source says the item was created
    pub received_at: Timestamp,

    /// Subject line, for sources that have one
    #[serde(default)]
    pub subject: Option<String>,
}

impl RawItem {
    pub fn new(
        source_id: impl Into<String>,
        body_text: impl Into<String>,
        received_at: Timestamp,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            body_text: body_text.into(),
            received_at,
            subject: None,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

/// Position anchoring "only fetch items newer than X"
///
/// Opaque to the adapter driver: strategies decide how it advances.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cursor {
    /// Nothing seen yet, or the source tracks seen-state itself
    #[default]
    Beginning,
    /// Everything up to and including this source id has been consumed
    After(String),
}

impl Cursor {
    pub fn position(&self) -> Option<&str> {
        match self {
            Self::Beginning => None,
            Self::After(id) => Some(id),
        }
    }
}

/// Message source polled by a feed adapter
///
/// Implementations are owned by exactly one adapter thread, hence `&mut self`.
///
/// # Example
///
/// ```ignore
/// let mut poller: Box<dyn SourcePoller> = connect_mailbox(&config);
/// poller.connect()?;
/// for item in poller.fetch_new_items(&Cursor::Beginning)? {
///     poller.mark_seen(&item)?;
/// }
/// ```
pub trait SourcePoller: Send {
    /// Establish a session using the credentials supplied at construction
    fn connect(&mut self) -> Result<(), SourceError>;

    /// Cursor to start from after the first successful connect
    ///
    /// Sources that would otherwise replay their whole history (mention
    /// timelines) return the newest existing id here.
    fn initial_cursor(&mut self) -> Result<Cursor, SourceError> {
        Ok(Cursor::Beginning)
    }

    /// Items newer than `cursor`, oldest first
    fn fetch_new_items(&mut self, cursor: &Cursor) -> Result<Vec<RawItem>, SourceError>;

    /// Record `item` as consumed on the source side (seen flag)
    fn mark_seen(&mut self, item: &RawItem) -> Result<(), SourceError>;
}

/// Transport for replies and heartbeats
pub trait OutboundSender: Send {
    /// Returns whether the source accepted the item
    fn send(&mut self, item: &OutboundItem) -> bool;
}
