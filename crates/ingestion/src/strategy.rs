//! Feed strategies: the per-source policy plugged into [`FeedAdapter`].
//!
//! The driver owns connection handling and pacing; a strategy only decides
//! how the cursor advances, which items are admitted and what the
//! acknowledgement looks like.
//!
//! [`FeedAdapter`]: crate::FeedAdapter

use contracts::{Cursor, FeedConfig, FeedKind, OutboundItem, RawItem, DEFAULT_HEARTBEAT_SUBJECT};
use regex::{Regex, RegexBuilder};

use crate::directive::{format_directives, ParsedMessage};

/// Why an item never reaches the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Our own liveness mail coming back
    Heartbeat,
    /// Nothing left to say after stripping
    Empty,
}

impl SkipReason {
    /// Metrics label
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Heartbeat => "heartbeat",
            Self::Empty => "empty",
        }
    }
}

/// Outcome of admission filtering
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Parse this text
    Accept(String),
    Skip(SkipReason),
}

/// Source-specific behavior of a feed adapter
pub trait FeedStrategy: Send {
    fn kind(&self) -> FeedKind;

    /// Advance `cursor` past `item` (called before the item is queued)
    fn advance_cursor(&self, cursor: &mut Cursor, item: &RawItem);

    /// Filter and pre-process an item before directive parsing
    fn admit(&self, item: &RawItem) -> Admission;

    /// Reply telling the sender when their message will play
    fn acknowledgement(&self, item: &RawItem, parsed: &ParsedMessage) -> OutboundItem {
        OutboundItem::reply(item.source_id.clone(), acknowledgement_text(parsed))
    }
}

impl<T: FeedStrategy + ?Sized> FeedStrategy for Box<T> {
    fn kind(&self) -> FeedKind {
        (**self).kind()
    }

    fn advance_cursor(&self, cursor: &mut Cursor, item: &RawItem) {
        (**self).advance_cursor(cursor, item)
    }

    fn admit(&self, item: &RawItem) -> Admission {
        (**self).admit(item)
    }

    fn acknowledgement(&self, item: &RawItem, parsed: &ParsedMessage) -> OutboundItem {
        (**self).acknowledgement(item, parsed)
    }
}

/// `Queued for 2026-01-02 10:00:02 UTC: "Hello there" (delay=2 seconds, rate=100)`
pub fn acknowledgement_text(parsed: &ParsedMessage) -> String {
    let when = parsed.release_time.format("%Y-%m-%d %H:%M:%S UTC");
    if parsed.directives.is_empty() {
        format!("Queued for {when}: \"{}\"", parsed.clean_text)
    } else {
        format!(
            "Queued for {when}: \"{}\" ({})",
            parsed.clean_text,
            format_directives(&parsed.directives)
        )
    }
}

/// Strategy for a configured feed
pub fn strategy_for(config: &FeedConfig) -> Box<dyn FeedStrategy> {
    match config.kind {
        FeedKind::Mailbox => Box::new(MailboxStrategy::new(config.heartbeat_subject.clone())),
        FeedKind::Social => Box::new(SocialFeedStrategy::new(
            config.screen_name.clone().unwrap_or_default(),
        )),
    }
}

/// Mailbox: seen-state lives on the server, heartbeats are filtered out
#[derive(Debug, Clone)]
pub struct MailboxStrategy {
    heartbeat_subject: String,
}

impl Default for MailboxStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_HEARTBEAT_SUBJECT)
    }
}

impl MailboxStrategy {
    pub fn new(heartbeat_subject: impl Into<String>) -> Self {
        Self {
            heartbeat_subject: heartbeat_subject.into(),
        }
    }
}

impl FeedStrategy for MailboxStrategy {
    fn kind(&self) -> FeedKind {
        FeedKind::Mailbox
    }

    fn advance_cursor(&self, _cursor: &mut Cursor, _item: &RawItem) {
        // the seen flag set by mark_seen is the cursor
    }

    fn admit(&self, item: &RawItem) -> Admission {
        let is_heartbeat = item
            .subject
            .as_deref()
            .is_some_and(|s| s.trim().eq_ignore_ascii_case(&self.heartbeat_subject));
        if is_heartbeat {
            return Admission::Skip(SkipReason::Heartbeat);
        }
        if item.body_text.trim().is_empty() {
            return Admission::Skip(SkipReason::Empty);
        }
        Admission::Accept(item.body_text.clone())
    }
}

/// Status updates are limited to this many characters
pub const SOCIAL_REPLY_LIMIT: usize = 280;

/// Social feed mentions: last-seen id cursor, `@screen_name` removed
#[derive(Debug, Clone)]
pub struct SocialFeedStrategy {
    /// `None` when no screen name is configured
    mention: Option<Regex>,
}

impl SocialFeedStrategy {
    pub fn new(screen_name: impl Into<String>) -> Self {
        let screen_name: String = screen_name.into();
        let name = screen_name.trim().trim_start_matches('@');
        let mention = if name.is_empty() {
            None
        } else {
            RegexBuilder::new(&format!("@{}", regex::escape(name)))
                .case_insensitive(true)
                .build()
                .ok()
        };
        Self { mention }
    }

    /// Remove every `@screen_name` mention, ignoring case
    pub fn strip_mentions(&self, text: &str) -> String {
        match &self.mention {
            Some(mention) => mention.replace_all(text, "").into_owned(),
            None => text.to_string(),
        }
    }
}

impl FeedStrategy for SocialFeedStrategy {
    fn kind(&self) -> FeedKind {
        FeedKind::Social
    }

    fn advance_cursor(&self, cursor: &mut Cursor, item: &RawItem) {
        *cursor = Cursor::After(item.source_id.clone());
    }

    fn admit(&self, item: &RawItem) -> Admission {
        let text = self.strip_mentions(&item.body_text);
        if text.trim().is_empty() {
            Admission::Skip(SkipReason::Empty)
        } else {
            Admission::Accept(text)
        }
    }

    fn acknowledgement(&self, item: &RawItem, parsed: &ParsedMessage) -> OutboundItem {
        let text: String = acknowledgement_text(parsed)
            .chars()
            .take(SOCIAL_REPLY_LIMIT)
            .collect();
        OutboundItem::reply(item.source_id.clone(), text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DirectiveParser;
    use chrono::{TimeZone, Utc};

    fn raw(id: &str, body: &str) -> RawItem {
        RawItem::new(id, body, Utc::now())
    }

    #[test]
    fn test_mailbox_filters_heartbeat_subject() {
        let strategy = MailboxStrategy::default();
        let item = raw("1", "still alive").with_subject("PiPumpkin Heartbeat");
        assert_eq!(strategy.admit(&item), Admission::Skip(SkipReason::Heartbeat));

        let item = raw("2", "say hi").with_subject("hello");
        assert_eq!(strategy.admit(&item), Admission::Accept("say hi".into()));
    }

    #[test]
    fn test_mailbox_skips_empty_body() {
        let strategy = MailboxStrategy::default();
        assert_eq!(strategy.admit(&raw("1", "  \n")), Admission::Skip(SkipReason::Empty));
    }

    #[test]
    fn test_mailbox_cursor_is_untouched() {
        let strategy = MailboxStrategy::default();
        let mut cursor = Cursor::Beginning;
        strategy.advance_cursor(&mut cursor, &raw("9", "x"));
        assert_eq!(cursor, Cursor::Beginning);
    }

    #[test]
    fn test_social_strips_mentions_case_insensitively() {
        let strategy = SocialFeedStrategy::new("@PiPumpkin");
        assert_eq!(
            strategy.strip_mentions("@pipumpkin say boo @PIPUMPKIN"),
            " say boo "
        );
        assert_eq!(strategy.strip_mentions("mail a@b.c"), "mail a@b.c");
        assert_eq!(strategy.strip_mentions("trailing @"), "trailing @");
    }

    #[test]
    fn test_social_strips_non_ascii_mentions() {
        let strategy = SocialFeedStrategy::new("Kürbis");
        assert_eq!(strategy.strip_mentions("@KÜRBIS hallo"), " hallo");
        assert_eq!(strategy.strip_mentions("@kürbis.bot"), ".bot");

        let dotted = SocialFeedStrategy::new("pi.pumpkin");
        assert_eq!(dotted.strip_mentions("@piXpumpkin hi"), "@piXpumpkin hi");
    }

    #[test]
    fn test_social_without_screen_name_keeps_text() {
        let strategy = SocialFeedStrategy::new("");
        assert_eq!(strategy.strip_mentions("@anyone hi"), "@anyone hi");
    }

    #[test]
    fn test_social_mention_only_is_skipped() {
        let strategy = SocialFeedStrategy::new("pumpkin");
        assert_eq!(strategy.admit(&raw("5", "@Pumpkin ")), Admission::Skip(SkipReason::Empty));
    }

    #[test]
    fn test_social_cursor_follows_items() {
        let strategy = SocialFeedStrategy::new("pumpkin");
        let mut cursor = Cursor::Beginning;
        strategy.advance_cursor(&mut cursor, &raw("41", "a"));
        strategy.advance_cursor(&mut cursor, &raw("42", "b"));
        assert_eq!(cursor, Cursor::After("42".into()));
    }

    #[test]
    fn test_acknowledgement_text() {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 2, 10, 0, 0).unwrap();
        let parsed = DirectiveParser::parse("Hello there rate:100 delay:2s", t0);
        assert_eq!(
            acknowledgement_text(&parsed),
            "Queued for 2026-01-02 10:00:02 UTC: \"Hello there\" (delay=2 seconds, rate=100)"
        );

        let parsed = DirectiveParser::parse("Hi delay:soon", t0);
        assert!(acknowledgement_text(&parsed).ends_with("(delay=?)"));
    }

    #[test]
    fn test_social_acknowledgement_is_truncated() {
        let strategy = SocialFeedStrategy::new("pumpkin");
        let item = raw("77", "x");
        let parsed = DirectiveParser::parse(&"long ".repeat(100), Utc::now());
        let ack = strategy.acknowledgement(&item, &parsed);
        assert_eq!(ack.reply_to(), Some("77"));
        assert_eq!(ack.text.chars().count(), SOCIAL_REPLY_LIMIT);
    }

    #[test]
    fn test_strategy_for_config() {
        let mut config = FeedConfig::new("mentions", FeedKind::Social);
        config.screen_name = Some("pumpkin".into());
        assert_eq!(strategy_for(&config).kind(), FeedKind::Social);

        let config = FeedConfig::new("inbox", FeedKind::Mailbox);
        assert_eq!(strategy_for(&config).kind(), FeedKind::Mailbox);
    }
}
