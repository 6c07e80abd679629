//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置与合约类型的往返
//! - 基于 MockSource 的 e2e 测试：多消息源 -> ReleaseQueue -> Dispatcher
//! - 故障恢复与心跳回路

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::FeedKind;
    use std::time::Duration;

    const SAMPLE: &str = r#"
[dispatcher]
tick_interval = "250ms"

[dispatcher.output]
rate = 150
voice = "german"

[liveness]
feed = "mentions"
min_period = "2m"
max_period = "1h"

[[feeds]]
name = "inbox"
kind = "mailbox"

[feeds.credentials]
user = "pumpkin@example.org"
secret = "hunter2"

[[feeds]]
name = "mentions"
kind = "social"
screen_name = "pipumpkin"
poll_interval = "15s"
"#;

    #[test]
    fn test_sample_config_survives_toml_and_json() {
        let blueprint = ConfigLoader::load_from_str(SAMPLE, ConfigFormat::Toml).unwrap();

        let toml = ConfigLoader::to_toml(&blueprint).unwrap();
        let from_toml = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&blueprint).unwrap();
        let from_json = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();

        for reloaded in [from_toml, from_json] {
            assert_eq!(reloaded.dispatcher.tick_interval, Duration::from_millis(250));
            assert_eq!(reloaded.dispatcher.output, blueprint.dispatcher.output);
            assert_eq!(reloaded.liveness.max_period, Duration::from_secs(3600));
            assert_eq!(reloaded.feeds.len(), 2);
            assert_eq!(reloaded.feeds[1].kind, FeedKind::Social);
            assert_eq!(
                reloaded.feeds[1].effective_poll_interval(),
                Duration::from_secs(15)
            );
        }
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use chrono::{TimeDelta, Utc};
    use contracts::{Credentials, FeedConfig, FeedKind, OutputDefaults};
    use dispatcher::{Dispatcher, HostIdentity, LivenessReporter, LogOutput};
    use ingestion::{strategy_for, FeedAdapter, FeedAdapterSettings, IngestionPipeline, MockSource};
    use scheduler::{ReleaseQueue, StopSignal};

    fn feed(name: &str, kind: FeedKind) -> FeedConfig {
        let mut config = FeedConfig::new(name, kind);
        config.poll_interval = Some(Duration::from_millis(20));
        config.backoff = Some(Duration::from_millis(10));
        config.outbound_wait = Duration::from_millis(10);
        config.credentials = Some(Credentials {
            user: format!("{name}@example.org"),
            secret: String::new(),
        });
        if kind == FeedKind::Social {
            config.screen_name = Some("pumpkin".into());
        }
        config
    }

    fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        condition()
    }

    fn identity() -> HostIdentity {
        HostIdentity {
            hostname: "pumpkin".into(),
            addresses: vec!["10.0.0.7".parse().unwrap()],
        }
    }

    /// End-to-end test: two MockSources -> ReleaseQueue -> Dispatcher
    ///
    /// 验证：
    /// 1. 两个消息源在各自线程中入队
    /// 2. Dispatcher 按 release time 而不是到达顺序分发
    /// 3. 每条入队消息都回执到自己的消息源
    #[tokio::test]
    async fn test_e2e_two_feeds_dispatch_in_release_order() {
        let queue = Arc::new(ReleaseQueue::new());
        let stop = StopSignal::new();

        let inbox = MockSource::new();
        let mentions = MockSource::new();
        mentions.cursor_only();
        inbox.push("Second delay:1s");
        mentions.push("@Pumpkin First rate:200");

        let mut ingestion = IngestionPipeline::new(Arc::clone(&queue), stop.clone());
        ingestion.register_feed(&feed("inbox", FeedKind::Mailbox), inbox.clone());
        ingestion.register_feed(&feed("mentions", FeedKind::Social), mentions.clone());
        ingestion.start_all().unwrap();

        let output = LogOutput::new("speaker").without_speech_delay();
        let history = output.history();
        let mut dispatcher = Dispatcher::new(
            Arc::clone(&queue),
            output,
            OutputDefaults::default().to_params(),
        );
        let dispatch_stop = stop.clone();
        let handle = tokio::task::spawn_blocking(move || {
            dispatcher.run(&dispatch_stop, Duration::from_millis(20), None)
        });

        let watched = history.clone();
        let delivered = tokio::task::spawn_blocking(move || {
            wait_until(Duration::from_secs(5), || watched.len() == 2)
        })
        .await
        .unwrap();

        stop.stop();
        let summary = handle.await.unwrap();
        let errors = tokio::task::spawn_blocking(move || ingestion.join_all())
            .await
            .unwrap();

        assert!(delivered, "both messages should be dispatched");
        assert!(errors.is_empty());

        let entries = history.entries();
        assert_eq!(entries[0].text, "First");
        assert_eq!(entries[0].params["rate"], contracts::ParamValue::Int(200));
        assert_eq!(entries[1].text, "Second");
        assert_eq!(summary.total_dispatched, 2);
        assert_eq!(summary.source_counts.get("mentions"), Some(&1));

        let inbox_replies = inbox.sent();
        assert_eq!(inbox_replies.len(), 1);
        assert!(inbox_replies[0].text.contains("\"Second\" (delay=1 seconds)"));
        let mention_replies = mentions.sent();
        assert_eq!(mention_replies.len(), 1);
        assert!(mention_replies[0].text.contains("\"First\" (rate=200)"));
    }

    /// Unparseable delays queue immediately and say so in the reply
    #[test]
    fn test_e2e_unparseable_delay_is_immediate() {
        let queue = Arc::new(ReleaseQueue::new());
        let config = feed("inbox", FeedKind::Mailbox);
        let source = MockSource::new();
        let mut adapter = FeedAdapter::new(
            FeedAdapterSettings::from(&config),
            source.clone(),
            strategy_for(&config),
            Arc::clone(&queue),
            StopSignal::new(),
        );

        adapter.connect().unwrap();
        source.push("Hi delay:soon");
        let now = Utc::now();
        assert_eq!(adapter.poll_once(now).unwrap(), 1);
        assert_eq!(adapter.drain_outbound(Duration::ZERO), 1);

        let reply = &source.sent()[0];
        assert!(reply.text.contains("\"Hi\" (delay=?)"), "got {}", reply.text);

        let output = LogOutput::new("speaker").without_speech_delay();
        let mut dispatcher = Dispatcher::new(
            Arc::clone(&queue),
            output,
            OutputDefaults::default().to_params(),
        );
        let outcome = dispatcher.tick(Utc::now()).unwrap();
        assert_eq!(outcome.message.text, "Hi");
        assert!(outcome.fallbacks.is_empty());
    }

    /// A poller failing its first three connects still delivers
    #[test]
    fn test_e2e_flaky_source_recovers() {
        let queue = Arc::new(ReleaseQueue::new());
        let stop = StopSignal::new();
        let config = feed("inbox", FeedKind::Mailbox);
        let source = MockSource::new();
        source.fail_connects(3);
        source.push("made it");

        let adapter = FeedAdapter::new(
            FeedAdapterSettings::from(&config),
            source.clone(),
            strategy_for(&config),
            Arc::clone(&queue),
            stop.clone(),
        );
        let metrics = adapter.metrics();
        let handle = adapter.spawn().unwrap();

        let queued = wait_until(Duration::from_secs(5), || queue.len() == 1);
        stop.stop();
        let result = handle.join().unwrap();

        assert!(queued);
        assert!(result.is_ok());
        assert_eq!(source.connect_attempts(), 4);
        assert_eq!(metrics.snapshot().failures, 3);
        assert_eq!(queue.try_pop_due(Utc::now()).unwrap().text, "made it");
    }

    /// One feed failing fatally leaves the others running
    #[test]
    fn test_e2e_fatal_feed_is_isolated() {
        let queue = Arc::new(ReleaseQueue::new());
        let stop = StopSignal::new();

        let broken = MockSource::new();
        broken.reject_credentials();
        let healthy = MockSource::new();
        healthy.push("still here");

        let mut ingestion = IngestionPipeline::new(Arc::clone(&queue), stop.clone());
        ingestion.register_feed(&feed("broken", FeedKind::Mailbox), broken);
        ingestion.register_feed(&feed("healthy", FeedKind::Mailbox), healthy);
        ingestion.start_all().unwrap();

        assert!(wait_until(Duration::from_secs(5), || queue.len() == 1
            && ingestion.finished_count() == 1));
        assert!(!ingestion.all_finished());

        ingestion.stop_all();
        let errors = ingestion.join_all();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].adapter(), "broken");
    }

    /// Heartbeat delivery results travel back and adapt the period
    #[test]
    fn test_e2e_heartbeat_period_follows_delivery() {
        let queue = Arc::new(ReleaseQueue::new());
        let config = feed("inbox", FeedKind::Mailbox);
        let source = MockSource::new();
        let mut adapter = FeedAdapter::new(
            FeedAdapterSettings::from(&config),
            source.clone(),
            strategy_for(&config),
            Arc::clone(&queue),
            StopSignal::new(),
        );
        let mut liveness = LivenessReporter::new(
            adapter.outbound(),
            Duration::from_secs(60),
            Duration::from_secs(1800),
        )
        .with_identity(identity());
        adapter.connect().unwrap();

        let t0 = Utc::now();
        assert!(liveness.poll(t0));
        source.fail_sends(true);
        adapter.drain_outbound(Duration::ZERO);

        // failure halves the period
        assert!(!liveness.poll(t0 + TimeDelta::seconds(1)));
        assert_eq!(liveness.period(), Duration::from_secs(900));

        source.fail_sends(false);
        assert!(liveness.poll(t0 + TimeDelta::seconds(900)));
        adapter.drain_outbound(Duration::ZERO);
        assert!(!liveness.poll(t0 + TimeDelta::seconds(901)));
        assert_eq!(liveness.period(), Duration::from_secs(1800));

        let sent = source.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].is_heartbeat());
        assert_eq!(sent[0].text, "Still alive host=pumpkin addresses=10.0.0.7");
    }

    /// Own heartbeat mails coming back through the inbox are not spoken
    #[test]
    fn test_e2e_returning_heartbeat_mail_is_filtered() {
        let queue = Arc::new(ReleaseQueue::new());
        let config = feed("inbox", FeedKind::Mailbox);
        let source = MockSource::new();
        let mut adapter = FeedAdapter::new(
            FeedAdapterSettings::from(&config),
            source.clone(),
            strategy_for(&config),
            Arc::clone(&queue),
            StopSignal::new(),
        );
        adapter.connect().unwrap();

        source.push_with_subject("Ready to go! host=pumpkin", &config.heartbeat_subject);
        source.push("real message");
        assert_eq!(adapter.poll_once(Utc::now()).unwrap(), 1);
        assert_eq!(queue.len(), 1);
        assert_eq!(adapter.metrics().snapshot().items_filtered, 1);
    }
}
