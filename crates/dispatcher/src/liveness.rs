//! LivenessReporter - periodic heartbeat through a feed's outbound queue
//!
//! 启动时先发送 "Ready to go!"，之后按周期发送 "Still alive"。
//! 周期自适应：投递失败时减半 (不低于 min_period)，成功时加倍 (不高于 max_period)。
//! 投递结果由 adapter 通过 `OutboundQueue::report_heartbeat` 回传。

use std::net::{IpAddr, UdpSocket};
use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use contracts::{LivenessSettings, OutboundItem, Timestamp};
use scheduler::OutboundQueue;
use tracing::{debug, info, warn};

/// 启动公告
pub const STARTUP_TEXT: &str = "Ready to go!";

/// 周期心跳
pub const ALIVE_TEXT: &str = "Still alive";

/// 本机标识：主机名 + 本地地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentity {
    pub hostname: String,
    pub addresses: Vec<IpAddr>,
}

impl HostIdentity {
    /// 探测主机名与出口地址
    ///
    /// 对公网地址 `connect` 一个 UDP socket 只会选路，不发送数据。
    pub fn detect() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown".into());

        let probes = [
            ("0.0.0.0:0", "8.8.8.8:80"),
            ("[::]:0", "[2001:4860:4860::8888]:80"),
        ];
        let addresses = probes
            .into_iter()
            .filter_map(|(bind, probe)| {
                let socket = UdpSocket::bind(bind).ok()?;
                socket.connect(probe).ok()?;
                socket.local_addr().ok().map(|addr| addr.ip())
            })
            .filter(|ip| !ip.is_unspecified())
            .collect();

        Self {
            hostname,
            addresses,
        }
    }

    fn describe(&self) -> String {
        if self.addresses.is_empty() {
            format!("host={} addresses=none", self.hostname)
        } else {
            let addresses = self
                .addresses
                .iter()
                .map(IpAddr::to_string)
                .collect::<Vec<_>>()
                .join(",");
            format!("host={} addresses={addresses}", self.hostname)
        }
    }
}

/// 心跳发送器 (在 Dispatcher 循环中轮询)
#[derive(Debug)]
pub struct LivenessReporter {
    outbound: Arc<OutboundQueue>,
    identity: HostIdentity,
    min_period: Duration,
    max_period: Duration,
    period: Duration,
    last_sent: Option<Timestamp>,
    sent: u64,
}

impl LivenessReporter {
    pub fn new(outbound: Arc<OutboundQueue>, min_period: Duration, max_period: Duration) -> Self {
        let max_period = max_period.max(min_period);
        Self {
            outbound,
            identity: HostIdentity::detect(),
            min_period,
            max_period,
            period: max_period,
            last_sent: None,
            sent: 0,
        }
    }

    pub fn from_settings(outbound: Arc<OutboundQueue>, settings: &LivenessSettings) -> Self {
        Self::new(outbound, settings.min_period, settings.max_period)
    }

    /// 替换探测到的主机标识
    pub fn with_identity(mut self, identity: HostIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// 当前周期
    pub fn period(&self) -> Duration {
        self.period
    }

    /// 已发出的心跳数
    pub fn sent_count(&self) -> u64 {
        self.sent
    }

    /// 下次心跳时间 (None = 启动公告尚未发送)
    pub fn next_due(&self) -> Option<Timestamp> {
        let last = self.last_sent?;
        let period = TimeDelta::from_std(self.period).unwrap_or(TimeDelta::MAX);
        Some(last.checked_add_signed(period).unwrap_or(last))
    }

    /// 处理投递回执，到期时发送心跳；返回是否发送
    pub fn poll(&mut self, now: Timestamp) -> bool {
        if let Some(delivered) = self.outbound.take_heartbeat_report() {
            self.adapt(delivered);
        }

        let due = self.next_due().is_none_or(|due| now >= due);
        if !due {
            return false;
        }

        let text = if self.sent == 0 {
            format!("{STARTUP_TEXT} {}", self.identity.describe())
        } else {
            format!("{ALIVE_TEXT} {}", self.identity.describe())
        };
        debug!(%text, "heartbeat queued");
        self.outbound.push(OutboundItem::heartbeat(text));
        self.last_sent = Some(now);
        self.sent += 1;
        true
    }

    fn adapt(&mut self, delivered: bool) {
        let previous = self.period;
        self.period = if delivered {
            (self.period * 2).min(self.max_period)
        } else {
            (self.period / 2).max(self.min_period)
        };
        observability::record_heartbeat_period(self.period.as_secs_f64());
        if delivered {
            if self.period != previous {
                info!(
                    period_secs = self.period.as_secs(),
                    "heartbeat delivered, period widened"
                );
            }
        } else {
            warn!(
                period_secs = self.period.as_secs(),
                "heartbeat not delivered, period shortened"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reporter(outbound: &Arc<OutboundQueue>) -> LivenessReporter {
        LivenessReporter::new(
            Arc::clone(outbound),
            Duration::from_secs(60),
            Duration::from_secs(1800),
        )
        .with_identity(HostIdentity {
            hostname: "pumpkin".into(),
            addresses: vec!["192.168.1.20".parse().unwrap()],
        })
    }

    #[test]
    fn test_startup_announcement_first() {
        let outbound = Arc::new(OutboundQueue::default());
        let mut liveness = reporter(&outbound);
        let t0 = Utc::now();

        assert!(liveness.poll(t0));
        let item = outbound.try_pop().unwrap();
        assert!(item.is_heartbeat());
        assert_eq!(item.text, "Ready to go! host=pumpkin addresses=192.168.1.20");

        assert!(!liveness.poll(t0 + TimeDelta::minutes(29)));
        assert!(liveness.poll(t0 + TimeDelta::minutes(30)));
        assert!(outbound.try_pop().unwrap().text.starts_with("Still alive"));
    }

    #[test]
    fn test_failure_halves_period_down_to_min() {
        let outbound = Arc::new(OutboundQueue::default());
        let mut liveness = reporter(&outbound);
        let t0 = Utc::now();
        liveness.poll(t0);

        for expected_ms in [900_000, 450_000, 225_000, 112_500, 60_000, 60_000] {
            outbound.report_heartbeat(false);
            liveness.poll(t0);
            assert_eq!(liveness.period(), Duration::from_millis(expected_ms));
        }
        assert_eq!(liveness.period(), Duration::from_secs(60));
    }

    #[test]
    fn test_success_doubles_period_up_to_max() {
        let outbound = Arc::new(OutboundQueue::default());
        let mut liveness = reporter(&outbound);
        let t0 = Utc::now();
        liveness.poll(t0);

        outbound.report_heartbeat(false);
        liveness.poll(t0);
        outbound.report_heartbeat(false);
        liveness.poll(t0);
        assert_eq!(liveness.period(), Duration::from_secs(450));

        outbound.report_heartbeat(true);
        liveness.poll(t0);
        assert_eq!(liveness.period(), Duration::from_secs(900));
        outbound.report_heartbeat(true);
        liveness.poll(t0);
        outbound.report_heartbeat(true);
        liveness.poll(t0);
        assert_eq!(liveness.period(), Duration::from_secs(1800));
    }

    #[test]
    fn test_shorter_period_brings_next_heartbeat_forward() {
        let outbound = Arc::new(OutboundQueue::default());
        let mut liveness = reporter(&outbound);
        let t0 = Utc::now();
        liveness.poll(t0);
        outbound.report_heartbeat(false);

        assert!(liveness.poll(t0 + TimeDelta::minutes(15)));
        assert_eq!(liveness.sent_count(), 2);
    }

    #[test]
    fn test_detect_has_hostname() {
        let identity = HostIdentity::detect();
        assert!(!identity.hostname.is_empty());
    }
}
