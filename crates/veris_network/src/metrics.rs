use strum::IntoStaticStr;
use veris_metrics::define_metrics;

pub const LABEL_NAME_REASON: &str = "reason";

define_metrics!(
    Network => {
        MetricCounter { NETWORK_CONNECTIONS_ACCEPTED, "network_connections_accepted", "Counter of admitted connections" },
        LabeledMetricCounter { NETWORK_CONNECTIONS_REJECTED, "network_connections_rejected", "Counter of rejected connections, by reason" },
        MetricCounter { NETWORK_HANDSHAKE_FAILURES, "network_handshake_failures", "Counter of failed Noise handshakes" },
        MetricCounter { NETWORK_MESSAGES_THROTTLED, "network_messages_throttled", "Counter of messages dropped by rate limiting" },
        MetricCounter { NETWORK_PEERS_BANNED, "network_peers_banned", "Counter of peers banned for misbehavior" },
        MetricGauge { NETWORK_ACTIVE_PEERS, "network_active_peers", "Number of registered peers" },
    },
);

/// Label values of the `reason` dimension on connection rejections.
#[derive(Clone, Copy, Debug, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum RejectReason {
    RateLimited,
    Flood,
    Banned,
    Authentication,
    Authorization,
    Sybil,
    Eclipse,
}

impl RejectReason {
    pub fn as_label(&self) -> [(&'static str, &'static str); 1] {
        [(LABEL_NAME_REASON, (*self).into())]
    }
}

pub(crate) fn register_metrics() {
    NETWORK_CONNECTIONS_ACCEPTED.register();
    NETWORK_CONNECTIONS_REJECTED.register();
    NETWORK_HANDSHAKE_FAILURES.register();
    NETWORK_MESSAGES_THROTTLED.register();
    NETWORK_PEERS_BANNED.register();
    NETWORK_ACTIVE_PEERS.register();
}
