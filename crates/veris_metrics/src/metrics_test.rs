use pretty_assertions::assert_eq;

use crate::{define_metrics, MetricScope};

define_metrics!(
    Admission => {
        MetricCounter { TEST_TXS_SEEN, "test_txs_seen", "Counter of transactions seen" },
        LabeledMetricCounter { TEST_TXS_REJECTED, "test_txs_rejected", "Counter of rejections" },
    },
    Network => {
        MetricGauge { TEST_ACTIVE_PEERS, "test_active_peers", "Number of connected peers" },
        MetricHistogram { TEST_HANDSHAKE_SECS, "test_handshake_secs", "Handshake latency" },
    },
);

#[test]
fn define_metrics_assigns_names_and_scopes() {
    assert_eq!(TEST_TXS_SEEN.get_name(), "test_txs_seen");
    assert_eq!(TEST_TXS_SEEN.get_scope(), MetricScope::Admission);
    assert_eq!(TEST_TXS_REJECTED.get_name(), "test_txs_rejected");
    assert_eq!(TEST_ACTIVE_PEERS.get_scope(), MetricScope::Network);
    assert_eq!(TEST_HANDSHAKE_SECS.get_name(), "test_handshake_secs");
}

#[test]
fn metric_calls_without_recorder_are_noops() {
    // No recorder installed: calls must not panic.
    TEST_TXS_SEEN.increment(1);
    TEST_TXS_REJECTED.increment(1, &[("reason", "block_limit")]);
    TEST_ACTIVE_PEERS.set(4.0);
    TEST_HANDSHAKE_SECS.record(0.25);
}
