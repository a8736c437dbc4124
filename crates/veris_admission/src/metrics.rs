use strum::IntoStaticStr;
use veris_metrics::define_metrics;

pub const LABEL_NAME_REASON: &str = "reason";

define_metrics!(
    Admission => {
        MetricCounter { ADMISSION_TXS_RECEIVED, "admission_txs_received", "Counter of transactions entering the admission chain" },
        MetricCounter { ADMISSION_TXS_ADMITTED, "admission_txs_admitted", "Counter of transactions that passed every decorator" },
        LabeledMetricCounter { ADMISSION_TXS_RATE_LIMITED, "admission_txs_rate_limited", "Counter of rate-limited transactions, by reason" },
        MetricCounter { ADMISSION_TXS_IDENTITY_REJECTED, "admission_txs_identity_rejected", "Counter of transactions rejected by the identity gate" },
        MetricCounter { ADMISSION_TXS_MFA_REJECTED, "admission_txs_mfa_rejected", "Counter of transactions rejected by the MFA gate" },
    },
);

/// Label values of the `reason` dimension on rate-limit rejections. The
/// strings double as event attribute values and are normative.
#[derive(Clone, Copy, Debug, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum RateLimitReason {
    BlockLimit,
    AccountLimit,
    SensitiveLimit,
}

impl RateLimitReason {
    pub fn as_label(&self) -> [(&'static str, &'static str); 1] {
        [(LABEL_NAME_REASON, (*self).into())]
    }
}

pub(crate) fn register_metrics() {
    ADMISSION_TXS_RECEIVED.register();
    ADMISSION_TXS_ADMITTED.register();
    ADMISSION_TXS_RATE_LIMITED.register();
    ADMISSION_TXS_IDENTITY_REJECTED.register();
    ADMISSION_TXS_MFA_REJECTED.register();
}
