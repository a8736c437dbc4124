//! Metric declaration helpers over the `metrics` facade.
//!
//! Components declare their metrics once with [`define_metrics!`] and register
//! them at startup; the recorder (Prometheus exporter or test recorder) is
//! installed by the binary, never by a library crate.

pub mod metrics;

pub use crate::metrics::{
    LabeledMetricCounter,
    MetricCounter,
    MetricGauge,
    MetricHistogram,
    MetricScope,
};

/// Declares metric constants grouped by [`MetricScope`].
///
/// ```
/// use veris_metrics::define_metrics;
///
/// define_metrics!(
///     Network => {
///         MetricCounter { CONNECTIONS_ACCEPTED, "connections_accepted", "Accepted connections" },
///     },
/// );
/// ```
#[macro_export]
macro_rules! define_metrics {
    (
        $(
            $scope:ident => {
                $(
                    $metric_type:ident { $name:ident, $key:literal, $description:literal }
                ),* $(,)?
            }
        ),* $(,)?
    ) => {
        $(
            $(
                pub const $name: $crate::$metric_type = $crate::$metric_type::new(
                    $crate::MetricScope::$scope,
                    $key,
                    $description,
                );
            )*
        )*
    };
}
