//! Metric wrapper types.

#[cfg(test)]
#[path = "metrics_test.rs"]
mod metrics_test;

/// The subsystem a metric belongs to; used for dashboard grouping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricScope {
    Admission,
    Mfa,
    Network,
    Infra,
}

/// A monotonically increasing counter.
#[derive(Clone, Copy, Debug)]
pub struct MetricCounter {
    scope: MetricScope,
    name: &'static str,
    description: &'static str,
}

impl MetricCounter {
    pub const fn new(scope: MetricScope, name: &'static str, description: &'static str) -> Self {
        Self { scope, name, description }
    }

    pub const fn get_name(&self) -> &'static str {
        self.name
    }

    pub const fn get_scope(&self) -> MetricScope {
        self.scope
    }

    pub fn register(&self) {
        metrics::describe_counter!(self.name, self.description);
        metrics::counter!(self.name).absolute(0);
    }

    pub fn increment(&self, value: u64) {
        metrics::counter!(self.name).increment(value);
    }
}

/// A counter sliced by a fixed label set.
#[derive(Clone, Copy, Debug)]
pub struct LabeledMetricCounter {
    scope: MetricScope,
    name: &'static str,
    description: &'static str,
}

impl LabeledMetricCounter {
    pub const fn new(scope: MetricScope, name: &'static str, description: &'static str) -> Self {
        Self { scope, name, description }
    }

    pub const fn get_name(&self) -> &'static str {
        self.name
    }

    pub const fn get_scope(&self) -> MetricScope {
        self.scope
    }

    pub fn register(&self) {
        metrics::describe_counter!(self.name, self.description);
    }

    pub fn increment(&self, value: u64, labels: &[(&'static str, &'static str)]) {
        metrics::counter!(self.name, labels).increment(value);
    }
}

/// A gauge for values that go both ways (table sizes, active sessions).
#[derive(Clone, Copy, Debug)]
pub struct MetricGauge {
    scope: MetricScope,
    name: &'static str,
    description: &'static str,
}

impl MetricGauge {
    pub const fn new(scope: MetricScope, name: &'static str, description: &'static str) -> Self {
        Self { scope, name, description }
    }

    pub const fn get_name(&self) -> &'static str {
        self.name
    }

    pub const fn get_scope(&self) -> MetricScope {
        self.scope
    }

    pub fn register(&self) {
        metrics::describe_gauge!(self.name, self.description);
        metrics::gauge!(self.name).set(0.0);
    }

    pub fn set(&self, value: f64) {
        metrics::gauge!(self.name).set(value);
    }

    pub fn increment(&self, value: f64) {
        metrics::gauge!(self.name).increment(value);
    }

    pub fn decrement(&self, value: f64) {
        metrics::gauge!(self.name).decrement(value);
    }
}

/// A histogram, recorded in seconds for latencies.
#[derive(Clone, Copy, Debug)]
pub struct MetricHistogram {
    scope: MetricScope,
    name: &'static str,
    description: &'static str,
}

impl MetricHistogram {
    pub const fn new(scope: MetricScope, name: &'static str, description: &'static str) -> Self {
        Self { scope, name, description }
    }

    pub const fn get_name(&self) -> &'static str {
        self.name
    }

    pub const fn get_scope(&self) -> MetricScope {
        self.scope
    }

    pub fn register(&self) {
        metrics::describe_histogram!(self.name, self.description);
    }

    pub fn record(&self, value: f64) {
        metrics::histogram!(self.name).record(value);
    }
}
