//! Metric descriptors.
//!
//! A descriptor is the declared shape of a metric - name, help text, label
//! names, kind, and kind-specific options - before the engine realizes it
//! into a live vector.

use std::time::Duration;

use promproxy_proto::MetricKind;

/// Options for a histogram registration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistogramOptions {
    /// Ascending bucket boundaries. Empty means the engine default.
    pub buckets: Vec<f64>,
}

impl HistogramOptions {
    /// Options with explicit bucket boundaries.
    pub fn with_buckets(buckets: Vec<f64>) -> Self {
        Self { buckets }
    }
}

/// Options for a summary registration.
///
/// All fields are optional; the engine applies its defaults for anything
/// left unset. On the wire these decode positionally, so omissions are
/// always a contiguous trailing run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SummaryOptions {
    /// Quantile objectives as (quantile, allowed error) pairs.
    pub objectives: Vec<(f64, f64)>,
    /// Sliding window over which quantiles are estimated.
    pub max_age: Option<Duration>,
    /// Number of age buckets the window is divided into.
    pub age_buckets: Option<u32>,
    /// Observation buffer capacity. Accepted for wire compatibility; this
    /// engine feeds its estimators directly.
    pub buf_cap: Option<u32>,
}

/// Kind plus kind-specific options, as a closed union.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricSpec {
    /// Monotonic counter; no options.
    Counter,
    /// Up/down gauge; no options.
    Gauge,
    /// Bucketed histogram.
    Histogram(HistogramOptions),
    /// Streaming-quantile summary.
    Summary(SummaryOptions),
}

impl MetricSpec {
    /// The kind this spec realizes.
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricSpec::Counter => MetricKind::Counter,
            MetricSpec::Gauge => MetricKind::Gauge,
            MetricSpec::Histogram(_) => MetricKind::Histogram,
            MetricSpec::Summary(_) => MetricKind::Summary,
        }
    }
}

/// The declared shape of a metric.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDescriptor {
    /// Namespace override. `None` means the registry's namespace applies;
    /// wire registrations never carry one.
    pub namespace: Option<String>,
    /// Metric name, unique within a registry across all kinds.
    pub name: String,
    /// Help text emitted on the `# HELP` line.
    pub help: String,
    /// Ordered label names.
    pub labels: Vec<String>,
    /// Kind and kind-specific options.
    pub spec: MetricSpec,
}

impl MetricDescriptor {
    /// Describe a counter.
    pub fn counter(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self::new(name, help, MetricSpec::Counter)
    }

    /// Describe a gauge.
    pub fn gauge(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self::new(name, help, MetricSpec::Gauge)
    }

    /// Describe a histogram.
    pub fn histogram(
        name: impl Into<String>,
        help: impl Into<String>,
        options: HistogramOptions,
    ) -> Self {
        Self::new(name, help, MetricSpec::Histogram(options))
    }

    /// Describe a summary.
    pub fn summary(
        name: impl Into<String>,
        help: impl Into<String>,
        options: SummaryOptions,
    ) -> Self {
        Self::new(name, help, MetricSpec::Summary(options))
    }

    fn new(name: impl Into<String>, help: impl Into<String>, spec: MetricSpec) -> Self {
        Self {
            namespace: None,
            name: name.into(),
            help: help.into(),
            labels: Vec::new(),
            spec,
        }
    }

    /// Set the label names.
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Override the registry namespace for this metric.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// The kind this descriptor realizes.
    pub fn kind(&self) -> MetricKind {
        self.spec.kind()
    }
}
