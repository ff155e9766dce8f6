//! Metrics engine backed by the `prometheus` crate.
//!
//! The engine owns a private `prometheus::Registry`, realizes descriptors
//! into labelled metric vectors, applies recorded observations, and
//! serializes everything into the standard text exposition format. It is
//! the only module that touches the `prometheus` API; the rest of the
//! server deals in descriptors and opaque handles.

mod summary;

use std::collections::HashMap;

use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts,
    Registry as EngineRegistry, TextEncoder,
};

use promproxy_proto::MetricKind;

use crate::descriptor::{MetricDescriptor, MetricSpec};
use crate::error::Error;

pub use summary::{SummaryVec, DEFAULT_AGE_BUCKETS, DEFAULT_MAX_AGE};

/// A realized metric vector.
///
/// Handles are owned by registry entries; the underlying vectors are
/// internally reference-counted and thread-safe, so recording never needs
/// the registry lock.
#[derive(Clone)]
pub enum MetricHandle {
    /// A realized counter vector.
    Counter(CounterVec),
    /// A realized gauge vector.
    Gauge(GaugeVec),
    /// A realized histogram vector.
    Histogram(HistogramVec),
    /// A realized summary vector.
    Summary(SummaryVec),
}

impl MetricHandle {
    /// The kind this handle records as.
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricHandle::Counter(_) => MetricKind::Counter,
            MetricHandle::Gauge(_) => MetricKind::Gauge,
            MetricHandle::Histogram(_) => MetricKind::Histogram,
            MetricHandle::Summary(_) => MetricKind::Summary,
        }
    }

    /// Apply one observation: counters add, gauges add, histograms and
    /// summaries observe.
    pub fn record(&self, labels: &HashMap<&str, &str>, value: f64) -> Result<(), Error> {
        match self {
            MetricHandle::Counter(vec) => {
                if value < 0.0 {
                    return Err(Error::validation("counter value must not be negative"));
                }
                vec.get_metric_with(labels)
                    .map_err(label_mismatch)?
                    .inc_by(value);
            }
            MetricHandle::Gauge(vec) => {
                vec.get_metric_with(labels).map_err(label_mismatch)?.add(value);
            }
            MetricHandle::Histogram(vec) => {
                vec.get_metric_with(labels)
                    .map_err(label_mismatch)?
                    .observe(value);
            }
            MetricHandle::Summary(vec) => {
                vec.observe(labels, value).map_err(label_mismatch)?;
            }
        }
        Ok(())
    }
}

fn label_mismatch(err: prometheus::Error) -> Error {
    Error::LabelMismatch(err.to_string())
}

fn engine_error(err: prometheus::Error) -> Error {
    Error::Engine(err.to_string())
}

/// The metrics engine.
pub struct Engine {
    registry: EngineRegistry,
}

impl Engine {
    /// Create an engine with an empty underlying registry.
    pub fn new() -> Self {
        Self {
            registry: EngineRegistry::new(),
        }
    }

    /// Realize a descriptor into a live metric vector and track it for
    /// gathering.
    ///
    /// `namespace` is the registry default; a descriptor-level namespace
    /// overrides it. The underlying registry rejects a second collector
    /// with the same fully qualified name, so conflicting realizations
    /// surface as engine errors.
    pub fn realize(
        &self,
        namespace: &str,
        descriptor: &MetricDescriptor,
    ) -> Result<MetricHandle, Error> {
        let namespace = descriptor.namespace.as_deref().unwrap_or(namespace);
        let labels: Vec<&str> = descriptor.labels.iter().map(String::as_str).collect();

        let handle = match &descriptor.spec {
            MetricSpec::Counter => {
                let opts =
                    Opts::new(descriptor.name.as_str(), descriptor.help.as_str()).namespace(namespace);
                let vec = CounterVec::new(opts, &labels).map_err(engine_error)?;
                self.registry
                    .register(Box::new(vec.clone()))
                    .map_err(engine_error)?;
                MetricHandle::Counter(vec)
            }
            MetricSpec::Gauge => {
                let opts =
                    Opts::new(descriptor.name.as_str(), descriptor.help.as_str()).namespace(namespace);
                let vec = GaugeVec::new(opts, &labels).map_err(engine_error)?;
                self.registry
                    .register(Box::new(vec.clone()))
                    .map_err(engine_error)?;
                MetricHandle::Gauge(vec)
            }
            MetricSpec::Histogram(options) => {
                let mut opts =
                    HistogramOpts::new(descriptor.name.as_str(), descriptor.help.as_str()).namespace(namespace);
                if !options.buckets.is_empty() {
                    opts = opts.buckets(options.buckets.clone());
                }
                let vec = HistogramVec::new(opts, &labels).map_err(engine_error)?;
                self.registry
                    .register(Box::new(vec.clone()))
                    .map_err(engine_error)?;
                MetricHandle::Histogram(vec)
            }
            MetricSpec::Summary(options) => {
                let vec = SummaryVec::new(
                    fq_name(namespace, &descriptor.name),
                    descriptor.help.as_str(),
                    &labels,
                    options.objectives.clone(),
                    options.max_age,
                    options.age_buckets,
                )
                .map_err(engine_error)?;
                self.registry
                    .register(Box::new(vec.clone()))
                    .map_err(engine_error)?;
                MetricHandle::Summary(vec)
            }
        };

        Ok(handle)
    }

    /// Serialize every realized metric into the text exposition format.
    pub fn gather(&self) -> Result<String, Error> {
        let families = self.registry.gather();
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buf)
            .map_err(engine_error)?;
        String::from_utf8(buf).map_err(|e| Error::Engine(e.to_string()))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

fn fq_name(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}_{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{HistogramOptions, SummaryOptions};

    fn labels<'a>(pairs: &'a [(&'a str, &'a str)]) -> HashMap<&'a str, &'a str> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_counter_realize_record_gather() {
        let engine = Engine::new();
        let descriptor =
            MetricDescriptor::counter("counter", "who cares?").with_labels(["a", "b", "c"]);
        let handle = engine.realize("namespace", &descriptor).unwrap();
        assert_eq!(handle.kind(), MetricKind::Counter);

        handle
            .record(&labels(&[("a", "A"), ("b", "B"), ("c", "C")]), 5.0)
            .unwrap();

        let text = engine.gather().unwrap();
        assert!(text.contains("# HELP namespace_counter who cares?\n"));
        assert!(text.contains("# TYPE namespace_counter counter\n"));
        assert!(text.contains("namespace_counter{a=\"A\",b=\"B\",c=\"C\"} 5\n"));
    }

    #[test]
    fn test_counter_rejects_negative() {
        let engine = Engine::new();
        let handle = engine
            .realize("", &MetricDescriptor::counter("c", "help"))
            .unwrap();
        assert!(matches!(
            handle.record(&labels(&[]), -1.0),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_gauge_adds() {
        let engine = Engine::new();
        let handle = engine
            .realize("ns", &MetricDescriptor::gauge("gauge", "help"))
            .unwrap();
        handle.record(&labels(&[]), 5.0).unwrap();
        handle.record(&labels(&[]), -2.0).unwrap();

        let text = engine.gather().unwrap();
        assert!(text.contains("# TYPE ns_gauge gauge\n"));
        assert!(text.contains("ns_gauge 3\n"));
    }

    #[test]
    fn test_histogram_default_buckets() {
        let engine = Engine::new();
        let descriptor = MetricDescriptor::histogram(
            "histo",
            "who cares?",
            HistogramOptions::default(),
        );
        let handle = engine.realize("namespace", &descriptor).unwrap();
        handle.record(&labels(&[]), 2.0).unwrap();

        let text = engine.gather().unwrap();
        assert!(text.contains("# TYPE namespace_histo histogram\n"));
        assert!(text.contains("namespace_histo_bucket{le=\"0.005\"} 0\n"));
        assert!(text.contains("namespace_histo_bucket{le=\"2.5\"} 1\n"));
        assert!(text.contains("namespace_histo_bucket{le=\"+Inf\"} 1\n"));
        assert!(text.contains("namespace_histo_sum 2\n"));
        assert!(text.contains("namespace_histo_count 1\n"));
    }

    #[test]
    fn test_histogram_custom_buckets() {
        let engine = Engine::new();
        let descriptor = MetricDescriptor::histogram(
            "sizes",
            "payload sizes",
            HistogramOptions::with_buckets(vec![1.0, 10.0, 100.0]),
        );
        let handle = engine.realize("", &descriptor).unwrap();
        handle.record(&labels(&[]), 42.0).unwrap();

        let text = engine.gather().unwrap();
        assert!(text.contains("sizes_bucket{le=\"10\"} 0\n"));
        assert!(text.contains("sizes_bucket{le=\"100\"} 1\n"));
    }

    #[test]
    fn test_summary_sum_count() {
        let engine = Engine::new();
        let descriptor = MetricDescriptor::summary(
            "summary",
            "who cares?",
            SummaryOptions::default(),
        )
        .with_labels(["a", "b", "c"]);
        let handle = engine.realize("namespace", &descriptor).unwrap();
        handle
            .record(&labels(&[("a", "A"), ("b", "B"), ("c", "C")]), 1.0)
            .unwrap();

        let text = engine.gather().unwrap();
        assert!(text.contains("# HELP namespace_summary who cares?\n"));
        assert!(text.contains("# TYPE namespace_summary summary\n"));
        assert!(text.contains("namespace_summary_sum{a=\"A\",b=\"B\",c=\"C\"} 1\n"));
        assert!(text.contains("namespace_summary_count{a=\"A\",b=\"B\",c=\"C\"} 1\n"));
    }

    #[test]
    fn test_label_mismatch_surfaced() {
        let engine = Engine::new();
        let descriptor =
            MetricDescriptor::counter("counter", "help").with_labels(["a", "b"]);
        let handle = engine.realize("", &descriptor).unwrap();

        let err = handle
            .record(&labels(&[("x", "1"), ("y", "2")]), 1.0)
            .unwrap_err();
        assert!(matches!(err, Error::LabelMismatch(_)));

        let err = handle.record(&labels(&[("a", "1")]), 1.0).unwrap_err();
        assert!(matches!(err, Error::LabelMismatch(_)));
    }

    #[test]
    fn test_duplicate_realization_rejected_by_engine() {
        let engine = Engine::new();
        let descriptor = MetricDescriptor::counter("dup", "help");
        engine.realize("", &descriptor).unwrap();
        assert!(matches!(
            engine.realize("", &descriptor),
            Err(Error::Engine(_))
        ));
    }

    #[test]
    fn test_descriptor_namespace_overrides_default() {
        let engine = Engine::new();
        let descriptor =
            MetricDescriptor::counter("hits", "help").with_namespace("special");
        let handle = engine.realize("default", &descriptor).unwrap();
        handle.record(&labels(&[]), 1.0).unwrap();

        let text = engine.gather().unwrap();
        assert!(text.contains("special_hits 1\n"));
        assert!(!text.contains("default_hits"));
    }
}
