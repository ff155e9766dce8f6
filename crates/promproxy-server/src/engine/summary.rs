//! Streaming summary vector.
//!
//! The `prometheus` crate ships no summary implementation, so this module
//! provides one as a custom [`Collector`]. Quantile estimation is delegated
//! to the `quantiles` crate's CKMS sketch; per label set we keep a ring of
//! age-bucketed sketches so reported quantiles cover a sliding window, the
//! same scheme the canonical client libraries use: observations feed every
//! bucket, the oldest bucket answers queries, and buckets reset as they
//! expire.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use prometheus::core::{Collector, Desc};
use prometheus::proto;
use quantiles::ckms::CKMS;

/// Window width when a registration does not supply one.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(600);

/// Age bucket count when a registration does not supply one.
pub const DEFAULT_AGE_BUCKETS: u32 = 5;

const DEFAULT_CKMS_ERROR: f64 = 0.01;

/// A labelled family of streaming summaries.
#[derive(Clone)]
pub struct SummaryVec {
    inner: Arc<SummaryVecInner>,
}

struct SummaryVecInner {
    desc: Desc,
    objectives: Vec<(f64, f64)>,
    rotate_every: Duration,
    age_buckets: usize,
    error: f64,
    children: Mutex<HashMap<Vec<String>, SummaryChild>>,
}

struct SummaryChild {
    label_values: Vec<String>,
    count: u64,
    sum: f64,
    windows: Vec<CKMS<f64>>,
    head: usize,
    last_rotate: Instant,
}

impl SummaryVec {
    /// Create a summary family.
    ///
    /// `fq_name` is the fully qualified (namespace-prefixed) metric name.
    /// `max_age` and `age_buckets` fall back to the module defaults when
    /// `None`.
    pub fn new(
        fq_name: impl Into<String>,
        help: impl Into<String>,
        label_names: &[&str],
        objectives: Vec<(f64, f64)>,
        max_age: Option<Duration>,
        age_buckets: Option<u32>,
    ) -> Result<SummaryVec, prometheus::Error> {
        let desc = Desc::new(
            fq_name.into(),
            help.into(),
            label_names.iter().map(|n| n.to_string()).collect(),
            HashMap::new(),
        )?;

        // The rotation interval must be non-zero.
        let max_age = max_age
            .filter(|age| !age.is_zero())
            .unwrap_or(DEFAULT_MAX_AGE);
        let age_buckets = age_buckets.unwrap_or(DEFAULT_AGE_BUCKETS).max(1);
        let error = objectives
            .iter()
            .map(|&(_, e)| e)
            .fold(DEFAULT_CKMS_ERROR, f64::min);

        Ok(SummaryVec {
            inner: Arc::new(SummaryVecInner {
                desc,
                objectives,
                rotate_every: max_age / age_buckets,
                age_buckets: age_buckets as usize,
                error,
                children: Mutex::new(HashMap::new()),
            }),
        })
    }

    /// Record one observation for the given label values.
    ///
    /// The label map must carry exactly the descriptor's label names.
    pub fn observe(
        &self,
        labels: &HashMap<&str, &str>,
        value: f64,
    ) -> Result<(), prometheus::Error> {
        let values = self.label_values(labels)?;
        let mut children = self.inner.children.lock();
        let child = children
            .entry(values.clone())
            .or_insert_with(|| SummaryChild::new(values, &self.inner));
        child.observe(value, Instant::now(), &self.inner);
        Ok(())
    }

    /// Resolve a label map into descriptor-ordered label values.
    fn label_values(&self, labels: &HashMap<&str, &str>) -> Result<Vec<String>, prometheus::Error> {
        let expected = &self.inner.desc.variable_labels;
        if labels.len() != expected.len() {
            return Err(prometheus::Error::InconsistentCardinality {
                expect: expected.len(),
                got: labels.len(),
            });
        }
        expected
            .iter()
            .map(|name| {
                labels.get(name.as_str()).map(|v| v.to_string()).ok_or_else(|| {
                    prometheus::Error::Msg(format!("label name {} missing in label map", name))
                })
            })
            .collect()
    }
}

impl SummaryChild {
    fn new(label_values: Vec<String>, inner: &SummaryVecInner) -> Self {
        Self {
            label_values,
            count: 0,
            sum: 0.0,
            windows: (0..inner.age_buckets)
                .map(|_| CKMS::new(inner.error))
                .collect(),
            head: 0,
            last_rotate: Instant::now(),
        }
    }

    fn observe(&mut self, value: f64, now: Instant, inner: &SummaryVecInner) {
        self.maybe_rotate(now, inner);
        self.count += 1;
        self.sum += value;
        for window in &mut self.windows {
            window.insert(value);
        }
    }

    /// Expire windows that have aged out. The head window always holds the
    /// longest history, so it is the one queried.
    fn maybe_rotate(&mut self, now: Instant, inner: &SummaryVecInner) {
        while now.duration_since(self.last_rotate) >= inner.rotate_every {
            self.windows[self.head] = CKMS::new(inner.error);
            self.head = (self.head + 1) % self.windows.len();
            self.last_rotate += inner.rotate_every;
        }
    }

    fn quantile(&self, q: f64) -> f64 {
        self.windows[self.head]
            .query(q)
            .map(|(_, v)| v)
            .unwrap_or(f64::NAN)
    }
}

impl Collector for SummaryVec {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.inner.desc]
    }

    fn collect(&self) -> Vec<proto::MetricFamily> {
        let now = Instant::now();
        let mut children = self.inner.children.lock();

        let mut metrics = Vec::with_capacity(children.len());
        for child in children.values_mut() {
            child.maybe_rotate(now, &self.inner);

            let mut summary = proto::Summary::default();
            summary.set_sample_count(child.count);
            summary.set_sample_sum(child.sum);
            let quantiles: Vec<proto::Quantile> = self
                .inner
                .objectives
                .iter()
                .map(|&(q, _)| {
                    let mut pb = proto::Quantile::default();
                    pb.set_quantile(q);
                    pb.set_value(child.quantile(q));
                    pb
                })
                .collect();
            summary.set_quantile(quantiles.into());

            let mut pairs: Vec<proto::LabelPair> = self
                .inner
                .desc
                .variable_labels
                .iter()
                .zip(&child.label_values)
                .map(|(name, value)| {
                    let mut pair = proto::LabelPair::default();
                    pair.set_name(name.clone());
                    pair.set_value(value.clone());
                    pair
                })
                .collect();
            pairs.sort_by(|a, b| a.get_name().cmp(b.get_name()));

            let mut metric = proto::Metric::default();
            metric.set_label(pairs.into());
            metric.set_summary(summary);
            metrics.push(metric);
        }

        // Stable output order for the text encoder.
        metrics.sort_by(|a, b| {
            let key = |m: &proto::Metric| {
                m.get_label()
                    .iter()
                    .map(|p| (p.get_name().to_string(), p.get_value().to_string()))
                    .collect::<Vec<_>>()
            };
            key(a).cmp(&key(b))
        });

        let mut family = proto::MetricFamily::default();
        family.set_name(self.inner.desc.fq_name.clone());
        family.set_help(self.inner.desc.help.clone());
        family.set_field_type(proto::MetricType::SUMMARY);
        family.set_metric(metrics.into());
        vec![family]
    }
}
