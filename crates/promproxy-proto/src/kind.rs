//! Metric kinds and their wire tags.

use std::fmt;

/// The four metric kinds a caller can register.
///
/// The kind is fixed for the lifetime of a registered metric and travels
/// on the wire as a single byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Monotonically increasing counter.
    Counter,
    /// Value that can go up and down.
    Gauge,
    /// Bucketed distribution of observations.
    Histogram,
    /// Streaming-quantile distribution of observations.
    Summary,
}

impl MetricKind {
    /// The one-byte wire tag for this kind.
    pub fn tag(self) -> u8 {
        match self {
            MetricKind::Counter => b'c',
            MetricKind::Gauge => b'g',
            MetricKind::Histogram => b'h',
            MetricKind::Summary => b's',
        }
    }

    /// Resolve a wire tag back to a kind.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'c' => Some(MetricKind::Counter),
            b'g' => Some(MetricKind::Gauge),
            b'h' => Some(MetricKind::Histogram),
            b's' => Some(MetricKind::Summary),
            _ => None,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
            MetricKind::Summary => "summary",
        };
        f.write_str(name)
    }
}
