//! Command parsing and dispatch.
//!
//! A request is an array whose first element is a one-byte command tag and
//! whose remaining elements are positional arguments. Parsing validates
//! arity and argument types into a [`Command`]; execution runs it against
//! the registry. Every malformed request or failed command produces exactly
//! one wire `Error` reply, and only `Close` (or a protocol-level decode
//! failure upstream) ends the session.

use std::time::Duration;

use promproxy_proto::{command, MetricKind, Value};

use crate::descriptor::{HistogramOptions, MetricDescriptor, MetricSpec, SummaryOptions};
use crate::error::Error;
use crate::registry::MetricRegistry;

/// A fully validated command, built fresh per request.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Register a metric.
    Register(MetricDescriptor),
    /// Record an observation.
    Record {
        /// Metric name to record against.
        name: String,
        /// Observed value.
        value: f64,
        /// Label name/value pairs, possibly empty.
        labels: Vec<(String, String)>,
    },
    /// Fetch the aggregated exposition text.
    Fetch,
    /// End the session.
    Close,
}

/// The outcome of dispatching one request.
#[derive(Debug)]
pub struct Dispatch {
    /// Replies to encode back to the caller, in order.
    pub replies: Vec<Value>,
    /// Whether the session must end after the replies are written.
    pub terminal: bool,
}

impl Dispatch {
    fn reply(value: Value) -> Self {
        Self {
            replies: vec![value],
            terminal: false,
        }
    }

    fn closing(value: Value) -> Self {
        Self {
            replies: vec![value],
            terminal: true,
        }
    }
}

/// Interpret one decoded request against the registry.
pub fn dispatch(registry: &MetricRegistry, request: &Value) -> Dispatch {
    // Close terminates the session even when its arguments are invalid.
    let closing = leading_tag(request) == Some(command::CLOSE);

    match Command::parse(request) {
        Ok(cmd) => cmd.execute(registry),
        Err(e) => Dispatch {
            replies: vec![e.to_wire()],
            terminal: closing,
        },
    }
}

fn leading_tag(request: &Value) -> Option<u8> {
    match request.as_array()?.first()?.as_bytes() {
        Some([tag]) => Some(*tag),
        _ => None,
    }
}

impl Command {
    /// Decode a wire value into a command, validating arity and argument
    /// types.
    pub fn parse(request: &Value) -> Result<Command, Error> {
        let args = request
            .as_array()
            .ok_or_else(|| Error::validation("no command specified"))?;
        let (first, args) = args
            .split_first()
            .ok_or_else(|| Error::validation("no command specified"))?;

        match command_tag(first)? {
            command::REGISTER => parse_register(args),
            command::METRICS => parse_fetch(args),
            command::RECORD => parse_record(args),
            command::CLOSE => parse_close(args),
            other => Err(Error::Validation(format!(
                "invalid command: {}",
                char::from(other)
            ))),
        }
    }

    /// Run this command against the registry.
    pub fn execute(self, registry: &MetricRegistry) -> Dispatch {
        match self {
            Command::Register(descriptor) => match registry.register(descriptor) {
                Ok(()) => Dispatch::reply(Value::simple("ok")),
                Err(e) => Dispatch::reply(e.to_wire()),
            },
            Command::Record {
                name,
                value,
                labels,
            } => match registry.record(&name, &labels, value) {
                Ok(()) => Dispatch::reply(Value::simple("ok")),
                Err(e) => Dispatch::reply(e.to_wire()),
            },
            Command::Fetch => match registry.fetch() {
                Ok(text) => Dispatch::reply(Value::bulk(text.into_bytes())),
                Err(e) => Dispatch::reply(e.to_wire()),
            },
            Command::Close => Dispatch::closing(Value::simple("ok")),
        }
    }
}

fn command_tag(value: &Value) -> Result<u8, Error> {
    let bytes = value
        .as_bytes()
        .ok_or_else(|| Error::validation("malformed command"))?;
    match bytes {
        [tag] => Ok(*tag),
        _ => Err(Error::Validation(format!(
            "malformed command: {}",
            String::from_utf8_lossy(bytes)
        ))),
    }
}

fn parse_register(args: &[Value]) -> Result<Command, Error> {
    match args.len() {
        0 => return Err(Error::validation("metric name required")),
        1 => return Err(Error::validation("metric description required")),
        2 => return Err(Error::validation("metric type required")),
        3 => return Err(Error::validation("metric labels required")),
        _ => {}
    }

    let name = string_arg(&args[0], "metric name")?;
    let help = string_arg(&args[1], "metric description")?;
    let kind = kind_arg(&args[2])?;
    let labels = string_array_arg(&args[3], "metric labels")?;
    let options = &args[4..];

    let spec = match kind {
        MetricKind::Counter => scalar_spec(options, MetricSpec::Counter)?,
        MetricKind::Gauge => scalar_spec(options, MetricSpec::Gauge)?,
        MetricKind::Histogram => MetricSpec::Histogram(parse_histogram_options(options)?),
        MetricKind::Summary => MetricSpec::Summary(parse_summary_options(options)?),
    };

    Ok(Command::Register(MetricDescriptor {
        namespace: None,
        name,
        help,
        labels,
        spec,
    }))
}

fn parse_record(args: &[Value]) -> Result<Command, Error> {
    if args.len() < 2 {
        return Err(Error::validation("not enough args"));
    }
    if args.len() > 3 {
        return Err(Error::validation("too many args"));
    }

    let name = string_arg(&args[0], "metric name")?;
    let value = float_arg(&args[1], "metric value")?;

    let mut labels = Vec::new();
    if let Some(tuples) = args.get(2) {
        let tuples = tuples
            .as_array()
            .ok_or_else(|| Error::validation("malformed labels"))?;
        for tuple in tuples {
            let pair = tuple
                .as_array()
                .ok_or_else(|| Error::validation("invalid tuple"))?;
            if pair.len() != 2 {
                return Err(Error::validation("invalid tuple"));
            }
            labels.push((
                string_arg(&pair[0], "label name")?,
                string_arg(&pair[1], "label value")?,
            ));
        }
    }

    Ok(Command::Record {
        name,
        value,
        labels,
    })
}

fn parse_fetch(args: &[Value]) -> Result<Command, Error> {
    if !args.is_empty() {
        return Err(Error::validation(
            "metrics command does not accept arguments",
        ));
    }
    Ok(Command::Fetch)
}

fn parse_close(args: &[Value]) -> Result<Command, Error> {
    if !args.is_empty() {
        return Err(Error::validation("close command does not accept arguments"));
    }
    Ok(Command::Close)
}

fn scalar_spec(options: &[Value], spec: MetricSpec) -> Result<MetricSpec, Error> {
    if !options.is_empty() {
        return Err(Error::validation("too many args"));
    }
    Ok(spec)
}

fn parse_histogram_options(options: &[Value]) -> Result<HistogramOptions, Error> {
    if options.len() > 1 {
        return Err(Error::validation("too many arguments"));
    }

    let mut histogram = HistogramOptions::default();
    if let Some(value) = options.first() {
        let items = value
            .as_array()
            .ok_or_else(|| Error::validation("malformed buckets"))?;
        histogram.buckets = items
            .iter()
            .map(|v| float_arg(v, "bucket"))
            .collect::<Result<_, _>>()?;
    }
    Ok(histogram)
}

/// Summary options decode positionally - objectives, max age, age bucket
/// count, buffer capacity - so omissions are always a contiguous trailing
/// run.
fn parse_summary_options(options: &[Value]) -> Result<SummaryOptions, Error> {
    if options.len() > 4 {
        return Err(Error::validation("too many arguments"));
    }

    let mut summary = SummaryOptions::default();
    if let Some(value) = options.first() {
        let pairs = value
            .as_array()
            .ok_or_else(|| Error::validation("malformed objectives"))?;
        for pair in pairs {
            let tuple = pair
                .as_array()
                .ok_or_else(|| Error::validation("invalid tuple"))?;
            if tuple.len() != 2 {
                return Err(Error::validation("invalid tuple"));
            }
            summary.objectives.push((
                float_arg(&tuple[0], "objective quantile")?,
                float_arg(&tuple[1], "objective error")?,
            ));
        }
    }
    if let Some(value) = options.get(1) {
        let secs = int_arg(value, "max age")?;
        if secs < 0 {
            return Err(Error::validation("malformed max age"));
        }
        summary.max_age = Some(Duration::from_secs(secs as u64));
    }
    if let Some(value) = options.get(2) {
        summary.age_buckets = Some(uint_arg(value, "age bucket count")?);
    }
    if let Some(value) = options.get(3) {
        summary.buf_cap = Some(uint_arg(value, "buffer capacity")?);
    }
    Ok(summary)
}

fn string_arg(value: &Value, what: &str) -> Result<String, Error> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::Validation(format!("malformed {what}")))
}

fn float_arg(value: &Value, what: &str) -> Result<f64, Error> {
    value
        .as_float()
        .ok_or_else(|| Error::Validation(format!("malformed {what}")))
}

fn int_arg(value: &Value, what: &str) -> Result<i64, Error> {
    value
        .as_int()
        .ok_or_else(|| Error::Validation(format!("malformed {what}")))
}

fn uint_arg(value: &Value, what: &str) -> Result<u32, Error> {
    int_arg(value, what)?
        .try_into()
        .map_err(|_| Error::Validation(format!("malformed {what}")))
}

fn string_array_arg(value: &Value, what: &str) -> Result<Vec<String>, Error> {
    let items = value
        .as_array()
        .ok_or_else(|| Error::Validation(format!("malformed {what}")))?;
    items
        .iter()
        .map(|item| string_arg(item, what))
        .collect()
}

fn kind_arg(value: &Value) -> Result<MetricKind, Error> {
    let bytes = value
        .as_bytes()
        .ok_or_else(|| Error::validation("malformed metric type"))?;
    let [tag] = bytes else {
        return Err(Error::validation("malformed metric type"));
    };
    MetricKind::from_tag(*tag).ok_or_else(|| {
        Error::Validation(format!("invalid metric type: {:?}", char::from(*tag)))
    })
}
