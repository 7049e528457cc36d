//! Registry binding for the request duration histogram.
//!
//! Naming follows the usual Prometheus layout `{namespace}_{subsystem}_{name}`
//! with the configured prefix as namespace and `http` as subsystem, so the
//! series line up with existing dashboards:
//!
//! | prefix | metric |
//! |---|---|
//! | `""` | `http_request_duration_seconds` |
//! | `"batman"` | `batman_http_request_duration_seconds` |

use prometheus::{Histogram, HistogramOpts, HistogramVec, Registry};

use crate::config::Config;
use crate::error::Error;

const SUBSYSTEM: &str = "http";
const NAME: &str = "request_duration_seconds";
const HELP: &str = "The latency of the HTTP requests.";

/// Label names, in the order values are passed on every observation.
pub(crate) const LABELS: &[&str] = &["handler", "method", "code"];

/// Fully-qualified metric name for `prefix`.
pub fn metric_name(prefix: &str) -> String {
    if prefix.is_empty() {
        format!("{SUBSYSTEM}_{NAME}")
    } else {
        format!("{prefix}_{SUBSYSTEM}_{NAME}")
    }
}

/// Builds the histogram from an already validated configuration.
pub(crate) fn request_duration(config: &Config) -> Result<HistogramVec, Error> {
    let opts = HistogramOpts::new(NAME, HELP)
        .namespace(config.prefix.clone())
        .subsystem(SUBSYSTEM)
        .buckets(config.buckets.clone());

    // A vec only checks its buckets when the first series is created, which
    // would be inside a request. Build one throwaway histogram to fail here.
    Histogram::with_opts(opts.clone()).map_err(Error::Metric)?;

    HistogramVec::new(opts, LABELS).map_err(Error::Metric)
}

/// Registers `histogram` once. A second histogram with the same name in the
/// same registry is refused.
pub(crate) fn register(registry: &Registry, histogram: &HistogramVec) -> Result<(), Error> {
    registry
        .register(Box::new(histogram.clone()))
        .map_err(Error::Registration)
}
