//! Middleware configuration.
//!
//! [`Config`] deserializes with serde, so it can sit inside an application's
//! own configuration file:
//!
//! ```yaml
//! http_metrics:
//!   prefix: exampleapp
//!   buckets: [1, 2.5, 5, 10, 20, 40, 80, 160, 320, 640]
//!   grouped_status: true
//! ```
//!
//! Every key is optional.

use serde::Deserialize;

/// Prometheus' default latency buckets, 5 ms to 10 s.
pub const DEFAULT_BUCKETS: &[f64] = prometheus::DEFAULT_BUCKETS;

/// Settings of a [`Middleware`](crate::Middleware) factory.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Namespace prepended to the metric name. Empty by default, which yields
    /// plain `http_request_duration_seconds`.
    pub prefix: String,

    /// Histogram bucket upper bounds, strictly ascending. Empty means
    /// [`DEFAULT_BUCKETS`].
    pub buckets: Vec<f64>,

    /// Collapse the `code` label to its class (`200`, `201` and `204` all
    /// become `2xx`). Fewer series, and queries grouped by status class no
    /// longer need to aggregate.
    pub grouped_status: bool,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_buckets(mut self, buckets: impl Into<Vec<f64>>) -> Self {
        self.buckets = buckets.into();
        self
    }

    pub fn with_grouped_status(mut self, grouped: bool) -> Self {
        self.grouped_status = grouped;
        self
    }

    /// Fills in defaults. Never fails and is idempotent: a non-empty bucket
    /// list is left exactly as given.
    pub fn validate(&mut self) {
        if self.buckets.is_empty() {
            self.buckets = DEFAULT_BUCKETS.to_vec();
        }
    }
}
