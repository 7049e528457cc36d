//! Unified error type.

/// The error type returned by the crate's fallible operations.
///
/// Failures of a wrapped handler are never turned into an `Error`: they stay
/// the handler's business and reach the host server untouched. This type only
/// surfaces construction-time problems with the histogram.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The histogram could not be built from the configuration, e.g. the
    /// prefix is not a valid metric name or the buckets are not ascending.
    #[error("invalid request duration histogram: {0}")]
    Metric(#[source] prometheus::Error),

    /// The registry refused the histogram, usually because a metric with the
    /// same fully-qualified name is already registered there.
    #[error("failed to register request duration histogram: {0}")]
    Registration(#[source] prometheus::Error),
}
