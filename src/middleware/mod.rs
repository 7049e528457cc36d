//! Request latency middleware.
//!
//! A [`Middleware`] owns one Prometheus histogram,
//! `{prefix}_http_request_duration_seconds{handler, method, code}`, and wraps
//! handlers so that every request they serve adds exactly one observation.
//!
//! ```rust,no_run
//! use http::StatusCode;
//! use prom_middleware::{Config, Middleware, Request};
//! use prometheus::Registry;
//!
//! # fn main() -> Result<(), prom_middleware::Error> {
//! let registry = Registry::new();
//! let mdlw = Middleware::new(Config::new().with_prefix("exampleapp"), Some(&registry))?;
//!
//! // `/test/2` and `/test/4` share one `handler` label, keeping cardinality low.
//! let test = mdlw.handler("/test/:testID", |_req: Request| async { StatusCode::ACCEPTED });
//!
//! // Empty handler ID: the request path becomes the label.
//! let other = mdlw.handler("", |_req: Request| async { StatusCode::NO_CONTENT });
//! # Ok(())
//! # }
//! ```
//!
//! # Labels
//!
//! | Label | Value |
//! |---|---|
//! | `handler` | the handler ID given to [`Middleware::handler`], or the percent-decoded request path when it is empty |
//! | `method` | request method, e.g. `GET` |
//! | `code` | response status, `403`, or `4xx` with [`Config::grouped_status`](crate::Config::grouped_status) |

mod interceptor;
mod metrics;

use std::sync::Arc;
use std::time::Instant;

use http::{Method, StatusCode};
use prometheus::{HistogramVec, Registry};
use tracing::debug;

use crate::config::Config;
use crate::error::Error;
use crate::handler::{BoxFuture, Handler};
use crate::request::Request;

use interceptor::ResponseInterceptor;

pub use metrics::metric_name;

// ── Middleware ────────────────────────────────────────────────────────────────

/// Factory of instrumented handlers.
///
/// Cloning is cheap and every clone feeds the same histogram.
#[derive(Clone)]
pub struct Middleware {
    histogram: HistogramVec,
    grouped_status: bool,
}

impl Middleware {
    /// Default configuration, bound to the process-wide default registry.
    ///
    /// Only one default factory can exist per process: a second call fails
    /// with [`Error::Registration`] because the metric name is taken.
    pub fn new_default() -> Result<Self, Error> {
        Self::new(Config::default(), None)
    }

    /// Builds the histogram described by `config` and registers it in
    /// `registry`, or in [`prometheus::default_registry`] when `None`.
    ///
    /// Fails if the histogram cannot be built or if `registry` already holds
    /// a metric of the same name. Give each factory its own prefix or its own
    /// registry.
    pub fn new(mut config: Config, registry: Option<&Registry>) -> Result<Self, Error> {
        let registry = registry.unwrap_or_else(|| prometheus::default_registry());
        config.validate();

        let histogram = metrics::request_duration(&config)?;
        metrics::register(registry, &histogram)?;

        debug!(
            metric = %metric_name(&config.prefix),
            buckets = config.buckets.len(),
            grouped_status = config.grouped_status,
            "registered request duration histogram"
        );

        Ok(Self { histogram, grouped_status: config.grouped_status })
    }

    /// Wraps `next` so each request it serves is timed and observed.
    ///
    /// A non-empty `handler_id` is used as the `handler` label for every
    /// request. An empty one makes the label the percent-decoded path of each
    /// request, so `/a%20b` is reported as `/a b`.
    pub fn handler<H: Handler>(&self, handler_id: &str, next: H) -> Instrumented<H> {
        Instrumented {
            handler_id: handler_label(handler_id),
            middleware: self.clone(),
            next,
        }
    }

    /// Starts timing one request. The observation happens when the returned
    /// timer is dropped.
    pub(crate) fn start_timer(
        &self,
        handler_id: Option<&str>,
        method: &Method,
        path: &str,
    ) -> RequestTimer {
        let handler = match handler_id {
            Some(id) => id.to_owned(),
            None => decode_path(path),
        };

        RequestTimer {
            histogram: self.histogram.clone(),
            handler,
            method: method.as_str().to_owned(),
            grouped_status: self.grouped_status,
            interceptor: ResponseInterceptor::new(),
            start: Instant::now(),
        }
    }
}

/// `None` when the label has to come from the request path.
pub(crate) fn handler_label(handler_id: &str) -> Option<Arc<str>> {
    (!handler_id.is_empty()).then(|| Arc::from(handler_id))
}

/// Percent-decoded request path. A path that does not decode to UTF-8 is
/// kept as sent.
fn decode_path(path: &str) -> String {
    match urlencoding::decode(path) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => path.to_owned(),
    }
}

// ── Instrumented handler ──────────────────────────────────────────────────────

/// A handler wrapped by [`Middleware::handler`].
pub struct Instrumented<H> {
    handler_id: Option<Arc<str>>,
    middleware: Middleware,
    next: H,
}

impl<H: Handler> Handler for Instrumented<H> {
    fn call(&self, req: Request) -> BoxFuture {
        let mut timer = self
            .middleware
            .start_timer(self.handler_id.as_deref(), req.method(), req.path());

        // The request goes to `next` as-is. If `next` panics, `timer` is
        // dropped right here and still observes.
        let fut = self.next.call(req);

        Box::pin(async move {
            let response = fut.await;
            timer.interceptor.intercept(response)
        })
    }
}

// ── Timing finalizer ──────────────────────────────────────────────────────────

/// Observes one request when dropped.
///
/// Dropping happens after the response has gone through the interceptor, while
/// unwinding from a panicking handler, or when the host drops the request
/// future. Each path observes exactly once.
pub(crate) struct RequestTimer {
    histogram: HistogramVec,
    handler: String,
    method: String,
    grouped_status: bool,
    interceptor: ResponseInterceptor,
    start: Instant,
}

impl RequestTimer {
    /// Records the status of a response head that never becomes a
    /// [`Response`](crate::Response), as in the tower adapter.
    pub(crate) fn record(&mut self, status: StatusCode) {
        self.interceptor.record(status);
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        let code = code_label(self.interceptor.status(), self.grouped_status);

        self.histogram
            .with_label_values(&[self.handler.as_str(), self.method.as_str(), code.as_str()])
            .observe(duration);
    }
}

/// `403`, or `4xx` when grouped. The leading digit alone is enough to tell
/// status classes apart.
fn code_label(status: StatusCode, grouped: bool) -> String {
    if grouped {
        format!("{}xx", status.as_u16() / 100)
    } else {
        status.as_str().to_owned()
    }
}
