//! Tower layer.
//!
//! Wraps any `http` service, which covers `axum::Router` and most
//! hand-written tower stacks:
//!
//! ```rust,ignore
//! let mdlw = Middleware::new(Config::default(), Some(&registry))?;
//! let app = axum::Router::new()
//!     .route("/users/{id}", get(get_user))
//!     .layer(MetricsLayer::new(mdlw, "/users/:id"));
//! ```
//!
//! Request and response pass through untouched, bodies included. The
//! observation covers the time until the inner service produces the response
//! head, so a streaming body is timed up to its first byte.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::{Layer, Service};

use crate::middleware::{handler_label, Middleware};

/// [`Layer`] that times every request passing through the wrapped service.
#[derive(Clone)]
pub struct MetricsLayer {
    middleware: Middleware,
    handler_id: Option<Arc<str>>,
}

impl MetricsLayer {
    /// `handler_id` follows [`Middleware::handler`]: empty means "use the
    /// request path".
    pub fn new(middleware: Middleware, handler_id: impl AsRef<str>) -> Self {
        Self { middleware, handler_id: handler_label(handler_id.as_ref()) }
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> MetricsService<S> {
        MetricsService {
            inner,
            middleware: self.middleware.clone(),
            handler_id: self.handler_id.clone(),
        }
    }
}

/// Future returned by [`MetricsService`].
pub type ResponseFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'static>>;

/// Service produced by [`MetricsLayer`].
///
/// Readiness is the inner service's. An inner error is returned as-is and
/// observed with the default `200`, like a handler that never answered.
#[derive(Clone)]
pub struct MetricsService<S> {
    inner: S,
    middleware: Middleware,
    handler_id: Option<Arc<str>>,
}

impl<S, ReqBody, ResBody> Service<http::Request<ReqBody>> for MetricsService<S>
where
    S: Service<http::Request<ReqBody>, Response = http::Response<ResBody>>,
    S::Future: Send + 'static,
{
    type Response = http::Response<ResBody>;
    type Error = S::Error;
    type Future = ResponseFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<ReqBody>) -> Self::Future {
        let mut timer = self
            .middleware
            .start_timer(self.handler_id.as_deref(), req.method(), req.uri().path());

        let fut = self.inner.call(req);

        Box::pin(async move {
            let res = fut.await;
            if let Ok(res) = &res {
                timer.record(res.status());
            }
            res
        })
    }
}
