//! # prom-middleware
//!
//! Prometheus request-latency instrumentation for HTTP handlers.
//! Wrap a handler, get a histogram. That is the whole job.
//!
//! ## The contract
//!
//! Every request served through a wrapped handler adds exactly one
//! observation to
//!
//! ```text
//! {prefix}_http_request_duration_seconds{handler, method, code}
//! ```
//!
//! whether the handler answers, panics, or is cancelled by the server.
//! Nothing else about the request or the response changes.
//!
//! What this crate intentionally leaves to others:
//!
//! - **Exposition**: render the registry with `prometheus::TextEncoder` on
//!   whatever `/metrics` route you already have
//! - **Routing**: pick the handler ID per route yourself; an empty ID falls
//!   back to the percent-decoded request path
//! - **Process lifecycle**: signals and graceful shutdown stay with the host
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::StatusCode;
//! use prom_middleware::{adapter, Config, Middleware, Request, Response};
//! use prometheus::Registry;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Registry::new();
//!     let cfg = Config::new()
//!         .with_prefix("exampleapp")
//!         .with_buckets(vec![1.0, 2.5, 5.0, 10.0, 20.0, 40.0, 80.0, 160.0, 320.0, 640.0]);
//!     let mdlw = Middleware::new(cfg, Some(&registry))?;
//!
//!     let app = mdlw.handler("/users/:id", get_user);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     adapter::hyper::serve(listener, app).await;
//!     Ok(())
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     if req.path().ends_with("/0") {
//!         return Response::status(StatusCode::NOT_FOUND);
//!     }
//!     Response::json(r#"{"id":42}"#)
//! }
//! ```

mod config;
mod error;
mod handler;
mod request;
mod response;

pub mod adapter;
pub mod middleware;

pub use config::{Config, DEFAULT_BUCKETS};
pub use error::Error;
pub use handler::{BoxFuture, BoxedHandler, Handler};
pub use middleware::{Instrumented, Middleware};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
