//! Hosting handlers on hyper.
//!
//! ```rust,no_run
//! use http::StatusCode;
//! use prom_middleware::{adapter, Middleware, Request};
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mdlw = Middleware::new_default()?;
//!     let app = mdlw.handler("", |_req: Request| async { StatusCode::ACCEPTED });
//!
//!     let listener = TcpListener::bind("0.0.0.0:8080").await?;
//!     adapter::hyper::serve(listener, app).await;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::error::Error as StdError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::service::Service;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::response::Response;

/// Largest request body [`HandlerService`] buffers unless told otherwise: 1 MiB.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Future returned by [`HandlerService`].
pub type ResponseFuture =
    Pin<Box<dyn Future<Output = Result<http::Response<Full<Bytes>>, Infallible>> + Send + 'static>>;

/// Turns `handler` into a hyper [`Service`].
pub fn service<H: Handler>(handler: H) -> HandlerService {
    HandlerService { handler: Arc::new(handler), body_limit: DEFAULT_BODY_LIMIT }
}

/// A hyper service backed by a [`Handler`]. Clones share the handler.
#[derive(Clone)]
pub struct HandlerService {
    handler: BoxedHandler,
    body_limit: usize,
}

impl HandlerService {
    /// Caps the buffered request body at `limit` bytes. Larger bodies get
    /// `413 Payload Too Large` without reaching the handler.
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }
}

impl<B> Service<http::Request<B>> for HandlerService
where
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    type Response = http::Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = ResponseFuture;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        respond(Arc::clone(&self.handler), self.body_limit, req)
    }
}

/// Buffers the body of `req` and runs it through `handler`.
///
/// A body that fails to read never reaches the handler: the client gets
/// `413 Payload Too Large` past `limit`, `400 Bad Request` otherwise.
fn respond<B>(handler: BoxedHandler, limit: usize, req: http::Request<B>) -> ResponseFuture
where
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    Box::pin(async move {
        let (parts, body) = req.into_parts();
        let body = match Limited::new(body, limit).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.is::<LengthLimitError>() => {
                warn!(method = %parts.method, limit, "request body too large");
                return Ok(Response::status(StatusCode::PAYLOAD_TOO_LARGE).into_inner());
            }
            Err(e) => {
                error!(method = %parts.method, "failed to read request body: {e}");
                return Ok(Response::status(StatusCode::BAD_REQUEST).into_inner());
            }
        };

        let response = Handler::call(&*handler, Request::from_parts(parts, body)).await;
        Ok(response.into_inner())
    })
}

/// Accepts connections on `listener` forever, serving each on its own task.
///
/// `auto::Builder` handles both HTTP/1.1 and HTTP/2, whatever the client
/// negotiates. Accept and connection errors are logged and skipped.
pub async fn serve<H: Handler>(listener: TcpListener, handler: H) {
    let svc = service(handler);

    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "listening");
    }

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(v) => v,
            Err(e) => {
                error!("accept error: {e}");
                continue;
            }
        };

        let svc = svc.clone();
        tokio::spawn(async move {
            if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                .serve_connection(TokioIo::new(stream), svc)
                .await
            {
                error!(%peer, "connection error: {e}");
            }
        });
    }
}
