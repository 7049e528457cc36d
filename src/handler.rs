//! Handler trait and type erasure.
//!
//! # What can be wrapped
//!
//! Anything that turns a [`Request`] into a [`Response`] asynchronously:
//!
//! ```text
//! async fn hello(req: Request) -> impl IntoResponse   ← plain async fn
//! |req: Request| async move { … }                     ← closure
//! impl Handler for MyHandler { … }                    ← hand-written type
//! Instrumented<H>                                     ← already-wrapped handler
//! ```
//!
//! The trait is object safe, so adapters store handlers of different types
//! behind one [`BoxedHandler`] and pay a single virtual call per request.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// A heap-allocated, type-erased future that resolves to a [`Response`].
///
/// `Send + 'static` lets tokio move the future across worker threads.
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// A type-erased handler shared across concurrent requests.
pub type BoxedHandler = Arc<dyn Handler>;

/// The request-handling capability the middleware wraps.
///
/// One handler value serves every request, possibly many at once, hence the
/// `Send + Sync` bound and `&self` receiver.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, req: Request) -> BoxFuture;
}

/// Implement `Handler` for any function with the right signature.
///
/// `Fn(Request) -> Fut` covers named `async fn` items, closures returning an
/// `async` block, and any struct that implements `Fn`.
impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}
