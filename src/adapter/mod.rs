//! Boundary translators between host frameworks and [`Handler`](crate::Handler).
//!
//! | Host | Adapter |
//! |---|---|
//! | hyper 1.x | [`hyper::service`] / [`hyper::serve`] host any handler, instrumented or not |
//! | tower (axum, tonic, hyper-util) | [`tower::MetricsLayer`] instruments an inner `Service` |
//!
//! The hyper adapter buffers the request body, up to a limit, into a
//! [`Request`](crate::Request) before the handler runs. The tower layer leaves
//! bodies alone.

pub mod hyper;
pub mod tower;
