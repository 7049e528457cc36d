use std::time::Duration;

use bytes::Bytes;
use http::{Method, StatusCode};
use prom_middleware::{BoxFuture, Config, Error, Handler, Middleware, Request};
use prometheus::{Encoder, Registry, TextEncoder};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn fake_handler(status: StatusCode) -> impl Handler {
    move |_req: Request| async move { status }
}

fn request(method: Method, path: &str) -> Request {
    http::Request::builder()
        .method(method)
        .uri(path)
        .body(Bytes::new())
        .unwrap()
        .into()
}

fn exposition(registry: &Registry) -> String {
    let mut buf = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buf).unwrap();
    String::from_utf8(buf).unwrap()
}

fn assert_metrics(body: &str, expected: &[String]) {
    for line in expected {
        assert!(body.contains(line.as_str()), "metric not present on the result: {line}\n{body}");
    }
}

fn histogram_lines(metric: &str, labels: &str, bounds: &[&str], count: u64) -> Vec<String> {
    let mut lines: Vec<String> = bounds
        .iter()
        .chain(std::iter::once(&"+Inf"))
        .map(|le| format!(r#"{metric}_bucket{{{labels},le="{le}"}} {count}"#))
        .collect();
    lines.push(format!("{metric}_count{{{labels}}} {count}"));
    lines
}

const DEFAULT_BOUNDS: &[&str] = &["0.005", "0.01", "0.025", "0.05", "0.1", "0.25", "0.5", "1", "2.5", "5", "10"];

#[tokio::test]
async fn default_config_without_handler_id_labels_by_path() {
    init_tracing();
    let reg = Registry::new();
    let mdlw = Middleware::new(Config::default(), Some(&reg)).unwrap();
    let h = mdlw.handler("", fake_handler(StatusCode::FORBIDDEN));

    h.call(request(Method::GET, "/test")).await;
    h.call(request(Method::POST, "/test2")).await;

    let body = exposition(&reg);
    let metric = "http_request_duration_seconds";
    assert_metrics(&body, &histogram_lines(metric, r#"code="403",handler="/test",method="GET""#, DEFAULT_BOUNDS, 1));
    assert_metrics(&body, &histogram_lines(metric, r#"code="403",handler="/test2",method="POST""#, DEFAULT_BOUNDS, 1));
}

#[tokio::test]
async fn custom_config_with_handler_id_uses_prefix_buckets_and_fixed_label() {
    init_tracing();
    let reg = Registry::new();
    let cfg = Config::new()
        .with_prefix("batman")
        .with_buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 40.0, 80.0, 160.0, 320.0]);
    let mdlw = Middleware::new(cfg, Some(&reg)).unwrap();
    let h = mdlw.handler("bruceWayne", fake_handler(StatusCode::CREATED));

    h.call(request(Method::GET, "/test")).await;
    h.call(request(Method::POST, "/test2")).await;

    let body = exposition(&reg);
    let metric = "batman_http_request_duration_seconds";
    let bounds = &["0.5", "1", "2.5", "5", "10", "20", "40", "80", "160", "320"];
    assert_metrics(&body, &histogram_lines(metric, r#"code="201",handler="bruceWayne",method="GET""#, bounds, 1));
    assert_metrics(&body, &histogram_lines(metric, r#"code="201",handler="bruceWayne",method="POST""#, bounds, 1));
    assert!(!body.contains(r#"handler="/test""#));
    assert!(!body.contains(r#"le="0.005""#));
}

#[tokio::test]
async fn grouped_status_collapses_codes_to_class() {
    let reg = Registry::new();
    let mdlw = Middleware::new(Config::new().with_grouped_status(true), Some(&reg)).unwrap();

    for status in [StatusCode::OK, StatusCode::CREATED, StatusCode::NO_CONTENT] {
        mdlw.handler("ok", fake_handler(status)).call(request(Method::GET, "/")).await;
    }
    mdlw.handler("denied", fake_handler(StatusCode::FORBIDDEN))
        .call(request(Method::GET, "/"))
        .await;

    let body = exposition(&reg);
    assert!(body.contains(r#"http_request_duration_seconds_count{code="2xx",handler="ok",method="GET"} 3"#));
    assert!(body.contains(r#"http_request_duration_seconds_count{code="4xx",handler="denied",method="GET"} 1"#));
    assert!(!body.contains(r#"code="201""#));
    assert!(!body.contains(r#"code="403""#));
}

#[tokio::test]
async fn path_label_is_percent_decoded() {
    let reg = Registry::new();
    let mdlw = Middleware::new(Config::default(), Some(&reg)).unwrap();
    let h = mdlw.handler("", fake_handler(StatusCode::OK));

    h.call(request(Method::GET, "/a%20b")).await;

    let body = exposition(&reg);
    assert!(body.contains(r#"http_request_duration_seconds_count{code="200",handler="/a b",method="GET"} 1"#));
    assert!(!body.contains("%20"));
}

#[tokio::test]
async fn each_request_is_observed_once() {
    let reg = Registry::new();
    let mdlw = Middleware::new(Config::default(), Some(&reg)).unwrap();
    let h = mdlw.handler("", fake_handler(StatusCode::OK));

    for _ in 0..7 {
        h.call(request(Method::GET, "/ping")).await;
    }

    assert!(exposition(&reg)
        .contains(r#"http_request_duration_seconds_count{code="200",handler="/ping",method="GET"} 7"#));
}

#[tokio::test]
async fn response_passes_through_unchanged() {
    let reg = Registry::new();
    let mdlw = Middleware::new(Config::default(), Some(&reg)).unwrap();
    let h = mdlw.handler("teapot", |req: Request| async move {
        (StatusCode::IM_A_TEAPOT, format!("{} {}", req.method(), req.path()))
    });

    let res = h.call(request(Method::PUT, "/brew")).await;

    assert_eq!(res.status_code(), StatusCode::IM_A_TEAPOT);
    assert_eq!(res.body().as_ref(), b"PUT /brew");
    assert!(exposition(&reg)
        .contains(r#"http_request_duration_seconds_count{code="418",handler="teapot",method="PUT"} 1"#));
}

#[tokio::test]
async fn implicit_status_is_ok() {
    let reg = Registry::new();
    let mdlw = Middleware::new(Config::default(), Some(&reg)).unwrap();
    let h = mdlw.handler("text", |_req: Request| async { "hello" });

    h.call(request(Method::GET, "/")).await;

    assert!(exposition(&reg)
        .contains(r#"http_request_duration_seconds_count{code="200",handler="text",method="GET"} 1"#));
}

#[tokio::test]
async fn panicking_handler_is_still_observed() {
    let reg = Registry::new();
    let mdlw = Middleware::new(Config::default(), Some(&reg)).unwrap();
    let h = mdlw.handler("boom", |_req: Request| async {
        if true {
            panic!("handler failed");
        }
        StatusCode::CREATED
    });

    let joined = tokio::spawn(h.call(request(Method::GET, "/boom"))).await;

    assert!(joined.unwrap_err().is_panic());
    assert!(exposition(&reg)
        .contains(r#"http_request_duration_seconds_count{code="200",handler="boom",method="GET"} 1"#));
}

/// Panics while building its future, before there is anything to poll.
struct PanicsOnCall;

impl Handler for PanicsOnCall {
    fn call(&self, _req: Request) -> BoxFuture {
        panic!("handler failed before returning a future");
    }
}

#[test]
fn handler_panicking_in_call_is_still_observed() {
    let reg = Registry::new();
    let mdlw = Middleware::new(Config::default(), Some(&reg)).unwrap();
    let h = mdlw.handler("eager", PanicsOnCall);

    let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| h.call(request(Method::GET, "/eager"))));

    assert!(res.is_err());
    assert!(exposition(&reg)
        .contains(r#"http_request_duration_seconds_count{code="200",handler="eager",method="GET"} 1"#));
}

#[tokio::test]
async fn cancelled_request_is_still_observed() {
    let reg = Registry::new();
    let mdlw = Middleware::new(Config::default(), Some(&reg)).unwrap();
    let h = mdlw.handler("slow", |_req: Request| async {
        std::future::pending::<()>().await;
        StatusCode::OK
    });

    let res = tokio::time::timeout(Duration::from_millis(20), h.call(request(Method::GET, "/slow"))).await;

    assert!(res.is_err());
    assert!(exposition(&reg)
        .contains(r#"http_request_duration_seconds_count{code="200",handler="slow",method="GET"} 1"#));
}

#[tokio::test]
async fn elapsed_time_lands_in_the_right_bucket() {
    let reg = Registry::new();
    let mdlw = Middleware::new(Config::new().with_buckets(vec![0.05, 10.0]), Some(&reg)).unwrap();
    let h = mdlw.handler("nap", |_req: Request| async {
        tokio::time::sleep(Duration::from_millis(80)).await;
        StatusCode::OK
    });

    h.call(request(Method::GET, "/")).await;

    let body = exposition(&reg);
    assert!(body.contains(r#"http_request_duration_seconds_bucket{code="200",handler="nap",method="GET",le="0.05"} 0"#));
    assert!(body.contains(r#"http_request_duration_seconds_bucket{code="200",handler="nap",method="GET",le="10"} 1"#));
}

#[tokio::test]
async fn wrapped_handlers_can_be_wrapped_again() {
    let reg = Registry::new();
    let inner = Middleware::new(Config::new().with_prefix("inner"), Some(&reg)).unwrap();
    let outer = Middleware::new(Config::new().with_prefix("outer"), Some(&reg)).unwrap();
    let h = outer.handler("", inner.handler("fixed", fake_handler(StatusCode::ACCEPTED)));

    h.call(request(Method::DELETE, "/things/1")).await;

    let body = exposition(&reg);
    assert!(body.contains(r#"inner_http_request_duration_seconds_count{code="202",handler="fixed",method="DELETE"} 1"#));
    assert!(body.contains(r#"outer_http_request_duration_seconds_count{code="202",handler="/things/1",method="DELETE"} 1"#));
}

#[tokio::test]
async fn concurrent_requests_share_the_histogram() {
    let reg = Registry::new();
    let mdlw = Middleware::new(Config::default(), Some(&reg)).unwrap();
    let h = std::sync::Arc::new(mdlw.handler("shared", fake_handler(StatusCode::OK)));

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..32 {
        let h = std::sync::Arc::clone(&h);
        tasks.spawn(async move { h.call(request(Method::GET, "/")).await });
    }
    while let Some(res) = tasks.join_next().await {
        res.unwrap();
    }

    assert!(exposition(&reg)
        .contains(r#"http_request_duration_seconds_count{code="200",handler="shared",method="GET"} 32"#));
}

#[test]
fn same_prefix_on_same_registry_fails() {
    let reg = Registry::new();
    Middleware::new(Config::new().with_prefix("dup"), Some(&reg)).unwrap();

    let err = Middleware::new(Config::new().with_prefix("dup"), Some(&reg)).err().unwrap();
    assert!(matches!(err, Error::Registration(_)));

    // A different registry or a different prefix is fine.
    Middleware::new(Config::new().with_prefix("dup"), Some(&Registry::new())).unwrap();
    Middleware::new(Config::new().with_prefix("other"), Some(&reg)).unwrap();
}

#[test]
fn invalid_prefix_is_a_metric_error() {
    let err = Middleware::new(Config::new().with_prefix("not-valid"), Some(&Registry::new())).err().unwrap();
    assert!(matches!(err, Error::Metric(_)));
}
