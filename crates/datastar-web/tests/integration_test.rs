//! Integration tests for the axum transport.
//!
//! Routes are exercised with `tower::ServiceExt::oneshot`; the lifecycle
//! tests drive [`stream`] responses directly and read their bodies frame by
//! frame.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode, Version};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_stream::StreamExt;
use tower::ServiceExt;

use datastar_web::{
    stream, BoxError, PatchElementsOptions, PatchSignalsOptions, ReadSignals,
    ServerSentEventGenerator, Signals, StreamOptions, WebGenerator,
};

async fn merge(version: Version, ReadSignals(signals): ReadSignals<Signals>) -> Response {
    let name = signals
        .get("foo")
        .and_then(Value::as_str)
        .unwrap_or("nobody")
        .to_string();

    stream(
        version,
        move |sse: WebGenerator| async move {
            sse.patch_elements(
                &format!("<div id=\"toMerge\">Hello {name}</div>"),
                &PatchElementsOptions::default(),
            )?;
            Ok::<(), BoxError>(())
        },
        StreamOptions::new().with_header("X-Accel-Buffering", "no"),
    )
}

fn app() -> Router {
    Router::new().route("/merge", get(merge).post(merge))
}

async fn body_text(response: Response) -> String {
    let bytes = timeout(Duration::from_secs(5), to_bytes(response.into_body(), usize::MAX))
        .await
        .expect("body finished in time")
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_merge_get() {
    let request = Request::builder()
        .uri("/merge?datastar=%7B%22foo%22%3A%22World%22%7D")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "text/event-stream");
    assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
    assert_eq!(headers[header::CONNECTION], "keep-alive");
    assert_eq!(headers["x-accel-buffering"], "no");

    assert_eq!(
        body_text(response).await,
        "event: datastar-patch-elements\ndata: elements <div id=\"toMerge\">Hello World</div>\n\n"
    );
}

#[tokio::test]
async fn test_merge_post() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/merge")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"foo":"Post"}"#))
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Hello Post"));
}

#[tokio::test]
async fn test_bad_signals_are_rejected() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/merge")
        .body(Body::from("[1,2,3]"))
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let request = Request::builder().uri("/merge").body(Body::empty()).unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_no_connection_header_on_http2() {
    let request = Request::builder()
        .version(Version::HTTP_2)
        .uri("/merge?datastar=%7B%7D")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::CONNECTION).is_none());
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
}

#[tokio::test]
async fn test_keepalive_until_close() {
    let (handle_tx, handle_rx) = oneshot::channel::<WebGenerator>();
    let response = stream(
        Version::HTTP_11,
        move |sse: WebGenerator| async move {
            sse.patch_signals("{\"tick\":0}", &PatchSignalsOptions::default())?;
            let _ = handle_tx.send(sse);
            Ok::<(), BoxError>(())
        },
        StreamOptions::new().with_keepalive(true),
    );
    let mut body = response.into_body().into_data_stream();

    let first = timeout(Duration::from_secs(5), body.next()).await.unwrap();
    assert_eq!(
        first.unwrap().unwrap(),
        "event: datastar-patch-signals\ndata: signals {\"tick\":0}\n\n"
    );

    let sse = handle_rx.await.unwrap();
    // Still open after the handler returned.
    assert!(timeout(Duration::from_millis(50), body.next()).await.is_err());

    sse.patch_signals("{\"tick\":1}", &PatchSignalsOptions::default())
        .unwrap();
    sse.close();

    let second = timeout(Duration::from_secs(5), body.next()).await.unwrap();
    assert_eq!(
        second.unwrap().unwrap(),
        "event: datastar-patch-signals\ndata: signals {\"tick\":1}\n\n"
    );
    let end = timeout(Duration::from_secs(5), body.next()).await.unwrap();
    assert!(end.is_none());
}

#[tokio::test]
async fn test_on_error_runs_after_on_abort() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let aborts = seen.clone();
    let errors = seen.clone();
    let (done_tx, done_rx) = oneshot::channel();

    let response = stream(
        Version::HTTP_11,
        |sse: WebGenerator| async move {
            sse.patch_signals("{\"before\":true}", &PatchSignalsOptions::default())?;
            Err::<(), BoxError>("boom".into())
        },
        StreamOptions::new()
            .on_abort(move || async move { aborts.lock().unwrap().push("abort".to_string()) })
            .on_error(move |err| async move {
                errors.lock().unwrap().push(err.to_string());
                let _ = done_tx.send(());
            }),
    );

    assert_eq!(
        body_text(response).await,
        "event: datastar-patch-signals\ndata: signals {\"before\":true}\n\n"
    );
    timeout(Duration::from_secs(5), done_rx).await.unwrap().unwrap();
    assert_eq!(*seen.lock().unwrap(), vec!["abort".to_string(), "boom".to_string()]);
}

#[tokio::test]
async fn test_unhandled_error_fails_body() {
    let response = stream(
        Version::HTTP_11,
        |_sse: WebGenerator| async move { Err::<(), BoxError>("unhandled".into()) },
        StreamOptions::new(),
    );

    let result = timeout(Duration::from_secs(5), to_bytes(response.into_body(), usize::MAX))
        .await
        .unwrap();
    assert!(result.is_err());
}

#[tokio::test]
async fn test_dropped_body_runs_on_abort() {
    let (abort_tx, abort_rx) = oneshot::channel();
    let response = stream(
        Version::HTTP_11,
        |_sse: WebGenerator| async move {
            std::future::pending::<()>().await;
            Ok::<(), BoxError>(())
        },
        StreamOptions::new().on_abort(move || async move {
            let _ = abort_tx.send(());
        }),
    );

    drop(response);
    timeout(Duration::from_secs(5), abort_rx)
        .await
        .expect("on_abort ran")
        .unwrap();
}

#[tokio::test]
async fn test_dropped_body_after_keepalive_handler_runs_on_abort_once() {
    let aborts = Arc::new(Mutex::new(0));
    let counter = aborts.clone();
    let (abort_tx, abort_rx) = oneshot::channel();
    let (handle_tx, handle_rx) = oneshot::channel::<WebGenerator>();

    let response = stream(
        Version::HTTP_11,
        move |sse: WebGenerator| async move {
            sse.patch_signals("{\"tick\":0}", &PatchSignalsOptions::default())?;
            let _ = handle_tx.send(sse);
            Ok::<(), BoxError>(())
        },
        StreamOptions::new()
            .with_keepalive(true)
            .on_abort(move || async move {
                *counter.lock().unwrap() += 1;
                let _ = abort_tx.send(());
            }),
    );
    let mut body = response.into_body().into_data_stream();
    let first = timeout(Duration::from_secs(5), body.next()).await.unwrap();
    assert!(first.is_some());

    // The handler has returned; the stream is only held open by keepalive.
    let sse = handle_rx.await.unwrap();
    drop(body);

    timeout(Duration::from_secs(5), abort_rx)
        .await
        .expect("on_abort ran")
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(*aborts.lock().unwrap(), 1);

    // Closing after the client left does not abort again.
    sse.close();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(*aborts.lock().unwrap(), 1);
}
