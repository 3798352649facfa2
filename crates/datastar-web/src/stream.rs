//! SSE session controller for axum handlers.

use std::future::Future;

use axum::body::Body;
use axum::http::header::{HeaderName, HeaderValue, CONNECTION};
use axum::http::{StatusCode, Version};
use axum::response::Response;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, error, warn};

use datastar_core::consts::SSE_HEADERS;
use datastar_core::{BoxError, ServerSentEventGenerator, StreamOptions};

use crate::generator::{Frame, WebGenerator};

/// Start an SSE response driven by `handler`.
///
/// The response is returned right away; `handler` runs on a spawned task
/// with a [`WebGenerator`] whose events become the streaming body.
/// `version` is the request's HTTP version: the `Connection` header is
/// only sent on HTTP/1.1.
///
/// - Handler success ends the body, unless `options.keepalive` is set;
///   then it stays open until the generator is closed or the client leaves.
/// - Handler failure runs `on_abort`, then `on_error` if registered.
///   Without `on_error` the failure is logged and the body is terminated
///   with it.
/// - A client disconnect (the body being dropped) runs `on_abort` and
///   drops the handler.
///
/// Must be called within a tokio runtime.
pub fn stream<F, Fut>(version: Version, handler: F, options: StreamOptions) -> Response
where
    F: FnOnce(WebGenerator) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    let (generator, frames) = WebGenerator::channel();
    let body = UnboundedReceiverStream::new(frames).map_while(|frame| match frame {
        Frame::Event(text) => Some(Ok::<_, BoxError>(text)),
        Frame::Fail(err) => Some(Err(err)),
        Frame::Close => None,
    });

    let mut response = Response::new(Body::from_stream(body));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    for (name, value) in SSE_HEADERS {
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            continue;
        };
        if name == CONNECTION && version != Version::HTTP_11 {
            continue;
        }
        headers.insert(name, HeaderValue::from_static(value));
    }
    for (name, value) in &options.headers {
        match (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => warn!(name = %name, "skipping invalid response header"),
        }
    }

    debug!(?version, keepalive = options.keepalive, "SSE stream opened");
    tokio::spawn(drive(generator, handler, options));
    response
}

async fn drive<F, Fut>(generator: WebGenerator, handler: F, mut options: StreamOptions)
where
    F: FnOnce(WebGenerator) -> Fut,
    Fut: Future<Output = Result<(), BoxError>>,
{
    let handler = handler(generator.clone());
    let result = tokio::select! {
        result = handler => Some(result),
        _ = generator.client_gone() => None,
    };

    match result {
        None => {
            debug!("client disconnected");
            generator.close();
            options.abort().await;
        }
        Some(Ok(())) if options.keepalive => {
            debug!("handler finished, keeping stream alive");
            generator.body_dropped().await;
            if !generator.is_closed() {
                debug!("client disconnected");
                generator.close();
                options.abort().await;
            }
        }
        Some(Ok(())) => generator.close(),
        Some(Err(err)) => {
            warn!(%err, "stream handler failed");
            options.abort().await;
            match options.handle_error(err).await {
                Some(err) => {
                    error!(%err, "unhandled stream handler failure");
                    generator.fail(err);
                }
                None => generator.close(),
            }
        }
    }
    debug!("SSE stream closed");
}
