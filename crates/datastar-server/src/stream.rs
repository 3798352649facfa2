//! SSE session controller for socket connections.

use std::future::Future;

use bytes::Bytes;
use http_body_util::{BodyExt, StreamBody};
use hyper::body::Frame;
use hyper::header::{HeaderName, HeaderValue, CONNECTION};
use hyper::{Response, StatusCode, Version};
use thiserror::Error;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use datastar_core::consts::SSE_HEADERS;
use datastar_core::{BoxError, ServerSentEventGenerator, StreamOptions};

use crate::generator::{Outgoing, SocketGenerator};
use crate::http::{IncomingRequest, ResponseBody};

/// Errors surfaced by [`stream`].
#[derive(Debug, Error)]
pub enum StreamError {
    /// The handler failed and no `on_error` callback was registered.
    #[error("stream handler failed: {0}")]
    Handler(#[source] BoxError),
}

/// Run one SSE session answering `request`.
///
/// Sends the SSE response head right away, then runs `handler` with a
/// [`SocketGenerator`]. Events reach the client in order; hyper picks the
/// body framing that the request's HTTP version allows.
///
/// - Handler success closes the stream, unless `options.keepalive` is set;
///   then it stays open until the generator is closed or the client leaves.
/// - Handler failure runs `on_abort`, then `on_error` if registered.
///   Without `on_error` the failure is returned as
///   [`StreamError::Handler`] after the stream is closed.
/// - A client disconnect runs `on_abort`, drops the handler and ends the
///   session with `Ok(())`.
pub async fn stream<B, F, Fut>(
    request: IncomingRequest<B>,
    handler: F,
    mut options: StreamOptions,
) -> Result<(), StreamError>
where
    F: FnOnce(SocketGenerator) -> Fut,
    Fut: Future<Output = Result<(), BoxError>>,
{
    let (generator, outgoing) = SocketGenerator::channel();
    let version = request.version();
    debug!(method = %request.method(), uri = %request.uri(), "SSE stream opened");

    let response = sse_response(version, &options, outgoing);
    if request.respond(response).is_err() {
        debug!("connection closed before the response was sent");
        generator.close();
        options.abort().await;
        return Ok(());
    }

    let handler = handler(generator.clone());
    let result = tokio::select! {
        result = handler => Some(result),
        _ = generator.client_gone() => None,
    };

    let mut failure = None;
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
            failure = options.handle_error(err).await;
            generator.close();
        }
    }
    debug!("SSE stream closed");

    match failure {
        Some(err) => Err(StreamError::Handler(err)),
        None => Ok(()),
    }
}

fn sse_response(
    version: Version,
    options: &StreamOptions,
    outgoing: tokio::sync::mpsc::UnboundedReceiver<Outgoing>,
) -> Response<ResponseBody> {
    let frames = UnboundedReceiverStream::new(outgoing).map_while(|message| match message {
        Outgoing::Event(text) => Some(Ok::<_, BoxError>(Frame::data(Bytes::from(text)))),
        Outgoing::Close => None,
    });

    let mut response = Response::new(StreamBody::new(frames).boxed_unsync());
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    for (name, value) in SSE_HEADERS {
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            continue;
        };
        // HTTP/1.0 has no persistent connections to announce.
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
    response
}
