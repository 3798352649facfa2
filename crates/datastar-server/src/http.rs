//! Request and response plumbing on top of hyper.
//!
//! hyper owns the HTTP/1 protocol (framing, version negotiation, chunked
//! bodies, `Expect: 100-continue`). This module wraps a request so a
//! handler can read its signals and answer it exactly once.

use std::fmt;

use bytes::Bytes;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use hyper::http::request::Parts;
use hyper::{Method, Request, Response, StatusCode, Uri, Version};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::debug;

use datastar_core::{signals, BoxError, SignalParseError, Signals};

/// Default upper bound for a request body.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Body type of every response written by this crate.
pub type ResponseBody = UnsyncBoxBody<Bytes, BoxError>;

/// Errors raised by the HTTP layer.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The connection failed at the protocol level.
    #[error("HTTP error: {0}")]
    Hyper(#[from] hyper::Error),

    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("failed to read request body: {0}")]
    Body(#[source] BoxError),
}

/// A request routed to a handler, together with the slot for its response.
///
/// The body stays on the connection until [`IncomingRequest::read_body`]
/// (or [`IncomingRequest::read_signals`]) is awaited.
pub struct IncomingRequest<B = Incoming> {
    parts: Parts,
    body: Option<B>,
    bytes: Option<Bytes>,
    max_body_bytes: usize,
    responder: oneshot::Sender<Response<ResponseBody>>,
}

impl<B> IncomingRequest<B> {
    /// Wrap `request`; the receiver resolves with the handler's response.
    pub(crate) fn new(
        request: Request<B>,
        max_body_bytes: usize,
    ) -> (Self, oneshot::Receiver<Response<ResponseBody>>) {
        let (parts, body) = request.into_parts();
        let (responder, response) = oneshot::channel();
        let request = Self {
            parts,
            body: Some(body),
            bytes: None,
            max_body_bytes,
            responder,
        };
        (request, response)
    }

    /// Override the body size limit.
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn version(&self) -> Version {
        self.parts.version
    }

    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// The still-encoded query string, if any.
    pub fn query(&self) -> Option<&str> {
        self.parts.uri.query()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Header value as text, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name)?.to_str().ok()
    }

    /// Send `response` to the client.
    ///
    /// Gives the response back if the connection is already gone.
    pub fn respond(self, response: Response<ResponseBody>) -> Result<(), Response<ResponseBody>> {
        self.responder.send(response)
    }
}

impl<B> IncomingRequest<B>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    /// Read the full request body, at most once.
    pub async fn read_body(&mut self) -> Result<&Bytes, HttpError> {
        if let Some(body) = self.body.take() {
            let limit = self.max_body_bytes;
            let collected = Limited::new(body, limit).collect().await.map_err(|err| {
                if err.downcast_ref::<LengthLimitError>().is_some() {
                    HttpError::BodyTooLarge { limit }
                } else {
                    HttpError::Body(err)
                }
            })?;
            self.bytes = Some(collected.to_bytes());
        }
        Ok(&*self.bytes.get_or_insert_with(Bytes::new))
    }

    /// Read the client signals.
    ///
    /// GET requests carry them in the `datastar` query parameter; every
    /// other method carries them as the JSON body, which is awaited in
    /// full.
    pub async fn read_signals(&mut self) -> Result<Signals, SignalParseError> {
        let result = if self.parts.method == Method::GET {
            signals::query_signals(self.query())
        } else {
            match self.read_body().await {
                Ok(body) => signals::body_signals(body),
                Err(err) => Err(SignalParseError::Body(Box::new(err))),
            }
        };
        if let Err(err) = &result {
            debug!(%err, method = %self.parts.method, "failed to read datastar signals");
        }
        result
    }

    /// Read the client signals into a caller-defined type.
    pub async fn read_signals_as<T: DeserializeOwned>(&mut self) -> Result<T, SignalParseError> {
        signals::signals_into(self.read_signals().await?)
    }
}

impl<B> fmt::Debug for IncomingRequest<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncomingRequest")
            .field("method", &self.parts.method)
            .field("uri", &self.parts.uri)
            .field("version", &self.parts.version)
            .field("headers", &self.parts.headers)
            .finish()
    }
}

/// A complete plain-text response.
pub fn text_response(status: StatusCode, body: impl Into<String>) -> Response<ResponseBody> {
    let body = Full::new(Bytes::from(body.into()))
        .map_err(|never| match never {})
        .boxed_unsync();
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(method: Method, uri: &str, body: &str) -> IncomingRequest<Full<Bytes>> {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("Datastar-Request", "true")
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap();
        IncomingRequest::new(request, DEFAULT_MAX_BODY_BYTES).0
    }

    #[test]
    fn test_accessors() {
        let request = build(Method::GET, "/merge?datastar=%7B%7D", "");

        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.path(), "/merge");
        assert_eq!(request.query(), Some("datastar=%7B%7D"));
        assert_eq!(request.header("datastar-request"), Some("true"));
        assert_eq!(request.version(), Version::HTTP_11);
    }

    #[tokio::test]
    async fn test_get_signals_from_query() {
        let mut request = build(
            Method::GET,
            "/merge?datastar=%7B%22foo%22%3A%22World%22%7D",
            "",
        );

        let signals = request.read_signals().await.unwrap();
        assert_eq!(serde_json::Value::Object(signals), json!({"foo": "World"}));
    }

    #[tokio::test]
    async fn test_post_signals_from_body() {
        let mut request = build(Method::POST, "/count", r#"{"count":2}"#);

        let signals = request.read_signals().await.unwrap();
        assert_eq!(signals.get("count"), Some(&json!(2)));

        // The body is buffered, so a second read sees the same signals.
        let again = request.read_signals().await.unwrap();
        assert_eq!(signals, again);
    }

    #[tokio::test]
    async fn test_post_invalid_body() {
        let mut request = build(Method::POST, "/x", "not json");
        let err = request.read_signals().await.unwrap_err();
        assert!(matches!(err, SignalParseError::InvalidJson(_)));

        let mut request = build(Method::PUT, "/x", "");
        let err = request.read_signals().await.unwrap_err();
        assert!(matches!(err, SignalParseError::EmptyBody));
    }

    #[tokio::test]
    async fn test_body_limit() {
        let mut request = build(Method::POST, "/x", r#"{"big":"xxxxxxxxxxxxxxxxxxxx"}"#)
            .with_max_body_bytes(16);
        assert!(matches!(
            request.read_body().await,
            Err(HttpError::BodyTooLarge { limit: 16 })
        ));

        let err = request.read_signals().await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_respond_delivers_response() {
        let (request, response) = IncomingRequest::new(
            Request::new(Full::new(Bytes::new())),
            DEFAULT_MAX_BODY_BYTES,
        );
        request
            .respond(text_response(StatusCode::NOT_FOUND, "not found"))
            .unwrap();

        let response = response.await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, "not found");
    }

    #[test]
    fn test_respond_after_hangup_returns_response() {
        let (request, response) = IncomingRequest::new(
            Request::new(Full::new(Bytes::new())),
            DEFAULT_MAX_BODY_BYTES,
        );
        drop(response);
        assert!(request.respond(text_response(StatusCode::OK, "late")).is_err());
    }
}
