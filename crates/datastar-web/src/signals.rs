//! Reading Datastar signals from axum requests.

use axum::async_trait;
use axum::body::to_bytes;
use axum::extract::{FromRequest, Request};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use datastar_core::{body_signals, query_signals, signals_into, SignalParseError, Signals};

/// Default upper bound for a request body holding signals.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Read the client signals from `request`.
///
/// GET requests carry them in the `datastar` query parameter; every other
/// method carries them as the JSON body, which is read in full.
pub async fn read_signals(request: Request) -> Result<Signals, SignalParseError> {
    read_signals_limited(request, DEFAULT_MAX_BODY_BYTES).await
}

/// Like [`read_signals`], with an explicit body size limit.
pub async fn read_signals_limited(
    request: Request,
    limit: usize,
) -> Result<Signals, SignalParseError> {
    let method = request.method().clone();
    let result = if method == Method::GET {
        query_signals(request.uri().query())
    } else {
        match to_bytes(request.into_body(), limit).await {
            Ok(bytes) => body_signals(&bytes),
            Err(err) => Err(SignalParseError::Body(Box::new(err))),
        }
    };
    if let Err(err) = &result {
        debug!(%err, %method, "failed to read datastar signals");
    }
    result
}

/// Read the client signals into a caller-defined type.
pub async fn read_signals_as<T: DeserializeOwned>(request: Request) -> Result<T, SignalParseError> {
    signals_into(read_signals(request).await?)
}

/// Rejection used by [`ReadSignals`]: `400 Bad Request` with the reason.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct SignalsRejection(#[from] pub SignalParseError);

impl IntoResponse for SignalsRejection {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.0.to_string()).into_response()
    }
}

/// Extractor for Datastar signals.
///
/// ```rust,ignore
/// async fn handler(ReadSignals(signals): ReadSignals<Signals>) -> Response { ... }
/// ```
#[derive(Debug, Clone)]
pub struct ReadSignals<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ReadSignals<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = SignalsRejection;

    async fn from_request(request: Request, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(read_signals_as(request).await?))
    }
}
