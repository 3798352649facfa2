//! A small hyper HTTP/1 server for SSE endpoints.
//!
//! Every request is routed by path to a handler, which runs on its own
//! task and answers through its [`IncomingRequest`] (typically by calling
//! [`crate::stream`]).

use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use datastar_core::{BoxError, SignalParseError};

use crate::http::{text_response, HttpError, IncomingRequest, ResponseBody, DEFAULT_MAX_BODY_BYTES};

/// Configuration for the socket server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Upper bound for request bodies read by handlers.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

type Handler =
    Arc<dyn Fn(IncomingRequest) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// Routes request paths to handlers.
#[derive(Clone)]
pub struct SocketServer {
    config: ServerConfig,
    routes: Arc<HashMap<String, Handler>>,
}

impl SocketServer {
    /// Create a new server with the given configuration.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            routes: Arc::new(HashMap::new()),
        }
    }

    /// Register `handler` for requests whose path equals `path`.
    pub fn route<F, Fut>(mut self, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(IncomingRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |request| handler(request).boxed());
        Arc::make_mut(&mut self.routes).insert(path.into(), handler);
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind to the configured address and serve forever.
    pub async fn run(self) -> io::Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        info!("Datastar socket server listening on {}", self.config.bind_addr);
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> io::Result<()> {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    let server = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = server.serve_connection(stream).await {
                            error!("Connection error from {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }

    /// Serve HTTP/1 requests arriving on `io` until the connection ends.
    pub async fn serve_connection<I>(&self, io: I) -> Result<(), HttpError>
    where
        I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let server = self.clone();
        let service = service_fn(move |request: Request<Incoming>| {
            let server = server.clone();
            async move { Ok::<_, Infallible>(server.dispatch(request).await) }
        });

        http1::Builder::new()
            .timer(TokioTimer::new())
            .serve_connection(TokioIo::new(io), service)
            .await?;
        Ok(())
    }

    async fn dispatch(&self, request: Request<Incoming>) -> Response<ResponseBody> {
        debug!(method = %request.method(), uri = %request.uri(), "request");

        let Some(handler) = self.routes.get(request.uri().path()).cloned() else {
            return text_response(StatusCode::NOT_FOUND, "not found");
        };

        let (request, response) = IncomingRequest::new(request, self.config.max_body_bytes);
        let task = tokio::spawn(handler(request));

        match response.await {
            Ok(response) => {
                tokio::spawn(report(task));
                response
            }
            // The handler let go of the request without answering it.
            Err(_) => match task.await {
                Ok(Ok(())) => {
                    error!("handler finished without a response");
                    text_response(StatusCode::INTERNAL_SERVER_ERROR, "no response")
                }
                Ok(Err(err)) => failure_response(err),
                Err(err) => {
                    error!("handler panicked: {}", err);
                    text_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
                }
            },
        }
    }
}

/// Log the outcome of a handler that already answered its request.
async fn report(task: JoinHandle<Result<(), BoxError>>) {
    match task.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => error!("Handler error: {}", err),
        Err(err) => error!("handler panicked: {}", err),
    }
}

/// Map an error raised before the handler answered to a response.
fn failure_response(err: BoxError) -> Response<ResponseBody> {
    match err.downcast_ref::<SignalParseError>() {
        Some(err) => {
            debug!(%err, "rejecting request");
            text_response(StatusCode::BAD_REQUEST, err.to_string())
        }
        None => {
            error!("Handler error: {}", err);
            text_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        }
    }
}
