use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    http::Version,
    response::{Html, Response},
    routing::get,
    Router,
};
use serde_json::Value;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use datastar_core::{
    BoxError, PatchElementsOptions, PatchSignalsOptions, ServerSentEventGenerator, Signals,
    StreamOptions,
};
use datastar_server::{ServerConfig, SocketGenerator, SocketServer};
use datastar_web::{ReadSignals, WebGenerator};

const INDEX_HTML: &str = include_str!("index.html");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,datastar_server=debug,datastar_web=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Datastar hello starting...");

    // Configuration
    let http_addr: SocketAddr = env_addr("DATASTAR_HTTP_ADDR", "0.0.0.0:3000")?;
    let socket_addr: SocketAddr = env_addr("DATASTAR_SOCKET_ADDR", "0.0.0.0:3001")?;

    // Socket transport: plain hyper HTTP/1 connections
    let server = SocketServer::new(ServerConfig {
        bind_addr: socket_addr,
        ..Default::default()
    })
    .route("/merge", |mut request| async move {
        let signals = request.read_signals().await?;
        let name = greeting_name(&signals);
        datastar_server::stream(
            request,
            move |sse: SocketGenerator| async move { merge_hello(&sse, &name) },
            StreamOptions::new(),
        )
        .await?;
        Ok::<(), BoxError>(())
    });

    let socket_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            tracing::error!("Socket server error: {}", e);
        }
    });

    // Web transport: axum
    let http_handle = tokio::spawn(async move {
        if let Err(e) = start_http_server(http_addr).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    tracing::info!("Datastar hello ready!");
    tracing::info!("   Page:   http://localhost:{}/", http_addr.port());
    tracing::info!("");
    tracing::info!("Try these commands:");
    tracing::info!(
        "   curl 'http://localhost:{}/merge?datastar=%7B%22foo%22%3A%22World%22%7D'",
        http_addr.port()
    );
    tracing::info!(
        "   curl 'http://localhost:{}/merge?datastar=%7B%22foo%22%3A%22World%22%7D'",
        socket_addr.port()
    );

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        _ = socket_handle => {
            tracing::warn!("Socket server stopped");
        }
        _ = http_handle => {
            tracing::warn!("HTTP server stopped");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn env_addr(var: &str, default: &str) -> anyhow::Result<SocketAddr> {
    let value = std::env::var(var).unwrap_or_else(|_| default.to_string());
    value
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid {var} {value:?}: {e}"))
}

/// Start the axum server
async fn start_http_server(addr: SocketAddr) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/merge", get(merge_handler).post(merge_handler))
        .route("/clock", get(clock_handler))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

fn greeting_name(signals: &Signals) -> String {
    signals
        .get("foo")
        .and_then(Value::as_str)
        .unwrap_or("World")
        .to_string()
}

fn merge_hello<G: ServerSentEventGenerator>(sse: &G, name: &str) -> Result<(), BoxError> {
    sse.patch_elements(
        &format!("<div id=\"toMerge\">Hello {name}</div>"),
        &PatchElementsOptions::default(),
    )?;
    Ok(())
}

/// Greet whoever is in the `foo` signal.
async fn merge_handler(version: Version, ReadSignals(signals): ReadSignals<Signals>) -> Response {
    let name = greeting_name(&signals);
    datastar_web::stream(
        version,
        move |sse: WebGenerator| async move { merge_hello(&sse, &name) },
        StreamOptions::new(),
    )
}

/// Push the server time once a second until the client goes away.
async fn clock_handler(version: Version) -> Response {
    datastar_web::stream(
        version,
        tick_clock,
        StreamOptions::new()
            .with_keepalive(true)
            .on_abort(|| async {
                tracing::info!("Clock client disconnected");
            }),
    )
}

async fn tick_clock(sse: WebGenerator) -> Result<(), BoxError> {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    loop {
        ticker.tick().await;
        let now = chrono::Local::now().format("%H:%M:%S").to_string();
        sse.patch_signals_json(
            &serde_json::json!({ "time": now }),
            &PatchSignalsOptions::default(),
        )?;
    }
}
