//! Thin HTTP layer over [`LoadService`].

use std::{convert::Infallible, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    Router,
    body::{Body, Bytes},
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use meteotunes_core::{
    Assembled, Config, FanOutObserver, LoadService, NoopObserver, WeatherSnapshot, response,
};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::{StreamExt, wrappers::UnboundedReceiverStream};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{debug, info, warn};

#[derive(Clone)]
struct AppState {
    service: Arc<LoadService>,
}

pub fn router(service: LoadService, request_timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/home", get(home))
        .route("/load", post(load))
        .route("/load/stream", post(load_stream))
        .layer(TimeoutLayer::with_status_code(StatusCode::GATEWAY_TIMEOUT, request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { service: Arc::new(service) })
}

pub async fn run(config: &Config) -> anyhow::Result<()> {
    config.validate()?;
    let service = LoadService::from_config(config)?;
    let app = router(service, Duration::from_secs(config.server.request_timeout_secs));

    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("meteotunes listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutting down");
}

async fn home() -> Json<serde_json::Value> {
    Json(json!({ "message": "welcome to meteotunes" }))
}

async fn load(State(state): State<AppState>, body: Bytes) -> Response {
    let out = state.service.load(&body, &NoopObserver).await;
    into_response(out)
}

fn into_response(out: Assembled) -> Response {
    (out.status, Json(out.body)).into_response()
}

/// Forwards the weather-ready event into the response stream.
struct StreamObserver {
    tx: mpsc::UnboundedSender<Assembled>,
}

impl FanOutObserver for StreamObserver {
    fn weather_ready(&self, weather: &WeatherSnapshot) {
        if self.tx.send(response::weather_ready(weather)).is_err() {
            debug!("stream receiver gone before weather frame");
        }
    }
}

/// Newline-delimited JSON: a 206 weather frame followed by the final frame.
/// Requests that fail before weather is known get a plain error response.
async fn load_stream(State(state): State<AppState>, body: Bytes) -> Response {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let service = Arc::clone(&state.service);
    tokio::spawn(async move {
        let observer = StreamObserver { tx: tx.clone() };
        tokio::select! {
            out = service.load(&body, &observer) => {
                if tx.send(out).is_err() {
                    debug!("stream receiver gone before final frame");
                }
            }
            _ = tx.closed() => debug!("client disconnected, load abandoned"),
        }
    });

    let Some(first) = rx.recv().await else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "interrupted", "message": "load ended without a response" })),
        )
            .into_response();
    };

    if first.status != StatusCode::PARTIAL_CONTENT {
        return into_response(first);
    }

    let frames = tokio_stream::once(first)
        .chain(UnboundedReceiverStream::new(rx))
        .map(|frame| Ok::<_, Infallible>(ndjson_line(&frame)));

    (
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(frames),
    )
        .into_response()
}

fn ndjson_line(frame: &Assembled) -> Bytes {
    match serde_json::to_vec(frame) {
        Ok(mut line) => {
            line.push(b'\n');
            Bytes::from(line)
        }
        Err(e) => {
            warn!(error = %e, "failed to serialise stream frame");
            Bytes::from_static(b"{\"status\":500,\"error\":\"serialization_failed\"}\n")
        }
    }
}
