use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, Response, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::state::ServerState;
use crate::pipeline::CardPipeline;
use crate::providers::Provider;

pub fn router<P: Provider + 'static>(pipeline: CardPipeline<P>) -> Router {
    let state = Arc::new(ServerState { pipeline });
    Router::new()
        .route("/", get(card::<P>))
        .route("/card.png", get(card::<P>))
        .route("/health", get(health))
        .with_state(state)
}

pub async fn run_server<P: Provider + 'static>(
    pipeline: CardPipeline<P>,
    addr: String,
) -> Result<()> {
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind server address: {}", addr))?;
    serve(listener, pipeline).await
}

/// Serves on an already bound listener.
pub async fn serve<P: Provider + 'static>(
    listener: TcpListener,
    pipeline: CardPipeline<P>,
) -> Result<()> {
    if let Ok(local) = listener.local_addr() {
        info!("card server listening on http://{}", local);
    }
    axum::serve(listener, router(pipeline)).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn card<P: Provider + 'static>(State(state): State<Arc<ServerState<P>>>) -> Response<Body> {
    match state.pipeline.generate().await {
        Ok(card) => png_response(card.png),
        Err(err) => {
            error!("card request failed: {:#}", err);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {:#}", err))
        }
    }
}

fn png_response(bytes: Vec<u8>) -> Response<Body> {
    let mut response = Response::new(Body::from(bytes));
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn error_response(status: StatusCode, message: String) -> Response<Body> {
    let mut response = Response::new(Body::from(message));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
