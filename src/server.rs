//! Local HTTP view of a running tracking screen.

use std::future::Future;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tower_http::cors::{Any, CorsLayer};

use crate::error::{Error, Result};
use crate::screen::ScreenCommand;
use crate::view::TrackingView;

#[derive(Clone)]
struct AppState {
    views: watch::Receiver<TrackingView>,
    commands: mpsc::Sender<ScreenCommand>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, message: &str) -> HandlerError {
    (status, Json(ErrorResponse { error: message.to_string() }))
}

pub fn router(views: watch::Receiver<TrackingView>, commands: mpsc::Sender<ScreenCommand>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/tracking", get(current_view))
        .route("/tracking/center", post(center_on_bus))
        .layer(cors)
        .with_state(AppState { views, commands })
}

/// Serves `router` on `bind` until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error when the address cannot be bound or the server fails.
pub async fn serve<F>(bind: &str, router: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| Error::Config(format!("failed to bind {bind}: {e}")))?;

    tracing::info!("view server running on http://{bind}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::ServerError(e.to_string()))
}

async fn current_view(State(state): State<AppState>) -> Json<TrackingView> {
    let view = state.views.borrow().clone();
    Json(view)
}

async fn center_on_bus(State(state): State<AppState>) -> std::result::Result<Json<TrackingView>, HandlerError> {
    let (reply, centered) = oneshot::channel();
    state
        .commands
        .send(ScreenCommand::CenterOnBus(reply))
        .await
        .map_err(|_| error(StatusCode::SERVICE_UNAVAILABLE, "tracking screen closed"))?;

    if !centered.await.unwrap_or(false) {
        return Err(error(StatusCode::CONFLICT, "no active bus position"));
    }
    let view = state.views.borrow().clone();
    Ok(Json(view))
}
