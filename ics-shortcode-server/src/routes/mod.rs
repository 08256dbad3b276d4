pub mod download;
pub mod pages;

use axum::{
    Json, Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::state::AppState;

/// Build the application router.
///
/// The download interceptor sits in front of every route, including the
/// fallback, and only answers requests for stored events.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(pages::router())
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            download::serve_downloads,
        ))
        .with_state(state)
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}

/// Standard API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Convert anyhow errors to HTTP responses
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "request_failed");
        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
