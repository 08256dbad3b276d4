//! Download interceptor for stored calendar events

use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use ics_shortcode_core::{Download, DownloadRequest};

use crate::routes::AppError;
use crate::state::AppState;

/// Answer requests for the download endpoint that name a stored event;
/// everything else goes on to the next handler.
pub async fn serve_downloads(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let download_request = DownloadRequest::from_uri(target);

    match state.renderer.handle_download_request(&download_request)? {
        Some(download) => Ok(download_response(download)),
        None => Ok(next.run(request).await),
    }
}

fn download_response(download: Download) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, Download::CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, download.content_disposition()),
        ],
        download.body,
    )
        .into_response()
}
