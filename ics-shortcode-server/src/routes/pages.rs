//! Content rendering endpoints

use axum::{Router, extract::State, response::Html, routing::{get, post}};

use crate::routes::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/render", post(render))
        .route("/health", get(health))
}

/// POST /render - Expand calendar shortcodes in the request body
async fn render(State(state): State<AppState>, content: String) -> Result<Html<String>, AppError> {
    let html = state.renderer.render_content(&content)?;
    Ok(Html(html))
}

/// GET /health - Liveness check
async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};

    use crate::routes::test_support::{get, send, state};

    fn post_render(content: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/render")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from(content.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_render_expands_shortcode() {
        let state = state();
        let content = r#"<p>[calendar start="31.12.2014 22:00" end="01.01.2015 05:00" title="Party"]</p>"#;

        let (response, body) = send(&state, post_render(content)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body,
            "<p><a href=\"/download/entry.ics?id=1\" class=\"calendar\">Add to calendar</a></p>"
        );
    }

    #[tokio::test]
    async fn test_render_then_follow_link() {
        let state = state();
        let content = r#"[calendar start="31.12.2014 22:00" end="01.01.2015 05:00" title="Party"]"#;
        send(&state, post_render(content)).await;

        let (response, body) = send(&state, get("/download/entry.ics?id=1")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body.contains("DTSTART:20141231T210000Z\r\n"), "{}", body);
        assert!(body.contains("DTEND:20150101T040000Z\r\n"), "{}", body);
    }

    #[tokio::test]
    async fn test_render_warning_is_inline() {
        let state = state();
        let content = r#"before [calendar start="not-a-date" end="01.01.2015 05:00" title="x"] after"#;

        let (response, body) = send(&state, post_render(content)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body.starts_with("before Calendar Shortcode: Parameter \"start\""), "{}", body);
        assert!(body.ends_with(" after"), "{}", body);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let (response, _) = send(&state(), get("/nope")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
