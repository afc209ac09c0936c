use axum::response::Html;
use tracing::debug;

/// Static landing page with the upload form.
pub async fn index() -> Html<&'static str> {
    debug!("Index route was accessed");
    Html(include_str!("../../static/index.html"))
}
