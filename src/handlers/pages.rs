// Sender/viewer pages and their assets

use crate::AppState;
use axum::extract::State;
use axum::http::header;
use axum::response::{Html, IntoResponse};

const INDEX_HTML: &str = include_str!("../../static/index.html");
const SENDER_HTML: &str = include_str!("../../static/sender.html");
const VIEWER_HTML: &str = include_str!("../../static/viewer.html");
const SENDER_JS: &str = include_str!("../../static/sender.js");
const VIEWER_JS: &str = include_str!("../../static/viewer.js");
const STYLE_CSS: &str = include_str!("../../static/style.css");

/// Placeholder in the scripts that receives the STUN server as a JS string literal
const STUN_PLACEHOLDER: &str = "{{STUN_SERVER}}";

const JAVASCRIPT: &str = "application/javascript; charset=utf-8";

pub async fn index_page() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn sender_page() -> Html<&'static str> {
    Html(SENDER_HTML)
}

pub async fn viewer_page() -> Html<&'static str> {
    Html(VIEWER_HTML)
}

pub async fn sender_js(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, JAVASCRIPT)],
        render_script(SENDER_JS, &state.stun_server),
    )
}

pub async fn viewer_js(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, JAVASCRIPT)],
        render_script(VIEWER_JS, &state.stun_server),
    )
}

pub async fn style_css() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], STYLE_CSS)
}

/// Substitute the STUN server, quoted and escaped for JavaScript
fn render_script(template: &str, stun_server: &str) -> String {
    let literal = serde_json::to_string(stun_server).unwrap_or_else(|_| "\"\"".to_string());
    template.replace(STUN_PLACEHOLDER, &literal)
}
