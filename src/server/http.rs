use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Json};

use crate::server::AppState;

const INDEX_HTML: &str = include_str!("assets/index.html");
const DASHBOARD_HTML: &str = include_str!("assets/dashboard.html");

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

pub async fn ping() -> impl IntoResponse {
    ([(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")], "ok")
}

/// JSON snapshot via the tick loop's reply channel. 503 if the loop is
/// gone (shutdown in progress).
pub async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    match state.game.stats().await {
        Some(snap) => {
            ([(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")], Json(snap)).into_response()
        }
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}
