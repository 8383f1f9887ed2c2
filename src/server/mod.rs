pub mod http;
pub mod ws;

use axum::{routing::get, Router};

use crate::game::engine::GameHandle;

#[derive(Clone)]
pub struct AppState {
    pub game: GameHandle,
}

pub fn router(game: GameHandle) -> Router {
    Router::new()
        .route("/", get(http::index))
        .route("/ws", get(ws::ws_handler))
        .route("/stats", get(http::stats))
        .route("/dashboard", get(http::dashboard))
        .route("/ping", get(http::ping))
        .with_state(AppState { game })
}
