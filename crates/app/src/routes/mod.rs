pub mod chat;
pub mod health;
pub mod sessions;
pub mod upload;

use axum::Router;
use std::sync::Arc;

use crate::app::AppState;

/// Build all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(upload::routes())
        .merge(chat::routes())
        .merge(sessions::routes())
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod testing;
