//! API routes module

pub mod health;
pub mod products;

use axum::Router;

use crate::state::AppState;

/// JSON API routes without the `/api` prefix; `create_router` adds it.
pub fn routes(state: &AppState) -> Router {
    Router::new().nest("/products", products::router(state))
}

/// Page routes plus the uploaded images, mounted at the root
pub fn pages(state: &AppState) -> Router {
    products::pages(state)
}

/// `/ready` with real dependency checks, merged next to `/health`
pub fn ready_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/ready", get(health::ready_handler))
        .with_state(state)
}
