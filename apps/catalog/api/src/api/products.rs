//! Products routes

use axum::Router;
use domain_products::{handlers, pages, PgProductRepository, ProductService};
use tower_http::services::ServeDir;

use crate::state::AppState;

fn service(state: &AppState) -> ProductService<PgProductRepository> {
    ProductService::new(PgProductRepository::new(state.db.clone()))
}

/// JSON API router
pub fn router(state: &AppState) -> Router {
    handlers::router(service(state))
}

/// Page router with `/uploads` served from the storage directory
pub fn pages(state: &AppState) -> Router {
    pages::router(service(state), state.storage.clone())
        .nest_service("/uploads", ServeDir::new(state.storage.root()))
}
