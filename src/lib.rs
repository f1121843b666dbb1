pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod service;
pub mod state;
pub mod store;

use axum::{routing::get, Router};
use state::AppState;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

pub fn app(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/events",
            get(handlers::list_events).post(handlers::create_event_handler),
        )
        .route(
            "/api/events/{id}",
            get(handlers::get_event_details)
                .patch(handlers::update_event_handler)
                .delete(handlers::delete_event_handler),
        )
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(app_state)
}
