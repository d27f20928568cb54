pub mod admin;
pub mod aggregates;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod model;
pub mod sync;

use crate::config::Config;
use crate::db::Repository;
use crate::orchestration::{ModelService, SyncRunner};
use axum::routing::{get, post};
use axum::{middleware, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
    pub sync: SyncRunner,
    pub model: ModelService,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, config: Config, sync: SyncRunner, model: ModelService) -> Self {
        Self {
            repo,
            config,
            sync,
            model,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/sync", get(sync::run_sync).post(sync::run_sync))
        .route("/api/dashboard", get(dashboard::get_dashboard))
        .route("/api/aggregates", get(aggregates::get_aggregates))
        .route("/api/model", get(model::get_model))
        .route("/api/model/params", post(model::set_param))
        .route(
            "/api/model/overrides",
            post(model::set_override).delete(model::delete_override),
        )
        .route("/api/admin/clear-actions", post(admin::clear_actions))
        .layer(middleware::from_fn(auth::require_auth))
        .layer(cors)
        .with_state(state)
}
