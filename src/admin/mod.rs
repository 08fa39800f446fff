//! Admin API.
//!
//! Read-only views of the controller plus the two write paths an operator or
//! chaos harness needs: trigger a failover and override a link's probe outcome.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::controller::ResilienceController;
use crate::kpi::KpiThresholds;
use self::auth::admin_auth_middleware;
use self::handlers::*;

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub controller: Arc<ResilienceController>,
    pub thresholds: KpiThresholds,
    pub api_key: Arc<str>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/metrics", get(get_metrics))
        .route("/admin/kpis", get(get_kpis))
        .route("/admin/failover", post(post_failover))
        .route("/admin/links/{name}/override", put(put_override))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
