use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::controller::snapshot::{LinkReport, MetricsSnapshot};
use crate::controller::{ControllerError, FailoverOutcome};
use crate::kpi::{KpiReport, KpiThresholds};
use crate::link::LinkStatus;

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
    pub active_link: Option<String>,
    pub monitor_running: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KpiStatus {
    pub thresholds: KpiThresholds,
    pub report: KpiReport,
    pub all_met: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FailoverRequest {
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OverrideRequest {
    /// `None` clears the override.
    pub status: Option<LinkStatus>,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let controller = &state.controller;
    let active = controller.active();
    let status = match &active {
        None => "initializing",
        Some(_) if controller.is_degraded() => "degraded",
        Some(_) => "operational",
    };

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: status.to_string(),
        active_link: active.map(|l| l.name().to_string()),
        monitor_running: controller.is_running().await,
    })
}

pub async fn get_metrics(State(state): State<AdminState>) -> Json<MetricsSnapshot> {
    Json(state.controller.metrics())
}

pub async fn get_kpis(State(state): State<AdminState>) -> Json<KpiStatus> {
    let report = state.controller.validate_kpis(&state.thresholds);
    Json(KpiStatus {
        thresholds: state.thresholds.clone(),
        report,
        all_met: report.all_met(),
    })
}

pub async fn post_failover(
    State(state): State<AdminState>,
    Json(request): Json<FailoverRequest>,
) -> Result<Json<FailoverOutcome>, (StatusCode, String)> {
    match state.controller.failover(request.target.as_deref()).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e @ ControllerError::UnknownLink(_)) => Err((StatusCode::NOT_FOUND, e.to_string())),
        Err(e) => Err((StatusCode::CONFLICT, e.to_string())),
    }
}

pub async fn put_override(
    State(state): State<AdminState>,
    Path(name): Path<String>,
    Json(request): Json<OverrideRequest>,
) -> Result<Json<LinkReport>, StatusCode> {
    let controller = &state.controller;
    let link = controller.link(&name).ok_or(StatusCode::NOT_FOUND)?;

    match request.status {
        Some(status) => link.force_status(status),
        None => link.clear_override(),
    }

    let is_active = controller
        .active()
        .is_some_and(|active| active.name() == link.name());
    Ok(Json(LinkReport::from_link(link, is_active)))
}
