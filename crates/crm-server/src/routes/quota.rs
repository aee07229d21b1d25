use axum::extract::{Query, State};
use axum::Json;
use crm_core::actions::{self, QuotaReport};
use crm_core::quota::ForecastScope;
use serde::Deserialize;

use super::with_workspace;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct QuotaParams {
    pub scope: Option<String>,
}

/// GET /api/quota?scope=mine|team: commit, best case and funnel against quota.
pub async fn get_quota(
    State(app): State<AppState>,
    Query(params): Query<QuotaParams>,
) -> Result<Json<QuotaReport>, AppError> {
    let scope: ForecastScope = match params.scope.as_deref() {
        Some(s) => s.parse()?,
        None => ForecastScope::Mine,
    };
    let report = with_workspace(&app, move |ws| {
        actions::quota_report(&ws.store, &ws.config, scope, &ws.now)
    })
    .await?;
    Ok(Json(report))
}
