use axum::extract::State;
use axum::Json;
use crm_core::deal::{self, Deal};
use crm_core::store::RecordStore;
use crm_core::types::DealStage;
use serde::Serialize;

use super::with_workspace;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct StageCount {
    pub stage: DealStage,
    pub count: usize,
}

#[derive(Serialize)]
pub struct DealsView {
    pub deals: Vec<Deal>,
    pub open_by_stage: Vec<StageCount>,
}

/// GET /api/deals: the owner's deals plus open-pipeline counts per stage.
pub async fn list_deals(State(app): State<AppState>) -> Result<Json<DealsView>, AppError> {
    let view = with_workspace(&app, |ws| {
        let deals: Vec<Deal> = ws.store.fetch_all(Some(ws.owner.as_str()))?;
        let open_by_stage = deal::open_deals_by_stage(&deals)
            .into_iter()
            .map(|(stage, count)| StageCount { stage, count })
            .collect();
        Ok(DealsView {
            deals,
            open_by_stage,
        })
    })
    .await?;
    Ok(Json(view))
}
