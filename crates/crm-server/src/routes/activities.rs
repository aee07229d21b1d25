use axum::extract::State;
use axum::Json;
use crm_core::activity::{self, Activity};
use crm_core::store::RecordStore;

use super::with_workspace;
use crate::error::AppError;
use crate::state::AppState;

/// GET /api/activities/recent: newest activities first.
pub async fn recent(State(app): State<AppState>) -> Result<Json<Vec<Activity>>, AppError> {
    let recent = with_workspace(&app, |ws| {
        let all: Vec<Activity> = ws.store.fetch_all(Some(ws.owner.as_str()))?;
        let limit = ws.config.dashboard.recent_activity_limit;
        Ok(activity::recent_activities(&all, limit)
            .into_iter()
            .cloned()
            .collect())
    })
    .await?;
    Ok(Json(recent))
}
