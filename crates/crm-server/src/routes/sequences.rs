use axum::extract::State;
use axum::Json;
use crm_core::sequence::{self, Sequence, SequenceStep};
use crm_core::store::RecordStore;
use serde::Serialize;

use super::with_workspace;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct SequenceView {
    #[serde(flatten)]
    pub sequence: Sequence,
    pub steps: Vec<SequenceStep>,
}

/// GET /api/sequences: the owner's sequences, each with its ordered steps.
pub async fn list_sequences(
    State(app): State<AppState>,
) -> Result<Json<Vec<SequenceView>>, AppError> {
    let views = with_workspace(&app, |ws| {
        let sequences: Vec<Sequence> = ws.store.fetch_all(Some(ws.owner.as_str()))?;
        let steps: Vec<SequenceStep> = ws.store.fetch_all(None)?;
        Ok(sequences
            .into_iter()
            .map(|s| SequenceView {
                steps: sequence::steps_for(&steps, s.id).into_iter().cloned().collect(),
                sequence: s,
            })
            .collect())
    })
    .await?;
    Ok(Json(views))
}
