use axum::extract::{Path, State};
use axum::Json;
use crm_core::actions::{self, CompletedStep};
use crm_core::enrollment::{self, ContactSequence, SequenceProgress};
use crm_core::store::RecordStore;
use crm_core::types::RecordId;
use serde::{Deserialize, Serialize};

use super::{with_workspace, with_workspace_mut};
use crate::error::AppError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct EnrollmentView {
    #[serde(flatten)]
    pub enrollment: ContactSequence,
    pub progress: SequenceProgress,
}

/// GET /api/enrollments: the session owner's enrollments with progress.
pub async fn list_enrollments(
    State(app): State<AppState>,
) -> Result<Json<Vec<EnrollmentView>>, AppError> {
    let views = with_workspace(&app, |ws| {
        let enrollments: Vec<ContactSequence> = ws.store.fetch_all(Some(ws.owner.as_str()))?;
        let steps: Vec<crm_core::sequence::SequenceStep> = ws.store.fetch_all(None)?;
        Ok(enrollments
            .into_iter()
            .map(|e| EnrollmentView {
                progress: enrollment::progress(&e, &steps),
                enrollment: e,
            })
            .collect())
    })
    .await?;
    Ok(Json(views))
}

#[derive(Deserialize)]
pub struct AssignBody {
    pub contact_id: RecordId,
    pub sequence_id: RecordId,
}

/// POST /api/enrollments: enroll a contact in a sequence.
pub async fn assign(
    State(app): State<AppState>,
    Json(body): Json<AssignBody>,
) -> Result<Json<ContactSequence>, AppError> {
    let created = with_workspace_mut(&app, move |mut ws| {
        actions::assign(
            &mut ws.store,
            &ws.owner,
            body.contact_id,
            body.sequence_id,
            &ws.now,
        )
    })
    .await?;
    Ok(Json(created))
}

/// POST /api/enrollments/{id}/complete: complete the current step.
pub async fn complete(
    State(app): State<AppState>,
    Path(id): Path<RecordId>,
) -> Result<Json<CompletedStep>, AppError> {
    let done = with_workspace_mut(&app, move |mut ws| {
        actions::complete(&mut ws.store, &ws.owner, id, &ws.now)
    })
    .await?;
    Ok(Json(done))
}

/// POST /api/enrollments/{id}/revisit: step back and make it due today.
pub async fn revisit(
    State(app): State<AppState>,
    Path(id): Path<RecordId>,
) -> Result<Json<ContactSequence>, AppError> {
    let updated = with_workspace_mut(&app, move |mut ws| {
        actions::revisit(&mut ws.store, &ws.owner, id, &ws.now)
    })
    .await?;
    Ok(Json(updated))
}

/// POST /api/enrollments/{id}/remove: take the contact out of the sequence.
pub async fn remove(
    State(app): State<AppState>,
    Path(id): Path<RecordId>,
) -> Result<Json<ContactSequence>, AppError> {
    let updated = with_workspace_mut(&app, move |mut ws| {
        actions::remove(&mut ws.store, &ws.owner, id)
    })
    .await?;
    Ok(Json(updated))
}
