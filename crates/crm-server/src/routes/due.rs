use axum::extract::State;
use axum::Json;
use crm_core::enrollment::DueItem;
use crm_core::sequence;
use serde::Serialize;

use super::with_workspace;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct DueRow {
    #[serde(flatten)]
    pub item: DueItem,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub action: &'static str,
    /// Step message with `{{firstName}}` filled in.
    pub message: Option<String>,
}

/// GET /api/due: steps due today or earlier, oldest first.
pub async fn get_due(State(app): State<AppState>) -> Result<Json<Vec<DueRow>>, AppError> {
    let rows = with_workspace(&app, |ws| {
        let snap = crm_core::snapshot::Snapshot::load(&ws.store, &ws.owner)?;
        let rows = snap
            .due_steps(&ws.now)
            .into_iter()
            .map(|item| {
                let contact = snap.contact(item.contact_id);
                let action = item
                    .step
                    .as_ref()
                    .map_or("complete", |s| s.action_hint(contact));
                let message = match (&item.step, contact) {
                    (Some(step), Some(c)) => Some(sequence::personalize(&step.message, c)),
                    (Some(step), None) => Some(step.message.clone()),
                    _ => None,
                };
                DueRow {
                    contact_name: contact.map(|c| c.full_name()),
                    contact_email: contact.and_then(|c| c.email_address()).map(str::to_string),
                    action,
                    message,
                    item,
                }
            })
            .collect();
        Ok(rows)
    })
    .await?;
    Ok(Json(rows))
}
