pub mod activities;
pub mod deals;
pub mod due;
pub mod enrollments;
pub mod quota;
pub mod sequences;

use crate::error::AppError;
use crate::state::{AppState, Workspace};
use std::sync::PoisonError;

/// Open the workspace and run `f` on the blocking pool. Store access is
/// synchronous file I/O and must stay off the async workers.
pub(crate) async fn with_workspace<T, F>(app: &AppState, f: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(Workspace) -> crm_core::Result<T> + Send + 'static,
{
    let app = app.clone();
    let result = tokio::task::spawn_blocking(move || f(app.open()?))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(result)
}

/// Like [`with_workspace`], but holds the state's write lock for the whole
/// load, check and persist sequence.
pub(crate) async fn with_workspace_mut<T, F>(app: &AppState, f: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(Workspace) -> crm_core::Result<T> + Send + 'static,
{
    let app = app.clone();
    let result = tokio::task::spawn_blocking(move || {
        let _guard = app.writes.lock().unwrap_or_else(PoisonError::into_inner);
        f(app.open()?)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(result)
}
