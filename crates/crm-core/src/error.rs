use crate::store::Table;
use crate::types::RecordId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrmError {
    #[error("not initialized: run 'crm init'")]
    NotInitialized,

    #[error("contact {contact_id} is already active in sequence {sequence_id}; remove them first")]
    AlreadyEnrolled {
        contact_id: RecordId,
        sequence_id: RecordId,
    },

    #[error("sequence {0} has no steps")]
    EmptySequence(RecordId),

    #[error("step {step_number} not found in sequence {sequence_id}")]
    StepNotFound {
        sequence_id: RecordId,
        step_number: u32,
    },

    #[error("invalid transition from {from} to {to}: {reason}")]
    InvalidTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("{table} record not found: {id}")]
    NotFound { table: Table, id: RecordId },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("invalid deal stage: {0}")]
    InvalidStage(String),

    #[error("store error on {table}: {message}")]
    Store { table: Table, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CrmError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CrmError::Validation(msg.into())
    }

    pub fn store(table: Table, err: impl std::fmt::Display) -> Self {
        CrmError::Store {
            table,
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CrmError>;
