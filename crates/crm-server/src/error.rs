use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use crm_core::error::CrmError;

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(CrmError::Validation(msg.into()).into())
    }
}

fn status_for(err: &CrmError) -> StatusCode {
    match err {
        CrmError::NotFound { .. } => StatusCode::NOT_FOUND,
        CrmError::AlreadyEnrolled { .. } => StatusCode::CONFLICT,
        CrmError::InvalidTransition { .. }
        | CrmError::EmptySequence(_)
        | CrmError::StepNotFound { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        CrmError::NotInitialized
        | CrmError::Validation(_)
        | CrmError::InvalidStatus(_)
        | CrmError::InvalidStage(_) => StatusCode::BAD_REQUEST,
        CrmError::Store { .. } | CrmError::Io(_) | CrmError::Yaml(_) | CrmError::Json(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self
            .0
            .downcast_ref::<CrmError>()
            .map_or(StatusCode::INTERNAL_SERVER_ERROR, status_for);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_core::store::Table;

    fn status(err: CrmError) -> StatusCode {
        AppError(err.into()).into_response().status()
    }

    #[test]
    fn not_found_maps_to_404() {
        assert_eq!(
            status(CrmError::NotFound {
                table: Table::ContactSequences,
                id: 7
            }),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn already_enrolled_maps_to_409() {
        assert_eq!(
            status(CrmError::AlreadyEnrolled {
                contact_id: 1,
                sequence_id: 2
            }),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn engine_rejections_map_to_422() {
        assert_eq!(
            status(CrmError::InvalidTransition {
                from: "Completed".into(),
                to: "Active".into(),
                reason: "done".into(),
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status(CrmError::EmptySequence(3)), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            status(CrmError::StepNotFound {
                sequence_id: 3,
                step_number: 9
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn validation_maps_to_400() {
        assert_eq!(status(CrmError::validation("bad")), StatusCode::BAD_REQUEST);
        assert_eq!(status(CrmError::NotInitialized), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::bad_request("nope").into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn store_and_io_map_to_500() {
        assert_eq!(
            status(CrmError::store(Table::Deals, "disk full")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(CrmError::Io(std::io::Error::other("disk full"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn foreign_error_maps_to_500() {
        let err = AppError(anyhow::anyhow!("something unexpected"));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn response_body_is_json() {
        let response = AppError(CrmError::EmptySequence(1).into()).into_response();
        let ct = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .expect("should have content-type");
        assert!(ct.to_str().unwrap().contains("application/json"));
    }
}
