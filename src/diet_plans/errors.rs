use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use super::reconcile::ReconcileError;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("{0}")]
    Validation(String),
    #[error("patient not found")]
    PatientNotFound,
    #[error("diet plan not found")]
    NotFound,
    #[error("diet plan belongs to another professional")]
    Unauthorized,
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error(transparent)]
    Transaction(#[from] anyhow::Error),
    #[error("diet plan {0} missing after write")]
    Inconsistent(Uuid),
}

impl PlanError {
    pub fn validation(msg: impl Into<String>) -> Self {
        PlanError::Validation(msg.into())
    }

    /// Ownership mismatches surface as 404 so callers cannot discover plans
    /// of other professionals.
    pub fn status(&self) -> StatusCode {
        match self {
            PlanError::Validation(_) | PlanError::Reconcile(_) => StatusCode::BAD_REQUEST,
            PlanError::PatientNotFound | PlanError::NotFound | PlanError::Unauthorized => {
                StatusCode::NOT_FOUND
            }
            PlanError::Transaction(_) | PlanError::Inconsistent(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to hand back to the client.
    pub fn public_message(&self) -> String {
        match self {
            PlanError::Unauthorized => PlanError::NotFound.to_string(),
            PlanError::Transaction(_) | PlanError::Inconsistent(_) => {
                "internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<PlanError> for (StatusCode, String) {
    fn from(e: PlanError) -> Self {
        (e.status(), e.public_message())
    }
}
