use crate::domain::application::{ApplicationId, ApplicationStatus};
use crate::domain::entity::EntityKind;
use crate::domain::journal::ApprovalStep;
use crate::domain::plan::PlanId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnrollmentError {
    #[error("Plan not found: {0}")]
    PlanNotFound(PlanId),
    #[error("Cannot move application from {from} to {to}")]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    #[error("Approval of application {0} is already under way")]
    ApprovalInProgress(ApplicationId),
    #[error("Review action unavailable: {0}")]
    ReviewUnavailable(String),
    #[error("{kind} record not found: {id}")]
    NotFound { kind: EntityKind, id: String },
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Upload error: {0}")]
    UploadError(String),
    #[error("Store error: {0}")]
    StoreError(String),
    #[error("Approval step '{step}' failed: {source}")]
    StepFailed {
        step: ApprovalStep,
        #[source]
        source: Box<EnrollmentError>,
    },
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl EnrollmentError {
    /// The approval step that failed, if the error came out of the approval sequence.
    pub fn failed_step(&self) -> Option<ApprovalStep> {
        match self {
            EnrollmentError::StepFailed { step, .. } => Some(*step),
            _ => None,
        }
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for EnrollmentError {
    fn from(err: rocksdb::Error) -> Self {
        EnrollmentError::InternalError(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, EnrollmentError>;
