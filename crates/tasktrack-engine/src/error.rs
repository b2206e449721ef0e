use tasktrack_core::FieldError;
use tasktrack_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),

    /// The mutation gate refused the change.
    #[error("{0}")]
    Validation(String),

    #[error("invalid input: {} field error(s)", .0.len())]
    InvalidFields(Vec<FieldError>),

    #[error("{0}")]
    Conflict(String),

    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            StoreError::Immutable(status) => {
                ServiceError::Validation(format!("Cannot update task with status: {status}"))
            }
            other => ServiceError::Store(other),
        }
    }
}

impl From<FieldError> for ServiceError {
    fn from(e: FieldError) -> Self {
        ServiceError::InvalidFields(vec![e])
    }
}
