use thiserror::Error;

use crate::domain::section::WorkflowVariant;
use crate::domain::vendor::VendorId;

/// Failure reported by the persistence collaborator, carried through unchanged.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct PersistenceError(pub String);

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("unknown vendor `{vendor_id}`")]
    UnknownVendor { vendor_id: VendorId },
    #[error("unknown section `{section}` for {variant} workflow")]
    UnknownSection { section: String, variant: WorkflowVariant },
    #[error("invalid approval state `{state}` (expected pending|under_review|approved|rejected)")]
    InvalidState { state: String },
    #[error("reviewer note is {length} characters, limit is {max_length}")]
    InvalidNote { length: usize, max_length: usize },
    #[error("persistence failure: {0}")]
    PersistenceFailure(#[from] PersistenceError),
}

impl WorkflowError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::UnknownVendor { .. } => "unknown_vendor",
            Self::UnknownSection { .. } => "unknown_section",
            Self::InvalidState { .. } => "invalid_state",
            Self::InvalidNote { .. } => "invalid_note",
            Self::PersistenceFailure(_) => "persistence_failure",
        }
    }

    /// Validation errors mean "fix your input"; only persistence failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PersistenceFailure(_))
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The review update could not be applied. Check the vendor, section, and state."
            }
            Self::ServiceUnavailable { .. } => {
                "The review update may not have been saved. Reload the vendor and retry."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Workflow(error @ WorkflowError::UnknownVendor { .. })
            | ApplicationError::Workflow(error @ WorkflowError::UnknownSection { .. })
            | ApplicationError::Workflow(error @ WorkflowError::InvalidState { .. })
            | ApplicationError::Workflow(error @ WorkflowError::InvalidNote { .. }) => {
                Self::BadRequest {
                    message: error.to_string(),
                    correlation_id: "unassigned".to_owned(),
                }
            }
            ApplicationError::Workflow(WorkflowError::PersistenceFailure(error)) => {
                Self::ServiceUnavailable {
                    message: error.0,
                    correlation_id: "unassigned".to_owned(),
                }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}
