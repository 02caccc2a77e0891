use thiserror::Error;

use crate::{help::catalog::LabelFamily, moderation::checks::AuthorizationDenial};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    AuthorizationDenied(#[from] AuthorizationDenial),
    #[error("`{name}` is not a known {family} label")]
    UnknownLabel { family: LabelFamily, name: String },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Failures that came from a collaborator and may succeed when triggered again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Integration(_))
    }

    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::Denied { correlation_id: id, .. }
            | InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("denied: {message}")]
    Denied { message: String, correlation_id: String },
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    /// Text that is safe to show to the invoking user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Denied { message, .. } => message.clone(),
            Self::BadRequest { message, .. } => {
                format!("The request could not be processed: {message}")
            }
            Self::ServiceUnavailable { .. } => {
                "The chat platform or database is temporarily unavailable. Please retry shortly."
                    .to_owned()
            }
            Self::Internal { .. } => {
                "The bot is misconfigured for this server. Please inform an administrator."
                    .to_owned()
            }
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::Denied { correlation_id, .. }
            | Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(DomainError::AuthorizationDenied(denial)) => {
                Self::Denied { message: denial.to_string(), correlation_id }
            }
            ApplicationError::Domain(error @ DomainError::UnknownLabel { .. })
            | ApplicationError::Domain(error @ DomainError::InvariantViolation(_)) => {
                Self::BadRequest { message: error.to_string(), correlation_id }
            }
            ApplicationError::Persistence(message) | ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, correlation_id }
            }
            ApplicationError::Configuration(message) => Self::Internal { message, correlation_id },
        }
    }
}
