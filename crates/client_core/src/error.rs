use shared::{
    domain::UserId,
    error::{ApiError, ErrorCode},
};
use thiserror::Error;

/// Failure of a single call against the user service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid backend url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("{method} {path} failed: {source}")]
    Transport {
        method: &'static str,
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{method} {path} rejected with status {status}")]
    Rejected {
        method: &'static str,
        path: String,
        status: u16,
    },
    #[error("{method} {path} returned an unreadable body: {source}")]
    Decode {
        method: &'static str,
        path: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ServiceError {
    /// Presentable form of the failure, used for the error banner.
    pub fn api_error(&self) -> ApiError {
        let code = match self {
            Self::Rejected { status, .. } => ErrorCode::from_status(*status),
            Self::Transport { .. } => ErrorCode::Unavailable,
            Self::InvalidBaseUrl { .. } => ErrorCode::Validation,
            Self::Client(_) | Self::Decode { .. } => ErrorCode::Internal,
        };
        ApiError::new(code, self.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("login and logout require a session-aware user service")]
    SessionUnsupported,
    #[error("no user with id {0} in the current list")]
    UnknownUser(UserId),
    #[error("this action requires an admin session")]
    NotAdmin,
    #[error("email of user {0} is not being edited")]
    NotEditing(UserId),
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
pub type ControllerResult<T> = std::result::Result<T, ControllerError>;
