use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Boxed cause attached to internal failures for diagnostics
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum KernelError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Parent directory not found: {0}")]
    ParentNotFound(String),

    #[error("Directory not empty: {0}")]
    DirectoryNotEmpty(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Is a directory: {0}")]
    IsADirectory(String),

    #[error("Syntax error: {0}")]
    SyntaxError(String),

    #[error("Malformed intent: {0}")]
    MalformedIntent(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Inference bridge unavailable: {0}")]
    BridgeUnavailable(String),

    #[error("Rename failed: {0}")]
    RenameFailed(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Internal error: {message}")]
    InternalError {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

/// The error taxonomy surfaced to presenters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    ParentNotFound,
    DirectoryNotEmpty,
    SyntaxError,
    MalformedIntent,
    UnknownAction,
    InvalidParams,
    BridgeUnavailable,
    RenameFailed,
    InternalError,
}

impl ErrorKind {
    /// Wire name, identical to the serialized form
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::AlreadyExists => "ALREADY_EXISTS",
            ErrorKind::ParentNotFound => "PARENT_NOT_FOUND",
            ErrorKind::DirectoryNotEmpty => "DIRECTORY_NOT_EMPTY",
            ErrorKind::SyntaxError => "SYNTAX_ERROR",
            ErrorKind::MalformedIntent => "MALFORMED_INTENT",
            ErrorKind::UnknownAction => "UNKNOWN_ACTION",
            ErrorKind::InvalidParams => "INVALID_PARAMS",
            ErrorKind::BridgeUnavailable => "BRIDGE_UNAVAILABLE",
            ErrorKind::RenameFailed => "RENAME_FAILED",
            ErrorKind::InternalError => "INTERNAL_ERROR",
        }
    }

    pub const ALL: [ErrorKind; 11] = [
        ErrorKind::NotFound,
        ErrorKind::AlreadyExists,
        ErrorKind::ParentNotFound,
        ErrorKind::DirectoryNotEmpty,
        ErrorKind::SyntaxError,
        ErrorKind::MalformedIntent,
        ErrorKind::UnknownAction,
        ErrorKind::InvalidParams,
        ErrorKind::BridgeUnavailable,
        ErrorKind::RenameFailed,
        ErrorKind::InternalError,
    ];
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl KernelError {
    /// Internal failure without an underlying cause
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
            source: None,
        }
    }

    /// Internal failure wrapping the original cause
    pub fn internal_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::InternalError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Project onto the presentation taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::ParentNotFound(_) => ErrorKind::ParentNotFound,
            Self::DirectoryNotEmpty(_) => ErrorKind::DirectoryNotEmpty,
            Self::NotADirectory(_) | Self::IsADirectory(_) | Self::AuthFailed(_) => {
                ErrorKind::InvalidParams
            }
            Self::SyntaxError(_) => ErrorKind::SyntaxError,
            Self::MalformedIntent(_) => ErrorKind::MalformedIntent,
            Self::UnknownAction(_) => ErrorKind::UnknownAction,
            Self::InvalidParams(_) => ErrorKind::InvalidParams,
            Self::BridgeUnavailable(_) => ErrorKind::BridgeUnavailable,
            Self::RenameFailed(_) => ErrorKind::RenameFailed,
            Self::InternalError { .. } | Self::Config(_) | Self::IoError(_) | Self::SerdeError(_) => {
                ErrorKind::InternalError
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, KernelError>;
