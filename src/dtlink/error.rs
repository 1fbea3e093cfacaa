use std::fmt;
use thiserror::Error;

/// Local input problems. Reported immediately; never reach the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Dataset name does not match `^[A-Za-z][A-Za-z0-9_ -]*$`
    InvalidName(String),
    DuplicateName(String),
    /// Removing the dataset would leave the registry empty
    LastDatasetRemaining,
    UnknownDataset(String),
    EmptyTemplate,
    NotEnoughDataRows,
    PasswordMismatch,
    EmptyPassword,
    /// The operation needs a remote copy but the session has none
    NoRemoteCopy,
    ProtectUnavailable,
    InvalidRemoteId(String),
    /// Multi-dataset templates cannot be expressed as an inline link
    NotInlinable,
    NoConflict,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidName(name) => write!(f, "Invalid Data Set Name: '{}'", name),
            ValidationError::DuplicateName(name) => {
                write!(f, "Data Set '{}' already exists", name)
            }
            ValidationError::LastDatasetRemaining => {
                write!(f, "Cannot remove the last remaining Data Set")
            }
            ValidationError::UnknownDataset(name) => write!(f, "No Data Set named '{}'", name),
            ValidationError::EmptyTemplate => write!(f, "No Template"),
            ValidationError::NotEnoughDataRows => write!(f, "Not Enough Data Rows"),
            ValidationError::PasswordMismatch => write!(f, "Password Verification Failed"),
            ValidationError::EmptyPassword => write!(f, "Invalid Password"),
            ValidationError::NoRemoteCopy => write!(f, "No Link to Update"),
            ValidationError::ProtectUnavailable => {
                write!(f, "Protection can only be set on a DataTemplate you can modify")
            }
            ValidationError::InvalidRemoteId(id) => write!(f, "Invalid link id: '{}'", id),
            ValidationError::NotInlinable => {
                write!(f, "Only a single Default Data Set can be shared as an inline link")
            }
            ValidationError::NoConflict => write!(f, "There is no conflict to resolve"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Text could not be encoded or decoded. The operation is aborted with prior state intact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// Structurally invalid payload (bad JSON/YAML, wrong shape, bad dataset names)
    Malformed(String),
    /// A field was not valid base64 or not valid UTF-8
    BadEncoding(String),
}

impl fmt::Display for EncodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingError::Malformed(detail) => write!(f, "Malformed DataTemplate: {}", detail),
            EncodingError::BadEncoding(detail) => {
                write!(f, "Invalid Character Encoding in DataTemplate: {}", detail)
            }
        }
    }
}

impl std::error::Error for EncodingError {}

#[derive(Error, Debug)]
pub enum DtError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Encoding(#[from] EncodingError),

    #[error("401 Unauthorized: a password is required")]
    Unauthorized,

    #[error("403 Forbidden: the password was rejected")]
    Forbidden,

    #[error("Remote DataTemplate is a Later Revision (local revision {local_revision})")]
    Conflict { local_revision: u64 },

    #[error("HTTP ERROR 404: DataTemplate '{0}' Not Found")]
    NotFound(String),

    #[error("HTTP ERROR {status}: {reason}")]
    Http { status: u16, reason: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),
}

impl DtError {
    /// True for errors produced by a remote exchange (HTTP status or transport).
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            DtError::Unauthorized
                | DtError::Forbidden
                | DtError::Conflict { .. }
                | DtError::NotFound(_)
                | DtError::Http { .. }
                | DtError::Transport(_)
        )
    }

    /// True for errors the server used to deny access (401/403).
    pub fn is_access_denied(&self) -> bool {
        matches!(self, DtError::Unauthorized | DtError::Forbidden)
    }
}

pub type Result<T> = std::result::Result<T, DtError>;
