use shared::error::{code_resource, ApiErrorBody, ErrorKind};
use thiserror::Error;

/// Failure of a remote call. Cloneable so one in-flight result can be handed
/// to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind:?}: {message}")]
pub struct RemoteError {
    pub kind: ErrorKind,
    /// Raw wire code, when the API sent one.
    pub code: Option<String>,
    pub message: String,
    /// HTTP status, absent for transport-level failures.
    pub status: Option<u16>,
}

impl RemoteError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
            status: None,
        }
    }

    pub fn from_body(status: u16, body: ApiErrorBody) -> Self {
        Self {
            kind: body.kind(),
            code: Some(body.code),
            message: body.message,
            status: Some(status),
        }
    }

    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::from_status(status),
            code: None,
            message: message.into(),
            status: Some(status),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }

    pub fn malformed(source: serde_json::Error) -> Self {
        Self::new(
            ErrorKind::Unknown,
            format!("malformed payload from server: {source}"),
        )
    }

    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    /// Resource named by the wire code, e.g. `SOCIAL` for `SOCIAL_ALREADY_EXISTS`.
    pub fn resource(&self) -> Option<&str> {
        self.code.as_deref().and_then(code_resource)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Error for operations that validate input before reaching the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("invalid input: {}", join_messages(.0))]
    Validation(Vec<ValidationError>),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl ClientError {
    pub fn remote_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Remote(err) => Some(err.kind),
            Self::Validation(_) => None,
        }
    }
}

impl From<Vec<ValidationError>> for ClientError {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self::Validation(errors)
    }
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
