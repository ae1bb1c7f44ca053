use serde::{Deserialize, Serialize};

/// Closed set of failure causes callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    AlreadyExists,
    NotAuthenticated,
    NotFound,
    Unknown,
}

impl ErrorKind {
    /// Resolves a wire error code such as `SOCIAL_ALREADY_EXISTS` or
    /// `NOT_AUTHENTICATED`. Resource prefixes are ignored.
    pub fn from_code(code: &str) -> Self {
        let code = code.trim().to_ascii_uppercase();
        if code.ends_with("ALREADY_EXISTS") {
            Self::AlreadyExists
        } else if code.ends_with("NOT_AUTHENTICATED") || code == "UNAUTHORIZED" {
            Self::NotAuthenticated
        } else if code.ends_with("NOT_FOUND") {
            Self::NotFound
        } else {
            Self::Unknown
        }
    }

    /// Fallback used when a response carries no error body.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::NotAuthenticated,
            404 => Self::NotFound,
            409 => Self::AlreadyExists,
            _ => Self::Unknown,
        }
    }
}

/// Error payload returned by the remote API on non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl ApiErrorBody {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::from_code(&self.code)
    }
}

/// Resource prefix of a wire code, e.g. `RESTAURANT` for `RESTAURANT_ALREADY_EXISTS`.
pub fn code_resource(code: &str) -> Option<&str> {
    ["_ALREADY_EXISTS", "_NOT_FOUND"]
        .iter()
        .find_map(|suffix| code.strip_suffix(*suffix))
        .filter(|prefix| !prefix.is_empty())
}
