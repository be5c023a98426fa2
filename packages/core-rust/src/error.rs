//! Error types shared by the engines and their collaborators.

use crate::field::DescriptorError;
use crate::navigation::Route;

/// Failure of one backend call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The session is gone; the token was evicted and the user must log in.
    #[error("not authenticated, redirecting to {redirect}")]
    Unauthorized { redirect: String },
    /// The backend answered with a non-success status.
    #[error("server responded with {status}: {message}")]
    Status { status: u16, message: String },
    /// The request never produced a response (connect, timeout, TLS).
    #[error("request failed: {0}")]
    Transport(String),
    /// The response body was not the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// Message suitable for a notification, preferring the server's own text.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Status { message, .. } if !message.trim().is_empty() => message.clone(),
            Self::Unauthorized { .. } => {
                "Your session has expired. Please log in again.".to_string()
            }
            _ => fallback.to_string(),
        }
    }
}

/// Errors from the dynamic form engine.
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    /// Required fields are missing; nothing was sent.
    #[error("required fields missing: {}", fields.join(", "))]
    Validation { fields: Vec<String> },
    /// A submission or load is already in flight.
    #[error("form is busy")]
    Busy,
    #[error("unknown field: {name}")]
    UnknownField { name: String },
    #[error("field {name} does not accept files")]
    NotAFileField { name: String },
    /// The edited record could not be fetched; the form is unusable.
    #[error("failed to load record, returning to {}", redirect.path())]
    Load {
        redirect: Route,
        #[source]
        source: ApiError,
    },
    /// The create/update call failed; edits are kept.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl FormError {
    /// Route the UI should leave for, if this error ends the form.
    #[must_use]
    pub fn redirect(&self) -> Option<Route> {
        match self {
            Self::Load { redirect, .. } => Some(redirect.clone()),
            Self::Api(ApiError::Unauthorized { .. }) => Some(Route::Login),
            _ => None,
        }
    }
}

/// Errors from the dynamic list engine.
#[derive(Debug, thiserror::Error)]
pub enum ListError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    #[error("list is busy")]
    Busy,
    #[error("item has no id")]
    MissingId,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Errors from resolving a module path segment.
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error("no module matches {segment:?}")]
    NotFound { segment: String },
    #[error("module {module} has invalid fields: {source}")]
    InvalidFields {
        module: String,
        #[source]
        source: DescriptorError,
    },
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    List(#[from] ListError),
}
