use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Error code and message reported by Graph or the identity provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderError {
    pub code: String,
    pub message: String,
}

/// Graph wraps every error in `{"error": {"code", "message"}}`
#[derive(Debug, Deserialize)]
struct GraphErrorEnvelope {
    error: GraphErrorBody,
}

#[derive(Debug, Deserialize)]
struct GraphErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl ProviderError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Parse a Graph error body, falling back to the raw text when it is not
    /// the standard envelope.
    pub fn from_graph_body(status: u16, body: &[u8]) -> Self {
        match serde_json::from_slice::<GraphErrorEnvelope>(body) {
            Ok(envelope) => Self::new(envelope.error.code, envelope.error.message),
            Err(_) => Self::new(
                format!("HTTP{status}"),
                String::from_utf8_lossy(body).trim().to_string(),
            ),
        }
    }
}

/// Errors raised while acquiring a token from the identity provider
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token request for tenant '{tenant_id}' rejected with status {status}: {code}: {description}")]
    Rejected {
        tenant_id: String,
        status: u16,
        code: String,
        description: String,
    },
    #[error("Token endpoint unavailable for tenant '{tenant_id}' after {attempts} attempts: {reason}")]
    Unavailable {
        tenant_id: String,
        status: Option<u16>,
        attempts: u32,
        reason: String,
    },
    #[error("Invalid token response for tenant '{tenant_id}': {reason}")]
    InvalidResponse { tenant_id: String, reason: String },
    #[error("Invalid token endpoint URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Typed failures of a logical Graph operation
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Tenant '{0}' not found")]
    TenantNotFound(String),
    #[error("Tenant '{0}' is not active")]
    TenantInactive(String),
    #[error("Authentication failed: {0}")]
    Authentication(Arc<TokenError>),
    #[error("Graph request failed after {attempts} attempts: {message}")]
    Transient {
        status: Option<u16>,
        attempts: u32,
        message: String,
    },
    #[error("Graph rejected a freshly acquired token: {}: {}", .0.code, .0.message)]
    Unauthorized(ProviderError),
    #[error("Graph request failed with status {status}: {}: {}", .error.code, .error.message)]
    Client { status: u16, error: ProviderError },
    #[error("Invalid Graph request: {0}")]
    InvalidRequest(String),
    #[error("Failed to decode Graph response: {0}")]
    Decode(String),
}

impl GraphError {
    /// The provider detail attached to this error, if any
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            Self::Unauthorized(error) | Self::Client { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<Arc<TokenError>> for GraphError {
    fn from(err: Arc<TokenError>) -> Self {
        match err.as_ref() {
            TokenError::Unavailable {
                status,
                attempts,
                reason,
                ..
            } => GraphError::Transient {
                status: *status,
                attempts: *attempts,
                message: format!("token endpoint unavailable: {reason}"),
            },
            _ => GraphError::Authentication(err),
        }
    }
}

impl From<TokenError> for GraphError {
    fn from(err: TokenError) -> Self {
        Arc::new(err).into()
    }
}

impl From<url::ParseError> for GraphError {
    fn from(err: url::ParseError) -> Self {
        GraphError::InvalidRequest(err.to_string())
    }
}
