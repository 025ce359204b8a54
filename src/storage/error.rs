//! Provider error taxonomy / 存储提供者错误类型
//!
//! Every adapter raises these so callers can decide what to do without
//! knowing which backend served the path.

use thiserror::Error;

/// Errors raised by storage providers / 存储提供者错误
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The backend reports the object or prefix does not exist.
    #[error("File not found: {path}")]
    NotFound { path: String },

    /// The backend answered with a status outside the expected set.
    #[error("Unexpected status {actual}, expected one of {expected:?}")]
    UnexpectedStatus { expected: Vec<u16>, actual: u16 },

    /// A required backend capability is missing or the backend cannot serve the request.
    #[error("Provider unavailable ({code}): {message}")]
    Unavailable { message: String, code: u16 },

    /// Failure raised by the request client, passed through untouched.
    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ProviderError {
    pub fn not_found(path: impl Into<String>) -> Self {
        ProviderError::NotFound { path: path.into() }
    }

    /// Service-unavailable class error (503) / 服务不可用
    pub fn unavailable(message: impl Into<String>) -> Self {
        ProviderError::Unavailable {
            message: message.into(),
            code: 503,
        }
    }

    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        ProviderError::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn transport<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ProviderError::Transport(Box::new(err))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound { .. })
    }

    /// HTTP-equivalent status for the outer API layer / 对应的HTTP状态码
    pub fn http_status(&self) -> u16 {
        match self {
            ProviderError::NotFound { .. } => 404,
            ProviderError::Unavailable { code, .. } => *code,
            ProviderError::UnexpectedStatus { .. } => 502,
            ProviderError::Transport(_) => 502,
            ProviderError::InvalidPath { .. } => 400,
            ProviderError::Decode(_) => 502,
            ProviderError::Io(err) if err.kind() == std::io::ErrorKind::NotFound => 404,
            ProviderError::Io(_) => 500,
            ProviderError::Config(_) => 500,
        }
    }
}

/// Result type for provider operations / 提供者操作结果
pub type ProviderResult<T> = Result<T, ProviderError>;
