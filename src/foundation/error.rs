/// Convenience result type used across pixcache.
pub type PixcacheResult<T> = Result<T, PixcacheError>;

/// Top-level error taxonomy used by the cache APIs.
///
/// Every variant folds into one of the three request-facing [`ErrorKind`]s. Checksum mismatches,
/// unknown presets and unreachable sources all surface as [`PixcacheError::NotFound`] so callers
/// cannot tell which part of a request failed validation.
#[derive(thiserror::Error, Debug)]
pub enum PixcacheError {
    /// The artifact, its source or its preset does not exist, or the URL failed validation.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request carried an empty or malformed payload.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A transform or persistence step failed unexpectedly.
    #[error("internal error: {0}")]
    Internal(String),

    /// The startup configuration is unusable.
    #[error("config error: {0}")]
    Config(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PixcacheError {
    /// Build a [`PixcacheError::NotFound`] value.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Build a [`PixcacheError::BadRequest`] value.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Build a [`PixcacheError::Internal`] value.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Build a [`PixcacheError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Request-facing classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::Internal(_) | Self::Config(_) | Self::Other(_) => ErrorKind::InternalError,
        }
    }
}

/// Failure classes a router maps onto responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// 404.
    NotFound,
    /// 400.
    BadRequest,
    /// 500.
    InternalError,
}

impl ErrorKind {
    /// HTTP status code for this kind.
    pub fn status_code(self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::BadRequest => 400,
            Self::InternalError => 500,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
