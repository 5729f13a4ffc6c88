use jpics_domain::DomainError;

/// Failure of one remote round trip.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unparseable response: {0}")]
    Parse(String),
    #[error("server error {code}: {message}")]
    Server { code: i64, message: String },
}

impl ApiError {
    /// Only transport failures are worth repeating; the server answers the same
    /// request the same way.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("no action token, log in first")]
    NotAuthenticated,
    #[error("remote call failed: {0}")]
    Remote(#[from] ApiError),
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("{0} timed out")]
    Timeout(String),
    #[error("system album bootstrap failed: {0}")]
    Bootstrap(String),
}

impl ApplicationError {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Remote(error) => error.is_transient(),
            Self::Timeout(_) => true,
            _ => false,
        }
    }
}
