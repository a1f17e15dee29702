use std::net::SocketAddr;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to bind callback listener on {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("invalid callback path {0:?}: must start with '/' and contain no route parameters")]
    InvalidCallbackPath(String),

    #[error("callback listener on {addr} failed: {source}")]
    Serve {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("authorization callback did not include a code")]
    MissingCode,

    #[error("authorization callback state does not match this session")]
    StateMismatch,

    #[error("authorization was denied: {error}{}", .description.as_deref().map(|d| format!(" ({d})")).unwrap_or_default())]
    Denied {
        error: String,
        description: Option<String>,
    },

    #[error("this authorization session was already used")]
    SessionConsumed,

    #[error("token exchange failed (HTTP {status}): {body}")]
    TokenExchange { status: u16, body: String },

    #[error("invalid token response: {0}")]
    InvalidTokenResponse(#[from] serde_json::Error),

    /// The identity check after a successful exchange was rejected.
    #[error("verification failed: {0}")]
    Verification(String),

    #[error("failed to save account: {0}")]
    Persist(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("authorization was cancelled before a callback arrived")]
    Cancelled,
}

impl Error {
    /// Rejections decided locally from the callback parameters, before any
    /// network call.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Self::MissingCode | Self::StateMismatch | Self::Denied { .. } | Self::SessionConsumed
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
