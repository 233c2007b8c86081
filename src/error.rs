use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

pub type LlmResult<T> = std::result::Result<T, LlmError>;

/// Main error type for dispatching a request to a provider
#[derive(Error, Debug)]
pub enum LlmError {
    /// Invalid or incomplete configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A field the provider cannot work without is empty
    #[error("missing required field `{field}` for provider {provider}")]
    MissingField { provider: String, field: &'static str },

    /// Proxy resolution or client construction failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Request could not be sent or the body could not be read
    #[error("failed to send request: {0}")]
    Network(#[source] reqwest::Error),

    /// Request timed out
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Cancellation token fired before the round trip completed
    #[error("request cancelled")]
    Cancelled,

    /// Provider answered with a non-2xx status
    #[error("request failed with status {status}: {body}")]
    Api { status: StatusCode, body: String },

    /// The answer path did not resolve against the response body
    #[error("failed to parse response: no value at `{path}` in {body}")]
    AnswerNotFound { path: String, body: String },

    /// A computed or configured header is not a valid HTTP header
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Call-site context wrapped around another error
    #[error("{context}: {source}")]
    Context {
        context: &'static str,
        #[source]
        source: Box<LlmError>,
    },
}

/// Errors raised while turning configuration into an HTTP client
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to parse proxy URL: {0}")]
    InvalidProxyUrl(#[from] url::ParseError),

    #[error("unsupported proxy scheme: {0}")]
    UnsupportedScheme(String),

    #[error("SOCKS5 proxy credentials need a password")]
    SocksPasswordRequired,

    #[error("failed to resolve proxy host {host}: {source}")]
    ProxyLookup {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

impl LlmError {
    /// Wrap this error with call-site context.
    pub fn context(self, context: &'static str) -> Self {
        LlmError::Context {
            context,
            source: Box::new(self),
        }
    }

    /// The innermost error, with all context wrappers removed
    pub fn root(&self) -> &LlmError {
        match self {
            LlmError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Map a reqwest failure, distinguishing timeouts from other network errors.
    pub(crate) fn from_send(err: reqwest::Error, timeout: Option<Duration>) -> Self {
        match timeout {
            Some(limit) if err.is_timeout() => LlmError::Timeout(limit),
            _ => LlmError::Network(err),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), LlmError::Cancelled)
    }

    /// Check if a caller could reasonably retry. The dispatch layer itself never does.
    pub fn is_retryable(&self) -> bool {
        match self.root() {
            LlmError::Timeout(_) | LlmError::Network(_) => true,
            LlmError::Api { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }

    /// Get the HTTP status code if available
    pub fn status_code(&self) -> Option<StatusCode> {
        match self.root() {
            LlmError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
