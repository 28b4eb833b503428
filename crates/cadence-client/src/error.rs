use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("not found: {resource}")]
    NotFound { resource: String },

    #[error("request rejected ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("response decoding failed: {0}")]
    Decode(String),

    #[error("client config error: {0}")]
    Config(String),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }

    pub(crate) fn conflict(message: impl Into<String>) -> Self {
        ClientError::Status {
            status: 409,
            message: message.into(),
        }
    }

    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        ClientError::Status {
            status: 400,
            message: message.into(),
        }
    }

    pub(crate) fn not_found(kind: &str, id: i64) -> Self {
        ClientError::NotFound {
            resource: format!("{kind}/{id}"),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout
        } else if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Transport(e.to_string())
        }
    }
}
