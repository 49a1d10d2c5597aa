use thiserror::Error;

/// Failures surfaced by the gateway and the components built on it.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Credential or model configuration missing; no call can proceed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The service answered, but without parseable text or with JSON that
    /// does not match the declared schema.
    #[error("AI response error: {0}")]
    AiResponse(String),

    /// Network-level failure or a non-success HTTP status.
    #[error("transport error: {context}")]
    Transport {
        context: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// A consultation turn could not be completed.
    #[error("chat error: {0}")]
    Chat(String),

    /// A local image could not be read or recognised.
    #[error("image input error: {0}")]
    Image(String),
}

impl GatewayError {
    pub fn transport(context: impl Into<String>, source: reqwest::Error) -> Self {
        GatewayError::Transport {
            context: context.into(),
            source: Some(source),
        }
    }

    pub fn status(context: impl Into<String>) -> Self {
        GatewayError::Transport {
            context: context.into(),
            source: None,
        }
    }

    /// Transport and response failures are reported the same way downstream.
    pub fn is_transport_or_response(&self) -> bool {
        matches!(
            self,
            GatewayError::Transport { .. } | GatewayError::AiResponse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
