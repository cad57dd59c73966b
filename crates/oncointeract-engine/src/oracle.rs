use serde_json::Value;
use thiserror::Error;

/// Failure talking to a hosted model. Never retried.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("{provider} credentials missing ({hint})")]
    MissingCredentials { provider: String, hint: String },
    #[error("{provider} request failed: {message}")]
    Transport { provider: String, message: String },
    #[error("{provider} request failed ({status}): {body}")]
    Api {
        provider: String,
        status: u16,
        body: String,
    },
    #[error("{provider} returned an unreadable payload: {message}")]
    Payload { provider: String, message: String },
}

impl OracleError {
    pub fn transport(provider: &str, message: impl Into<String>) -> Self {
        Self::Transport {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub fn payload(provider: &str, message: impl Into<String>) -> Self {
        Self::Payload {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}

/// A hosted text model that answers with JSON shaped by `schema`.
pub trait TextOracle: Send + Sync {
    fn name(&self) -> &str;
    fn complete_json(&self, prompt: &str, schema: &Value) -> Result<String, OracleError>;
}

/// A hosted image model. `Ok(None)` means the call succeeded but carried no
/// inline image.
pub trait ImageOracle: Send + Sync {
    fn name(&self) -> &str;
    fn render(&self, prompt: &str, system_instruction: &str)
        -> Result<Option<String>, OracleError>;
}
