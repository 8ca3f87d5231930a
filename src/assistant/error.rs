use thiserror::Error;

pub type AssistantResult<T> = Result<T, AssistantError>;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("Gemini API error: {0}")]
    Api(String),

    #[error("No response generated from Gemini API")]
    EmptyResponse,

    #[error("Gemini API key is not configured")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to encode schema context: {0}")]
    Serialization(#[from] serde_json::Error),
}
