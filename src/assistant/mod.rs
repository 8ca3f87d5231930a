// Assistant Module
// Natural language to SQL through the Gemini API

pub mod chat;
pub mod error;
pub mod gemini;

pub use chat::{ChatMessage, ChatRole, ChatSession};
pub use error::{AssistantError, AssistantResult};
pub use gemini::{GeminiClient, SqlGenerator};
