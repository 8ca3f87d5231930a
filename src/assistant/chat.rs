//! Chat transcript for the assistant panel

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::assistant::error::AssistantResult;
use crate::assistant::gemini::SqlGenerator;
use crate::explorer::model::SchemaNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Ai,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Default)]
struct Transcript {
    messages: Vec<ChatMessage>,
    busy: bool,
}

/// Clears the busy flag when an `ask` ends, including when its future is dropped
struct InFlight<'a>(&'a ChatSession);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.lock().busy = false;
    }
}

/// One conversation. Only one request may be in flight at a time.
#[derive(Default)]
pub struct ChatSession {
    inner: Mutex<Transcript>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Transcript> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.lock().messages.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.lock().busy
    }

    pub fn clear(&self) {
        let mut transcript = self.lock();
        if !transcript.busy {
            transcript.messages.clear();
        }
    }

    /// Records the user's message and marks the session busy. Returns the
    /// prompt to send, or `None` when the input is blank or a request is
    /// already in flight.
    fn begin(&self, input: &str) -> Option<String> {
        let prompt = input.trim();
        if prompt.is_empty() {
            return None;
        }

        let mut transcript = self.lock();
        if transcript.busy {
            tracing::debug!("chat request already in flight");
            return None;
        }
        transcript.busy = true;
        transcript
            .messages
            .push(ChatMessage::new(ChatRole::User, prompt));
        Some(prompt.to_string())
    }

    fn finish(&self, result: AssistantResult<String>) -> ChatMessage {
        let reply = match result {
            Ok(text) => ChatMessage::new(ChatRole::Ai, text),
            Err(err) => {
                tracing::warn!(error = %err, "assistant request failed");
                ChatMessage::new(ChatRole::Error, format!("Error: {}", err))
            }
        };

        let mut transcript = self.lock();
        transcript.busy = false;
        transcript.messages.push(reply.clone());
        reply
    }

    /// Sends `input` with the given schema context and appends the reply.
    pub async fn ask(
        &self,
        generator: &dyn SqlGenerator,
        input: &str,
        context: &[SchemaNode],
    ) -> Option<ChatMessage> {
        let prompt = self.begin(input)?;
        let _in_flight = InFlight(self);
        let result = generator.generate(&prompt, context).await;
        Some(self.finish(result))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::assistant::error::AssistantError;

    struct Canned(Result<&'static str, &'static str>);

    #[async_trait]
    impl SqlGenerator for Canned {
        async fn generate(&self, _prompt: &str, _context: &[SchemaNode]) -> AssistantResult<String> {
            match self.0 {
                Ok(sql) => Ok(sql.to_string()),
                Err(msg) => Err(AssistantError::Api(msg.to_string())),
            }
        }
    }

    struct Gate {
        release: Notify,
    }

    #[async_trait]
    impl SqlGenerator for Gate {
        async fn generate(&self, prompt: &str, _context: &[SchemaNode]) -> AssistantResult<String> {
            self.release.notified().await;
            Ok(format!("-- {}", prompt))
        }
    }

    #[tokio::test]
    async fn appends_user_and_ai_messages() {
        let chat = ChatSession::new();

        let reply = chat
            .ask(&Canned(Ok("SELECT 1;")), "  one  ", &[])
            .await
            .unwrap();

        assert_eq!(reply.role, ChatRole::Ai);
        assert_eq!(
            chat.messages(),
            vec![
                ChatMessage::new(ChatRole::User, "one"),
                ChatMessage::new(ChatRole::Ai, "SELECT 1;"),
            ]
        );
        assert!(!chat.is_busy());
    }

    #[tokio::test]
    async fn blank_input_is_ignored() {
        let chat = ChatSession::new();
        assert!(chat.ask(&Canned(Ok("x")), "   ", &[]).await.is_none());
        assert!(chat.messages().is_empty());
    }

    #[tokio::test]
    async fn failures_become_error_bubbles() {
        let chat = ChatSession::new();

        let reply = chat
            .ask(&Canned(Err("quota exceeded")), "list users", &[])
            .await
            .unwrap();

        assert_eq!(reply.role, ChatRole::Error);
        assert_eq!(reply.content, "Error: Gemini API error: quota exceeded");
        assert!(!chat.is_busy());
    }

    #[tokio::test]
    async fn refuses_input_while_busy() {
        let chat = Arc::new(ChatSession::new());
        let gate = Arc::new(Gate {
            release: Notify::new(),
        });

        let pending = {
            let chat = chat.clone();
            let gate = gate.clone();
            tokio::spawn(async move { chat.ask(gate.as_ref(), "first", &[]).await })
        };
        while !chat.is_busy() {
            tokio::task::yield_now().await;
        }

        assert!(chat.ask(gate.as_ref(), "second", &[]).await.is_none());

        gate.release.notify_one();
        let reply = pending.await.unwrap().unwrap();
        assert_eq!(reply.content, "-- first");
        assert_eq!(chat.messages().len(), 2);
    }

    #[tokio::test]
    async fn cancelled_request_releases_the_session() {
        let chat = Arc::new(ChatSession::new());
        let gate = Arc::new(Gate {
            release: Notify::new(),
        });

        let pending = {
            let chat = chat.clone();
            let gate = gate.clone();
            tokio::spawn(async move { chat.ask(gate.as_ref(), "first", &[]).await })
        };
        while !chat.is_busy() {
            tokio::task::yield_now().await;
        }

        pending.abort();
        assert!(pending.await.unwrap_err().is_cancelled());
        assert!(!chat.is_busy());

        let reply = chat
            .ask(&Canned(Ok("SELECT 2;")), "second", &[])
            .await
            .expect("accepted after cancel");
        assert_eq!(reply.content, "SELECT 2;");
    }
}
