//! Gemini `generateContent` client that turns requests into SQL

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::assistant::error::{AssistantError, AssistantResult};
use crate::config::GeminiConfig;
use crate::explorer::model::SchemaNode;

pub const SYSTEM_PROMPT: &str = r#"You are a specialized database agent that helps users create SQL queries.
Your primary role is to convert natural language requests into precise SQL queries.

Guidelines:
- Focus exclusively on generating SQL queries based on user requests
- When database schema information is provided, use it to create accurate queries
- Use standard SQL syntax that works with PostgreSQL
- Include helpful comments in the SQL to explain complex parts
- Do not engage in general conversation or provide explanations
- Your response must ONLY contain the SQL query, nothing else
- No introductory text, no explanations after the query
- If the user's request is ambiguous or illogical, create the most reasonable SQL query possible
- Always return a valid SQL query, even if you have to make assumptions

Example:
User: "Show me all customers who made a purchase last month"
Response:
-- Query to find customers with purchases in the previous month
SELECT DISTINCT c.customer_id, c.first_name, c.last_name
FROM customers c
JOIN orders o ON c.customer_id = o.customer_id
WHERE o.order_date >= DATE_TRUNC('month', CURRENT_DATE - INTERVAL '1 month')
  AND o.order_date < DATE_TRUNC('month', CURRENT_DATE)
ORDER BY c.last_name, c.first_name;"#;

const SCHEMA_CONTEXT_HEADER: &str = "Database Schema Information:\n";

/// Anything that can turn a natural language request into SQL
#[async_trait]
pub trait SqlGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, context: &[SchemaNode]) -> AssistantResult<String>;
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

pub struct GeminiClient {
    http: Client,
    api_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Self {
        Self {
            http: Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone().filter(|key| !key.trim().is_empty()),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_url, self.model)
    }

    fn build_request(prompt: &str, context: &[SchemaNode]) -> AssistantResult<GenerateRequest> {
        let mut parts = vec![
            Part {
                text: SYSTEM_PROMPT.to_string(),
            },
            Part {
                text: prompt.to_string(),
            },
        ];

        if !context.is_empty() {
            let schema = serde_json::to_string_pretty(context)?;
            parts.push(Part {
                text: format!("{}{}", SCHEMA_CONTEXT_HEADER, schema),
            });
        }

        Ok(GenerateRequest {
            contents: vec![Content { parts }],
        })
    }

    fn error_message(body: &serde_json::Value) -> String {
        body.get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string()
    }
}

#[async_trait]
impl SqlGenerator for GeminiClient {
    #[instrument(skip(self, prompt, context), fields(model = %self.model, tables = context.len()))]
    async fn generate(&self, prompt: &str, context: &[SchemaNode]) -> AssistantResult<String> {
        let api_key = self.api_key.as_deref().ok_or(AssistantError::MissingApiKey)?;
        let request = Self::build_request(prompt, context)?;

        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            let message = Self::error_message(&body);
            tracing::warn!(status = %status, %message, "Gemini request failed");
            return Err(AssistantError::Api(message));
        }

        let body: GenerateResponse = response.json().await?;
        body.candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text)
            .ok_or(AssistantError::EmptyResponse)
    }
}
