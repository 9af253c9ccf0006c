//! FollowUpAgent - follow-up question generation over a messages API.
//!
//! Configuration comes from the environment:
//! - `STUDYRUN_FOLLOWUP_API_KEY` (required)
//! - `STUDYRUN_FOLLOWUP_MODEL` (defaults to `claude-sonnet-4-20250514`)
//! - `STUDYRUN_FOLLOWUP_URL` (defaults to the Anthropic messages endpoint)
//!
//! Errors are reported as `StudyError`; the follow-up service turns any of
//! them into the static fallback prompt.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::env;
use studyrun_core::error::{Result, StudyError};
use studyrun_core::followup::{FollowUpGenerator, FollowUpQuestion, FollowUpRequest};
use studyrun_core::response::Payload;

pub const ENV_API_KEY: &str = "STUDYRUN_FOLLOWUP_API_KEY";
pub const ENV_MODEL: &str = "STUDYRUN_FOLLOWUP_MODEL";
pub const ENV_URL: &str = "STUDYRUN_FOLLOWUP_URL";

const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

const SYSTEM_PROMPT: &str = "You are a careful user researcher. Ask short, neutral, \
open-ended follow-up questions about the participant's earlier answers. \
Reply with the questions only, one per line, without numbering.";

/// Generator backed by an HTTP messages endpoint.
#[derive(Clone)]
pub struct FollowUpAgent {
    client: Client,
    api_key: String,
    model: String,
    url: String,
    max_tokens: u32,
}

impl FollowUpAgent {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            url: DEFAULT_URL.to_string(),
            max_tokens: 512,
        }
    }

    /// Reads the process environment. `None` when no API key is set.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let api_key = lookup(ENV_API_KEY).filter(|key| !key.trim().is_empty())?;
        let model = lookup(ENV_MODEL).unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let mut agent = Self::new(api_key, model);
        if let Some(url) = lookup(ENV_URL) {
            agent.url = url;
        }
        Some(agent)
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn build_request(&self, request: &FollowUpRequest) -> CreateMessageRequest {
        CreateMessageRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: SYSTEM_PROMPT.to_string(),
            messages: vec![Message {
                role: "user".to_string(),
                content: render_prompt(request),
            }],
        }
    }

    async fn send_request(&self, body: &CreateMessageRequest) -> Result<String> {
        let response = self
            .client
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|err| StudyError::io(format!("follow-up request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(map_http_error(status, &body_text));
        }

        let parsed: CreateMessageResponse = response
            .json()
            .await
            .map_err(|err| StudyError::internal(format!("failed to parse follow-up response: {err}")))?;

        extract_text(parsed)
    }
}

#[async_trait]
impl FollowUpGenerator for FollowUpAgent {
    async fn generate(&self, request: &FollowUpRequest) -> Result<FollowUpQuestion> {
        tracing::debug!(
            "[FollowUpAgent] Generating for block {} ({} context answers, model={})",
            request.block_id,
            request.context.len(),
            self.model
        );

        let text = self.send_request(&self.build_request(request)).await?;
        let questions = split_questions(&text, request.max_questions);
        let first = questions
            .first()
            .cloned()
            .ok_or_else(|| StudyError::internal("follow-up response contained no question"))?;

        let mut question = FollowUpQuestion::generated(first);
        question.metadata = json!({ "model": self.model, "questions": questions });
        Ok(question)
    }
}

fn render_prompt(request: &FollowUpRequest) -> String {
    let mut prompt = String::new();
    if let Some(instructions) = &request.instructions {
        prompt.push_str(&format!("Researcher guidance: {}\n\n", instructions.trim()));
    }

    if request.context.is_empty() {
        prompt.push_str("The participant has not answered anything yet.\n");
    } else {
        prompt.push_str("Earlier answers:\n");
        for entry in &request.context {
            prompt.push_str(&format!(
                "- {} ({}): {}\n",
                entry.title,
                entry.block_type,
                render_answer(&entry.answer)
            ));
        }
    }

    prompt.push_str(&format!(
        "\nWrite at most {} follow-up question(s).",
        request.max_questions.max(1)
    ));
    prompt
}

fn render_answer(answer: &Payload) -> String {
    if answer.is_empty() {
        return "(no answer)".to_string();
    }
    answer
        .iter()
        .map(|(field, value)| match value.as_str() {
            Some(text) => format!("{field}={text}"),
            None => format!("{field}={value}"),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Non-empty lines with list markers stripped, capped at `max`.
fn split_questions(text: &str, max: usize) -> Vec<String> {
    text.lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(|c: char| c.is_ascii_digit() || matches!(c, '-' | '*' | '.' | ')'))
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .take(max.max(1))
        .collect()
}

#[derive(Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlockResponse>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ContentBlockResponse {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_text(response: CreateMessageResponse) -> Result<String> {
    response
        .content
        .into_iter()
        .find_map(|block| match block {
            ContentBlockResponse::Text { text } => Some(text),
            ContentBlockResponse::Other => None,
        })
        .ok_or_else(|| StudyError::internal("follow-up response had no text content"))
}

fn map_http_error(status: StatusCode, body: &str) -> StudyError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or_else(|_| body.to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            StudyError::config(format!("follow-up API rejected credentials: {message}"))
        }
        _ => StudyError::io(format!("follow-up API returned {}: {}", status.as_u16(), message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use studyrun_core::block::BlockType;
    use studyrun_core::followup::FollowUpContext;
    use studyrun_core::response::payload;

    fn request() -> FollowUpRequest {
        FollowUpRequest {
            session_id: "s1".into(),
            block_id: "dig_deeper".into(),
            instructions: Some("Ask about colour".into()),
            context: vec![FollowUpContext {
                block_id: "colour".into(),
                block_type: BlockType::SimpleInput,
                title: "Favourite colour?".into(),
                answer: payload([("value", json!("blue"))]),
            }],
            max_questions: 2,
        }
    }

    #[test]
    fn test_from_lookup_requires_api_key() {
        let empty: HashMap<&str, &str> = HashMap::new();
        assert!(FollowUpAgent::from_lookup(|k| empty.get(k).map(|v| v.to_string())).is_none());

        let vars = HashMap::from([(ENV_API_KEY, "sk-test"), (ENV_URL, "http://localhost:8080/v1")]);
        let agent = FollowUpAgent::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(agent.model(), DEFAULT_MODEL);
        assert_eq!(agent.url(), "http://localhost:8080/v1");
    }

    #[test]
    fn test_prompt_includes_guidance_and_answers() {
        let prompt = render_prompt(&request());
        assert!(prompt.contains("Researcher guidance: Ask about colour"));
        assert!(prompt.contains("- Favourite colour? (simple_input): value=blue"));
        assert!(prompt.ends_with("at most 2 follow-up question(s)."));
    }

    #[test]
    fn test_request_serializes_messages_shape() {
        let agent = FollowUpAgent::new("key", "model-x");
        let body = serde_json::to_value(agent.build_request(&request())).unwrap();
        assert_eq!(body["model"], "model-x");
        assert_eq!(body["messages"][0]["role"], "user");
        assert!(body["system"].as_str().unwrap().contains("follow-up"));
    }

    #[test]
    fn test_split_questions_strips_markers() {
        let text = "1. Why blue?\n\n- What else did you consider?\n* Third one";
        assert_eq!(
            split_questions(text, 2),
            vec!["Why blue?".to_string(), "What else did you consider?".to_string()]
        );
        assert!(split_questions("  \n", 3).is_empty());
    }

    #[test]
    fn test_extract_text_skips_other_blocks() {
        let parsed: CreateMessageResponse = serde_json::from_str(
            r#"{"content": [{"type": "thinking"}, {"type": "text", "text": "Why blue?"}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(parsed).unwrap(), "Why blue?");
    }

    #[test]
    fn test_map_http_error() {
        let err = map_http_error(
            StatusCode::UNAUTHORIZED,
            r#"{"error": {"type": "authentication_error", "message": "bad key"}}"#,
        );
        assert!(matches!(err, StudyError::Config(ref m) if m.contains("bad key")));

        let err = map_http_error(StatusCode::SERVICE_UNAVAILABLE, "overloaded");
        assert!(err.is_retryable());
    }
}
