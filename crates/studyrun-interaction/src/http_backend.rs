//! HttpStudyBackend - JSON/HTTP implementation of the study store boundary.
//!
//! Endpoints, relative to the base URL:
//!
//! | Operation        | Request                              |
//! |------------------|--------------------------------------|
//! | fetch blocks     | `GET  studies/{id}/blocks`           |
//! | submit block     | `POST sessions/{id}/responses`       |
//! | load responses   | `GET  sessions/{id}/responses`       |
//! | save progress    | `PUT  sessions/{id}/progress`        |
//! | load progress    | `GET  sessions/{id}/progress`        |
//! | archive          | `POST sessions/{id}/archive`         |
//!
//! Requests are never retried here; the engine's callers decide.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use studyrun_core::block::{Block, BlockSource};
use studyrun_core::error::{Result, StudyError};
use studyrun_core::persistence::{
    BlockSubmission, ProgressSnapshot, ProgressStore, SubmissionGateway, SubmissionReceipt,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Study store reached over HTTP.
#[derive(Clone)]
pub struct HttpStudyBackend {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpStudyBackend {
    /// Creates a backend rooted at `base_url` (trailing slashes are ignored).
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| StudyError::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Sends `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn blocks_url(&self, study_id: &str) -> String {
        self.url(&format!("studies/{study_id}/blocks"))
    }

    fn session_url(&self, session_id: &str, leaf: &str) -> String {
        self.url(&format!("sessions/{session_id}/{leaf}"))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// Both a bare array and `{ "blocks": [...] }` are accepted.
#[derive(Deserialize)]
#[serde(untagged)]
enum BlocksBody {
    Bare(Vec<Block>),
    Wrapped { blocks: Vec<Block> },
}

impl BlocksBody {
    fn into_blocks(self) -> Vec<Block> {
        match self {
            BlocksBody::Bare(blocks) | BlocksBody::Wrapped { blocks } => blocks,
        }
    }
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(alias = "error")]
    message: String,
}

/// Reads the body of a non-2xx response into a short message.
async fn describe_failure(response: Response) -> String {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "failed to read error body".to_string());
    error_message(status, &body)
}

fn error_message(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.trim().to_string());
    if detail.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("HTTP {}: {}", status.as_u16(), detail)
    }
}

#[async_trait]
impl BlockSource for HttpStudyBackend {
    async fn fetch_blocks(&self, study_id: &str) -> Result<Vec<Block>> {
        let url = self.blocks_url(study_id);
        tracing::debug!("[HttpStudyBackend] GET {}", url);

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| StudyError::load(format!("block request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(StudyError::load(format!(
                "failed to fetch blocks for study '{}': {}",
                study_id,
                describe_failure(response).await
            )));
        }

        let body: BlocksBody = response
            .json()
            .await
            .map_err(|e| StudyError::load(format!("invalid block list: {e}")))?;
        Ok(body.into_blocks())
    }
}

#[async_trait]
impl SubmissionGateway for HttpStudyBackend {
    async fn submit_block(&self, submission: &BlockSubmission) -> Result<SubmissionReceipt> {
        let url = self.session_url(&submission.session_id, "responses");
        tracing::debug!(
            "[HttpStudyBackend] POST {} (block={})",
            url,
            submission.block_id
        );

        let response = self
            .authorize(self.client.post(&url))
            .json(submission)
            .send()
            .await
            .map_err(|e| StudyError::persistence(format!("submission request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(StudyError::persistence(format!(
                "submission of block '{}' failed: {}",
                submission.block_id,
                describe_failure(response).await
            )));
        }

        response
            .json()
            .await
            .map_err(|e| StudyError::persistence(format!("invalid submission receipt: {e}")))
    }

    async fn load_responses(&self, session_id: &str) -> Result<Vec<BlockSubmission>> {
        let url = self.session_url(session_id, "responses");
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| StudyError::load(format!("responses request failed: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(StudyError::load(format!(
                "responses load failed: {}",
                describe_failure(response).await
            )));
        }

        response
            .json()
            .await
            .map_err(|e| StudyError::load(format!("invalid response list: {e}")))
    }
}

#[async_trait]
impl ProgressStore for HttpStudyBackend {
    async fn save_progress(&self, snapshot: &ProgressSnapshot) -> Result<()> {
        let url = self.session_url(&snapshot.session_id, "progress");
        let response = self
            .authorize(self.client.put(&url))
            .json(snapshot)
            .send()
            .await
            .map_err(|e| StudyError::persistence(format!("progress request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(StudyError::persistence(format!(
                "progress save failed: {}",
                describe_failure(response).await
            )));
        }
        Ok(())
    }

    async fn load_progress(&self, session_id: &str) -> Result<Option<ProgressSnapshot>> {
        let url = self.session_url(session_id, "progress");
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| StudyError::load(format!("progress request failed: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(StudyError::load(format!(
                "progress load failed: {}",
                describe_failure(response).await
            )));
        }

        response
            .json()
            .await
            .map(Some)
            .map_err(|e| StudyError::load(format!("invalid progress snapshot: {e}")))
    }

    async fn archive(&self, session_id: &str) -> Result<()> {
        let url = self.session_url(session_id, "archive");
        let response = self
            .authorize(self.client.post(&url))
            .send()
            .await
            .map_err(|e| StudyError::persistence(format!("archive request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(StudyError::persistence(format!(
                "archive failed: {}",
                describe_failure(response).await
            )));
        }
        Ok(())
    }
}
