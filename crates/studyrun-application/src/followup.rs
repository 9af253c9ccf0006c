//! Follow-up question service.
//!
//! Wraps an optional generator with a timeout. Every failure path ends in the
//! static fallback prompt; nothing here returns an error.

use std::sync::Arc;
use std::time::Duration;
use studyrun_core::config::EngineConfig;
use studyrun_core::followup::{FollowUpGenerator, FollowUpQuestion, FollowUpRequest};

pub struct FollowUpService {
    generator: Option<Arc<dyn FollowUpGenerator>>,
    timeout: Duration,
    fallback_prompt: String,
}

impl FollowUpService {
    pub fn new(
        generator: Option<Arc<dyn FollowUpGenerator>>,
        timeout: Duration,
        fallback_prompt: impl Into<String>,
    ) -> Self {
        Self {
            generator,
            timeout,
            fallback_prompt: fallback_prompt.into(),
        }
    }

    pub fn from_config(generator: Option<Arc<dyn FollowUpGenerator>>, config: &EngineConfig) -> Self {
        Self::new(
            generator,
            config.followup_timeout(),
            config.followup_fallback_prompt.clone(),
        )
    }

    pub fn fallback(&self) -> FollowUpQuestion {
        FollowUpQuestion::fallback(self.fallback_prompt.clone())
    }

    pub async fn ask(&self, request: &FollowUpRequest) -> FollowUpQuestion {
        let Some(generator) = &self.generator else {
            tracing::debug!("[FollowUpService] No generator configured, using fallback");
            return self.fallback();
        };

        match tokio::time::timeout(self.timeout, generator.generate(request)).await {
            Ok(Ok(question)) if !question.text.trim().is_empty() => question,
            Ok(Ok(_)) => {
                tracing::warn!(
                    "[FollowUpService] Generator returned empty text for block {}, using fallback",
                    request.block_id
                );
                self.fallback()
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    "[FollowUpService] Generation failed for block {}: {}, using fallback",
                    request.block_id,
                    e
                );
                self.fallback()
            }
            Err(_) => {
                tracing::warn!(
                    "[FollowUpService] Generation timed out after {:?} for block {}, using fallback",
                    self.timeout,
                    request.block_id
                );
                self.fallback()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use studyrun_core::error::{Result, StudyError};

    enum Behaviour {
        Answer(&'static str),
        Fail,
        Hang,
    }

    struct MockGenerator(Behaviour);

    #[async_trait]
    impl FollowUpGenerator for MockGenerator {
        async fn generate(&self, _request: &FollowUpRequest) -> Result<FollowUpQuestion> {
            match self.0 {
                Behaviour::Answer(text) => Ok(FollowUpQuestion::generated(text)),
                Behaviour::Fail => Err(StudyError::internal("model unavailable")),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(FollowUpQuestion::generated("too late"))
                }
            }
        }
    }

    fn request() -> FollowUpRequest {
        FollowUpRequest {
            session_id: "s".to_string(),
            block_id: "ai".to_string(),
            instructions: None,
            context: Vec::new(),
            max_questions: 1,
        }
    }

    fn service(behaviour: Option<Behaviour>) -> FollowUpService {
        let generator = behaviour.map(|b| Arc::new(MockGenerator(b)) as Arc<dyn FollowUpGenerator>);
        FollowUpService::new(generator, Duration::from_secs(5), "Tell us more")
    }

    #[tokio::test]
    async fn test_generated_question_passes_through() {
        let question = service(Some(Behaviour::Answer("Why blue?"))).ask(&request()).await;
        assert_eq!(question.text, "Why blue?");
        assert!(!question.is_fallback());
    }

    #[tokio::test]
    async fn test_failures_degrade_to_fallback() {
        for behaviour in [None, Some(Behaviour::Fail), Some(Behaviour::Answer("  "))] {
            let question = service(behaviour).ask(&request()).await;
            assert!(question.is_fallback());
            assert_eq!(question.text, "Tell us more");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_degrades_to_fallback() {
        let question = service(Some(Behaviour::Hang)).ask(&request()).await;
        assert!(question.is_fallback());
    }
}
