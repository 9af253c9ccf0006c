use crate::StudyArgs;
use anyhow::{Context, Result};
use std::sync::Arc;
use studyrun_application::SessionContext;
use studyrun_infrastructure::paths::StudyrunPaths;
use studyrun_infrastructure::{ConfigService, FileBlockSource, FileProgressStore, FileSubmissionStore};
use studyrun_interaction::FollowUpAgent;

/// Wires the file-backed collaborators for a CLI session.
///
/// The follow-up agent is attached only when its API key is set.
pub fn session_context(args: &StudyArgs) -> Result<SessionContext> {
    let config_service = match &args.config {
        Some(path) => ConfigService::new(path),
        None => ConfigService::default_location()?,
    };
    let config = config_service
        .load()
        .with_context(|| format!("Failed to load {}", config_service.path().display()))?;

    let data_dir = match &args.data_dir {
        Some(dir) => dir.clone(),
        None => StudyrunPaths::data_dir()?,
    };
    tracing::debug!("Session data under {}", data_dir.display());

    let mut context = SessionContext::new(
        Arc::new(FileBlockSource::new(&args.study_dir)),
        Arc::new(FileSubmissionStore::new(&data_dir)),
        Arc::new(FileProgressStore::new(&data_dir)),
    )
    .with_config(config);

    if let Some(agent) = FollowUpAgent::from_env() {
        tracing::info!("Follow-up questions generated with {}", agent.model());
        context = context.with_followups(Arc::new(agent));
    }
    Ok(context)
}
