use super::answers::Answers;
use super::context::session_context;
use crate::StudyArgs;
use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use studyrun_application::{AdvanceOutcome, SessionEngine};
use studyrun_core::block::BlockType;
use studyrun_core::session::{SessionProgress, SessionStatus};
use uuid::Uuid;

/// Final line printed after a run.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunSummary {
    session_id: String,
    status: SessionStatus,
    current_block_index: usize,
    total_pause_duration_ms: u64,
    progress: SessionProgress,
}

pub async fn start(
    args: &StudyArgs,
    answers_path: &Path,
    session: Option<String>,
    stop_after: Option<String>,
) -> Result<()> {
    let answers = Answers::load(answers_path)?;
    let context = session_context(args)?;
    let session_id = session.unwrap_or_else(|| Uuid::new_v4().to_string());

    let engine = SessionEngine::start(context, &args.study, session_id)
        .await
        .with_context(|| format!("Failed to start study '{}'", args.study))?;
    drive(&engine, &answers, stop_after.as_deref()).await
}

pub async fn resume(args: &StudyArgs, answers_path: &Path, session_id: &str) -> Result<()> {
    let answers = Answers::load(answers_path)?;
    let context = session_context(args)?;

    let engine = SessionEngine::resume_from_store(context, &args.study, session_id)
        .await
        .with_context(|| format!("Failed to resume session {}", session_id))?;
    if engine.state().await.is_paused() {
        engine.resume().await?;
    }
    drive(&engine, &answers, None).await
}

/// Answers blocks until completion, the stop block, or an error.
///
/// Anything short of completion exits the session so progress stays on disk
/// for a later `resume`.
async fn drive(engine: &SessionEngine, answers: &Answers, stop_after: Option<&str>) -> Result<()> {
    tracing::debug!("{} scripted answer(s) loaded", answers.len());
    let result = answer_blocks(engine, answers, stop_after).await;

    let state = engine.state().await;
    if !state.is_completed() {
        engine.exit().await;
    }

    let summary = RunSummary {
        session_id: state.session_id.clone(),
        status: state.status,
        current_block_index: state.current_block_index,
        total_pause_duration_ms: state.total_pause_duration_ms,
        progress: engine.progress().await,
    };
    print_json(&summary)?;

    result.with_context(|| {
        format!(
            "Session {} stopped at block index {}; run `studyrun resume --session {}` to retry",
            state.session_id, state.current_block_index, state.session_id
        )
    })
}

async fn answer_blocks(
    engine: &SessionEngine,
    answers: &Answers,
    stop_after: Option<&str>,
) -> Result<()> {
    while let Some(block) = engine.current_block().await {
        if block.block_type == BlockType::AiFollowup {
            let question = engine.follow_up_prompt().await?;
            print_json(&json!({ "blockId": block.id, "followUp": question }))?;
        }

        let outcome = engine.advance(answers.payload_for(&block.id)).await?;
        print_json(&outcome)?;

        match &outcome {
            AdvanceOutcome::Rejected { findings } => {
                let reasons: Vec<String> = findings
                    .iter()
                    .map(|f| format!("{}: {}", f.field, f.message))
                    .collect();
                bail!("Block '{}' was rejected ({})", block.id, reasons.join("; "));
            }
            AdvanceOutcome::Advanced {
                completed: true, ..
            } => return Ok(()),
            AdvanceOutcome::Advanced { .. } => {}
        }

        if stop_after == Some(block.id.as_str()) {
            tracing::info!("Stopping after block {} as requested", block.id);
            return Ok(());
        }
    }

    if !engine.state().await.is_completed() {
        tracing::warn!("Reached the end of the study without a completion signal");
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
