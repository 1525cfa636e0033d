// crates/substrate-store/src/writer.rs
// ============================================================================
// Module: Decision Store Writer Thread
// Description: Dedicated background thread that serializes every write
// against the Decision Store through a single SQLite connection.
// Purpose: Make "writes are serialized per-database" (spec.md §4.1) a
// structural property rather than a calling-convention.
// Dependencies: substrate-core, rusqlite
// ============================================================================

//! ## Overview
//! Callers submit a [`WriteCommand`] over a bounded [`std::sync::mpsc`]
//! channel and block on a per-command response channel. The writer thread
//! drains the channel into small batches (bounded by
//! `SqliteStoreConfig::batch_max_ops` / `batch_max_wait_ms`) and commits each
//! batch as a single transaction, mirroring
//! `decision-gate-store-sqlite`'s writer-runtime shape.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::mpsc;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::RecvTimeoutError;
use std::sync::mpsc::Sender;
use std::sync::mpsc::SyncSender;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;
use rusqlite::params;

use substrate_core::Artifact;
use substrate_core::Constraint;
use substrate_core::Decision;
use substrate_core::DecisionId;
use substrate_core::PersistenceError;
use substrate_core::PipelineRun;
use substrate_core::Requirement;
use substrate_core::RequirementId;
use substrate_core::RequirementStatus;
use substrate_core::RunId;
use substrate_core::TokenUsage;

use crate::config::SqliteStoreConfig;
use crate::error::SqliteStoreError;
use crate::mapping::deserialize_enum_str;
use crate::mapping::serialize_enum_str;
use crate::types::DecisionPatch;
use crate::types::NewArtifact;
use crate::types::NewConstraint;
use crate::types::NewDecision;
use crate::types::NewPipelineRun;
use crate::types::NewRequirement;
use crate::types::PipelineRunPatch;

// ============================================================================
// SECTION: Commands
// ============================================================================

/// A single write command accepted by the writer thread.
pub(crate) enum WriteCommand {
    /// `createPipelineRun`.
    CreatePipelineRun {
        input: NewPipelineRun,
        response: Sender<Result<PipelineRun, PersistenceError>>,
    },
    /// `updatePipelineRun`.
    UpdatePipelineRun {
        id: RunId,
        patch: PipelineRunPatch,
        response: Sender<Result<(), PersistenceError>>,
    },
    /// `createDecision`.
    CreateDecision {
        input: NewDecision,
        response: Sender<Result<Decision, PersistenceError>>,
    },
    /// `updateDecision`.
    UpdateDecision {
        id: DecisionId,
        patch: DecisionPatch,
        response: Sender<Result<(), PersistenceError>>,
    },
    /// `supersedeDecision`, idempotent-safe per spec.md §4.1.
    SupersedeDecision {
        original_id: DecisionId,
        superseding_id: DecisionId,
        response: Sender<Result<(), PersistenceError>>,
    },
    /// `createRequirement`.
    CreateRequirement {
        input: NewRequirement,
        response: Sender<Result<Requirement, PersistenceError>>,
    },
    /// Requirement status transition, used by the solutioning readiness
    /// check and by story completion to mark requirements done.
    UpdateRequirementStatus {
        id: RequirementId,
        status: RequirementStatus,
        response: Sender<Result<(), PersistenceError>>,
    },
    /// `createConstraint`.
    CreateConstraint {
        input: NewConstraint,
        response: Sender<Result<Constraint, PersistenceError>>,
    },
    /// `registerArtifact`.
    RegisterArtifact {
        input: NewArtifact,
        response: Sender<Result<Artifact, PersistenceError>>,
    },
    /// `addTokenUsage`.
    AddTokenUsage {
        input: TokenUsage,
        response: Sender<Result<(), PersistenceError>>,
    },
}

// ============================================================================
// SECTION: Gateway
// ============================================================================

/// Submission handle into the writer thread, held by [`crate::SqliteDecisionStore`].
pub(crate) struct WriteGateway {
    sender: SyncSender<WriteCommand>,
}

impl WriteGateway {
    /// Submits `command` and blocks until the writer thread has committed
    /// (or rejected) the batch containing it.
    pub(crate) fn submit(&self, command: WriteCommand) -> Result<(), SqliteStoreError> {
        self.sender
            .send(command)
            .map_err(|_| SqliteStoreError::Io("decision store writer thread is gone".to_string()))
    }
}

/// Spawns the writer thread and returns a gateway to submit commands to it.
pub(crate) fn spawn_writer(
    config: SqliteStoreConfig,
    write_connection: Arc<Mutex<Connection>>,
) -> WriteGateway {
    let (sender, receiver) = mpsc::sync_channel(config.writer_queue_capacity);
    let builder = thread::Builder::new().name("substrate-store-writer".to_string());
    let batch_max_ops = config.batch_max_ops;
    let batch_max_wait = Duration::from_millis(config.batch_max_wait_ms);
    // Thread-spawn failure here would mean the OS cannot give us any thread
    // at all; there is no degraded mode to fall back to, so the store
    // becomes unusable. Callers observe this as every subsequent submit()
    // failing with `Io` once the channel's sole receiver is dropped.
    let spawn_result = builder.spawn(move || {
        writer_loop(&write_connection, &receiver, batch_max_ops, batch_max_wait);
    });
    drop(spawn_result);
    WriteGateway { sender }
}

// ============================================================================
// SECTION: Writer Loop
// ============================================================================

fn writer_loop(
    write_connection: &Arc<Mutex<Connection>>,
    receiver: &Receiver<WriteCommand>,
    batch_max_ops: usize,
    batch_max_wait: Duration,
) {
    while let Ok(first) = receiver.recv() {
        let mut batch = vec![first];
        let deadline = Instant::now() + batch_max_wait;
        while batch.len() < batch_max_ops {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match receiver.recv_timeout(deadline - now) {
                Ok(command) => batch.push(command),
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => break,
            }
        }
        execute_batch(write_connection, batch);
    }
}

fn execute_batch(write_connection: &Arc<Mutex<Connection>>, batch: Vec<WriteCommand>) {
    let Ok(mut guard) = write_connection.lock() else {
        dispatch_fatal_to_all(batch, "decision store write connection mutex poisoned");
        return;
    };
    let tx = match guard.transaction() {
        Ok(tx) => tx,
        Err(err) => {
            drop(guard);
            dispatch_fatal_to_all(batch, &format!("failed to open transaction: {err}"));
            return;
        }
    };

    let mut pending: Vec<(WriteOutcome, Box<dyn FnOnce(WriteOutcome)>)> = Vec::with_capacity(batch.len());
    for command in batch {
        let (outcome, deliver) = apply_command(&tx, command);
        pending.push((outcome, deliver));
    }

    match tx.commit() {
        Ok(()) => {
            for (outcome, deliver) in pending {
                deliver(outcome);
            }
        }
        Err(err) => {
            let message = format!("decision store commit failed: {err}");
            for (_, deliver) in pending {
                deliver(WriteOutcome::Fatal(message.clone()));
            }
        }
    }
    drop(guard);
}

/// Uniform result shape threaded through the generic dispatch closures below.
enum WriteOutcome {
    Unit(Result<(), PersistenceError>),
    PipelineRun(Result<PipelineRun, PersistenceError>),
    Decision(Result<Decision, PersistenceError>),
    Requirement(Result<Requirement, PersistenceError>),
    Constraint(Result<Constraint, PersistenceError>),
    Artifact(Result<Artifact, PersistenceError>),
    /// The transaction itself failed to commit; every command in the batch
    /// observes this regardless of its own logical outcome.
    Fatal(String),
}

fn dispatch_fatal_to_all(batch: Vec<WriteCommand>, message: &str) {
    for command in batch {
        let (outcome, deliver) = apply_command_fatal(command, message);
        deliver(outcome);
    }
}

fn apply_command_fatal(command: WriteCommand, message: &str) -> (WriteOutcome, Box<dyn FnOnce(WriteOutcome)>) {
    let err = PersistenceError::Io(message.to_string());
    match command {
        WriteCommand::CreatePipelineRun { response, .. } => (
            WriteOutcome::PipelineRun(Err(err)),
            Box::new(move |outcome| send_pipeline_run(response, outcome)),
        ),
        WriteCommand::UpdatePipelineRun { response, .. }
        | WriteCommand::UpdateDecision { response, .. }
        | WriteCommand::SupersedeDecision { response, .. }
        | WriteCommand::UpdateRequirementStatus { response, .. }
        | WriteCommand::AddTokenUsage { response, .. } => (
            WriteOutcome::Unit(Err(err)),
            Box::new(move |outcome| send_unit(response, outcome)),
        ),
        WriteCommand::CreateDecision { response, .. } => (
            WriteOutcome::Decision(Err(err)),
            Box::new(move |outcome| send_decision(response, outcome)),
        ),
        WriteCommand::CreateRequirement { response, .. } => (
            WriteOutcome::Requirement(Err(err)),
            Box::new(move |outcome| send_requirement(response, outcome)),
        ),
        WriteCommand::CreateConstraint { response, .. } => (
            WriteOutcome::Constraint(Err(err)),
            Box::new(move |outcome| send_constraint(response, outcome)),
        ),
        WriteCommand::RegisterArtifact { response, .. } => (
            WriteOutcome::Artifact(Err(err)),
            Box::new(move |outcome| send_artifact(response, outcome)),
        ),
    }
}

fn send_unit(response: Sender<Result<(), PersistenceError>>, outcome: WriteOutcome) {
    let result = match outcome {
        WriteOutcome::Unit(result) => result,
        WriteOutcome::Fatal(message) => Err(PersistenceError::Io(message)),
        _ => Err(PersistenceError::Io("writer produced mismatched outcome".to_string())),
    };
    let _ = response.send(result);
}

fn send_pipeline_run(response: Sender<Result<PipelineRun, PersistenceError>>, outcome: WriteOutcome) {
    let result = match outcome {
        WriteOutcome::PipelineRun(result) => result,
        WriteOutcome::Fatal(message) => Err(PersistenceError::Io(message)),
        _ => Err(PersistenceError::Io("writer produced mismatched outcome".to_string())),
    };
    let _ = response.send(result);
}

fn send_decision(response: Sender<Result<Decision, PersistenceError>>, outcome: WriteOutcome) {
    let result = match outcome {
        WriteOutcome::Decision(result) => result,
        WriteOutcome::Fatal(message) => Err(PersistenceError::Io(message)),
        _ => Err(PersistenceError::Io("writer produced mismatched outcome".to_string())),
    };
    let _ = response.send(result);
}

fn send_requirement(response: Sender<Result<Requirement, PersistenceError>>, outcome: WriteOutcome) {
    let result = match outcome {
        WriteOutcome::Requirement(result) => result,
        WriteOutcome::Fatal(message) => Err(PersistenceError::Io(message)),
        _ => Err(PersistenceError::Io("writer produced mismatched outcome".to_string())),
    };
    let _ = response.send(result);
}

fn send_constraint(response: Sender<Result<Constraint, PersistenceError>>, outcome: WriteOutcome) {
    let result = match outcome {
        WriteOutcome::Constraint(result) => result,
        WriteOutcome::Fatal(message) => Err(PersistenceError::Io(message)),
        _ => Err(PersistenceError::Io("writer produced mismatched outcome".to_string())),
    };
    let _ = response.send(result);
}

fn send_artifact(response: Sender<Result<Artifact, PersistenceError>>, outcome: WriteOutcome) {
    let result = match outcome {
        WriteOutcome::Artifact(result) => result,
        WriteOutcome::Fatal(message) => Err(PersistenceError::Io(message)),
        _ => Err(PersistenceError::Io("writer produced mismatched outcome".to_string())),
    };
    let _ = response.send(result);
}

#[allow(clippy::too_many_lines)]
fn apply_command(tx: &Transaction<'_>, command: WriteCommand) -> (WriteOutcome, Box<dyn FnOnce(WriteOutcome)>) {
    match command {
        WriteCommand::CreatePipelineRun { input, response } => {
            let outcome = WriteOutcome::PipelineRun(create_pipeline_run(tx, input).map_err(Into::into));
            (outcome, Box::new(move |outcome| send_pipeline_run(response, outcome)))
        }
        WriteCommand::UpdatePipelineRun { id, patch, response } => {
            let outcome = WriteOutcome::Unit(update_pipeline_run(tx, id, patch).map_err(Into::into));
            (outcome, Box::new(move |outcome| send_unit(response, outcome)))
        }
        WriteCommand::CreateDecision { input, response } => {
            let outcome = WriteOutcome::Decision(create_decision(tx, input).map_err(Into::into));
            (outcome, Box::new(move |outcome| send_decision(response, outcome)))
        }
        WriteCommand::UpdateDecision { id, patch, response } => {
            let outcome = WriteOutcome::Unit(update_decision(tx, id, patch).map_err(Into::into));
            (outcome, Box::new(move |outcome| send_unit(response, outcome)))
        }
        WriteCommand::SupersedeDecision { original_id, superseding_id, response } => {
            let outcome =
                WriteOutcome::Unit(supersede_decision(tx, original_id, superseding_id).map_err(Into::into));
            (outcome, Box::new(move |outcome| send_unit(response, outcome)))
        }
        WriteCommand::CreateRequirement { input, response } => {
            let outcome = WriteOutcome::Requirement(create_requirement(tx, input).map_err(Into::into));
            (outcome, Box::new(move |outcome| send_requirement(response, outcome)))
        }
        WriteCommand::UpdateRequirementStatus { id, status, response } => {
            let outcome =
                WriteOutcome::Unit(update_requirement_status(tx, id, status).map_err(Into::into));
            (outcome, Box::new(move |outcome| send_unit(response, outcome)))
        }
        WriteCommand::CreateConstraint { input, response } => {
            let outcome = WriteOutcome::Constraint(create_constraint(tx, input).map_err(Into::into));
            (outcome, Box::new(move |outcome| send_constraint(response, outcome)))
        }
        WriteCommand::RegisterArtifact { input, response } => {
            let outcome = WriteOutcome::Artifact(register_artifact(tx, input).map_err(Into::into));
            (outcome, Box::new(move |outcome| send_artifact(response, outcome)))
        }
        WriteCommand::AddTokenUsage { input, response } => {
            let outcome = WriteOutcome::Unit(add_token_usage(tx, input).map_err(Into::into));
            (outcome, Box::new(move |outcome| send_unit(response, outcome)))
        }
    }
}

// ============================================================================
// SECTION: Per-Operation SQL
// ============================================================================

fn create_pipeline_run(tx: &Transaction<'_>, input: NewPipelineRun) -> Result<PipelineRun, SqliteStoreError> {
    use substrate_core::RunConfig;
    use substrate_core::RunStatus;
    use substrate_core::TokenUsageTotals;
    use substrate_core::Timestamp;

    let NewPipelineRun { methodology, concept, start_phase, parent_run_id } = input;

    let config = RunConfig::new(concept, start_phase.clone(), Timestamp::now());
    let config_json = serde_json::to_string(&config).map_err(|err| SqliteStoreError::Corrupt(err.to_string()))?;
    let token_usage = TokenUsageTotals::default();
    let token_usage_json =
        serde_json::to_string(&token_usage).map_err(|err| SqliteStoreError::Corrupt(err.to_string()))?;
    let status_text = serialize_enum_str(&RunStatus::Running)?;

    tx.execute(
        "INSERT INTO pipeline_runs
            (methodology, current_phase, status, parent_run_id, config_json, token_usage_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            &methodology,
            start_phase.as_str(),
            status_text,
            parent_run_id.map(RunId::get),
            config_json,
            token_usage_json
        ],
    )?;
    let id = RunId::from_raw(u64::try_from(tx.last_insert_rowid()).unwrap_or_default())
        .ok_or_else(|| SqliteStoreError::Corrupt("allocated zero pipeline run id".to_string()))?;

    Ok(PipelineRun {
        id,
        methodology,
        current_phase: start_phase,
        status: RunStatus::Running,
        parent_run_id,
        config,
        token_usage,
    })
}

fn update_pipeline_run(
    tx: &Transaction<'_>,
    id: RunId,
    patch: PipelineRunPatch,
) -> Result<(), SqliteStoreError> {
    if patch.is_empty() {
        return Ok(());
    }
    let row_exists: Option<i64> = tx
        .query_row("SELECT id FROM pipeline_runs WHERE id = ?1", params![id.get()], |row| row.get(0))
        .optional()?;
    if row_exists.is_none() {
        return Err(SqliteStoreError::NotFound(format!("pipeline run {id}")));
    }

    if let Some(phase) = &patch.current_phase {
        tx.execute(
            "UPDATE pipeline_runs SET current_phase = ?1 WHERE id = ?2",
            params![phase.as_str(), id.get()],
        )?;
    }
    if let Some(status) = patch.status {
        let status_text = serialize_enum_str(&status)?;
        tx.execute("UPDATE pipeline_runs SET status = ?1 WHERE id = ?2", params![status_text, id.get()])?;
    }
    if let Some(config) = &patch.config {
        let config_json = serde_json::to_string(config).map_err(|err| SqliteStoreError::Corrupt(err.to_string()))?;
        tx.execute(
            "UPDATE pipeline_runs SET config_json = ?1 WHERE id = ?2",
            params![config_json, id.get()],
        )?;
    }
    if let Some(token_usage) = patch.token_usage {
        let token_usage_json =
            serde_json::to_string(&token_usage).map_err(|err| SqliteStoreError::Corrupt(err.to_string()))?;
        tx.execute(
            "UPDATE pipeline_runs SET token_usage_json = ?1 WHERE id = ?2",
            params![token_usage_json, id.get()],
        )?;
    }
    Ok(())
}

fn create_decision(tx: &Transaction<'_>, input: NewDecision) -> Result<Decision, SqliteStoreError> {
    let value_json =
        serde_json::to_string(&input.value).map_err(|err| SqliteStoreError::Corrupt(err.to_string()))?;
    tx.execute(
        "INSERT INTO decisions
            (pipeline_run_id, phase, category, key, value_json, rationale, superseded_by)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL)",
        params![
            input.pipeline_run_id.get(),
            input.phase.as_str(),
            input.category.as_str(),
            input.key.as_str(),
            value_json,
            &input.rationale
        ],
    )?;
    let id = DecisionId::from_raw(u64::try_from(tx.last_insert_rowid()).unwrap_or_default())
        .ok_or_else(|| SqliteStoreError::Corrupt("allocated zero decision id".to_string()))?;
    Ok(Decision {
        id,
        pipeline_run_id: input.pipeline_run_id,
        phase: input.phase,
        category: input.category,
        key: input.key,
        value: input.value,
        rationale: input.rationale,
        superseded_by: None,
    })
}

fn update_decision(tx: &Transaction<'_>, id: DecisionId, patch: DecisionPatch) -> Result<(), SqliteStoreError> {
    if patch.is_empty() {
        return Ok(());
    }
    let row_exists: Option<i64> =
        tx.query_row("SELECT id FROM decisions WHERE id = ?1", params![id.get()], |row| row.get(0)).optional()?;
    if row_exists.is_none() {
        return Err(SqliteStoreError::NotFound(format!("decision {id}")));
    }
    if let Some(value) = &patch.value {
        let value_json = serde_json::to_string(value).map_err(|err| SqliteStoreError::Corrupt(err.to_string()))?;
        tx.execute("UPDATE decisions SET value_json = ?1 WHERE id = ?2", params![value_json, id.get()])?;
    }
    if let Some(rationale) = &patch.rationale {
        tx.execute("UPDATE decisions SET rationale = ?1 WHERE id = ?2", params![rationale, id.get()])?;
    }
    Ok(())
}

fn supersede_decision(
    tx: &Transaction<'_>,
    original_id: DecisionId,
    superseding_id: DecisionId,
) -> Result<(), SqliteStoreError> {
    let current: Option<Option<i64>> = tx
        .query_row("SELECT superseded_by FROM decisions WHERE id = ?1", params![original_id.get()], |row| {
            row.get(0)
        })
        .optional()?;
    let Some(superseded_by) = current else {
        return Err(SqliteStoreError::NotFound(format!("decision {original_id}")));
    };
    if superseded_by.is_some() {
        return Err(SqliteStoreError::Conflict(format!(
            "decision {original_id} is already superseded"
        )));
    }
    tx.execute(
        "UPDATE decisions SET superseded_by = ?1 WHERE id = ?2",
        params![superseding_id.get(), original_id.get()],
    )?;
    Ok(())
}

fn create_requirement(tx: &Transaction<'_>, input: NewRequirement) -> Result<Requirement, SqliteStoreError> {
    let type_text = serialize_enum_str(&input.requirement_type)?;
    let priority_text = serialize_enum_str(&input.priority)?;
    let status_text = serialize_enum_str(&input.status)?;
    tx.execute(
        "INSERT INTO requirements (pipeline_run_id, source, requirement_type, description, priority, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            input.pipeline_run_id.get(),
            &input.source,
            type_text,
            &input.description,
            priority_text,
            status_text
        ],
    )?;
    let id = RequirementId::from_raw(u64::try_from(tx.last_insert_rowid()).unwrap_or_default())
        .ok_or_else(|| SqliteStoreError::Corrupt("allocated zero requirement id".to_string()))?;
    Ok(Requirement {
        id,
        pipeline_run_id: input.pipeline_run_id,
        source: input.source,
        requirement_type: input.requirement_type,
        description: input.description,
        priority: input.priority,
        status: input.status,
    })
}

fn update_requirement_status(
    tx: &Transaction<'_>,
    id: RequirementId,
    status: RequirementStatus,
) -> Result<(), SqliteStoreError> {
    let status_text = serialize_enum_str(&status)?;
    let affected = tx.execute("UPDATE requirements SET status = ?1 WHERE id = ?2", params![status_text, id.get()])?;
    if affected == 0 {
        return Err(SqliteStoreError::NotFound(format!("requirement {id}")));
    }
    Ok(())
}

fn create_constraint(tx: &Transaction<'_>, input: NewConstraint) -> Result<Constraint, SqliteStoreError> {
    tx.execute(
        "INSERT INTO constraints (pipeline_run_id, category, description, source) VALUES (?1, ?2, ?3, ?4)",
        params![input.pipeline_run_id.get(), &input.category, &input.description, &input.source],
    )?;
    let id = substrate_core::ConstraintId::from_raw(u64::try_from(tx.last_insert_rowid()).unwrap_or_default())
        .ok_or_else(|| SqliteStoreError::Corrupt("allocated zero constraint id".to_string()))?;
    Ok(Constraint {
        id,
        pipeline_run_id: input.pipeline_run_id,
        category: input.category,
        description: input.description,
        source: input.source,
    })
}

fn register_artifact(tx: &Transaction<'_>, input: NewArtifact) -> Result<Artifact, SqliteStoreError> {
    let content_hash = input.content.as_deref().map(substrate_core::hash_bytes);
    tx.execute(
        "INSERT INTO artifacts (pipeline_run_id, phase, artifact_type, path, content_hash, summary)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            input.pipeline_run_id.get(),
            input.phase.as_str(),
            input.artifact_type.as_str(),
            &input.path,
            content_hash.as_ref().map(substrate_core::HashDigest::as_str),
            &input.summary
        ],
    )?;
    let id = substrate_core::ArtifactId::from_raw(u64::try_from(tx.last_insert_rowid()).unwrap_or_default())
        .ok_or_else(|| SqliteStoreError::Corrupt("allocated zero artifact id".to_string()))?;
    Ok(Artifact {
        id,
        pipeline_run_id: input.pipeline_run_id,
        phase: input.phase,
        artifact_type: input.artifact_type,
        path: input.path,
        content_hash,
        summary: input.summary,
    })
}

fn add_token_usage(tx: &Transaction<'_>, input: TokenUsage) -> Result<(), SqliteStoreError> {
    tx.execute(
        "INSERT INTO token_usage (pipeline_run_id, phase, agent, input_tokens, output_tokens, cost_cents)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            input.pipeline_run_id.get(),
            input.phase.as_str(),
            input.agent.as_str(),
            input.input_tokens,
            input.output_tokens,
            input.cost_cents
        ],
    )?;
    Ok(())
}
