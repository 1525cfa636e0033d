// crates/substrate-cli/src/events_writer.rs
// ============================================================================
// Module: NDJSON Event Writer
// Description: Subscribes a CLI run's Event Bus to every known event name
// and writes each as one line of JSON on stdout.
// Purpose: spec.md §6.3 — "one JSON object per line" when `--events` is
// passed to `auto run`/`auto resume`.
// Dependencies: substrate-events, serde_json
// ============================================================================

//! ## Overview
//! `EventBus::on` only registers a handler against one exact event name —
//! there is no wildcard subscription. This writer registers the same
//! handler under every event-name constant the bus re-exports, so a single
//! writer instance mirrors the whole stream regardless of which events a
//! given run actually emits.

use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;

use substrate_events::Event;
use substrate_events::EventBus;

/// Registers an NDJSON writer on every known event name.
///
/// Serialization failures and write failures are swallowed rather than
/// propagated: a broken events stream must never abort the pipeline run
/// driving it.
pub fn attach_ndjson_writer(bus: &EventBus) {
    let stdout = Arc::new(Mutex::new(std::io::stdout()));
    for name in EVENT_NAMES {
        let stdout = Arc::clone(&stdout);
        bus.on(name, move |event: &Event| {
            write_event_line(&stdout, event);
        });
    }
}

fn write_event_line(stdout: &Arc<Mutex<std::io::Stdout>>, event: &Event) {
    let Ok(line) = serde_json::to_string(event) else {
        return;
    };
    if let Ok(mut guard) = stdout.lock() {
        let _ = writeln!(guard, "{line}");
    }
}

const EVENT_NAMES: [&str; 19] = [
    substrate_events::PIPELINE_START,
    substrate_events::PIPELINE_COMPLETE,
    substrate_events::PIPELINE_HEARTBEAT,
    substrate_events::STORY_PHASE,
    substrate_events::STORY_DONE,
    substrate_events::STORY_ESCALATION,
    substrate_events::STORY_WARN,
    substrate_events::STORY_LOG,
    substrate_events::STORY_STALL,
    substrate_events::WORKTREE_CREATED,
    substrate_events::WORKTREE_MERGED,
    substrate_events::WORKTREE_CONFLICT,
    substrate_events::WORKTREE_REMOVED,
    substrate_events::TASK_READY,
    substrate_events::ORCHESTRATOR_STORY_ESCALATED,
    substrate_events::ORCHESTRATOR_COMPLETE,
    substrate_events::SUPERVISOR_KILL,
    substrate_events::SUPERVISOR_RESTART,
    substrate_events::SUPERVISOR_ABORT,
];
