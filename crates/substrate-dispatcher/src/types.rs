// crates/substrate-dispatcher/src/types.rs
// ============================================================================
// Module: Dispatch Types
// Description: Request/outcome shapes for a single sub-agent dispatch.
// Purpose: Give callers a typed handle over `dispatch({taskType, prompt,
// agent?, model?})` without depending on the process layer.
// Dependencies: substrate-core, substrate-contract, serde_json
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde_json::Value;
use substrate_contract::PromptSection;
use substrate_contract::TaskType;
use substrate_contract::TokenEstimate;
use substrate_core::AgentName;

// ============================================================================
// SECTION: Dispatch Identifier
// ============================================================================

/// Identifier for a single dispatch invocation, unique within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DispatchId(u64);

impl DispatchId {
    /// Returns the raw id value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for DispatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Monotonic allocator for [`DispatchId`]s.
#[derive(Debug, Default)]
pub(crate) struct DispatchIdAllocator {
    next: AtomicU64,
}

impl DispatchIdAllocator {
    pub(crate) fn next(&self) -> DispatchId {
        DispatchId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

// ============================================================================
// SECTION: Dispatch Request
// ============================================================================

/// Request to run a single sub-agent task.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    /// Task type, selecting the result schema used for validation.
    pub task_type: TaskType,
    /// Prompt template with `{{section_name}}` placeholders.
    pub template: String,
    /// Sections fed to the Prompt Assembler (spec.md §6.2).
    pub sections: Vec<PromptSection>,
    /// Token ceiling enforced by the Prompt Assembler.
    pub token_ceiling: u64,
    /// Optional named agent; `None` selects the dispatcher's default.
    pub agent: Option<AgentName>,
    /// Optional model override passed through to the agent process.
    pub model: Option<String>,
    /// Optional per-dispatch timeout, in seconds. `None` means no timeout.
    pub timeout_secs: Option<u64>,
}

// ============================================================================
// SECTION: Dispatch Outcome
// ============================================================================

/// Terminal status of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    /// The agent exited zero and its output parsed (or needed no parsing).
    Completed,
    /// The agent exited non-zero, failed to spawn, or its output failed to parse.
    Failed,
    /// The dispatch was cancelled via [`crate::dispatcher::Dispatcher::shutdown`].
    Cancelled,
}

/// Outcome of a completed, failed, or cancelled dispatch.
///
/// # Invariants
/// - `parse_error` is `Some` if and only if `parsed` is `None` and the task
///   type expected structured output.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// Identifier of the dispatch this outcome belongs to.
    pub id: DispatchId,
    /// Terminal status.
    pub status: DispatchStatus,
    /// Process exit code, if the process ran to completion.
    pub exit_code: Option<i32>,
    /// Raw captured stdout.
    pub output: String,
    /// Structured JSON extracted and schema-validated from `output`.
    pub parsed: Option<Value>,
    /// Populated iff `parsed` is `None` for a task type expecting output.
    pub parse_error: Option<String>,
    /// Wall-clock duration of the dispatch, in milliseconds.
    pub duration_ms: u64,
    /// Estimated input/output token counts.
    pub token_estimate: TokenEstimate,
}
