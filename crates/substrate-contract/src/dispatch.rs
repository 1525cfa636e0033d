// crates/substrate-contract/src/dispatch.rs
// ============================================================================
// Module: Dispatch Task Vocabulary
// Description: Task type enum and the typed dispatch request/response shapes
// shared between the dispatcher and the orchestrators.
// Purpose: Give every sub-agent invocation a stable, matchable task type.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! `TaskType` enumerates every sub-agent task Substrate can dispatch. It
//! drives which result schema (§6.4) and which per-task-type schema
//! validation (§4.3 step 3) applies.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Task Type
// ============================================================================

/// Sub-agent task type, one per distinct dispatch kind in the methodology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskType {
    /// Analysis-phase brief generation.
    Analysis,
    /// Planning-phase requirements extraction.
    Planning,
    /// Solutioning-phase architecture and story generation.
    Solutioning,
    /// Implementation: create a story file.
    CreateStory,
    /// Implementation: develop a story.
    DevStory,
    /// Implementation: review a story's changes.
    CodeReview,
    /// Implementation: apply requested fixes.
    Fix,
}

impl TaskType {
    /// Returns a stable lowercase label for logging and event payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::Planning => "planning",
            Self::Solutioning => "solutioning",
            Self::CreateStory => "create-story",
            Self::DevStory => "dev-story",
            Self::CodeReview => "code-review",
            Self::Fix => "fix",
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_type_labels_are_kebab_case() {
        assert_eq!(TaskType::CreateStory.as_str(), "create-story");
        assert_eq!(TaskType::CodeReview.to_string(), "code-review");
    }
}
