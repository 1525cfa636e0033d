// crates/substrate-contract/src/results.rs
// ============================================================================
// Module: Sub-Agent Result Schemas
// Description: Cross-consistent result shapes for create-story, dev-story, and
// code-review dispatches.
// Purpose: Give the Implementation Orchestrator typed, self-validating results.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! These three schemas share the `result` enum (`success | failed`), per
//! spec.md §4.6 and §6.4. `CodeReviewResult` additionally enforces the
//! cross-field invariant `issues == issue_list.len()`; on deserialize, a
//! mismatched `issues` count is silently rewritten to match, mirroring the
//! teacher's schema auto-correction idiom (spec.md §4.3 step 3, §9).

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Shared Result Enum
// ============================================================================

/// Shared outcome enum across all sub-agent dispatch result schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// The dispatch completed its task successfully.
    Success,
    /// The dispatch failed to complete its task.
    Failed,
}

/// Token estimate reported alongside every sub-agent result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEstimate {
    /// Estimated input tokens.
    pub input: u64,
    /// Estimated output tokens.
    pub output: u64,
}

// ============================================================================
// SECTION: Create Story
// ============================================================================

/// Result of a `create-story` dispatch.
///
/// # Invariants
/// - An empty or missing `story_file` is a valid (if unhappy) value; callers
///   decide what to do with it (spec.md §4.6: escalate with
///   `create-story-no-file`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateStoryResult {
    /// Dispatch outcome.
    pub result: ResultStatus,
    /// Path to the created story file, if any.
    #[serde(default)]
    pub story_file: Option<String>,
    /// Story key the story file was created for.
    pub story_key: String,
    /// Human-readable story title.
    pub story_title: String,
    /// Token usage for this dispatch.
    #[serde(rename = "tokenUsage")]
    pub token_usage: TokenEstimate,
}

// ============================================================================
// SECTION: Dev Story
// ============================================================================

/// Test-suite outcome reported by `dev-story`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestOutcome {
    /// All tests passed.
    Pass,
    /// At least one test failed.
    Fail,
}

/// Result of a `dev-story` dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevStoryResult {
    /// Dispatch outcome.
    pub result: ResultStatus,
    /// Acceptance criteria that were met.
    #[serde(default)]
    pub ac_met: Vec<String>,
    /// Acceptance criteria that failed.
    #[serde(default)]
    pub ac_failures: Vec<String>,
    /// Files modified by this dispatch.
    #[serde(default)]
    pub files_modified: Vec<String>,
    /// Test-suite outcome.
    pub tests: TestOutcome,
    /// Token usage for this dispatch.
    #[serde(rename = "tokenUsage")]
    pub token_usage: TokenEstimate,
}

// ============================================================================
// SECTION: Code Review
// ============================================================================

/// Code review verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewVerdict {
    /// Ready to ship as-is.
    ShipIt,
    /// Minor fixes recommended but not blocking.
    NeedsMinorFixes,
    /// Major rework required.
    NeedsMajorRework,
}

/// Severity of a single review issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    /// Blocking issue.
    Blocker,
    /// Major issue.
    Major,
    /// Minor issue.
    Minor,
    /// Informational note.
    Info,
}

/// One review issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewIssue {
    /// Issue severity.
    pub severity: IssueSeverity,
    /// File the issue applies to.
    pub file: String,
    /// Issue description.
    pub desc: String,
}

/// Result of a `code-review` dispatch.
///
/// # Invariants
/// - `issues == issue_list.len()` always holds after deserialization; a
///   mismatched `issues` value supplied by the agent is corrected in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeReviewResult {
    /// Dispatch outcome.
    pub result: ResultStatus,
    /// Review verdict.
    pub verdict: ReviewVerdict,
    /// Issue count, always kept consistent with `issue_list.len()`.
    pub issues: usize,
    /// Enumerated issues.
    pub issue_list: Vec<ReviewIssue>,
    /// Token usage for this dispatch.
    pub token_usage: TokenEstimate,
}

impl<'de> Deserialize<'de> for CodeReviewResult {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            result: ResultStatus,
            verdict: ReviewVerdict,
            #[serde(default)]
            issues: usize,
            #[serde(default)]
            issue_list: Vec<ReviewIssue>,
            #[serde(rename = "tokenUsage", default)]
            token_usage: TokenEstimate,
        }

        let raw = Raw::deserialize(deserializer)?;
        Ok(Self {
            result: raw.result,
            verdict: raw.verdict,
            issues: raw.issue_list.len(),
            issue_list: raw.issue_list,
            token_usage: raw.token_usage,
        })
    }
}

impl CodeReviewResult {
    /// Returns true when the cross-field invariant currently holds. Always
    /// `true` for values produced by [`Deserialize`], useful for asserting
    /// invariants on values built by hand (e.g. in tests or fakes).
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.issues == self.issue_list.len()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn code_review_result_autocorrects_mismatched_issue_count() {
        let raw = json!({
            "result": "success",
            "verdict": "NEEDS_MINOR_FIXES",
            "issues": 99,
            "issue_list": [
                {"severity": "minor", "file": "a.rs", "desc": "nit"},
            ],
            "tokenUsage": {"input": 10, "output": 20},
        });
        let parsed: CodeReviewResult = serde_json::from_value(raw).expect("parse");
        assert_eq!(parsed.issues, 1);
        assert!(parsed.is_consistent());
    }

    #[test]
    fn code_review_result_defaults_missing_issue_list() {
        let raw = json!({"result": "success", "verdict": "SHIP_IT"});
        let parsed: CodeReviewResult = serde_json::from_value(raw).expect("parse");
        assert_eq!(parsed.issues, 0);
        assert!(parsed.issue_list.is_empty());
    }

    #[test]
    fn create_story_result_empty_story_file_parses_as_none_marker() {
        let raw = json!({
            "result": "success",
            "story_file": "",
            "story_key": "10-2",
            "story_title": "t",
            "tokenUsage": {"input": 1, "output": 1},
        });
        let parsed: CreateStoryResult = serde_json::from_value(raw).expect("parse");
        assert_eq!(parsed.story_file.as_deref(), Some(""));
    }

    #[test]
    fn dev_story_result_round_trips() {
        let result = DevStoryResult {
            result: ResultStatus::Success,
            ac_met: vec!["ac1".to_string()],
            ac_failures: Vec::new(),
            files_modified: vec!["src/lib.rs".to_string()],
            tests: TestOutcome::Pass,
            token_usage: TokenEstimate { input: 5, output: 7 },
        };
        let json = serde_json::to_string(&result).expect("serialize");
        let back: DevStoryResult = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(result, back);
    }
}
