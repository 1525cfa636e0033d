// crates/substrate-contract/src/phase.rs
// ============================================================================
// Module: Phase and Artifact Vocabulary
// Description: Canonical phase names and artifact type constants.
// Purpose: Centralize the built-in methodology phase/artifact identifiers.
// Dependencies: none
// ============================================================================

//! ## Overview
//! The four built-in phases and their canonical artifact types, exactly as
//! named in spec.md §4.4. These are plain string constants rather than an
//! enum so that a methodology pack (out of scope, §1) can register
//! additional phases without this crate changing.

// ============================================================================
// SECTION: Phase Names
// ============================================================================

/// Analysis phase name.
pub const PHASE_ANALYSIS: &str = "analysis";
/// Planning phase name.
pub const PHASE_PLANNING: &str = "planning";
/// Solutioning phase name.
pub const PHASE_SOLUTIONING: &str = "solutioning";
/// Implementation phase name.
pub const PHASE_IMPLEMENTATION: &str = "implementation";

/// Built-in phases in registration order.
pub const BUILTIN_PHASES: [&str; 4] =
    [PHASE_ANALYSIS, PHASE_PLANNING, PHASE_SOLUTIONING, PHASE_IMPLEMENTATION];

// ============================================================================
// SECTION: Artifact Types
// ============================================================================

/// Product brief artifact type, produced by analysis.
pub const ARTIFACT_PRODUCT_BRIEF: &str = "product-brief";
/// PRD artifact type, produced by planning.
pub const ARTIFACT_PRD: &str = "prd";
/// Architecture artifact type, produced by solutioning.
pub const ARTIFACT_ARCHITECTURE: &str = "architecture";
/// Stories artifact type, produced by solutioning.
pub const ARTIFACT_STORIES: &str = "stories";
/// Implementation-complete artifact type, produced by implementation.
pub const ARTIFACT_IMPLEMENTATION_COMPLETE: &str = "implementation-complete";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_phases_are_in_spec_order() {
        assert_eq!(
            BUILTIN_PHASES,
            ["analysis", "planning", "solutioning", "implementation"]
        );
    }
}
