// crates/substrate-orchestrator/src/readiness.rs
// ============================================================================
// Module: Solutioning Readiness Heuristic
// Description: Coarse functional-requirement-to-story keyword match.
// Purpose: Implements the solutioning exit gate's readiness check (spec.md
// §4.5, §9 Open Questions).
// Dependencies: substrate-core
// ============================================================================

//! ## Overview
//! spec.md §9 leaves the exact match algorithm unspecified beyond "keyword
//! match". [`DESIGN.md`] records the decision: a coarse, case-insensitive
//! token-overlap check (Jaccard-ish over lowercased word sets), not a
//! semantic match. A requirement is "covered" once at least one story
//! description shares a meaningful word with it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashSet;

use substrate_core::Requirement;

/// Words too common to carry match signal; excluded from both sides.
const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "to", "of", "for", "in", "on", "with", "is", "as", "by", "that", "this", "be",
    "are", "it", "at", "from", "will", "shall", "must", "should", "can",
];

fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|word| word.len() > 2 && !STOPWORDS.contains(&word.as_str()))
        .collect()
}

/// Returns `true` when every requirement in `requirements` has at least one
/// story description in `story_descriptions` sharing a non-stopword token.
/// An empty requirement list is trivially ready.
#[must_use]
pub fn requirements_covered_by_stories(requirements: &[Requirement], story_descriptions: &[String]) -> bool {
    if requirements.is_empty() {
        return true;
    }
    let story_tokens: Vec<HashSet<String>> = story_descriptions.iter().map(|d| tokenize(d)).collect();
    requirements.iter().all(|requirement| {
        let requirement_tokens = tokenize(&requirement.description);
        if requirement_tokens.is_empty() {
            return false;
        }
        story_tokens
            .iter()
            .any(|tokens| tokens.intersection(&requirement_tokens).count() > 0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use substrate_core::RequirementId;
    use substrate_core::RequirementPriority;
    use substrate_core::RequirementStatus;
    use substrate_core::RequirementType;
    use substrate_core::RunId;

    fn requirement(description: &str) -> Requirement {
        Requirement {
            id: RequirementId::new(std::num::NonZeroU64::new(1).expect("nonzero")),
            pipeline_run_id: RunId::new(std::num::NonZeroU64::new(1).expect("nonzero")),
            source: "prd".into(),
            requirement_type: RequirementType::Functional,
            description: description.into(),
            priority: RequirementPriority::Must,
            status: RequirementStatus::Active,
        }
    }

    #[test]
    fn empty_requirements_are_trivially_ready() {
        assert!(requirements_covered_by_stories(&[], &[]));
    }

    #[test]
    fn matching_keyword_satisfies_readiness() {
        let requirements = vec![requirement("Users can export invoices as PDF")];
        let stories = vec!["Story: generate a PDF export of an invoice".to_string()];
        assert!(requirements_covered_by_stories(&requirements, &stories));
    }

    #[test]
    fn unmatched_requirement_fails_readiness() {
        let requirements = vec![requirement("Users can export invoices as PDF")];
        let stories = vec!["Story: allow password reset via email".to_string()];
        assert!(!requirements_covered_by_stories(&requirements, &stories));
    }

    #[test]
    fn stopword_only_requirement_never_satisfied() {
        let requirements = vec![requirement("it is to be")];
        let stories = vec!["it is to be".to_string()];
        assert!(!requirements_covered_by_stories(&requirements, &stories));
    }
}
