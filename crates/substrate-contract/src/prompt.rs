// crates/substrate-contract/src/prompt.rs
// ============================================================================
// Module: Prompt Assembler Contract
// Description: Pure function assembling a dispatch prompt from prioritized sections.
// Purpose: Fit prompt content under a token ceiling without ever dropping
// required content.
// Dependencies: none
// ============================================================================

//! ## Overview
//! [`assemble_prompt`] is a pure function: same inputs always produce the
//! same output, with no I/O. It is invoked by the dispatcher (out of this
//! crate) before every sub-agent spawn. Token count is estimated as
//! `ceil(byte_len / 4)`, matching spec.md §6.2.

// ============================================================================
// SECTION: Imports
// ============================================================================

// ============================================================================
// SECTION: Section Priority
// ============================================================================

/// Priority of a prompt section, governing drop order under ceiling pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SectionPriority {
    /// Dropped first under pressure.
    Optional,
    /// Truncated (with a marker) if dropping all optional sections is not enough.
    Important,
    /// Never dropped or truncated.
    Required,
}

/// One named prompt section, substituted into a `{{name}}` placeholder in
/// the template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSection {
    /// Section name, matched against `{{name}}` in the template.
    pub name: String,
    /// Section priority.
    pub priority: SectionPriority,
    /// Section content.
    pub content: String,
}

impl PromptSection {
    /// Creates a new prompt section.
    #[must_use]
    pub fn new(name: impl Into<String>, priority: SectionPriority, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority,
            content: content.into(),
        }
    }
}

/// Final state of a section after assembly, returned for caller introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledSection {
    /// Section name.
    pub name: String,
    /// Priority of the section.
    pub priority: SectionPriority,
    /// Whether the section was dropped entirely.
    pub dropped: bool,
    /// Whether the section's content was truncated (but not dropped).
    pub truncated: bool,
}

/// Output of [`assemble_prompt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPrompt {
    /// Final assembled prompt text.
    pub prompt: String,
    /// Estimated token count of the final prompt (`ceil(byte_len / 4)`).
    pub token_count: u64,
    /// Per-section outcome, in input order.
    pub sections: Vec<AssembledSection>,
    /// True iff any section was dropped or truncated.
    pub truncated: bool,
}

const TRUNCATION_MARKER: &str = "\n...[truncated]...\n";

/// Estimates token count as `ceil(byte_len / 4)`.
#[must_use]
pub fn estimate_tokens(text: &str) -> u64 {
    let bytes = text.len() as u64;
    bytes.div_ceil(4)
}

/// Assembles a prompt from `template` and `sections`, shedding optional
/// sections first, then truncating important sections, under pressure from
/// `token_ceiling`. Required sections are never dropped or truncated.
///
/// # Panics
///
/// Never panics; `token_ceiling == 0` simply yields maximal shedding.
#[must_use]
pub fn assemble_prompt(
    template: &str,
    sections: &[PromptSection],
    token_ceiling: u64,
) -> AssembledPrompt {
    let mut contents: Vec<String> = sections.iter().map(|s| s.content.clone()).collect();
    let mut dropped = vec![false; sections.len()];
    let mut truncated_flags = vec![false; sections.len()];

    let render = |contents: &[String]| -> String {
        let mut out = template.to_string();
        for (section, content) in sections.iter().zip(contents.iter()) {
            let placeholder = format!("{{{{{}}}}}", section.name);
            out = out.replace(&placeholder, content);
        }
        out
    };

    let mut current = render(&contents);
    let mut any_change = false;

    if estimate_tokens(&current) > token_ceiling {
        // Drop optional sections, largest first, until under ceiling or exhausted.
        let mut optional_indices: Vec<usize> = sections
            .iter()
            .enumerate()
            .filter(|(_, s)| s.priority == SectionPriority::Optional)
            .map(|(i, _)| i)
            .collect();
        optional_indices.sort_by_key(|&i| std::cmp::Reverse(contents[i].len()));

        for idx in optional_indices {
            if estimate_tokens(&current) <= token_ceiling {
                break;
            }
            contents[idx].clear();
            dropped[idx] = true;
            any_change = true;
            current = render(&contents);
        }
    }

    if estimate_tokens(&current) > token_ceiling {
        // Truncate important sections, preserving a marker, until under
        // ceiling or all important sections are fully truncated.
        let important_indices: Vec<usize> = sections
            .iter()
            .enumerate()
            .filter(|(_, s)| s.priority == SectionPriority::Important)
            .map(|(i, _)| i)
            .collect();

        for idx in important_indices {
            while estimate_tokens(&current) > token_ceiling && !contents[idx].is_empty() {
                let keep = contents[idx].len().saturating_sub(contents[idx].len() / 4 + 1);
                contents[idx].truncate(keep);
                if !contents[idx].ends_with(TRUNCATION_MARKER) {
                    contents[idx].push_str(TRUNCATION_MARKER);
                }
                truncated_flags[idx] = true;
                any_change = true;
                current = render(&contents);
            }
            if estimate_tokens(&current) <= token_ceiling {
                break;
            }
        }
    }

    // Required sections are never touched beyond this point, even if the
    // ceiling is still exceeded — fidelity to required content wins.
    let assembled_sections = sections
        .iter()
        .enumerate()
        .map(|(i, s)| AssembledSection {
            name: s.name.clone(),
            priority: s.priority,
            dropped: dropped[i],
            truncated: truncated_flags[i],
        })
        .collect();

    AssembledPrompt {
        token_count: estimate_tokens(&current),
        prompt: current,
        sections: assembled_sections,
        truncated: any_change,
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

    fn big_section(name: &str, priority: SectionPriority, bytes: usize) -> PromptSection {
        PromptSection::new(name, priority, "x".repeat(bytes))
    }

    #[test]
    fn fits_under_ceiling_without_changes() {
        let sections = vec![PromptSection::new("a", SectionPriority::Required, "short")];
        let result = assemble_prompt("body: {{a}}", &sections, 1000);
        assert!(!result.truncated);
        assert!(result.prompt.contains("short"));
    }

    #[test]
    fn drops_optional_before_touching_required() {
        let sections = vec![
            big_section("req", SectionPriority::Required, 40),
            big_section("opt", SectionPriority::Optional, 4000),
        ];
        let result = assemble_prompt("{{req}}{{opt}}", &sections, 20);
        assert!(result.truncated);
        assert!(result.sections[1].dropped);
        assert!(!result.sections[0].dropped);
        assert!(result.prompt.contains(&"x".repeat(40)));
    }

    #[test]
    fn truncates_important_when_dropping_optional_is_not_enough() {
        let sections = vec![
            big_section("req", SectionPriority::Required, 10),
            big_section("imp", SectionPriority::Important, 4000),
            big_section("opt", SectionPriority::Optional, 4000),
        ];
        let result = assemble_prompt("{{req}}{{imp}}{{opt}}", &sections, 20);
        assert!(result.sections[2].dropped);
        assert!(result.sections[1].truncated);
        assert!(!result.sections[0].dropped);
        assert!(!result.sections[0].truncated);
    }

    #[test]
    fn required_content_is_never_omitted() {
        let required_text = "must-keep-this-exact-text";
        let sections = vec![
            PromptSection::new("req", SectionPriority::Required, required_text),
            big_section("opt", SectionPriority::Optional, 4000),
        ];
        let result = assemble_prompt("{{req}} {{opt}}", &sections, 1);
        assert!(result.prompt.contains(required_text));
    }

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    proptest::proptest! {
        #[test]
        fn required_section_text_always_survives(extra in "[a-z]{0,200}") {
            let required_text = format!("REQUIRED-MARKER-{extra}");
            let sections = vec![
                PromptSection::new("req", SectionPriority::Required, required_text.clone()),
                big_section("opt", SectionPriority::Optional, 2000),
            ];
            let result = assemble_prompt("{{req}}{{opt}}", &sections, 5);
            prop_assert!(result.prompt.contains(&required_text));
        }
    }
}
