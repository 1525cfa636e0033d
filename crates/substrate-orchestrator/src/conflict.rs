// crates/substrate-orchestrator/src/conflict.rs
// ============================================================================
// Module: Conflict Detector
// Description: Groups story keys that would touch the same module.
// Purpose: Pure function feeding the Implementation Orchestrator's
// serial-within-group / parallel-across-group scheduling (spec.md §4.7).
// Dependencies: substrate-core, substrate-config
// ============================================================================

//! ## Overview
//! `detect_conflict_groups` maps each story key to a module set via
//! [`SubstrateConfig::modules_for_story`], then computes the transitive
//! closure of "shares a module" over those sets. A singleton input produces
//! one group of size one; a story with no configured modules (neither its
//! own key nor its epic id appears in the classification table) falls back
//! to its own singleton module, so unclassified stories are never
//! accidentally merged with one another — including two stories under the
//! same epic, which `modules_for_story` keys independently unless the
//! table classifies them at the coarser epic level.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::collections::HashSet;

use substrate_config::SubstrateConfig;
use substrate_core::StoryKey;

/// Groups `story_keys` into maximal sets that share at least one module,
/// per `config`'s module-classification table.
#[must_use]
pub fn detect_conflict_groups(story_keys: &[StoryKey], config: &SubstrateConfig) -> Vec<Vec<StoryKey>> {
    if story_keys.is_empty() {
        return Vec::new();
    }

    let story_modules: Vec<HashSet<String>> = story_keys
        .iter()
        .map(|key| config.modules_for_story(key.as_str()).into_iter().collect())
        .collect();

    // Union-find over story indices, merging any two stories whose module
    // sets intersect.
    let mut parent: Vec<usize> = (0..story_keys.len()).collect();

    fn find(parent: &mut [usize], node: usize) -> usize {
        if parent[node] != node {
            parent[node] = find(parent, parent[node]);
        }
        parent[node]
    }

    fn union(parent: &mut [usize], a: usize, b: usize) {
        let root_a = find(parent, a);
        let root_b = find(parent, b);
        if root_a != root_b {
            parent[root_b] = root_a;
        }
    }

    let mut module_to_first_story: HashMap<&str, usize> = HashMap::new();
    for (index, modules) in story_modules.iter().enumerate() {
        for module in modules {
            if let Some(&first) = module_to_first_story.get(module.as_str()) {
                union(&mut parent, first, index);
            } else {
                module_to_first_story.insert(module.as_str(), index);
            }
        }
    }

    let mut groups: HashMap<usize, Vec<StoryKey>> = HashMap::new();
    for index in 0..story_keys.len() {
        let root = find(&mut parent, index);
        groups.entry(root).or_default().push(story_keys[index].clone());
    }

    let mut result: Vec<Vec<StoryKey>> = groups.into_values().collect();
    result.sort_by(|a, b| a.first().map(StoryKey::as_str).cmp(&b.first().map(StoryKey::as_str)));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn groups_always_partition_the_input(epic_count in 1usize..6, story_count in 1usize..12) {
            let config = SubstrateConfig::default();
            let keys: Vec<StoryKey> = (0..story_count)
                .map(|i| StoryKey::new(format!("epic{}-{}", i % epic_count, i)))
                .collect();
            let groups = detect_conflict_groups(&keys, &config);
            let total: usize = groups.iter().map(Vec::len).sum();
            prop_assert_eq!(total, keys.len());
            let mut seen = std::collections::HashSet::new();
            for group in &groups {
                for key in group {
                    prop_assert!(seen.insert(key.as_str().to_string()));
                }
            }
        }
    }

    fn config_with_modules(entries: &[(&str, &[&str])]) -> SubstrateConfig {
        let mut config = SubstrateConfig::default();
        for (epic, modules) in entries {
            config
                .module_classification
                .insert((*epic).to_string(), modules.iter().map(|m| (*m).to_string()).collect());
        }
        config
    }

    #[test]
    fn empty_input_yields_no_groups() {
        let config = SubstrateConfig::default();
        assert!(detect_conflict_groups(&[], &config).is_empty());
    }

    #[test]
    fn singleton_input_yields_one_group_of_size_one() {
        let config = SubstrateConfig::default();
        let groups = detect_conflict_groups(&[StoryKey::new("epic1-1")], &config);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 1);
    }

    #[test]
    fn shared_module_merges_stories_into_one_group() {
        let config = config_with_modules(&[("epic1", &["billing"]), ("epic2", &["billing"]), ("epic3", &["auth"])]);
        let keys = vec![StoryKey::new("epic1-1"), StoryKey::new("epic2-1"), StoryKey::new("epic3-1")];
        let groups = detect_conflict_groups(&keys, &config);
        assert_eq!(groups.len(), 2);
        let sizes: Vec<usize> = groups.iter().map(Vec::len).collect();
        assert!(sizes.contains(&2));
        assert!(sizes.contains(&1));
    }

    #[test]
    fn unclassified_stories_remain_singletons() {
        let config = SubstrateConfig::default();
        let keys = vec![StoryKey::new("epicA-1"), StoryKey::new("epicB-1")];
        let groups = detect_conflict_groups(&keys, &config);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn four_story_keys_serialize_into_expected_groups() {
        let config = config_with_modules(&[
            ("epic1", &["billing", "invoicing"]),
            ("epic2", &["invoicing"]),
            ("epic3", &["reporting"]),
            ("epic4", &["reporting"]),
        ]);
        let keys = vec![
            StoryKey::new("epic1-1"),
            StoryKey::new("epic2-1"),
            StoryKey::new("epic3-1"),
            StoryKey::new("epic4-1"),
        ];
        let groups = detect_conflict_groups(&keys, &config);
        assert_eq!(groups.len(), 2);
        for group in &groups {
            assert_eq!(group.len(), 2);
        }
    }

    /// spec.md §8 scenario 4: story keys `10-1`, `10-2`, `10-4`, `10-5` all
    /// share epic `10`, yet `10-1`/`10-2` share a module while `10-4` and
    /// `10-5` each stand alone — three groups are expected even though every
    /// key has the same epic id.
    #[test]
    fn same_epic_stories_split_across_groups_by_module() {
        let config = config_with_modules(&[("10-1", &["billing"]), ("10-2", &["billing"]), ("10-4", &["reporting"]), ("10-5", &["search"])]);
        let keys = vec![StoryKey::new("10-1"), StoryKey::new("10-2"), StoryKey::new("10-4"), StoryKey::new("10-5")];
        let groups = detect_conflict_groups(&keys, &config);
        assert_eq!(groups.len(), 3);
        let sizes: Vec<usize> = groups.iter().map(Vec::len).collect();
        assert_eq!(sizes.iter().filter(|&&n| n == 2).count(), 1);
        assert_eq!(sizes.iter().filter(|&&n| n == 1).count(), 2);
    }

    #[test]
    fn unclassified_same_epic_stories_remain_distinct_singletons() {
        let config = SubstrateConfig::default();
        let keys = vec![StoryKey::new("10-1"), StoryKey::new("10-2")];
        let groups = detect_conflict_groups(&keys, &config);
        assert_eq!(groups.len(), 2);
    }
}
