// crates/substrate-supervisor/src/kill.rs
// ============================================================================
// Module: Process Tree Kill
// Description: Enumerates a process and its descendants and terminates them,
// graceful term first, force kill after a bounded grace period.
// Purpose: spec.md §4.9's "collects the orchestrator pid plus descendants,
// graceful term, bounded grace, force kill" stall-recovery step.
// Dependencies: sysinfo, tokio
// ============================================================================

//! ## Overview
//! `sysinfo` is used here and nowhere else in the workspace: no crate in the
//! teacher's own dependency stack does OS process-tree enumeration, since
//! `decision-gate`'s providers are invoked and awaited in-line rather than
//! monitored from the outside.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashSet;
use std::time::Duration;

use sysinfo::Pid;
use sysinfo::Signal;
use sysinfo::System;

// ============================================================================
// SECTION: Process Tree Enumeration
// ============================================================================

/// Returns `root` plus every process whose parent chain leads back to it, per
/// the `system` snapshot passed in.
///
/// Iterates to a fixed point since `sysinfo`'s process map is not ordered
/// parent-before-child.
#[must_use]
pub fn process_tree(system: &System, root: u32) -> Vec<u32> {
    let mut tree = HashSet::new();
    tree.insert(Pid::from_u32(root));

    loop {
        let mut grew = false;
        for (pid, process) in system.processes() {
            if tree.contains(pid) {
                continue;
            }
            if let Some(parent) = process.parent() {
                if tree.contains(&parent) {
                    tree.insert(*pid);
                    grew = true;
                }
            }
        }
        if !grew {
            break;
        }
    }

    tree.into_iter().map(Pid::as_u32).collect()
}

// ============================================================================
// SECTION: Terminate
// ============================================================================

/// Sends a graceful termination signal to `root` and every descendant, waits
/// `grace`, then force-kills whatever is still alive. Returns every pid
/// actually signalled, for [`substrate_events::EventPayload::SupervisorKill`]'s
/// `pids` field.
///
/// Platforms that reject [`Signal::Term`] (reported via `kill_with` returning
/// `None`) fall straight through to the force-kill pass after the grace
/// period, so the process is still reclaimed.
pub async fn kill_process_tree(root: u32, grace: Duration) -> Vec<u32> {
    let snapshot = System::new_all();
    let tree = process_tree(&snapshot, root);

    let mut signalled = HashSet::new();
    for &raw in &tree {
        if let Some(process) = snapshot.process(Pid::from_u32(raw)) {
            if process.kill_with(Signal::Term).unwrap_or(false) {
                signalled.insert(raw);
            }
        }
    }

    tokio::time::sleep(grace).await;

    let snapshot = System::new_all();
    for &raw in &tree {
        if let Some(process) = snapshot.process(Pid::from_u32(raw)) {
            if process.kill() {
                signalled.insert(raw);
            }
        }
    }

    signalled.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_tree_always_contains_the_root() {
        let system = System::new_all();
        let tree = process_tree(&system, std::process::id());
        assert!(tree.contains(&std::process::id()));
    }
}
