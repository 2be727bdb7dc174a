//! The process-wide live-branch registry and the task-local "current frontier".
//!
//! The frontier is the set of branches that [`crate::api::log`] and
//! [`crate::api::apply`] write to from wherever they're called. It's carried
//! with `tokio::task_local!` rather than a thread-local: a thread-local would
//! leak across tasks multiplexed onto the same worker thread, silently
//! attributing one task's logs to another's branches.
//!
//! Entering a new frontier (forking, disabling) is necessarily a scope-taking
//! operation in tokio's task-local model: there's no free-standing "set and
//! later unset", only "run this future/closure with this value in scope". See
//! [`crate::logger`] and [`crate::api`] for the consuming builders this drives.

use std::collections::HashSet;
use std::sync::OnceLock;

use dashmap::DashMap;
use tokio::task_local;

use crate::branch::Branch;
use crate::fail;
use crate::id::BranchId;

static LIVE_BRANCHES: OnceLock<DashMap<BranchId, Branch>> = OnceLock::new();

fn live_branches() -> &'static DashMap<BranchId, Branch> {
    LIVE_BRANCHES.get_or_init(DashMap::new)
}

pub(crate) fn register(branch: Branch) {
    live_branches().insert(branch.id().clone(), branch);
}

/// Removes a branch and every descendant reachable from it, via the ids
/// recorded in the registry at the time of the call.
pub(crate) fn deregister_subtree(root: &BranchId) {
    let mut pending = vec![root.clone()];
    while let Some(id) = pending.pop() {
        if let Some((_, branch)) = live_branches().remove(&id) {
            pending.extend(branch.children());
        }
    }
}

pub(crate) fn lookup(id: &BranchId) -> Branch {
    live_branches().get(id).map(|b| b.clone()).unwrap_or_else(|| fail::branch_not_live(id))
}

#[derive(Clone)]
pub(crate) struct Frontier {
    pub ids: HashSet<BranchId>,
    pub enabled: bool,
}

task_local! {
    static FRONTIER: Frontier;
}

/// Runs `future` with `frontier` as the active context for its whole lifetime.
pub(crate) async fn scope<F: std::future::Future>(frontier: Frontier, future: F) -> F::Output {
    FRONTIER.scope(frontier, future).await
}

/// Runs `f` with `frontier` as the active context for its whole lifetime.
pub(crate) fn sync_scope<F: FnOnce() -> R, R>(frontier: Frontier, f: F) -> R {
    FRONTIER.sync_scope(frontier, f)
}

/// The frontier in scope right now, or `None` if nothing is.
pub(crate) fn current() -> Option<Frontier> {
    FRONTIER.try_with(|f| f.clone()).ok()
}

/// The branches in the current frontier, resolved to live handles. Empty if
/// nothing is in scope or the frontier is disabled.
pub(crate) fn current_branches() -> Vec<Branch> {
    match current() {
        Some(frontier) if frontier.enabled => frontier.ids.iter().map(lookup).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frontier_is_absent_outside_any_scope() {
        assert!(current().is_none());
    }

    #[tokio::test]
    async fn frontier_is_visible_inside_scope() {
        let frontier = Frontier { ids: HashSet::new(), enabled: true };
        scope(frontier, async {
            assert!(current().is_some());
        })
        .await;
        assert!(current().is_none());
    }
}
