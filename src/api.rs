//! The free functions callers use from anywhere in the active frontier.
//!
//! [`log`] and [`apply`] are no-ops outside a [`TreeLogger`][crate::logger::TreeLogger]
//! scope: there's no context to write to, so they silently do nothing rather
//! than erroring. [`fork`] and [`disable`] return scope-taking builders with
//! the same `on_future`/`on_closure` shape as `TreeLogger` itself, since
//! entering a new frontier is, like entering a logger, inherently a
//! scope-bounded operation under `tokio::task_local!`.

use std::collections::HashSet;
use std::future::Future;

use crate::branch::Branch;
use crate::context::{self, Frontier};
use crate::logs::{Metadata, MessageType};
use crate::validate::{self, ValidationError};

/// Logs a message to every branch in the current frontier. Does nothing if
/// there is no active [`TreeLogger`][crate::logger::TreeLogger] scope, or if
/// the scope is currently [`disable`]d.
pub fn log(message: impl Into<String>, message_type: MessageType, entry_metadata: Option<Metadata>) {
    let message = message.into();
    for branch in context::current_branches() {
        branch.log(message.clone(), message_type, entry_metadata.clone());
    }
}

/// Like [`log`], but parses `message_type` from a string instead of requiring
/// a typed [`MessageType`].
pub fn log_typed(
    message: impl Into<String>,
    message_type: &str,
    entry_metadata: Option<Metadata>,
) -> Result<(), ValidationError> {
    log(message, message_type.parse()?, entry_metadata);
    Ok(())
}

/// Adds tags and/or metadata to every branch in the current frontier.
///
/// Does nothing if there is no active frontier. Requires at least one of
/// `tags` or `metadata` to be set.
pub fn apply(tags: Option<Vec<String>>, metadata: Option<Metadata>) -> Result<(), ValidationError> {
    validate::validate_apply(&tags, &metadata)?;
    if let Some(tags) = &tags {
        validate::validate_tags(tags)?;
    }

    for branch in context::current_branches() {
        if let Some(tags) = tags.clone() {
            branch.add_tags(tags);
        }
        if let Some(metadata) = metadata.clone() {
            branch.add_metadata(metadata);
        }
    }

    Ok(())
}

/// The branches in the current frontier, or an empty vec if there is none.
pub fn context() -> Vec<Branch> {
    context::current_branches()
}

/// A scope-taking builder that pins the frontier to an explicit set of
/// branches for its duration, restoring whatever was active on exit.
pub struct WithContext {
    branches: Vec<Branch>,
    parent_enabled: bool,
}

/// Pins the active frontier to exactly `branches` for the duration of the
/// returned scope. An empty `branches` yields a no-op scope, same as calling
/// outside any frontier.
pub fn with_context(branches: impl IntoIterator<Item = Branch>) -> WithContext {
    let parent_enabled = context::current().map(|f| f.enabled).unwrap_or(true);
    WithContext { branches: branches.into_iter().collect(), parent_enabled }
}

impl WithContext {
    pub async fn on_future<F: Future>(self, future: F) -> F::Output {
        if self.branches.is_empty() {
            return future.await;
        }
        context::scope(self.frontier(), future).await
    }

    pub fn on_closure<R>(self, f: impl FnOnce() -> R) -> R {
        if self.branches.is_empty() {
            return f();
        }
        context::sync_scope(self.frontier(), f)
    }

    fn frontier(&self) -> Frontier {
        Frontier {
            ids: self.branches.iter().map(|b| b.id().clone()).collect::<HashSet<_>>(),
            enabled: self.parent_enabled,
        }
    }
}

/// A scope-taking builder that forks every branch in the current frontier
/// into a new child branch named `name`, then runs code with those children
/// as the new frontier.
pub struct Fork {
    children: Vec<Branch>,
    parent_enabled: bool,
}

/// Forks every branch in the current frontier. If there is no active
/// frontier, `on_future`/`on_closure` just run the code unchanged.
pub fn fork(name: impl Into<String>) -> Fork {
    let name = name.into();
    let parent = context::current();
    let parent_enabled = parent.as_ref().map(|f| f.enabled).unwrap_or(true);
    let children: Vec<Branch> = context::current_branches()
        .iter()
        .map(|b| {
            let child = b.fork(name.clone());
            context::register(child.clone());
            child
        })
        .collect();
    Fork { children, parent_enabled }
}

impl Fork {
    pub async fn on_future<F: Future>(self, future: F) -> F::Output {
        if self.children.is_empty() {
            return future.await;
        }
        let frontier = self.frontier();
        context::scope(frontier, future).await
    }

    pub fn on_closure<R>(self, f: impl FnOnce() -> R) -> R {
        if self.children.is_empty() {
            return f();
        }
        let frontier = self.frontier();
        context::sync_scope(frontier, f)
    }

    fn frontier(&self) -> Frontier {
        Frontier {
            ids: self.children.iter().map(|b| b.id().clone()).collect::<HashSet<_>>(),
            enabled: self.parent_enabled,
        }
    }
}

/// A scope-taking builder that suppresses [`log`]/[`apply`] for its duration
/// without losing track of which branches are in scope.
pub struct Disable {
    frontier: Option<Frontier>,
}

/// Disables logging for the current frontier. If there is no active
/// frontier, this has no effect either way.
pub fn disable() -> Disable {
    let frontier = context::current().map(|f| Frontier { ids: f.ids, enabled: false });
    Disable { frontier }
}

impl Disable {
    pub async fn on_future<F: Future>(self, future: F) -> F::Output {
        match self.frontier {
            Some(frontier) => context::scope(frontier, future).await,
            None => future.await,
        }
    }

    pub fn on_closure<R>(self, f: impl FnOnce() -> R) -> R {
        match self.frontier {
            Some(frontier) => context::sync_scope(frontier, f),
            None => f(),
        }
    }
}

/// A scope-taking builder that re-enables logging for the current frontier,
/// for use nested inside a [`disable`] scope.
pub struct Enable {
    frontier: Option<Frontier>,
}

pub fn enable() -> Enable {
    let frontier = context::current().map(|f| Frontier { ids: f.ids, enabled: true });
    Enable { frontier }
}

impl Enable {
    pub async fn on_future<F: Future>(self, future: F) -> F::Output {
        match self.frontier {
            Some(frontier) => context::scope(frontier, future).await,
            None => future.await,
        }
    }

    pub fn on_closure<R>(self, f: impl FnOnce() -> R) -> R {
        match self.frontier {
            Some(frontier) => context::sync_scope(frontier, f),
            None => f(),
        }
    }
}
