//! The batching worker and the [`TreeLogger`] scope that owns it.
//!
//! A [`TreeLogger`] owns one dedicated OS thread running its own
//! single-threaded [`tokio`] runtime. Public API calls never talk to the
//! backend directly; they enqueue an [`Event`][crate::event::Event] and the
//! worker coalesces same-kind, same-branch events over a debounce window
//! before writing a batch through the configured [`Writer`].

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::backend::{BackendError, Writer};
use crate::branch::Branch;
use crate::context::{self, Frontier};
use crate::event::{Batch, Event};
use crate::fail;

/// A fluent builder for [`TreeLogger`].
pub struct TreeLoggerConfig {
    name: String,
    debounce: Duration,
    batch_size: usize,
    silent: bool,
}

impl TreeLoggerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        TreeLoggerConfig {
            name: name.into(),
            debounce: Duration::from_millis(250),
            batch_size: 50,
            silent: false,
        }
    }

    /// How long the worker waits after the first event in a batch before
    /// flushing it, absent a max-batch-size trigger.
    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// The largest any single per-kind batch (entries, tree edges, metadata,
    /// tags) is allowed to grow before an early flush is forced.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// When `true`, a worker panic or backend error is swallowed instead of
    /// propagating out of [`TreeLogger::on_future`]/[`on_closure`][TreeLogger::on_closure].
    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn build(self, writer: Arc<dyn Writer>) -> TreeLogger {
        let (tx, rx) = mpsc::unbounded_channel();
        let root = Branch::new(self.name, tx.clone());

        TreeLogger {
            root,
            writer,
            debounce: self.debounce,
            batch_size: self.batch_size,
            silent: self.silent,
            queue_tx: tx,
            queue_rx: Some(rx),
        }
    }
}

/// A branching logger for concurrent or recursive computations.
///
/// Entering it is necessarily scope-taking: call [`on_future`][Self::on_future]
/// to run an async block with this logger active, or
/// [`on_closure`][Self::on_closure] to run a synchronous one. Both start the
/// worker thread on entry and, on exit, flush and retire this logger's whole
/// branch subtree.
pub struct TreeLogger {
    root: Branch,
    writer: Arc<dyn Writer>,
    debounce: Duration,
    batch_size: usize,
    silent: bool,
    queue_tx: UnboundedSender<Event>,
    queue_rx: Option<UnboundedReceiver<Event>>,
}

impl TreeLogger {
    pub fn root(&self) -> &Branch {
        &self.root
    }

    fn enter(&mut self) -> (Frontier, WorkerGuard) {
        let rx = self.queue_rx.take().expect("tree logger worker already started");
        context::register(self.root.clone());

        let frontier = match context::current() {
            Some(mut existing) => {
                existing.ids.insert(self.root.id().clone());
                existing
            }
            None => Frontier { ids: HashSet::from([self.root.id().clone()]), enabled: true },
        };

        let worker = spawn_worker(Arc::clone(&self.writer), rx, self.debounce, self.batch_size, self.silent);
        let guard = WorkerGuard {
            root_id: self.root.id().clone(),
            queue_tx: self.queue_tx.clone(),
            worker: Some(worker),
            silent: self.silent,
        };
        (frontier, guard)
    }

    /// Runs `future` with this logger's root branch in the active frontier.
    ///
    /// The worker is flushed, joined, and this logger's branch subtree is
    /// deregistered on every exit path, including `future` panicking: that
    /// teardown lives in [`WorkerGuard`]'s `Drop` impl, so unwinding past this
    /// call still runs it.
    pub async fn on_future<F: Future>(mut self, future: F) -> F::Output {
        let (frontier, _guard) = self.enter();
        context::scope(frontier, future).await
    }

    /// Runs `f` with this logger's root branch in the active frontier. See
    /// [`on_future`][Self::on_future] for the exit-on-panic guarantee.
    pub fn on_closure<R>(mut self, f: impl FnOnce() -> R) -> R {
        let (frontier, _guard) = self.enter();
        context::sync_scope(frontier, f)
    }
}

/// Flushes and joins the worker and deregisters the branch subtree when
/// dropped, whether that happens at the end of a normal
/// [`on_future`][TreeLogger::on_future]/[`on_closure`][TreeLogger::on_closure]
/// call or because the scoped future/closure panicked and unwound through it.
struct WorkerGuard {
    root_id: crate::id::BranchId,
    queue_tx: UnboundedSender<Event>,
    worker: Option<JoinHandle<()>>,
    silent: bool,
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        context::deregister_subtree(&self.root_id);
        let _ = self.queue_tx.send(Event::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() && !self.silent {
                fail::worker_panicked();
            }
        }
    }
}

fn spawn_worker(
    writer: Arc<dyn Writer>,
    queue: UnboundedReceiver<Event>,
    debounce: Duration,
    batch_size: usize,
    silent: bool,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("failed to start tree logger worker runtime");

        if let Err(err) = runtime.block_on(run(writer, queue, debounce, batch_size)) {
            if !silent {
                panic!("tree logger worker failed: {err}");
            }
        }
    })
}

enum Polled {
    Event(Event),
    TimedOut,
    Closed,
}

async fn poll(queue: &mut UnboundedReceiver<Event>, deadline: Option<Instant>) -> Polled {
    match deadline {
        Some(deadline) => {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(remaining, queue.recv()).await {
                Ok(Some(event)) => Polled::Event(event),
                Ok(None) => Polled::Closed,
                Err(_elapsed) => Polled::TimedOut,
            }
        }
        None => match queue.recv().await {
            Some(event) => Polled::Event(event),
            None => Polled::Closed,
        },
    }
}

async fn run(
    writer: Arc<dyn Writer>,
    mut queue: UnboundedReceiver<Event>,
    debounce: Duration,
    batch_size: usize,
) -> Result<(), BackendError> {
    let mut batch = Batch::default();
    let mut deadline: Option<Instant> = None;

    loop {
        let mut shutting_down = false;

        match poll(&mut queue, deadline).await {
            Polled::Event(Event::Shutdown) => shutting_down = true,
            Polled::Event(event) => {
                if deadline.is_none() {
                    deadline = Some(Instant::now() + debounce);
                }
                batch.absorb(event);
            }
            Polled::TimedOut => {}
            Polled::Closed => shutting_down = true,
        }

        let past_deadline = deadline.map(|d| Instant::now() >= d).unwrap_or(false);
        let over_batch_size = batch.len() >= batch_size;

        if past_deadline || over_batch_size || shutting_down {
            flush(writer.as_ref(), batch.take()).await?;
            deadline = None;
        }

        if shutting_down {
            return Ok(());
        }
    }
}

async fn flush(writer: &dyn Writer, batch: Batch) -> Result<(), BackendError> {
    if !batch.entries.is_empty() {
        writer.append_entries(batch.entries).await?;
    }
    if !batch.tree.is_empty() {
        writer.update_tree(batch.tree).await?;
    }
    if !batch.metadata.is_empty() {
        writer.update_branch_metadata(batch.metadata).await?;
    }
    if !batch.tags.is_empty() {
        writer.add_tags(batch.tags).await?;
    }
    Ok(())
}
