//! Deferred task coordination
//!
//! A contribution may start long-running work in one execution cycle and a
//! later contribution (possibly in a later cycle) consumes its result. Work
//! is recorded under an `(owner, key)` pair together with the cycle that
//! started it. There is one producer per key; readers only look.
//!
//! Started work is never cancelled. A reader may decline to wait for it
//! (delayed mode) but the work still runs to completion.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;

use crate::error::DeferredError;

/// Result produced by deferred work
pub type DeferredOutcome = Result<Value, DeferredError>;

/// Deferred work, boxed so it can cross into the host's runtime
pub type DeferredWork = BoxFuture<'static, DeferredOutcome>;

/// Keeps a unit's code loaded while work it started is still running
pub type UnitGuard = Arc<dyn Any + Send + Sync>;

/// Host-wide settings for deferred work
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeferredConfig {
    /// Let the cycle that started a task skip waiting on it
    #[serde(default)]
    pub delayed_mode: bool,
}

/// Whether delayed mode is switched on
pub fn is_delayed_mode_enabled(config: &DeferredConfig) -> bool {
    config.delayed_mode
}

/// Runs deferred work on the host's executor.
///
/// Units loaded from a dynamic library carry their own copy of every
/// dependency, including the async runtime's thread-local state. Work is
/// therefore always started through this trait object, which the host
/// creates, so it lands on the host's runtime no matter where it was built.
pub trait DeferredSpawner: Send + Sync {
    /// Start `work`, holding `guard` until the work has been dropped
    fn spawn(&self, work: DeferredWork, guard: Option<UnitGuard>) -> DeferredHandle;
}

/// Spawns onto a Tokio runtime.
///
/// Without a pinned runtime handle the runtime current at spawn time is
/// used; with none available the handle completes with
/// [`DeferredError::NoRuntime`].
#[derive(Debug, Clone, Default)]
pub struct TokioSpawner {
    runtime: Option<tokio::runtime::Handle>,
}

impl TokioSpawner {
    /// Spawn onto `runtime`, even from threads outside it
    pub fn new(runtime: tokio::runtime::Handle) -> Self {
        Self {
            runtime: Some(runtime),
        }
    }

    /// Pin the runtime current on this thread, if any
    pub fn current() -> Self {
        Self {
            runtime: tokio::runtime::Handle::try_current().ok(),
        }
    }
}

impl DeferredSpawner for TokioSpawner {
    fn spawn(&self, work: DeferredWork, guard: Option<UnitGuard>) -> DeferredHandle {
        let (completion, handle) = DeferredHandle::pending();

        let runtime = self
            .runtime
            .clone()
            .or_else(|| tokio::runtime::Handle::try_current().ok());
        let Some(runtime) = runtime else {
            tracing::warn!("Deferred task started outside of a runtime");
            completion.complete(Err(DeferredError::NoRuntime));
            return handle;
        };

        runtime.spawn(async move {
            let outcome = AssertUnwindSafe(work)
                .catch_unwind()
                .await
                .unwrap_or(Err(DeferredError::Panicked));
            // The work future is gone; its code may be unloaded now
            drop(guard);
            completion.complete(outcome);
        });

        handle
    }
}

/// Write side of a [`DeferredHandle`]
#[derive(Debug)]
pub struct DeferredCompletion {
    tx: watch::Sender<Option<DeferredOutcome>>,
}

impl DeferredCompletion {
    /// Publish the outcome to every reader
    pub fn complete(self, outcome: DeferredOutcome) {
        let _ = self.tx.send(Some(outcome));
    }
}

/// Reference to in-flight (or finished) deferred work.
///
/// Cloning a handle yields another reader of the same work.
#[derive(Debug, Clone)]
pub struct DeferredHandle {
    outcome: watch::Receiver<Option<DeferredOutcome>>,
}

impl DeferredHandle {
    /// A handle that finishes when the returned completion is used.
    ///
    /// Dropping the completion unused makes waiters see
    /// [`DeferredError::Dropped`].
    pub fn pending() -> (DeferredCompletion, Self) {
        let (tx, rx) = watch::channel(None);
        (DeferredCompletion { tx }, Self { outcome: rx })
    }

    /// A handle that is already done
    pub fn ready(outcome: DeferredOutcome) -> Self {
        let (_tx, rx) = watch::channel(Some(outcome));
        Self { outcome: rx }
    }

    /// Whether the work has finished (successfully or not)
    pub fn is_done(&self) -> bool {
        self.outcome.borrow().is_some()
    }

    /// The outcome, if the work has finished
    pub fn outcome(&self) -> Option<DeferredOutcome> {
        self.outcome.borrow().clone()
    }

    /// Wait until the work finishes and return its outcome
    pub async fn wait(&self) -> DeferredOutcome {
        let mut rx = self.outcome.clone();
        let finished = match rx.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        };

        finished
            .or_else(|| self.outcome())
            .unwrap_or(Err(DeferredError::Dropped))
    }
}

/// A recorded handle and the cycle it was started in
#[derive(Debug, Clone)]
pub struct DeferredSlot {
    /// The work
    pub handle: DeferredHandle,
    /// Execution cycle during which the work was started
    pub cycle: u64,
}

/// What a reader got when it consumed a deferred slot
#[derive(Debug, Clone)]
pub enum Consumption {
    /// Nothing recorded under the key
    Absent,
    /// Work is pending and was started this cycle in delayed mode; the
    /// reader did not wait
    Placeholder,
    /// Work finished (possibly after waiting for it)
    Ready(DeferredOutcome),
}

impl Consumption {
    /// Whether the reader skipped waiting
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder)
    }
}

/// Owner-scoped store of deferred work
pub struct DeferredTasks {
    slots: Mutex<HashMap<(String, String), DeferredSlot>>,
    spawner: Arc<dyn DeferredSpawner>,
}

impl DeferredTasks {
    /// Create an empty store spawning onto the Tokio runtime current at
    /// spawn time
    pub fn new() -> Self {
        Self::with_spawner(Arc::new(TokioSpawner::default()))
    }

    /// Create an empty store starting work through `spawner`
    pub fn with_spawner(spawner: Arc<dyn DeferredSpawner>) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            spawner,
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<(String, String), DeferredSlot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start `work` and record it under `(owner, key)` for `cycle`.
    ///
    /// Replaces whatever was recorded before. Callers that must not
    /// supersede pending work check [`peek`](Self::peek) first.
    pub fn begin<F>(&self, owner: &str, key: &str, cycle: u64, work: F) -> DeferredHandle
    where
        F: Future<Output = DeferredOutcome> + Send + 'static,
    {
        self.begin_boxed(owner, key, cycle, work.boxed(), None)
    }

    /// [`begin`](Self::begin) for already boxed work, holding `guard` until
    /// the work is done
    pub fn begin_boxed(
        &self,
        owner: &str,
        key: &str,
        cycle: u64,
        work: DeferredWork,
        guard: Option<UnitGuard>,
    ) -> DeferredHandle {
        let handle = self.spawner.spawn(work, guard);
        let slot = DeferredSlot {
            handle: handle.clone(),
            cycle,
        };

        let previous = self
            .slots()
            .insert((owner.to_string(), key.to_string()), slot);
        if previous.is_some_and(|p| !p.handle.is_done()) {
            tracing::debug!(owner, key, cycle, "Superseded pending deferred task");
        }

        handle
    }

    /// Look at the slot recorded under `(owner, key)` without removing it
    pub fn peek(&self, owner: &str, key: &str) -> Option<DeferredSlot> {
        self.slots()
            .get(&(owner.to_string(), key.to_string()))
            .cloned()
    }

    /// Remove the slot recorded under `(owner, key)`
    pub fn clear(&self, owner: &str, key: &str) -> Option<DeferredSlot> {
        self.slots().remove(&(owner.to_string(), key.to_string()))
    }

    /// Remove every slot of an owner, returning how many were removed
    pub fn clear_owner(&self, owner: &str) -> usize {
        let mut slots = self.slots();
        let before = slots.len();
        slots.retain(|(o, _), _| o != owner);
        before - slots.len()
    }

    /// Consume the work under `(owner, key)` from `current_cycle`.
    ///
    /// - nothing recorded: [`Consumption::Absent`]
    /// - already done: [`Consumption::Ready`] immediately
    /// - pending, delayed mode on and started this same cycle:
    ///   [`Consumption::Placeholder`] without waiting
    /// - pending otherwise: waits, then [`Consumption::Ready`]
    ///
    /// The slot stays recorded in every case.
    pub async fn consume(
        &self,
        owner: &str,
        key: &str,
        current_cycle: u64,
        delayed_mode: bool,
    ) -> Consumption {
        let Some(slot) = self.peek(owner, key) else {
            return Consumption::Absent;
        };

        if let Some(outcome) = slot.handle.outcome() {
            return Consumption::Ready(outcome);
        }

        if delayed_mode && slot.cycle == current_cycle {
            tracing::debug!(owner, key, cycle = current_cycle, "Deferred task pending, not waiting");
            return Consumption::Placeholder;
        }

        Consumption::Ready(slot.handle.wait().await)
    }
}

impl Default for DeferredTasks {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DeferredTasks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredTasks")
            .field("slots", &self.slots().len())
            .finish_non_exhaustive()
    }
}
