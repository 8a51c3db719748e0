//! ExtensionContext - the mutable value threaded through one dispatch

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use tracing::Level;

use crate::deferred::{Consumption, DeferredHandle, DeferredOutcome, DeferredTasks, UnitGuard};
use crate::error::ExtensionError;

/// Where contribution log lines go.
///
/// A unit built as a dynamic library has its own, unconnected copy of
/// `tracing`. Its `log_*` calls reach the host's subscriber only through
/// this trait object, which the host creates.
pub trait LogSink: Send + Sync {
    /// Record one line logged by a contribution for `owner` at `point`
    fn log(&self, level: Level, owner: &str, point: &str, message: &str);
}

/// Forwards to the `tracing` subscriber of whoever created it
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: Level, owner: &str, point: &str, message: &str) {
        match level {
            Level::ERROR => tracing::error!(owner, point, "{}", message),
            Level::WARN => tracing::warn!(owner, point, "{}", message),
            Level::INFO => tracing::info!(owner, point, "{}", message),
            Level::DEBUG => tracing::debug!(owner, point, "{}", message),
            _ => tracing::trace!(owner, point, "{}", message),
        }
    }
}

/// Context shared by every contribution of one dispatch.
///
/// The calling cycle owns it exclusively and passes it by `&mut` to each
/// contribution in turn, so contributions can:
/// - leave notes for contributions that run after them
/// - add extras the caller composes into its output (temporary extras live
///   for one cycle, persistent extras until removed)
/// - start or consume deferred work scoped to the owner
pub struct ExtensionContext {
    owner: String,
    point: String,
    cycle: u64,
    delayed_mode: bool,
    extras_temporary: BTreeMap<String, String>,
    extras_persistent: BTreeMap<String, String>,
    notes: Map<String, Value>,
    deferred: Arc<DeferredTasks>,
    log_sink: Arc<dyn LogSink>,
    unit_guard: Option<UnitGuard>,
}

impl ExtensionContext {
    /// Create a context for `owner` with its own deferred task store
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            point: String::new(),
            cycle: 0,
            delayed_mode: false,
            extras_temporary: BTreeMap::new(),
            extras_persistent: BTreeMap::new(),
            notes: Map::new(),
            deferred: Arc::new(DeferredTasks::new()),
            log_sink: Arc::new(TracingSink),
            unit_guard: None,
        }
    }

    /// Builder: share a deferred task store with other cycles
    pub fn with_deferred(mut self, deferred: Arc<DeferredTasks>) -> Self {
        self.deferred = deferred;
        self
    }

    /// Builder: set the current execution cycle
    pub fn with_cycle(mut self, cycle: u64) -> Self {
        self.cycle = cycle;
        self
    }

    /// Builder: set whether delayed mode is on
    pub fn with_delayed_mode(mut self, delayed_mode: bool) -> Self {
        self.delayed_mode = delayed_mode;
        self
    }

    /// Builder: send contribution log lines to `sink`
    pub fn with_log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = sink;
        self
    }

    // ─── Identity ────────────────────────────────────────────────────

    /// Owner this context (and its deferred work) is scoped to
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Extension point currently being dispatched
    pub fn point(&self) -> &str {
        &self.point
    }

    /// Set the point being dispatched (used by the dispatcher)
    pub fn set_point(&mut self, point: impl Into<String>) {
        self.point = point.into();
    }

    /// Keep `guard` alive for deferred work started from now on (used by the
    /// dispatcher while a dynamically loaded contribution runs)
    pub fn set_unit_guard(&mut self, guard: Option<UnitGuard>) {
        self.unit_guard = guard;
    }

    /// Current execution cycle
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Advance to the next cycle, dropping temporary extras
    pub fn next_cycle(&mut self) {
        self.cycle += 1;
        self.clear_temporary();
    }

    /// Whether delayed mode is on
    pub fn delayed_mode(&self) -> bool {
        self.delayed_mode
    }

    // ─── Extras ──────────────────────────────────────────────────────

    /// Add an extra that lasts for this cycle only
    pub fn set_temporary_extra(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.extras_temporary.insert(key.into(), value.into());
    }

    /// Extras for this cycle
    pub fn temporary_extras(&self) -> &BTreeMap<String, String> {
        &self.extras_temporary
    }

    /// Add an extra that lasts until removed
    pub fn set_persistent_extra(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.extras_persistent.insert(key.into(), value.into());
    }

    /// Remove a persistent extra
    pub fn remove_persistent_extra(&mut self, key: &str) -> Option<String> {
        self.extras_persistent.remove(key)
    }

    /// Extras that outlive the cycle
    pub fn persistent_extras(&self) -> &BTreeMap<String, String> {
        &self.extras_persistent
    }

    /// Drop every temporary extra
    pub fn clear_temporary(&mut self) {
        self.extras_temporary.clear();
    }

    // ─── Notes ───────────────────────────────────────────────────────

    /// Leave a note for later contributions or the caller
    ///
    /// # Example
    /// ```ignore
    /// ctx.note_set("recalled", 3)?;
    /// ```
    pub fn note_set<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), ExtensionError> {
        let value =
            serde_json::to_value(value).map_err(|e| ExtensionError::Serialization(e.to_string()))?;
        self.notes.insert(key.to_string(), value);
        Ok(())
    }

    /// Read a note
    pub fn note_get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.notes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Remove and return a raw note
    pub fn take_note(&mut self, key: &str) -> Option<Value> {
        self.notes.remove(key)
    }

    /// All notes
    pub fn notes(&self) -> &Map<String, Value> {
        &self.notes
    }

    // ─── Deferred work ───────────────────────────────────────────────

    /// The owner's deferred task store
    pub fn deferred(&self) -> &Arc<DeferredTasks> {
        &self.deferred
    }

    /// Start deferred work under `key` for this owner and cycle.
    ///
    /// The work runs on the host's runtime and keeps the calling unit
    /// loaded until it is done.
    pub fn begin_deferred<F>(&self, key: &str, work: F) -> DeferredHandle
    where
        F: Future<Output = DeferredOutcome> + Send + 'static,
    {
        self.deferred.begin_boxed(
            &self.owner,
            key,
            self.cycle,
            Box::pin(work),
            self.unit_guard.clone(),
        )
    }

    /// Consume deferred work under `key`.
    ///
    /// When the reader does not wait, `placeholder` is added as a temporary
    /// extra under `placeholder_key` so the caller can tell the work is still
    /// running.
    pub async fn consume_deferred(
        &mut self,
        key: &str,
        placeholder_key: &str,
        placeholder: &str,
    ) -> Consumption {
        let deferred = Arc::clone(&self.deferred);
        let consumption = deferred
            .consume(&self.owner, key, self.cycle, self.delayed_mode)
            .await;

        if consumption.is_placeholder() {
            self.set_temporary_extra(placeholder_key, placeholder);
        }

        consumption
    }

    // ─── Logging ─────────────────────────────────────────────────────

    /// Log an info message (tagged with owner and point)
    pub fn log_info(&self, message: &str) {
        self.log_sink.log(Level::INFO, &self.owner, &self.point, message);
    }

    /// Log a warning message
    pub fn log_warn(&self, message: &str) {
        self.log_sink.log(Level::WARN, &self.owner, &self.point, message);
    }

    /// Log an error message
    pub fn log_error(&self, message: &str) {
        self.log_sink.log(Level::ERROR, &self.owner, &self.point, message);
    }

    /// Log a debug message
    pub fn log_debug(&self, message: &str) {
        self.log_sink.log(Level::DEBUG, &self.owner, &self.point, message);
    }
}
