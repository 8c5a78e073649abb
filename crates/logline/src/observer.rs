//! Optional diagnostic hooks.
//!
//! Each hook is a plain closure, invoked synchronously at its lifecycle
//! point. Hooks never influence control flow; a panicking hook is caught
//! and logged. Hooks may run on any thread.

use crate::error::StoreError;
use crate::types::{CycleOutcome, DestinationId, LogType, SerializedRecord};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::warn;

type ResolvedHook = Box<dyn Fn(&LogType, &[DestinationId]) + Send + Sync>;
type RecordHook = Box<dyn Fn(&SerializedRecord) + Send + Sync>;
type CycleStartedHook = Box<dyn Fn() + Send + Sync>;
type DeliveringHook = Box<dyn Fn(&DestinationId, &[SerializedRecord]) + Send + Sync>;
type CycleEndedHook = Box<dyn Fn(&[CycleOutcome]) + Send + Sync>;
type StoreErrorHook = Box<dyn Fn(&StoreError) + Send + Sync>;

/// A set of optional lifecycle callbacks.
#[derive(Default)]
pub struct Observer {
    resolved: Option<ResolvedHook>,
    enqueued: Option<RecordHook>,
    persisted: Option<RecordHook>,
    cycle_started: Option<CycleStartedHook>,
    delivering: Option<DeliveringHook>,
    cycle_ended: Option<CycleEndedHook>,
    store_error: Option<StoreErrorHook>,
}

impl Observer {
    /// Creates an observer with no hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Called from `send` once an event's destinations are resolved.
    pub fn on_resolved(
        mut self,
        f: impl Fn(&LogType, &[DestinationId]) + Send + Sync + 'static,
    ) -> Self {
        self.resolved = Some(Box::new(f));
        self
    }

    /// Called from `send` for each record handed to the runner's queue.
    pub fn on_enqueued(mut self, f: impl Fn(&SerializedRecord) + Send + Sync + 'static) -> Self {
        self.enqueued = Some(Box::new(f));
        self
    }

    /// Called after the store accepted a record.
    pub fn on_persisted(mut self, f: impl Fn(&SerializedRecord) + Send + Sync + 'static) -> Self {
        self.persisted = Some(Box::new(f));
        self
    }

    /// Called when a delivery cycle begins.
    pub fn on_cycle_started(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.cycle_started = Some(Box::new(f));
        self
    }

    /// Called right before a sender is invoked with its batch.
    pub fn on_delivering(
        mut self,
        f: impl Fn(&DestinationId, &[SerializedRecord]) + Send + Sync + 'static,
    ) -> Self {
        self.delivering = Some(Box::new(f));
        self
    }

    /// Called with every `(destination, outcome)` pair once a cycle ends.
    pub fn on_cycle_ended(mut self, f: impl Fn(&[CycleOutcome]) + Send + Sync + 'static) -> Self {
        self.cycle_ended = Some(Box::new(f));
        self
    }

    /// Called when a store operation fails.
    pub fn on_store_error(mut self, f: impl Fn(&StoreError) + Send + Sync + 'static) -> Self {
        self.store_error = Some(Box::new(f));
        self
    }

    pub(crate) fn resolved(&self, log_type: &LogType, destinations: &[DestinationId]) {
        if let Some(hook) = &self.resolved {
            guard("resolved", || hook(log_type, destinations));
        }
    }

    pub(crate) fn enqueued(&self, record: &SerializedRecord) {
        if let Some(hook) = &self.enqueued {
            guard("enqueued", || hook(record));
        }
    }

    pub(crate) fn persisted(&self, record: &SerializedRecord) {
        if let Some(hook) = &self.persisted {
            guard("persisted", || hook(record));
        }
    }

    pub(crate) fn cycle_started(&self) {
        if let Some(hook) = &self.cycle_started {
            guard("cycle_started", || hook());
        }
    }

    pub(crate) fn delivering(&self, destination: &DestinationId, batch: &[SerializedRecord]) {
        if let Some(hook) = &self.delivering {
            guard("delivering", || hook(destination, batch));
        }
    }

    pub(crate) fn cycle_ended(&self, outcomes: &[CycleOutcome]) {
        if let Some(hook) = &self.cycle_ended {
            guard("cycle_ended", || hook(outcomes));
        }
    }

    pub(crate) fn store_error(&self, err: &StoreError) {
        if let Some(hook) = &self.store_error {
            guard("store_error", || hook(err));
        }
    }
}

impl std::fmt::Debug for Observer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observer")
            .field("resolved", &self.resolved.is_some())
            .field("enqueued", &self.enqueued.is_some())
            .field("persisted", &self.persisted.is_some())
            .field("cycle_started", &self.cycle_started.is_some())
            .field("delivering", &self.delivering.is_some())
            .field("cycle_ended", &self.cycle_ended.is_some())
            .field("store_error", &self.store_error.is_some())
            .finish()
    }
}

fn guard(hook: &'static str, f: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        warn!(hook, "Observer hook panicked, ignoring");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn empty_observer_is_noop() {
        let observer = Observer::new();
        observer.cycle_started();
        observer.cycle_ended(&[]);
    }

    #[test]
    fn hooks_are_invoked() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c1 = calls.clone();
        let c2 = calls.clone();
        let observer = Observer::new()
            .on_cycle_started(move || {
                c1.fetch_add(1, Ordering::SeqCst);
            })
            .on_persisted(move |_| {
                c2.fetch_add(10, Ordering::SeqCst);
            });

        observer.cycle_started();
        observer.persisted(&SerializedRecord::new(
            "click".into(),
            "json",
            "stdout".into(),
            "{}",
        ));

        assert_eq!(calls.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn panicking_hook_is_contained() {
        let observer = Observer::new().on_cycle_started(|| panic!("boom"));
        observer.cycle_started();
    }

    #[test]
    fn debug_lists_installed_hooks() {
        let observer = Observer::new().on_cycle_ended(|_| {});
        let rendered = format!("{:?}", observer);
        assert!(rendered.contains("cycle_ended: true"));
        assert!(rendered.contains("resolved: false"));
    }
}
