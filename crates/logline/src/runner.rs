//! The pipeline runner: a single-consumer actor.
//!
//! Producers (`send` and timer tasks) only push [`Command`]s onto an
//! unbounded FIFO queue. One consumer task drains it, one command at a time,
//! and is the only code that touches the store or the pending timer:
//!
//! ```text
//! send() ──Persist──┐
//!                   ├──▶ queue ──▶ consumer ──▶ store.append
//! timer ──Deliver───┘                  │
//!                                      ├──▶ store.load_oldest
//!                                      ├──▶ sender.deliver (per destination)
//!                                      ├──▶ store.delete_by_ids
//!                                      └──▶ policy.schedule ──▶ timer
//! ```
//!
//! A record is therefore always persisted before any cycle that could load
//! it. The queue is unbounded: if `send` outpaces the store, memory grows
//! without limit.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult, StoreError};
use crate::scheduler::NextCycle;
use crate::types::{
    CycleOutcome, DeliveryOutcome, DestinationId, LogEvent, RecordId, SerializedRecord,
};
use futures_util::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Work items processed by the consumer task.
#[derive(Debug)]
pub(crate) enum Command {
    /// Append one record to the store.
    Persist(SerializedRecord),
    /// Run one delivery cycle. `None` is an unconditional kick (start or
    /// flush); `Some(generation)` comes from an armed timer and is dropped if a newer
    /// timer has replaced it.
    Deliver { generation: Option<u64> },
}

/// A running pipeline instance.
///
/// Dropping the runner stops it.
pub struct Runner {
    config: Arc<PipelineConfig>,
    tx: mpsc::UnboundedSender<Command>,
    worker: JoinHandle<()>,
}

impl Runner {
    /// Spawns the consumer task and enqueues the first delivery cycle.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: Arc<PipelineConfig>) -> PipelineResult<Self> {
        let handle = Handle::try_current().map_err(|_| PipelineError::NoRuntime)?;
        let (tx, rx) = mpsc::unbounded_channel();

        let worker = Worker {
            config: config.clone(),
            tx: tx.clone(),
            rx,
            timer: None,
            generation: 0,
        };
        let worker = handle.spawn(worker.run());

        tx.send(Command::Deliver { generation: None })
            .map_err(|_| PipelineError::QueueClosed)?;

        info!(
            batch_size = config.batch_size,
            destinations = config.senders.len(),
            "Pipeline runner started"
        );

        Ok(Self { config, tx, worker })
    }

    /// Resolves, serializes and enqueues one record per destination.
    ///
    /// Never blocks on the store or senders. Fails synchronously, before
    /// anything is enqueued, if the log type is unmapped or serialization
    /// fails.
    pub fn send(&self, event: &dyn LogEvent) -> PipelineResult<()> {
        let config = &self.config;
        let log_type = event.log_type();

        let destinations = config.resolver.resolve_type(&log_type)?;
        config.observer.resolved(&log_type, &destinations);

        let payload = config.serializer.serialize(event)?;
        let serializer_type = config.serializer.type_tag();

        for destination in destinations {
            let record = SerializedRecord::new(
                log_type.clone(),
                serializer_type,
                destination,
                payload.clone(),
            );
            config.observer.enqueued(&record);
            self.tx
                .send(Command::Persist(record))
                .map_err(|_| PipelineError::QueueClosed)?;
        }

        Ok(())
    }

    /// Enqueues an immediate delivery cycle.
    ///
    /// The cycle re-arms the timer as usual, superseding whatever was pending.
    pub fn flush(&self) -> PipelineResult<()> {
        self.tx
            .send(Command::Deliver { generation: None })
            .map_err(|_| PipelineError::QueueClosed)
    }

    /// Stops the consumer and cancels the pending timer.
    ///
    /// An in-flight store or sender call is abandoned; records it had not
    /// deleted stay in the store.
    pub fn stop(self) {
        info!("Pipeline runner stopping");
        self.worker.abort();
    }

    /// The configuration this runner was started with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

impl Drop for Runner {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

/// A cycle that stopped at a store failure.
struct CycleAborted {
    outcomes: Vec<CycleOutcome>,
    error: StoreError,
}

/// State owned exclusively by the consumer task.
struct Worker {
    config: Arc<PipelineConfig>,
    tx: mpsc::UnboundedSender<Command>,
    rx: mpsc::UnboundedReceiver<Command>,
    timer: Option<JoinHandle<()>>,
    generation: u64,
}

impl Worker {
    async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            match command {
                Command::Persist(record) => self.persist(&record).await,
                Command::Deliver { generation } => {
                    if let Some(generation) = generation {
                        if generation != self.generation {
                            debug!(
                                generation,
                                current = self.generation,
                                "Ignoring trigger from superseded timer"
                            );
                            continue;
                        }
                    }

                    let outcomes = match self.deliver_cycle().await {
                        Ok(outcomes) => outcomes,
                        Err(CycleAborted { outcomes, error }) => {
                            error!(error = %error, "Delivery cycle aborted by store failure");
                            self.config.observer.store_error(&error);
                            outcomes
                        }
                    };
                    self.config.observer.cycle_ended(&outcomes);
                    self.arm_next_cycle(outcomes);
                }
            }
        }
    }

    async fn persist(&self, record: &SerializedRecord) {
        match self.config.store.append(record).await {
            Ok(()) => {
                debug!(
                    record_id = %record.id,
                    destination = %record.destination,
                    log_type = %record.log_type,
                    "Persisted record"
                );
                self.config.observer.persisted(record);
            }
            Err(e) => {
                error!(
                    record_id = %record.id,
                    destination = %record.destination,
                    error = %e,
                    "Failed to persist record"
                );
                self.config.observer.store_error(&e);
            }
        }
    }

    /// Load, group, deliver, reconcile.
    async fn deliver_cycle(&self) -> Result<Vec<CycleOutcome>, CycleAborted> {
        let config = &self.config;
        config.observer.cycle_started();

        let records = config
            .store
            .load_oldest(config.batch_size)
            .await
            .map_err(|error| CycleAborted {
                outcomes: Vec::new(),
                error,
            })?;

        if records.is_empty() {
            debug!("Delivery cycle found no records");
            return Ok(Vec::new());
        }

        let loaded = records.len();
        let mut outcomes = Vec::new();

        for (destination, batch) in group_by_destination(records) {
            let outcome = self.deliver_group(&destination, &batch).await;

            if outcome.removes_records() {
                let ids: Vec<RecordId> = batch.iter().map(|r| r.id).collect();
                if let Err(error) = config.store.delete_by_ids(&ids).await {
                    return Err(CycleAborted { outcomes, error });
                }
            }

            debug!(
                destination = %destination,
                outcome = %outcome,
                count = batch.len(),
                "Destination batch reconciled"
            );

            outcomes.push(CycleOutcome {
                destination,
                outcome,
                record_count: batch.len(),
            });
        }

        info!(
            loaded,
            destinations = outcomes.len(),
            "Delivery cycle complete"
        );
        Ok(outcomes)
    }

    /// Invokes one sender. Errors, panics and timeouts become `Deferred`.
    async fn deliver_group(
        &self,
        destination: &DestinationId,
        batch: &[SerializedRecord],
    ) -> DeliveryOutcome {
        let Some(sender) = self.config.sender(destination) else {
            if self.config.drop_orphaned_records {
                error!(
                    destination = %destination,
                    count = batch.len(),
                    "No sender configured for destination, dropping records"
                );
                return DeliveryOutcome::Rejected;
            }
            error!(
                destination = %destination,
                count = batch.len(),
                "No sender configured for destination, keeping records"
            );
            return DeliveryOutcome::Deferred;
        };

        self.config.observer.delivering(destination, batch);

        let invocation = AssertUnwindSafe(sender.deliver(batch)).catch_unwind();
        let result = match self.config.delivery_timeout {
            Some(limit) => match tokio::time::timeout(limit, invocation).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        destination = %destination,
                        timeout_ms = limit.as_millis() as u64,
                        count = batch.len(),
                        "Sender timed out, deferring batch"
                    );
                    return DeliveryOutcome::Deferred;
                }
            },
            None => invocation.await,
        };

        match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                warn!(
                    destination = %destination,
                    count = batch.len(),
                    error = %e,
                    "Sender failed, deferring batch"
                );
                DeliveryOutcome::Deferred
            }
            Err(_) => {
                warn!(
                    destination = %destination,
                    count = batch.len(),
                    "Sender panicked, deferring batch"
                );
                DeliveryOutcome::Deferred
            }
        }
    }

    /// Replaces the pending timer with a fresh one from the policy.
    fn arm_next_cycle(&mut self, outcomes: Vec<CycleOutcome>) {
        if let Some(previous) = self.timer.take() {
            previous.abort();
        }

        self.generation += 1;
        let next = NextCycle::new(self.tx.clone(), self.generation);
        let policy = self.config.scheduler.clone();

        self.timer = Some(tokio::spawn(async move {
            policy.schedule(&outcomes, next).await;
        }));
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// Partitions records by destination, keeping load order inside each group
/// and first-appearance order across groups.
fn group_by_destination(
    records: Vec<SerializedRecord>,
) -> Vec<(DestinationId, Vec<SerializedRecord>)> {
    let mut groups: Vec<(DestinationId, Vec<SerializedRecord>)> = Vec::new();
    let mut index: HashMap<DestinationId, usize> = HashMap::new();

    for record in records {
        match index.get(&record.destination) {
            Some(&i) => groups[i].1.push(record),
            None => {
                index.insert(record.destination.clone(), groups.len());
                groups.push((record.destination.clone(), vec![record]));
            }
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(destination: &str, payload: &str) -> SerializedRecord {
        SerializedRecord::new("click".into(), "json", destination.into(), payload)
    }

    #[test]
    fn grouping_preserves_load_order() {
        let records = vec![
            record("a", "1"),
            record("b", "2"),
            record("a", "3"),
            record("c", "4"),
            record("b", "5"),
        ];

        let groups = group_by_destination(records);
        let summary: Vec<(String, Vec<String>)> = groups
            .into_iter()
            .map(|(d, batch)| {
                (
                    d.to_string(),
                    batch.into_iter().map(|r| r.payload).collect(),
                )
            })
            .collect();

        assert_eq!(
            summary,
            vec![
                ("a".to_string(), vec!["1".to_string(), "3".to_string()]),
                ("b".to_string(), vec!["2".to_string(), "5".to_string()]),
                ("c".to_string(), vec!["4".to_string()]),
            ]
        );
    }

    #[test]
    fn grouping_empty_batch() {
        assert!(group_by_destination(Vec::new()).is_empty());
    }

    #[test]
    fn start_outside_runtime_fails() {
        use crate::serializer::JsonSerializer;
        use crate::store::InMemoryStore;

        struct Never;

        #[async_trait::async_trait]
        impl crate::sender::Sender for Never {
            async fn deliver(
                &self,
                _batch: &[SerializedRecord],
            ) -> Result<DeliveryOutcome, crate::error::BoxError> {
                Ok(DeliveryOutcome::Deferred)
            }
        }

        let config = PipelineConfig::builder(
            Arc::new(InMemoryStore::new()),
            Arc::new(JsonSerializer::new()),
        )
        .destination("never", Arc::new(Never), ["click"])
        .build()
        .unwrap();

        let err = Runner::start(Arc::new(config)).err().unwrap();
        assert!(matches!(err, PipelineError::NoRuntime));
    }
}
