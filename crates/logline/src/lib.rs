//! # Logline
//!
//! A client-side event logging pipeline. Applications emit typed log events;
//! logline serializes them, buffers them in a durable store, and delivers
//! them in batches to one or more destinations on a recurring schedule.
//!
//! ## Core Invariants
//!
//! 1. **One consumer**: every store write and every delivery cycle runs on
//!    a single consumer task, in queue order
//! 2. **Fan-out is independent**: an event mapped to N destinations becomes
//!    N records with their own ids and retry fate
//! 3. **Batch reconciliation**: `Delivered` and `Rejected` delete the whole
//!    destination batch, `Deferred` leaves it for the next cycle
//! 4. **Fail-safe senders**: a sender error, panic or timeout counts as
//!    `Deferred`
//! 5. **One pending timer**: re-arming cancels the previous timer
//!
//! ## Architecture
//!
//! ```text
//! send(event) -> Resolver -> Serializer -> Persist x N ──┐
//!                                                        v
//!                               Runner queue (FIFO, single consumer)
//!                                                        |
//!            Deliver: load_oldest -> group -> Sender -> delete -> schedule
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use logline::{
//!     DeliveryOutcome, FixedIntervalPolicy, InMemoryStore, JsonSerializer, Pipeline,
//!     PipelineConfig, SerializedRecord, Sender, TypedLog,
//! };
//! use serde::Serialize;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[derive(Serialize)]
//! struct ClickLog {
//!     id: u32,
//! }
//!
//! impl TypedLog for ClickLog {
//!     const LOG_TYPE: &'static str = "click";
//! }
//!
//! struct Stdout;
//!
//! #[async_trait::async_trait]
//! impl Sender for Stdout {
//!     async fn deliver(
//!         &self,
//!         batch: &[SerializedRecord],
//!     ) -> Result<DeliveryOutcome, logline::BoxError> {
//!         for record in batch {
//!             println!("{}", record.payload);
//!         }
//!         Ok(DeliveryOutcome::Delivered)
//!     }
//! }
//!
//! # async fn run() -> logline::PipelineResult<()> {
//! let config = PipelineConfig::builder(
//!     Arc::new(InMemoryStore::new()),
//!     Arc::new(JsonSerializer::new()),
//! )
//! .destination("stdout", Arc::new(Stdout), ["click"])
//! .scheduler(Arc::new(FixedIntervalPolicy::new(Duration::from_secs(5))))
//! .build()?;
//!
//! let pipeline = Pipeline::new();
//! pipeline.start(config)?;
//! pipeline.send(&ClickLog { id: 1 })?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod observer;
mod pipeline;
pub mod resolver;
mod runner;
pub mod scheduler;
pub mod sender;
pub mod serializer;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

pub use config::{PipelineConfig, PipelineConfigBuilder, PipelineSettings, DEFAULT_BATCH_SIZE};
pub use error::{
    BoxError, PipelineError, PipelineResult, SerializeError, StoreError, StoreResult,
};
pub use observer::Observer;
pub use pipeline::Pipeline;
pub use resolver::Resolver;
pub use runner::Runner;
pub use scheduler::{FixedIntervalPolicy, NextCycle, SchedulingPolicy, DEFAULT_FLUSH_INTERVAL};
pub use sender::Sender;
pub use serializer::{Filter, JsonSerializer, Serializer, TimestampFilter};
pub use store::{InMemoryStore, Store};
pub use types::{
    CycleOutcome, DeliveryOutcome, DestinationId, LogEvent, LogType, RecordId, SerializedRecord,
    TypedLog,
};

// Re-exported so implementors of the async traits use the same macro version.
pub use async_trait::async_trait;
