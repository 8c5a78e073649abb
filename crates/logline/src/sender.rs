//! Delivery backend contract.

use crate::error::BoxError;
use crate::types::{DeliveryOutcome, SerializedRecord};
use async_trait::async_trait;

/// Accepts a batch of records for one destination.
///
/// The runner invokes a sender at most once per cycle, with every loaded
/// record for its destination, and never concurrently with itself.
///
/// Returning `Err` (or panicking) is not fatal: the runner treats it as
/// [`DeliveryOutcome::Deferred`] and keeps the records for the next cycle.
#[async_trait]
pub trait Sender: Send + Sync {
    /// Delivers one batch and reports the outcome.
    async fn deliver(&self, batch: &[SerializedRecord]) -> Result<DeliveryOutcome, BoxError>;
}
