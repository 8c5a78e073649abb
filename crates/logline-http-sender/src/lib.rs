//! HTTP delivery for logline.
//!
//! [`HttpSender`] POSTs each destination batch as one JSON array and maps
//! the response status onto a [`logline::DeliveryOutcome`]:
//!
//! | Response                  | Outcome     |
//! |---------------------------|-------------|
//! | 2xx                       | `Delivered` |
//! | 408, 429, 5xx             | `Deferred`  |
//! | any other status          | `Rejected`  |
//! | connect / timeout failure | `Deferred`  |
//!
//! The sender never retries on its own; a deferred batch stays in the
//! store and is picked up by the next delivery cycle.

mod error;
mod sender;

pub use error::{HttpSenderError, HttpSenderResult};
pub use sender::{classify_status, encode_batch, HttpSender, HttpSenderConfig};
