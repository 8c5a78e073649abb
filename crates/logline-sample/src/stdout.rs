//! Destination that prints each record as one line.

use async_trait::async_trait;
use logline::{BoxError, DeliveryOutcome, Sender, SerializedRecord};
use parking_lot::Mutex;
use std::io::Write;

/// Writes `<destination> <log_type> <payload>` lines to a writer.
pub struct LineSender {
    out: Mutex<Box<dyn Write + Send>>,
}

impl LineSender {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
        }
    }

    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

#[async_trait]
impl Sender for LineSender {
    async fn deliver(&self, batch: &[SerializedRecord]) -> Result<DeliveryOutcome, BoxError> {
        let mut out = self.out.lock();
        for record in batch {
            writeln!(out, "{} {} {}", record.destination, record.log_type, record.payload)?;
        }
        out.flush()?;
        Ok(DeliveryOutcome::Delivered)
    }
}
