//! Scheduling policies decide when the next delivery cycle fires.

use crate::runner::Command;
use crate::types::CycleOutcome;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Default delay between delivery cycles.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Handle that requests the next delivery cycle.
///
/// Consumed on use, so one armed timer can trigger at most one cycle. If
/// the runner re-arms before this handle fires, the trigger is ignored.
#[derive(Debug)]
pub struct NextCycle {
    tx: mpsc::UnboundedSender<Command>,
    generation: u64,
}

impl NextCycle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Command>, generation: u64) -> Self {
        Self { tx, generation }
    }

    /// Generation of the timer this handle belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Enqueues the next delivery cycle.
    pub fn trigger(self) {
        let generation = self.generation;
        if self
            .tx
            .send(Command::Deliver {
                generation: Some(generation),
            })
            .is_err()
        {
            debug!(generation, "Runner stopped, dropping cycle trigger");
        }
    }
}

/// Decides, from the latest cycle's outcomes, when to trigger the next one.
///
/// The runner spawns `schedule` as its single pending timer task and aborts
/// it when a newer timer is armed or the pipeline stops.
#[async_trait]
pub trait SchedulingPolicy: Send + Sync {
    /// Waits as long as the policy wants, then calls `next.trigger()`.
    ///
    /// Dropping `next` without triggering stops further cycles until the
    /// pipeline is restarted.
    async fn schedule(&self, outcomes: &[CycleOutcome], next: NextCycle);
}

/// Fixed delay between cycles, independent of outcomes.
#[derive(Debug, Clone)]
pub struct FixedIntervalPolicy {
    interval: Duration,
}

impl FixedIntervalPolicy {
    /// Creates a policy with the given interval.
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// The configured interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for FixedIntervalPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_FLUSH_INTERVAL)
    }
}

#[async_trait]
impl SchedulingPolicy for FixedIntervalPolicy {
    async fn schedule(&self, _outcomes: &[CycleOutcome], next: NextCycle) {
        tokio::time::sleep(self.interval).await;
        next.trigger();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fixed_interval_triggers_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let policy = FixedIntervalPolicy::new(Duration::from_secs(5));

        let task = tokio::spawn(async move {
            policy.schedule(&[], NextCycle::new(tx, 7)).await;
        });

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(rx.try_recv().is_err(), "should not fire before the interval");

        task.await.unwrap();
        match rx.recv().await {
            Some(Command::Deliver { generation }) => assert_eq!(generation, Some(7)),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn default_interval_is_five_seconds() {
        assert_eq!(FixedIntervalPolicy::default().interval(), Duration::from_secs(5));
    }

    #[test]
    fn trigger_after_runner_gone_is_silent() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        NextCycle::new(tx, 1).trigger();
    }
}
