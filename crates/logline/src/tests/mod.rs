//! Scenario tests for the pipeline runner.
//!
//! - `harness.rs`     - Recording store, scripted sender, policy and observer doubles
//! - `lifecycle.rs`   - start/stop/send state machine and hook ordering
//! - `persistence.rs` - one append per (event, destination) pair
//! - `delivery.rs`    - load, deliver and delete in batches
//! - `fanout.rs`      - independent copies per destination
//! - `scheduling.rs`  - timer debounce and superseded triggers
//! - `failures.rs`    - sender and store failures, unknown destinations

mod delivery;
