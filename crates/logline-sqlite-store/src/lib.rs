//! SQLite-backed durable store for logline.
//!
//! Records survive process restarts: anything persisted but not yet
//! delivered is picked up by the first delivery cycle after the next start.
//!
//! All SQLite work runs on the dedicated `tokio-rusqlite` thread, so the
//! pipeline's consumer task only awaits.
//!
//! ```ignore
//! let store = SqliteStore::open(Path::new("/var/lib/app/logline.db")).await?;
//! let config = PipelineConfig::builder(Arc::new(store), Arc::new(JsonSerializer::new()));
//! ```

mod error;
mod migrations;
pub mod queries;
mod store;

pub use error::{SqliteStoreError, SqliteStoreResult};
pub use migrations::{run_migrations, CURRENT_VERSION};
pub use store::SqliteStore;
