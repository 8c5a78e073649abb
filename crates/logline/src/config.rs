//! Pipeline configuration.
//!
//! A [`PipelineConfig`] is built once before `start` and never changes
//! afterwards. Tunables can also be read from the environment through
//! [`PipelineSettings::from_env`].

use crate::error::{PipelineError, PipelineResult};
use crate::observer::Observer;
use crate::resolver::Resolver;
use crate::scheduler::{FixedIntervalPolicy, SchedulingPolicy, DEFAULT_FLUSH_INTERVAL};
use crate::sender::Sender;
use crate::serializer::Serializer;
use crate::store::Store;
use crate::types::{DestinationId, LogType};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Default number of records loaded per delivery cycle.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Immutable pipeline configuration.
pub struct PipelineConfig {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) serializer: Arc<dyn Serializer>,
    pub(crate) senders: HashMap<DestinationId, Arc<dyn Sender>>,
    pub(crate) resolver: Resolver,
    pub(crate) scheduler: Arc<dyn SchedulingPolicy>,
    pub(crate) batch_size: usize,
    pub(crate) delivery_timeout: Option<Duration>,
    pub(crate) drop_orphaned_records: bool,
    pub(crate) observer: Observer,
}

impl PipelineConfig {
    /// Starts building a configuration around a store and a serializer.
    pub fn builder(
        store: Arc<dyn Store>,
        serializer: Arc<dyn Serializer>,
    ) -> PipelineConfigBuilder {
        PipelineConfigBuilder::new(store, serializer)
    }

    /// Maximum records loaded per cycle.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Per-invocation sender timeout, if any.
    pub fn delivery_timeout(&self) -> Option<Duration> {
        self.delivery_timeout
    }

    /// Whether records for unconfigured destinations are deleted.
    pub fn drops_orphaned_records(&self) -> bool {
        self.drop_orphaned_records
    }

    /// Every configured destination.
    pub fn destination_ids(&self) -> impl Iterator<Item = &DestinationId> {
        self.senders.keys()
    }

    /// The destination resolver.
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub(crate) fn sender(&self, destination: &DestinationId) -> Option<&Arc<dyn Sender>> {
        self.senders.get(destination)
    }
}

impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("serializer", &self.serializer.type_tag())
            .field("destinations", &self.senders.keys().collect::<Vec<_>>())
            .field("batch_size", &self.batch_size)
            .field("delivery_timeout", &self.delivery_timeout)
            .field("drop_orphaned_records", &self.drop_orphaned_records)
            .field("observer", &self.observer)
            .finish()
    }
}

struct DestinationEntry {
    id: DestinationId,
    sender: Arc<dyn Sender>,
    accepts: Vec<LogType>,
}

/// Builder for [`PipelineConfig`].
pub struct PipelineConfigBuilder {
    store: Arc<dyn Store>,
    serializer: Arc<dyn Serializer>,
    destinations: Vec<DestinationEntry>,
    default_destination: Option<DestinationId>,
    scheduler: Option<Arc<dyn SchedulingPolicy>>,
    batch_size: usize,
    delivery_timeout: Option<Duration>,
    drop_orphaned_records: bool,
    observer: Observer,
}

impl PipelineConfigBuilder {
    fn new(store: Arc<dyn Store>, serializer: Arc<dyn Serializer>) -> Self {
        Self {
            store,
            serializer,
            destinations: Vec::new(),
            default_destination: None,
            scheduler: None,
            batch_size: DEFAULT_BATCH_SIZE,
            delivery_timeout: None,
            drop_orphaned_records: false,
            observer: Observer::default(),
        }
    }

    /// Registers a destination and the log types it accepts.
    pub fn destination<I, T>(
        mut self,
        id: impl Into<DestinationId>,
        sender: Arc<dyn Sender>,
        accepts: I,
    ) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<LogType>,
    {
        self.destinations.push(DestinationEntry {
            id: id.into(),
            sender,
            accepts: accepts.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Routes log types no destination accepts to this destination.
    pub fn default_destination(mut self, id: impl Into<DestinationId>) -> Self {
        self.default_destination = Some(id.into());
        self
    }

    /// Sets the scheduling policy. Defaults to a 5 second fixed interval.
    pub fn scheduler(mut self, policy: Arc<dyn SchedulingPolicy>) -> Self {
        self.scheduler = Some(policy);
        self
    }

    /// Sets the maximum number of records loaded per cycle.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Bounds every sender invocation; an expired invocation counts as deferred.
    pub fn delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = Some(timeout);
        self
    }

    /// Deletes loaded records whose destination is no longer registered,
    /// reporting them as rejected.
    ///
    /// Off by default: such records stay in the store, deferred, until a
    /// sender for their destination is registered again. They also keep
    /// occupying batch slots, so a host that retires destinations for good
    /// should turn this on.
    pub fn drop_orphaned_records(mut self, enabled: bool) -> Self {
        self.drop_orphaned_records = enabled;
        self
    }

    /// Installs diagnostic hooks.
    pub fn observer(mut self, observer: Observer) -> Self {
        self.observer = observer;
        self
    }

    /// Applies environment-derived settings.
    pub fn settings(mut self, settings: &PipelineSettings) -> Self {
        self.batch_size = settings.batch_size;
        self.delivery_timeout = settings.delivery_timeout;
        self.scheduler = Some(Arc::new(FixedIntervalPolicy::new(settings.flush_interval)));
        self
    }

    /// Validates and freezes the configuration.
    pub fn build(self) -> PipelineResult<PipelineConfig> {
        if self.batch_size == 0 {
            return Err(PipelineError::InvalidConfig(
                "batch size must be positive".to_string(),
            ));
        }
        if self.destinations.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "at least one destination is required".to_string(),
            ));
        }

        let mut senders = HashMap::with_capacity(self.destinations.len());
        for entry in &self.destinations {
            if senders
                .insert(entry.id.clone(), entry.sender.clone())
                .is_some()
            {
                return Err(PipelineError::InvalidConfig(format!(
                    "destination {} is registered twice",
                    entry.id
                )));
            }
        }

        if let Some(default) = &self.default_destination {
            if !senders.contains_key(default) {
                return Err(PipelineError::InvalidConfig(format!(
                    "default destination {} is not registered",
                    default
                )));
            }
        }

        let resolver = Resolver::new(
            self.destinations
                .iter()
                .map(|entry| (&entry.id, entry.accepts.as_slice())),
            self.default_destination,
        );

        Ok(PipelineConfig {
            store: self.store,
            serializer: self.serializer,
            senders,
            resolver,
            scheduler: self
                .scheduler
                .unwrap_or_else(|| Arc::new(FixedIntervalPolicy::default())),
            batch_size: self.batch_size,
            delivery_timeout: self.delivery_timeout,
            drop_orphaned_records: self.drop_orphaned_records,
            observer: self.observer,
        })
    }
}

/// Tunables read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Records loaded per cycle
    pub batch_size: usize,
    /// Delay between cycles
    pub flush_interval: Duration,
    /// Optional per-invocation sender timeout
    pub delivery_timeout: Option<Duration>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            delivery_timeout: None,
        }
    }
}

impl PipelineSettings {
    /// Reads `LOGLINE_BATCH_SIZE`, `LOGLINE_FLUSH_INTERVAL_MS` and
    /// `LOGLINE_DELIVERY_TIMEOUT_SECS`, falling back to defaults for unset or
    /// unparsable values.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let batch_size = lookup("LOGLINE_BATCH_SIZE")
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.batch_size);

        let flush_interval = lookup("LOGLINE_FLUSH_INTERVAL_MS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.flush_interval);

        let delivery_timeout = lookup("LOGLINE_DELIVERY_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs);

        Self {
            batch_size,
            flush_interval,
            delivery_timeout,
        }
    }
}
