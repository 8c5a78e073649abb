//! Destination resolution: which destinations receive a given log type.

use crate::error::{PipelineError, PipelineResult};
use crate::types::{DestinationId, LogEvent, LogType};
use std::collections::HashMap;

/// Static mapping from log type to destinations, built once at configuration
/// time.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    routes: HashMap<LogType, Vec<DestinationId>>,
    default_destination: Option<DestinationId>,
}

impl Resolver {
    /// Builds the lookup table from `(destination, accepted log types)` rows.
    ///
    /// Destinations keep their row order for each log type.
    pub fn new<'a>(
        table: impl IntoIterator<Item = (&'a DestinationId, &'a [LogType])>,
        default_destination: Option<DestinationId>,
    ) -> Self {
        let mut routes: HashMap<LogType, Vec<DestinationId>> = HashMap::new();
        for (destination, log_types) in table {
            for log_type in log_types {
                let entry = routes.entry(log_type.clone()).or_default();
                if !entry.contains(destination) {
                    entry.push(destination.clone());
                }
            }
        }
        Self {
            routes,
            default_destination,
        }
    }

    /// Destinations for a log type.
    ///
    /// Falls back to the default destination; fails with
    /// [`PipelineError::UnmappedLogType`] when there is none.
    pub fn resolve_type(&self, log_type: &LogType) -> PipelineResult<Vec<DestinationId>> {
        match self.routes.get(log_type) {
            Some(destinations) if !destinations.is_empty() => Ok(destinations.clone()),
            _ => match &self.default_destination {
                Some(default) => Ok(vec![default.clone()]),
                None => Err(PipelineError::UnmappedLogType(log_type.clone())),
            },
        }
    }

    /// Destinations for an event.
    pub fn resolve(&self, event: &dyn LogEvent) -> PipelineResult<Vec<DestinationId>> {
        self.resolve_type(&event.log_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(default: Option<&str>) -> Resolver {
        let stdout = DestinationId::from("stdout");
        let remote = DestinationId::from("remote");
        let stdout_types = vec![LogType::from("click"), LogType::from("screen")];
        let remote_types = vec![LogType::from("click")];
        Resolver::new(
            vec![
                (&stdout, stdout_types.as_slice()),
                (&remote, remote_types.as_slice()),
            ],
            default.map(DestinationId::from),
        )
    }

    #[test]
    fn resolves_all_mapped_destinations_in_order() {
        let destinations = resolver(None).resolve_type(&"click".into()).unwrap();
        assert_eq!(
            destinations,
            vec![DestinationId::from("stdout"), DestinationId::from("remote")]
        );
    }

    #[test]
    fn resolves_single_destination() {
        let destinations = resolver(None).resolve_type(&"screen".into()).unwrap();
        assert_eq!(destinations, vec![DestinationId::from("stdout")]);
    }

    #[test]
    fn unmapped_type_is_an_error() {
        let err = resolver(None).resolve_type(&"purchase".into()).unwrap_err();
        assert!(matches!(err, PipelineError::UnmappedLogType(t) if t.as_str() == "purchase"));
    }

    #[test]
    fn unmapped_type_falls_back_to_default() {
        let destinations = resolver(Some("fallback"))
            .resolve_type(&"purchase".into())
            .unwrap();
        assert_eq!(destinations, vec![DestinationId::from("fallback")]);
    }

    #[test]
    fn mapped_type_ignores_default() {
        let destinations = resolver(Some("fallback"))
            .resolve_type(&"screen".into())
            .unwrap();
        assert_eq!(destinations, vec![DestinationId::from("stdout")]);
    }
}
