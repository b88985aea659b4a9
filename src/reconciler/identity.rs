//! Container identity correlation.
//!
//! The runtime reports full 64 character identifiers, while records may hold
//! abbreviated ones (or the reverse). Every place that correlates a record
//! with a container goes through [`ids_match`].

use crate::docker::ContainerInfo;
use crate::records::ConfiguredServer;

/// True when `stored` and `observed` refer to the same container: equal, or
/// one is a prefix of the other. An empty identifier matches nothing.
pub fn ids_match(stored: &str, observed: &str) -> bool {
    if stored.is_empty() || observed.is_empty() {
        return false;
    }
    stored.starts_with(observed) || observed.starts_with(stored)
}

/// First record whose container reference matches `container_id`.
pub fn find_record<'a>(
    records: &'a [ConfiguredServer],
    container_id: &str,
) -> Option<&'a ConfiguredServer> {
    records
        .iter()
        .find(|r| ids_match(&r.container_id, container_id))
}

/// Observed container for a record, if one is present.
pub fn find_container<'a>(
    containers: &'a [ContainerInfo],
    record: &ConfiguredServer,
) -> Option<&'a ContainerInfo> {
    containers
        .iter()
        .find(|c| ids_match(&record.container_id, &c.full_id))
}

pub fn is_tracked(records: &[ConfiguredServer], container_id: &str) -> bool {
    find_record(records, container_id).is_some()
}
