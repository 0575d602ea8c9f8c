use std::collections::BTreeMap;

use serde::Serialize;

/// Active guest sessions of one portal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PortalSessionAggregate {
    pub portal: String,
    /// Session count keyed by the serving AP's MAC address.
    pub per_device: BTreeMap<String, u64>,
    /// Total reported by the controller.
    pub total: u64,
}

impl PortalSessionAggregate {
    /// Number of sessions actually counted across all fetched pages.
    pub fn counted(&self) -> u64 {
        self.per_device.values().sum()
    }
}
