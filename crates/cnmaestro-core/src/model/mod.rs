// ── Domain model ──
//
// Canonical types produced by the normalizer. They are built fresh for
// every scrape and dropped once the metrics are emitted.

pub mod ap_group;
pub mod device;
pub mod portal;

pub use ap_group::{ApGroupSummary, FleetSnapshot};
pub use device::{Availability, Band, Device, Radio, RebootEvent};
pub use portal::PortalSessionAggregate;
