//! mDNS/DNS-SD based renderer discovery.
//!
//! Browses for cast-capable service types and turns resolved/removed service
//! records into [`DiscoveryEvent`]s.
//!
//! # Key Design Points
//!
//! - Uses resolved record data (IP from SRV/A answers), not string parsing
//! - Friendly names come from the `fn` TXT record for Google Cast devices
//!   and from the service instance name otherwise
//! - Removal records only carry the full service name, so [`RendererTable`]
//!   remembers every resolved handle to announce the same handle on removal

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use mdns_sd::{ResolvedService, ServiceDaemon, ServiceEvent};
use parking_lot::Mutex;

use super::types::{DiscoveryError, DiscoveryEvent, RendererHandle, RendererKind};

/// Google Cast mDNS service type (note: trailing dot is required by mdns-sd).
pub const CHROMECAST_SERVICE_TYPE: &str = "_googlecast._tcp.local.";

/// AirPlay mDNS service type.
pub const AIRPLAY_SERVICE_TYPE: &str = "_airplay._tcp.local.";

/// Every service type the backend browses, with the kind it maps to.
pub const BROWSED_SERVICE_TYPES: [(&str, RendererKind); 2] = [
    (CHROMECAST_SERVICE_TYPE, RendererKind::Chromecast),
    (AIRPLAY_SERVICE_TYPE, RendererKind::AirPlay),
];

/// TXT key carrying a Google Cast device's friendly name.
const TXT_FRIENDLY_NAME: &str = "fn";

/// TXT key carrying the device model.
const TXT_MODEL: &str = "md";

/// Maps an mDNS service type to a renderer kind.
pub fn kind_for_service_type(service_type: &str) -> RendererKind {
    BROWSED_SERVICE_TYPES
        .iter()
        .find(|(ty, _)| *ty == service_type)
        .map(|(_, kind)| *kind)
        .unwrap_or(RendererKind::Other)
}

/// Extracts the instance label from a full service name.
///
/// `Living Room._airplay._tcp.local.` → `Living Room`
fn instance_name(fullname: &str, service_type: &str) -> Option<String> {
    let instance = fullname
        .strip_suffix(service_type)?
        .strip_suffix('.')
        .unwrap_or_default();
    if instance.is_empty() {
        None
    } else {
        Some(instance.to_string())
    }
}

/// Builds a renderer handle from a resolved service record.
fn handle_from_resolved(
    info: &ResolvedService,
    service_type: &str,
    kind: RendererKind,
) -> RendererHandle {
    let mut handle = RendererHandle::new(info.fullname.clone(), kind);

    let friendly_name = match kind {
        RendererKind::Chromecast => info
            .txt_properties
            .get_property_val_str(TXT_FRIENDLY_NAME)
            .map(str::to_string),
        _ => instance_name(&info.fullname, service_type),
    };
    if let Some(name) = friendly_name {
        handle = handle.with_friendly_name(name);
    }

    // Prefer IPv4 - cast receivers are reliably reachable on it
    let ip = info
        .addresses
        .iter()
        .map(|addr| addr.to_ip_addr())
        .find(|ip| ip.is_ipv4());
    if let Some(ip) = ip {
        handle = handle.with_address(SocketAddr::new(ip, info.port));
    }

    if let Some(model) = info.txt_properties.get_property_val_str(TXT_MODEL) {
        handle = handle.with_model(model);
    }

    handle
}

/// Remembers resolved renderers by full service name.
#[derive(Default)]
pub(crate) struct RendererTable {
    known: Mutex<HashMap<String, Arc<RendererHandle>>>,
}

impl RendererTable {
    /// Records a resolved renderer and returns the matching add event.
    pub(crate) fn resolved(&self, handle: RendererHandle) -> DiscoveryEvent {
        let handle = Arc::new(handle);
        self.known
            .lock()
            .insert(handle.id().to_string(), Arc::clone(&handle));
        DiscoveryEvent::Added(handle)
    }

    /// Forgets a renderer and returns the matching remove event.
    ///
    /// A removal for a service that never resolved yields a handle without a
    /// name, which the bridge reports as a resolution failure.
    pub(crate) fn removed(&self, service_type: &str, fullname: &str) -> DiscoveryEvent {
        let handle = self.known.lock().remove(fullname).unwrap_or_else(|| {
            Arc::new(RendererHandle::new(
                fullname,
                kind_for_service_type(service_type),
            ))
        });
        DiscoveryEvent::Removed(handle)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.known.lock().len()
    }
}

/// Translates one mDNS daemon event into a discovery event.
///
/// Search lifecycle events carry no renderer information and yield `None`.
pub(crate) fn translate(
    table: &RendererTable,
    service_type: &str,
    kind: RendererKind,
    event: ServiceEvent,
) -> Option<DiscoveryEvent> {
    match event {
        ServiceEvent::ServiceResolved(info) => {
            log::trace!("[mDNS] Service resolved: {}", info.fullname);
            Some(table.resolved(handle_from_resolved(&info, service_type, kind)))
        }
        ServiceEvent::ServiceRemoved(removed_type, fullname) => {
            log::trace!("[mDNS] Service removed: {}", fullname);
            Some(table.removed(&removed_type, &fullname))
        }
        other => {
            log::trace!("[mDNS] Ignoring daemon event: {:?}", other);
            None
        }
    }
}

/// Creates a new mDNS service daemon.
///
/// The daemon spawns a background thread for mDNS operations and should be
/// reused for the lifetime of the backend.
pub fn create_daemon() -> Result<ServiceDaemon, DiscoveryError> {
    ServiceDaemon::new().map_err(|e| DiscoveryError::MdnsDaemon(e.to_string()))
}
