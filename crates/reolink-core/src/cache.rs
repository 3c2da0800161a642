// ── Derived state cache ──
//
// Lazily filled device state that several accessors share: abilities
// (per user), link info, ports, device time, device info, and the
// "GetRtspUrl is unusable" decision. Everything here is session-scoped;
// the owning client wipes it from a disconnect callback and drops the
// user-scoped abilities from a logout callback.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, FixedOffset};
use tracing::debug;

use reolink_api::models::{Abilities, DevInfo, LocalLink, NetPort};

use crate::timezone::DeviceTimezone;

/// A device clock reading with the timezone it was reported in.
#[derive(Debug, Clone)]
pub struct DeviceTime {
    pub time: DateTime<FixedOffset>,
    pub timezone: Arc<DeviceTimezone>,
}

#[derive(Default)]
struct Inner {
    abilities: HashMap<Option<String>, Arc<Abilities>>,
    local_link: Option<LocalLink>,
    net_port: Option<NetPort>,
    device_time: Option<DeviceTime>,
    dev_info: Option<DevInfo>,
    no_get_rtsp: bool,
}

/// Session-scoped cache of derived device state.
#[derive(Default)]
pub struct DerivedCache {
    inner: RwLock<Inner>,
}

impl DerivedCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&Inner) -> T) -> T {
        f(&self.inner.read().expect("cache lock poisoned"))
    }

    fn write(&self, f: impl FnOnce(&mut Inner)) {
        f(&mut self.inner.write().expect("cache lock poisoned"));
    }

    // ── Abilities ────────────────────────────────────────────────────

    pub fn abilities(&self, username: Option<&str>) -> Option<Arc<Abilities>> {
        self.read(|c| c.abilities.get(&username.map(str::to_owned)).cloned())
    }

    pub fn set_abilities(&self, username: Option<&str>, abilities: Arc<Abilities>) {
        self.write(|c| {
            c.abilities.insert(username.map(str::to_owned), abilities);
        });
    }

    /// Drop the user-scoped abilities (on logout).
    pub fn clear_abilities(&self) {
        self.write(|c| c.abilities.clear());
    }

    // ── Network ──────────────────────────────────────────────────────

    pub fn local_link(&self) -> Option<LocalLink> {
        self.read(|c| c.local_link.clone())
    }

    pub fn set_local_link(&self, link: LocalLink) {
        self.write(|c| c.local_link = Some(link));
    }

    pub fn net_port(&self) -> Option<NetPort> {
        self.read(|c| c.net_port.clone())
    }

    pub fn set_net_port(&self, ports: NetPort) {
        self.write(|c| c.net_port = Some(ports));
    }

    pub fn no_get_rtsp(&self) -> bool {
        self.read(|c| c.no_get_rtsp)
    }

    pub fn set_no_get_rtsp(&self) {
        self.write(|c| c.no_get_rtsp = true);
    }

    // ── System ───────────────────────────────────────────────────────

    pub fn device_time(&self) -> Option<DeviceTime> {
        self.read(|c| c.device_time.clone())
    }

    pub fn set_device_time(&self, time: DeviceTime) {
        self.write(|c| c.device_time = Some(time));
    }

    pub fn dev_info(&self) -> Option<DevInfo> {
        self.read(|c| c.dev_info.clone())
    }

    pub fn set_dev_info(&self, info: DevInfo) {
        self.write(|c| c.dev_info = Some(info));
    }

    /// Forget everything (on disconnect).
    pub fn invalidate(&self) {
        self.write(|c| *c = Inner::default());
        debug!("derived cache invalidated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abilities_are_keyed_by_user() {
        let cache = DerivedCache::new();
        cache.set_abilities(None, Arc::new(Abilities::default()));
        assert!(cache.abilities(None).is_some());
        assert!(cache.abilities(Some("admin")).is_none());

        cache.set_abilities(Some("admin"), Arc::new(Abilities::default()));
        cache.clear_abilities();
        assert!(cache.abilities(None).is_none());
        assert!(cache.abilities(Some("admin")).is_none());
    }

    #[test]
    fn invalidate_clears_every_field() {
        let cache = DerivedCache::new();
        cache.set_local_link(LocalLink::default());
        cache.set_net_port(NetPort::default());
        cache.set_dev_info(DevInfo::default());
        cache.set_no_get_rtsp();
        cache.set_abilities(None, Arc::new(Abilities::default()));

        cache.invalidate();
        assert!(cache.local_link().is_none());
        assert!(cache.net_port().is_none());
        assert!(cache.dev_info().is_none());
        assert!(cache.device_time().is_none());
        assert!(!cache.no_get_rtsp());
        assert!(cache.abilities(None).is_none());
    }
}
