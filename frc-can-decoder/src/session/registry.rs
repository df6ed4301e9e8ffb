//! Controller registry
//!
//! One [`Controller`] per global address seen by a session. Controllers are
//! never removed; live ones are only marked offline.

use crate::types::{GlobalAddress, Timestamp};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Liveness state of a controller on a live bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ControllerStatus {
    Online,
    Offline,
}

impl fmt::Display for ControllerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerStatus::Online => write!(f, "Online"),
            ControllerStatus::Offline => write!(f, "Offline"),
        }
    }
}

/// Liveness fields, present only for controllers of a live session
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Liveness {
    pub first_detected: Timestamp,
    pub last_seen: Timestamp,
    /// Seconds between the two most recent sightings
    pub latency: f64,
    pub status: ControllerStatus,
}

/// One physical device on the bus
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Controller {
    address: GlobalAddress,
    apis_seen: BTreeSet<u16>,
    liveness: Option<Liveness>,
}

impl Controller {
    /// `detected_at` is `Some` for live sessions
    pub(crate) fn new(address: GlobalAddress, detected_at: Option<Timestamp>) -> Self {
        Self {
            address,
            apis_seen: BTreeSet::new(),
            liveness: detected_at.map(|now| Liveness {
                first_detected: now,
                last_seen: now,
                latency: 0.0,
                status: ControllerStatus::Online,
            }),
        }
    }

    pub fn address(&self) -> GlobalAddress {
        self.address
    }

    /// Every API code observed so far
    pub fn apis_seen(&self) -> &BTreeSet<u16> {
        &self.apis_seen
    }

    pub fn liveness(&self) -> Option<&Liveness> {
        self.liveness.as_ref()
    }

    /// `None` for controllers of a log session
    pub fn status(&self) -> Option<ControllerStatus> {
        self.liveness.map(|l| l.status)
    }

    /// Note one more frame from this device
    pub(crate) fn record_sighting(&mut self, api: u16, now: Timestamp) {
        self.apis_seen.insert(api);

        if let Some(liveness) = self.liveness.as_mut() {
            liveness.latency = now - liveness.last_seen;
            liveness.last_seen = now;
            liveness.status = ControllerStatus::Online;
        }
    }

    /// Mark offline when unseen for longer than `offline_threshold` seconds.
    ///
    /// Returns true on an Online -> Offline transition.
    pub(crate) fn sweep_liveness(&mut self, now: Timestamp, offline_threshold: f64) -> bool {
        match self.liveness.as_mut() {
            Some(liveness)
                if liveness.status == ControllerStatus::Online
                    && now - liveness.last_seen > offline_threshold =>
            {
                liveness.status = ControllerStatus::Offline;
                true
            }
            _ => false,
        }
    }
}

/// Controllers indexed by global address
#[derive(Debug, Clone, Default)]
pub struct ControllerRegistry {
    controllers: Vec<Controller>,
    index: HashMap<GlobalAddress, usize>,
    live: bool,
}

impl ControllerRegistry {
    pub fn new(live: bool) -> Self {
        Self {
            controllers: Vec::new(),
            index: HashMap::new(),
            live,
        }
    }

    /// Existing controller for `address`, or a freshly inserted one
    pub fn resolve_or_create(&mut self, address: GlobalAddress, now: Timestamp) -> &mut Controller {
        let idx = match self.index.get(&address) {
            Some(&idx) => idx,
            None => {
                log::debug!(
                    "New controller {} ({} / {})",
                    address,
                    address.device_type_name(),
                    address.manufacturer_name()
                );
                let detected_at = if self.live { Some(now) } else { None };
                self.controllers.push(Controller::new(address, detected_at));
                let idx = self.controllers.len() - 1;
                self.index.insert(address, idx);
                idx
            }
        };
        &mut self.controllers[idx]
    }

    pub fn get(&self, address: &GlobalAddress) -> Option<&Controller> {
        self.index.get(address).map(|&idx| &self.controllers[idx])
    }

    /// Controllers in order of first detection
    pub fn iter(&self) -> impl Iterator<Item = &Controller> {
        self.controllers.iter()
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Liveness sweep over every controller; returns how many went offline
    pub fn sweep_liveness(&mut self, now: Timestamp, offline_threshold: f64) -> usize {
        let mut went_offline = 0;
        for controller in &mut self.controllers {
            if controller.sweep_liveness(now, offline_threshold) {
                log::info!("Controller {} went offline", controller.address);
                went_offline += 1;
            }
        }
        went_offline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> GlobalAddress {
        GlobalAddress::new(2, 5, n).unwrap()
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut registry = ControllerRegistry::new(false);
        registry.resolve_or_create(addr(1), 0.0).record_sighting(10, 0.0);
        registry.resolve_or_create(addr(1), 1.0).record_sighting(11, 1.0);
        registry.resolve_or_create(addr(2), 2.0);

        assert_eq!(registry.len(), 2);
        let c = registry.get(&addr(1)).unwrap();
        assert_eq!(c.apis_seen().iter().copied().collect::<Vec<_>>(), vec![10, 11]);
        assert!(c.liveness().is_none());
        assert!(c.status().is_none());
    }

    #[test]
    fn test_apis_seen_has_set_semantics() {
        let mut registry = ControllerRegistry::new(false);
        let c = registry.resolve_or_create(addr(1), 0.0);
        c.record_sighting(7, 0.0);
        c.record_sighting(7, 0.1);
        c.record_sighting(3, 0.2);
        assert_eq!(c.apis_seen().len(), 2);
    }

    #[test]
    fn test_live_controller_latency() {
        let mut registry = ControllerRegistry::new(true);
        let c = registry.resolve_or_create(addr(1), 10.0);
        c.record_sighting(1, 10.0);
        c.record_sighting(1, 10.25);

        let liveness = c.liveness().unwrap();
        assert_eq!(liveness.first_detected, 10.0);
        assert_eq!(liveness.last_seen, 10.25);
        assert_eq!(liveness.latency, 0.25);
        assert_eq!(liveness.status, ControllerStatus::Online);
    }

    #[test]
    fn test_sweep_marks_offline_but_keeps_controller() {
        let mut registry = ControllerRegistry::new(true);
        registry.resolve_or_create(addr(1), 0.0).record_sighting(1, 0.0);
        registry.resolve_or_create(addr(2), 0.0).record_sighting(1, 0.9);

        // Exactly at the threshold is still online
        assert_eq!(registry.sweep_liveness(1.0, 1.0), 0);
        assert_eq!(registry.sweep_liveness(1.5, 1.0), 1);
        assert_eq!(registry.get(&addr(1)).unwrap().status(), Some(ControllerStatus::Offline));
        assert_eq!(registry.get(&addr(2)).unwrap().status(), Some(ControllerStatus::Online));

        // Already offline: no second transition
        assert_eq!(registry.sweep_liveness(1.6, 1.0), 0);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_log_registry_ignores_sweeps() {
        let mut registry = ControllerRegistry::new(false);
        registry.resolve_or_create(addr(1), 0.0).record_sighting(1, 0.0);
        assert_eq!(registry.sweep_liveness(100.0, 1.0), 0);
        assert!(registry.get(&addr(1)).unwrap().status().is_none());
    }
}
