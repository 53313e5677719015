//! Sensor-only zones: disablers, return areas and rescue centers.
//!
//! A zone body never blocks motion. Its effect is entirely carried by the
//! collision handler registered for its [`CollisionType`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use swarm_core::prelude::*;

/// Which devices a disabler zone switches off while a drone overlaps it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisablerZone {
    pub disables: BTreeSet<DeviceKind>,
    /// Mark the drone as killed for presentation. Has no effect on physics.
    pub kill: bool,
}

impl DisablerZone {
    pub fn new(disables: impl IntoIterator<Item = DeviceKind>) -> Self {
        Self {
            disables: disables.into_iter().collect(),
            kill: false,
        }
    }

    /// Drones inside cannot send or receive messages.
    pub fn no_communication() -> Self {
        Self::new([DeviceKind::Communicator])
    }

    /// Drones inside lose their position and heading measurements.
    pub fn no_gps() -> Self {
        Self::new([DeviceKind::Gps, DeviceKind::Compass])
    }

    /// Every device is disabled and the drone is flagged as killed.
    pub fn kill() -> Self {
        Self {
            disables: DeviceKind::ALL.into_iter().collect(),
            kill: true,
        }
    }

    pub fn disables(&self, kind: DeviceKind) -> bool {
        self.disables.contains(&kind)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ZoneKind {
    Disabler(DisablerZone),
    /// Drones overlapping the area during the current tick.
    ReturnArea { inside: BTreeSet<EntityId> },
    /// Wounded persons delivered so far.
    RescueCenter { rescued: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub kind: ZoneKind,
}

impl Zone {
    pub fn disabler(zone: DisablerZone) -> Self {
        Self {
            kind: ZoneKind::Disabler(zone),
        }
    }

    pub fn return_area() -> Self {
        Self {
            kind: ZoneKind::ReturnArea {
                inside: BTreeSet::new(),
            },
        }
    }

    pub fn rescue_center() -> Self {
        Self {
            kind: ZoneKind::RescueCenter { rescued: 0 },
        }
    }

    pub fn collision_type(&self) -> CollisionType {
        match self.kind {
            ZoneKind::Disabler(_) => CollisionType::Disabler,
            ZoneKind::ReturnArea { .. } => CollisionType::ReturnArea,
            ZoneKind::RescueCenter { .. } => CollisionType::RescueCenter,
        }
    }

    /// Short label used by the scoreboard.
    pub fn label(&self) -> &'static str {
        match &self.kind {
            ZoneKind::Disabler(d) if d.kill => "kill_zone",
            ZoneKind::Disabler(_) => "disabler",
            ZoneKind::ReturnArea { .. } => "return_area",
            ZoneKind::RescueCenter { .. } => "rescue_center",
        }
    }

    /// Drones inside a return area, or persons rescued by a center. Always
    /// zero for disablers.
    pub fn occupancy(&self) -> usize {
        match &self.kind {
            ZoneKind::ReturnArea { inside } => inside.len(),
            ZoneKind::RescueCenter { rescued } => *rescued as usize,
            ZoneKind::Disabler(_) => 0,
        }
    }

    pub fn pre_step(&mut self) {
        if let ZoneKind::ReturnArea { inside } = &mut self.kind {
            inside.clear();
        }
    }

    pub fn reset(&mut self) {
        match &mut self.kind {
            ZoneKind::ReturnArea { inside } => inside.clear(),
            ZoneKind::RescueCenter { rescued } => *rescued = 0,
            ZoneKind::Disabler(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_disable_expected_devices() {
        let no_com = DisablerZone::no_communication();
        assert!(no_com.disables(DeviceKind::Communicator));
        assert!(!no_com.disables(DeviceKind::Lidar));

        let no_gps = DisablerZone::no_gps();
        assert!(no_gps.disables(DeviceKind::Gps));
        assert!(no_gps.disables(DeviceKind::Compass));

        let kill = DisablerZone::kill();
        assert!(kill.kill);
        assert!(DeviceKind::ALL.iter().all(|&k| kill.disables(k)));
    }

    #[test]
    fn return_area_forgets_occupants_each_tick() {
        let mut zone = Zone::return_area();
        if let ZoneKind::ReturnArea { inside } = &mut zone.kind {
            inside.insert(EntityId::new(2, 0));
        }
        assert_eq!(zone.occupancy(), 1);
        zone.pre_step();
        assert_eq!(zone.occupancy(), 0);
    }

    #[test]
    fn rescue_count_survives_pre_step_but_not_reset() {
        let mut zone = Zone::rescue_center();
        zone.kind = ZoneKind::RescueCenter { rescued: 3 };
        zone.pre_step();
        assert_eq!(zone.occupancy(), 3);
        zone.reset();
        assert_eq!(zone.occupancy(), 0);
    }
}
