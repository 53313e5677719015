//! Grasping: pinning wounded persons to a drone with a joint.
//!
//! The grasper's discrete controller is read at the start of every tick.
//! Command `0` releases everything held; any other value arms the grasper.
//! An armed grasper attaches whatever liftable its halo overlaps during the
//! physics phase, up to `max_grasped` entities.

use rapier2d::prelude::ImpulseJointHandle;
use swarm_core::prelude::*;
use tracing::{debug, trace};

use crate::device::controller::{Controller, DiscreteController};
use crate::device::{Device, DeviceState};
use crate::entity::Entity;
use crate::report::SimEvent;
use crate::world::World;

/// Fraction of the anchor-to-target segment where the pin joint sits.
const PIN_FRACTION: f64 = 0.7;

/// One held entity and the joint holding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grasp {
    pub target: EntityId,
    pub joint: ImpulseJointHandle,
}

#[derive(Debug, Clone)]
pub struct Grasper {
    controller: DiscreteController,
    max_grasped: usize,
    held: Vec<Grasp>,
    can_grasp: bool,
}

impl Grasper {
    pub fn new(anchor: EntityId, max_grasped: usize, strict: bool) -> Self {
        Self {
            controller: DiscreteController::grasper(anchor, strict),
            max_grasped,
            held: Vec::new(),
            can_grasp: false,
        }
    }

    pub fn controller(&self) -> &DiscreteController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut DiscreteController {
        &mut self.controller
    }

    pub fn max_grasped(&self) -> usize {
        self.max_grasped
    }

    pub fn can_grasp(&self) -> bool {
        self.can_grasp
    }

    /// Held entities in the order they were grasped.
    pub fn held(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.held.iter().map(|g| g.target)
    }

    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    pub fn is_holding(&self, target: EntityId) -> bool {
        self.held.iter().any(|g| g.target == target)
    }

    /// Whether a grasp of `target` would be accepted right now.
    pub fn admits(&self, target: EntityId) -> bool {
        self.can_grasp
            && !self.disabled()
            && !self.is_holding(target)
            && self.held.len() < self.max_grasped
    }

    /// Read the controller for this tick. Returns `true` when everything
    /// held must be released.
    pub fn read_command(&mut self) -> bool {
        self.can_grasp = self.controller.effective_command() != 0;
        !self.can_grasp && !self.held.is_empty()
    }

    fn push(&mut self, grasp: Grasp) {
        self.held.push(grasp);
    }

    fn take(&mut self, target: EntityId) -> Option<Grasp> {
        let idx = self.held.iter().position(|g| g.target == target)?;
        Some(self.held.remove(idx))
    }

    pub fn reset(&mut self) {
        self.controller.state_mut().reset();
        self.controller.clear();
        self.held.clear();
        self.can_grasp = false;
    }
}

impl Device for Grasper {
    fn state(&self) -> &DeviceState {
        self.controller.state()
    }

    fn state_mut(&mut self) -> &mut DeviceState {
        self.controller.state_mut()
    }
}

// ---------------------------------------------------------------------------
// World-level operations
// ---------------------------------------------------------------------------

impl World {
    /// Pin `target` to `drone`. Returns `true` if a new grasp was made.
    ///
    /// No-op when the grasper is disarmed or full, already holds `target`,
    /// or either entity is gone.
    pub(crate) fn grasp(&mut self, drone: EntityId, target: EntityId) -> bool {
        let (Some(anchor_body), Some(target_body)) = (self.live_body(drone), self.live_body(target))
        else {
            return false;
        };
        let admitted = self
            .entities
            .get(&drone)
            .and_then(Entity::as_drone)
            .is_some_and(|d| d.grasper().admits(target));
        let liftable = self.entities.get(&target).and_then(Entity::as_wounded).is_some();
        if !admitted || !liftable {
            return false;
        }

        let (Some(a), Some(b)) = (self.physics.pose(anchor_body), self.physics.pose(target_body))
        else {
            return false;
        };
        let pin = a.position.lerp(b.position, PIN_FRACTION);
        let (Some(local_a), Some(local_b)) = (
            self.physics.world_to_local(anchor_body, pin),
            self.physics.world_to_local(target_body, pin),
        ) else {
            return false;
        };
        let Some(joint) = self
            .physics
            .insert_pin_joint(anchor_body, local_a, target_body, local_b)
        else {
            trace!(tick = self.timestep, drone = %drone, wounded = %target, "grasp skipped, body missing");
            return false;
        };

        if let Some(d) = self.entities.get_mut(&drone).and_then(Entity::as_drone_mut) {
            d.grasper_mut().push(Grasp { target, joint });
            d.hide_from_sensors(target);
        }
        if let Some(w) = self.entities.get_mut(&target).and_then(Entity::as_wounded_mut) {
            w.grasped_by.push(drone);
        }
        debug!(tick = self.timestep, drone = %drone, wounded = %target, "grasped");
        self.report.push(SimEvent::Grasped {
            drone,
            wounded: target,
        });
        true
    }

    /// Undo a grasp. Safe to call after the joint or either body is gone.
    pub(crate) fn release(&mut self, drone: EntityId, target: EntityId) -> bool {
        let Some(grasp) = self
            .entities
            .get_mut(&drone)
            .and_then(Entity::as_drone_mut)
            .and_then(|d| {
                let g = d.grasper_mut().take(target)?;
                d.reveal_to_sensors(target);
                Some(g)
            })
        else {
            return false;
        };
        if !self.physics.remove_joint(grasp.joint) {
            trace!(tick = self.timestep, drone = %drone, wounded = %target, "joint already torn down");
        }
        if let Some(w) = self.entities.get_mut(&target).and_then(Entity::as_wounded_mut) {
            w.grasped_by.retain(|&d| d != drone);
        }
        debug!(tick = self.timestep, drone = %drone, wounded = %target, "released");
        self.report.push(SimEvent::Released {
            drone,
            wounded: target,
        });
        true
    }

    /// Release everything `drone` holds. Returns how many were released.
    pub(crate) fn release_all(&mut self, drone: EntityId) -> usize {
        let targets: Vec<EntityId> = self
            .entities
            .get(&drone)
            .and_then(Entity::as_drone)
            .map(|d| d.grasper().held().collect())
            .unwrap_or_default();
        targets
            .into_iter()
            .filter(|&t| self.release(drone, t))
            .count()
    }

    /// Detach `target` from every drone holding it.
    pub(crate) fn release_from_all(&mut self, target: EntityId) {
        let holders: Vec<EntityId> = self
            .entities
            .get(&target)
            .and_then(Entity::as_wounded)
            .map(|w| w.grasped_by.clone())
            .unwrap_or_default();
        for drone in holders {
            self.release(drone, target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn armed(max: usize) -> Grasper {
        let mut g = Grasper::new(EntityId::new(0, 0), max, false);
        g.controller_mut().set_command(1).unwrap();
        g.read_command();
        g
    }

    #[test]
    fn disarmed_grasper_admits_nothing() {
        let g = Grasper::new(EntityId::new(0, 0), 1, false);
        assert!(!g.admits(EntityId::new(1, 0)));
    }

    #[test]
    fn command_zero_requests_release_only_when_holding() {
        let mut g = armed(2);
        g.controller_mut().set_command(0).unwrap();
        assert!(!g.read_command(), "nothing held, nothing to release");
        assert!(!g.can_grasp());
    }

    #[test]
    fn admission_respects_capacity_and_duplicates() {
        let mut g = armed(1);
        let target = EntityId::new(1, 0);
        assert!(g.admits(target));
        g.push(Grasp {
            target,
            joint: ImpulseJointHandle::invalid(),
        });
        assert!(!g.admits(target));
        assert!(!g.admits(EntityId::new(2, 0)), "max_grasped reached");
        assert!(g.take(target).is_some());
        assert!(g.take(target).is_none());
    }

    #[test]
    fn disabled_grasper_admits_nothing() {
        let mut g = armed(1);
        g.disable();
        assert!(!g.admits(EntityId::new(1, 0)));
    }
}
