//! Collision-effect dispatch.
//!
//! A [`CollisionRegistry`] maps an unordered pair of [`CollisionType`]s to a
//! handler. After every physics step the world looks up each overlapping
//! collider pair and calls the handler once, with the [`Contact`] oriented so
//! that `first` carries the first type of the registered key.
//!
//! Handlers return whether physics resolution should continue for the pair.
//! They must not panic: anything stale (a removed drone, a person already
//! rescued this tick) is silently ignored.

use std::collections::HashMap;
use std::fmt;

use swarm_core::prelude::*;
use tracing::{debug, trace};

use crate::entity::{Entity, EntityKind};
use crate::physics::{ColliderTag, OverlapPair};
use crate::report::SimEvent;
use crate::world::World;
use crate::zone::ZoneKind;

/// An overlapping pair, oriented to match the registered key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub first: ColliderTag,
    pub second: ColliderTag,
}

pub type CollisionHandler = fn(&mut World, &Contact) -> bool;

#[derive(Clone, Default)]
pub struct CollisionRegistry {
    handlers: HashMap<(CollisionType, CollisionType), CollisionHandler>,
}

impl fmt::Debug for CollisionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.handlers.keys().collect();
        keys.sort();
        f.debug_struct("CollisionRegistry").field("pairs", &keys).finish()
    }
}

impl CollisionRegistry {
    /// A registry with no handlers.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The handlers every world starts with.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(CollisionType::Grasper, CollisionType::Liftable, grasp_liftable);
        registry.register(CollisionType::Liftable, CollisionType::RescueCenter, rescue_liftable);
        registry.register(CollisionType::Disabler, CollisionType::DroneBody, disable_drone);
        registry.register(CollisionType::ReturnArea, CollisionType::DroneBody, track_return);
        registry.register(CollisionType::DroneBody, CollisionType::Wall, drone_hits_wall);
        registry.register(CollisionType::DroneBody, CollisionType::DroneBody, drones_collide);
        registry
    }

    /// Install `handler` for `(a, b)`, replacing any handler registered for
    /// the pair in either order.
    pub fn register(&mut self, a: CollisionType, b: CollisionType, handler: CollisionHandler) {
        self.handlers.remove(&(b, a));
        self.handlers.insert((a, b), handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Find the handler for an overlapping pair and orient the contact.
    pub fn resolve(&self, pair: &OverlapPair) -> Option<(CollisionHandler, Contact)> {
        let (a, b) = (pair.a, pair.b);
        if let Some(&h) = self.handlers.get(&(a.collision_type, b.collision_type)) {
            return Some((h, Contact { first: a, second: b }));
        }
        self.handlers
            .get(&(b.collision_type, a.collision_type))
            .map(|&h| (h, Contact { first: b, second: a }))
    }
}

// ---------------------------------------------------------------------------
// Default handlers
// ---------------------------------------------------------------------------

fn grasp_liftable(world: &mut World, contact: &Contact) -> bool {
    world.grasp(contact.first.entity, contact.second.entity);
    true
}

fn rescue_liftable(world: &mut World, contact: &Contact) -> bool {
    world.rescue(contact.first.entity, contact.second.entity);
    true
}

fn disable_drone(world: &mut World, contact: &Contact) -> bool {
    let zone = contact.first.entity;
    let drone = contact.second.entity;
    let Some(ZoneKind::Disabler(disabler)) = world
        .entities
        .get(&zone)
        .filter(|e| !e.removed)
        .and_then(Entity::as_zone)
        .map(|z| z.kind.clone())
    else {
        return true;
    };
    if let Some(d) = world
        .entities
        .get_mut(&drone)
        .filter(|e| !e.removed)
        .and_then(Entity::as_drone_mut)
    {
        d.disable_devices(&disabler.disables);
        if disabler.kill {
            d.mark_killed();
        }
        trace!(tick = world.timestep, zone = %zone, drone = %drone, "devices disabled");
    }
    true
}

fn track_return(world: &mut World, contact: &Contact) -> bool {
    let drone = contact.second.entity;
    let drone_live = world
        .entities
        .get(&drone)
        .is_some_and(|e| !e.removed && matches!(e.kind, EntityKind::Drone(_)));
    if !drone_live {
        return true;
    }
    if let Some(ZoneKind::ReturnArea { inside }) = world
        .entities
        .get_mut(&contact.first.entity)
        .and_then(Entity::as_zone_mut)
        .map(|z| &mut z.kind)
    {
        inside.insert(drone);
    }
    true
}

fn drone_hits_wall(world: &mut World, contact: &Contact) -> bool {
    world.record_collision(contact.first.entity, contact.second.entity);
    true
}

fn drones_collide(world: &mut World, contact: &Contact) -> bool {
    world.record_collision(contact.first.entity, contact.second.entity);
    world.record_collision(contact.second.entity, contact.first.entity);
    true
}

impl World {
    /// Count a collision against `drone` and apply damage. A drone whose
    /// health runs out is removed definitively at the end of the tick.
    pub(crate) fn record_collision(&mut self, drone: EntityId, other: EntityId) {
        let Some(d) = self
            .entities
            .get_mut(&drone)
            .filter(|e| !e.removed)
            .and_then(Entity::as_drone_mut)
        else {
            return;
        };
        let destroyed = d.record_collision();
        self.report.push(SimEvent::Collision { drone, other });
        if destroyed {
            debug!(tick = self.timestep, drone = %drone, "drone destroyed by collisions");
            self.schedule_removal(drone, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(i: u32, collision_type: CollisionType) -> ColliderTag {
        ColliderTag {
            entity: EntityId::new(i, 0),
            collision_type,
        }
    }

    fn noop(_: &mut World, _: &Contact) -> bool {
        false
    }

    #[test]
    fn lookup_is_unordered() {
        let registry = CollisionRegistry::with_defaults();
        // Liftable entity sorts before the grasper's drone here.
        let pair = OverlapPair {
            a: tag(1, CollisionType::Liftable),
            b: tag(2, CollisionType::Grasper),
        };
        let (_, contact) = registry.resolve(&pair).unwrap();
        assert_eq!(contact.first.collision_type, CollisionType::Grasper);
        assert_eq!(contact.second.collision_type, CollisionType::Liftable);
    }

    #[test]
    fn unregistered_pair_has_no_handler() {
        let registry = CollisionRegistry::with_defaults();
        let pair = OverlapPair {
            a: tag(1, CollisionType::Wall),
            b: tag(2, CollisionType::Liftable),
        };
        assert!(registry.resolve(&pair).is_none());
    }

    #[test]
    fn register_replaces_reversed_key() {
        let mut registry = CollisionRegistry::with_defaults();
        let before = registry.len();
        registry.register(CollisionType::Liftable, CollisionType::Grasper, noop);
        assert_eq!(registry.len(), before);
        let pair = OverlapPair {
            a: tag(1, CollisionType::Grasper),
            b: tag(2, CollisionType::Liftable),
        };
        let (_, contact) = registry.resolve(&pair).unwrap();
        assert_eq!(contact.first.collision_type, CollisionType::Liftable);
    }
}
