//! World entities.
//!
//! Every entity owns exactly one [`PhysicalBody`]. What else it carries is
//! decided by its [`EntityKind`]: a drone owns its devices, a wounded person
//! its grasp bookkeeping, a zone its effect state.

use swarm_core::prelude::*;

use crate::agent::Drone;
use crate::body::PhysicalBody;
use crate::zone::Zone;

/// A liftable entity to be carried to a rescue center.
#[derive(Debug, Clone, PartialEq)]
pub struct WoundedPerson {
    pub reward: f64,
    /// Drones currently holding this person, in grasp order.
    pub grasped_by: Vec<EntityId>,
    /// Only this center accepts the person, if set.
    pub rescue_center: Option<EntityId>,
    pub rescued: bool,
}

impl WoundedPerson {
    pub fn new(reward: f64, rescue_center: Option<EntityId>) -> Self {
        Self {
            reward,
            grasped_by: Vec::new(),
            rescue_center,
            rescued: false,
        }
    }

    pub fn is_grasped(&self) -> bool {
        !self.grasped_by.is_empty()
    }

    /// Whether delivery to `center` counts as a rescue.
    pub fn accepts(&self, center: EntityId) -> bool {
        self.rescue_center.map_or(true, |c| c == center)
    }
}

#[derive(Debug, Clone)]
pub enum EntityKind {
    Wall,
    Drone(Box<Drone>),
    Wounded(WoundedPerson),
    Zone(Zone),
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub(crate) id: EntityId,
    pub(crate) name: Option<String>,
    /// Set as soon as removal is requested; the body is detached at the end
    /// of the tick.
    pub(crate) removed: bool,
    /// Ticks left before a temporary entity removes itself.
    pub(crate) lifetime: Option<u32>,
    pub(crate) initial_lifetime: Option<u32>,
    pub(crate) body: PhysicalBody,
    pub(crate) kind: EntityKind,
}

impl Entity {
    pub(crate) fn new(id: EntityId, body: PhysicalBody, kind: EntityKind) -> Self {
        Self {
            id,
            name: None,
            removed: false,
            lifetime: None,
            initial_lifetime: None,
            body,
            kind,
        }
    }

    pub(crate) fn with_lifetime(mut self, ticks: u32) -> Self {
        self.lifetime = Some(ticks);
        self.initial_lifetime = Some(ticks);
        self
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn removed(&self) -> bool {
        self.removed
    }

    pub fn lifetime(&self) -> Option<u32> {
        self.lifetime
    }

    pub fn body(&self) -> &PhysicalBody {
        &self.body
    }

    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    pub fn as_drone(&self) -> Option<&Drone> {
        match &self.kind {
            EntityKind::Drone(d) => Some(&**d),
            _ => None,
        }
    }

    pub fn as_drone_mut(&mut self) -> Option<&mut Drone> {
        match &mut self.kind {
            EntityKind::Drone(d) => Some(&mut **d),
            _ => None,
        }
    }

    pub fn as_wounded(&self) -> Option<&WoundedPerson> {
        match &self.kind {
            EntityKind::Wounded(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_wounded_mut(&mut self) -> Option<&mut WoundedPerson> {
        match &mut self.kind {
            EntityKind::Wounded(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_zone(&self) -> Option<&Zone> {
        match &self.kind {
            EntityKind::Zone(z) => Some(z),
            _ => None,
        }
    }

    pub fn as_zone_mut(&mut self) -> Option<&mut Zone> {
        match &mut self.kind {
            EntityKind::Zone(z) => Some(z),
            _ => None,
        }
    }

    /// Count down a temporary entity. Returns `true` when it expires.
    pub(crate) fn tick_lifetime(&mut self) -> bool {
        match self.lifetime.as_mut() {
            Some(left) => {
                *left = left.saturating_sub(1);
                *left == 0
            }
            None => false,
        }
    }
}
