//! Per-tick reports, score snapshots and state hashing.

use std::time::Duration;

use serde::Serialize;
use swarm_core::prelude::*;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Something that happened during a tick, in the order it happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SimEvent {
    Grasped {
        drone: EntityId,
        wounded: EntityId,
    },
    Released {
        drone: EntityId,
        wounded: EntityId,
    },
    Rescued {
        wounded: EntityId,
        center: EntityId,
        reward: f64,
        /// Drones credited, with their share.
        credited: Vec<(EntityId, f64)>,
    },
    DeviceDisabled {
        drone: EntityId,
        device: DeviceKind,
    },
    Collision {
        drone: EntityId,
        other: EntityId,
    },
    Removed {
        entity: EntityId,
        definitive: bool,
    },
}

/// Wall-clock time spent in each phase of the last tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepDiagnostics {
    pub pre_step: Duration,
    pub physics: Duration,
    pub dispatch: Duration,
    pub post_step: Duration,
    pub sensors: Duration,
    pub total: Duration,
    /// Overlapping collider pairs routed to a handler.
    pub pairs_dispatched: usize,
    /// Handlers that returned `false`.
    pub pairs_suppressed: usize,
}

/// Outcome of one [`World::step`](crate::world::World::step).
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Timestep the report belongs to (value before the increment).
    pub tick: u64,
    pub events: Vec<SimEvent>,
    pub diagnostics: StepDiagnostics,
}

impl TickReport {
    pub fn new(tick: u64) -> Self {
        Self {
            tick,
            ..Default::default()
        }
    }

    pub fn push(&mut self, event: SimEvent) {
        self.events.push(event);
    }

    pub fn rescued(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.events.iter().filter_map(|e| match e {
            SimEvent::Rescued { wounded, .. } => Some(*wounded),
            _ => None,
        })
    }
}

// ---------------------------------------------------------------------------
// Scoreboard
// ---------------------------------------------------------------------------

/// Score line of one drone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroneScore {
    pub id: EntityId,
    /// Display name given with `World::set_name`.
    pub name: Option<String>,
    /// Reward accumulated from rescues.
    pub reward: f64,
    pub health: i32,
    /// Wounded persons held at snapshot time.
    pub grasped: usize,
    /// Ticks spent in contact with a wall or another drone.
    pub collisions: u64,
    /// Inside a kill zone during the last tick.
    pub killed: bool,
}

/// Score line of one zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneScore {
    pub id: EntityId,
    /// `disabler`, `kill_zone`, `return_area` or `rescue_center`.
    pub kind: &'static str,
    /// Drones inside a return area, or persons rescued by a center.
    pub occupancy: usize,
}

/// Snapshot consumed by scoring and reporting layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scoreboard {
    /// Ticks completed when the snapshot was taken.
    pub timestep: u64,
    /// Wounded persons rescued so far, over all centers.
    pub rescued: u32,
    /// Wounded persons still in the world.
    pub wounded_remaining: usize,
    /// Attached drones in id order.
    pub drones: Vec<DroneScore>,
    /// Attached zones in id order.
    pub zones: Vec<ZoneScore>,
}

impl Scoreboard {
    /// Sum of every drone's reward.
    pub fn total_reward(&self) -> f64 {
        self.drones.iter().map(|d| d.reward).sum()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// Hashable view of one entity.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct EntityState {
    pub id: u64,
    pub removed: bool,
    /// Pose as raw bit patterns so the hash is exact.
    pub pose: Option<[u64; 3]>,
    pub reward: Option<u64>,
    pub health: Option<i32>,
    pub grasped: Vec<u64>,
}

impl EntityState {
    pub fn pose_bits(pose: Pose) -> [u64; 3] {
        [
            pose.position.x.to_bits(),
            pose.position.y.to_bits(),
            pose.angle.to_bits(),
        ]
    }
}

/// BLAKE3 hex digest (64 lowercase hex chars) of the world state.
pub(crate) fn compute_hash(timestep: u64, entities: &[EntityState]) -> String {
    #[derive(Serialize)]
    struct HashableState<'a> {
        timestep: u64,
        entities: &'a [EntityState],
    }

    let state = HashableState { timestep, entities };
    // Plain structs of integers and bools always serialize.
    let bytes = serde_json::to_vec(&state).unwrap_or_default();
    blake3::hash(&bytes).to_hex().to_string()
}
