//! The simulation world.
//!
//! [`World`] owns every entity, the physics space and the collision
//! registry. [`World::step`] advances one fixed time slice:
//!
//! 1. `pre_step`: devices re-enabled, return areas and inboxes cleared,
//!    staged messages sent, grasper commands read, temporary entities
//!    counted down.
//! 2. Physics integration, then collision dispatch over the sorted
//!    overlapping pairs.
//! 3. Controller commands applied as forces for the next integration.
//! 4. `post_step`: disable edges reported, messages delivered.
//! 5. Deferred removals flushed.
//! 6. Sensors recomputed.
//! 7. `timestep += 1`.
//!
//! Entities live in a [`BTreeMap`] keyed by [`EntityId`], so every pass over
//! them runs in the same order on every run. No pass adds or removes
//! entities from the map it iterates; removals requested mid-tick only set
//! the `removed` flag and are applied in phase 5.

use std::collections::BTreeMap;
use std::time::Instant;

use rand::SeedableRng;
use rand_pcg::Pcg64;
use rapier2d::prelude::RigidBodyHandle;
use swarm_core::prelude::*;
use tracing::{debug, trace, warn};

use crate::agent::{Drone, DroneCommand};
use crate::body::{BodyDesc, PhysicalBody};
use crate::collision::{CollisionHandler, CollisionRegistry};
use crate::config::{DroneConfig, SimConfig};
use crate::device::communicator::{in_transmission_range, Message};
use crate::device::Device;
use crate::entity::{Entity, EntityKind, WoundedPerson};
use crate::physics::{OverlapPair, PhysicsSpace};
use crate::report::{
    compute_hash, DroneScore, EntityState, Scoreboard, SimEvent, StepDiagnostics, TickReport,
    ZoneScore,
};
use crate::zone::{DisablerZone, Zone, ZoneKind};

/// Radius of a wounded person's body.
pub const WOUNDED_RADIUS: f64 = 6.0;
/// Mass of a wounded person's body.
pub const WOUNDED_MASS: f64 = 0.5;

/// Every entity of one simulation, the physics space they live in and the
/// handlers that react to their overlaps.
///
/// Single-threaded: all mutation goes through `&mut self`, either between
/// ticks or inside [`step`](Self::step).
pub struct World {
    pub(crate) config: SimConfig,
    allocator: EntityAllocator,
    pub(crate) entities: BTreeMap<EntityId, Entity>,
    pub(crate) physics: PhysicsSpace,
    registry: CollisionRegistry,
    pub(crate) timestep: u64,
    pending_removals: Vec<(EntityId, bool)>,
    in_step: bool,
    rng: Pcg64,
    pub(crate) report: TickReport,
    rescued: u32,
}

impl World {
    /// # Errors
    ///
    /// [`SimError::Configuration`] if `config` fails validation.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Self {
            rng: Pcg64::seed_from_u64(config.seed),
            config,
            allocator: EntityAllocator::new(),
            entities: BTreeMap::new(),
            physics: PhysicsSpace::new(),
            registry: CollisionRegistry::with_defaults(),
            timestep: 0,
            pending_removals: Vec::new(),
            in_step: false,
            report: TickReport::new(0),
            rescued: 0,
        })
    }

    // -- construction -----------------------------------------------------

    fn insert(&mut self, id: EntityId, entity: Entity) -> EntityId {
        self.entities.insert(id, entity);
        self.attach(id);
        id
    }

    fn insert_new(&mut self, desc: BodyDesc, kind: EntityKind) -> EntityId {
        let id = self.allocator.allocate();
        self.insert(id, Entity::new(id, PhysicalBody::detached(desc), kind))
    }

    /// Insert an entity's body into the physics space, plus the grasper halo
    /// for drones.
    fn attach(&mut self, id: EntityId) {
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        entity.body.attach(&mut self.physics, id);
        if let Some(d) = entity.as_drone() {
            let reach = d.config().radius + d.config().grasper_reach;
            self.physics
                .insert_sensor_disc(id, reach, CollisionType::Grasper);
        }
    }

    /// A static wall segment.
    pub fn add_wall(&mut self, a: Position, b: Position) -> EntityId {
        self.insert_new(BodyDesc::wall_segment(a, b), EntityKind::Wall)
    }

    /// A wall segment that removes itself after `lifetime` ticks.
    pub fn add_temporary_wall(&mut self, a: Position, b: Position, lifetime: u32) -> EntityId {
        let id = self.allocator.allocate();
        let entity = Entity::new(
            id,
            PhysicalBody::detached(BodyDesc::wall_segment(a, b)),
            EntityKind::Wall,
        )
        .with_lifetime(lifetime.max(1));
        self.insert(id, entity)
    }

    /// A static axis-aligned box obstacle.
    pub fn add_obstacle(&mut self, center: Position, half_width: f64, half_height: f64) -> EntityId {
        self.insert_new(
            BodyDesc::obstacle_box(center, half_width, half_height),
            EntityKind::Wall,
        )
    }

    /// A drone built from the world's drone section and sensor suite.
    ///
    /// # Errors
    ///
    /// [`SimError::Configuration`] if a device cannot be built.
    pub fn add_drone(&mut self, pose: Pose) -> Result<EntityId, SimError> {
        let drone = self.config.drone.clone();
        self.add_drone_with(pose, &drone)
    }

    /// A drone with body, grasper, health and radio parameters of its own.
    /// Sensors still follow the world config.
    ///
    /// # Errors
    ///
    /// [`SimError::Configuration`] if `drone` is invalid or a device cannot
    /// be built.
    pub fn add_drone_with(&mut self, pose: Pose, drone: &DroneConfig) -> Result<EntityId, SimError> {
        let id = self.allocator.allocate();
        let built = match Drone::with_drone_config(id, &self.config, drone) {
            Ok(d) => d,
            Err(e) => {
                self.allocator.release(id);
                return Err(e);
            }
        };
        let body = PhysicalBody::detached(BodyDesc::drone_base(pose, drone));
        Ok(self.insert(id, Entity::new(id, body, EntityKind::Drone(Box::new(built)))))
    }

    /// A wounded person any rescue center accepts.
    pub fn add_wounded(&mut self, position: Position, reward: f64) -> EntityId {
        self.insert_new(
            BodyDesc::wounded(position, WOUNDED_RADIUS, WOUNDED_MASS),
            EntityKind::Wounded(WoundedPerson::new(reward, None)),
        )
    }

    /// A wounded person only `center` accepts.
    ///
    /// # Errors
    ///
    /// [`SimError::StaleReference`] unless `center` is a live rescue center.
    pub fn add_wounded_for(
        &mut self,
        position: Position,
        reward: f64,
        center: EntityId,
    ) -> Result<EntityId, SimError> {
        let is_center = self.entity(center)?.as_zone().is_some_and(|z| {
            matches!(z.kind, ZoneKind::RescueCenter { .. })
        });
        if !is_center {
            return Err(SimError::StaleReference { entity: center });
        }
        Ok(self.insert_new(
            BodyDesc::wounded(position, WOUNDED_RADIUS, WOUNDED_MASS),
            EntityKind::Wounded(WoundedPerson::new(reward, Some(center))),
        ))
    }

    fn add_zone(&mut self, center: Position, half_width: f64, half_height: f64, zone: Zone) -> EntityId {
        let desc = BodyDesc::zone(center, half_width, half_height, zone.collision_type());
        self.insert_new(desc, EntityKind::Zone(zone))
    }

    /// An axis-aligned rescue center. Wounded persons that overlap it are
    /// rescued and removed.
    pub fn add_rescue_center(&mut self, center: Position, half_width: f64, half_height: f64) -> EntityId {
        self.add_zone(center, half_width, half_height, Zone::rescue_center())
    }

    /// An axis-aligned area that tracks which drones are inside it.
    pub fn add_return_area(&mut self, center: Position, half_width: f64, half_height: f64) -> EntityId {
        self.add_zone(center, half_width, half_height, Zone::return_area())
    }

    /// An axis-aligned zone that disables the listed devices of any drone
    /// overlapping it.
    pub fn add_disabler_zone(
        &mut self,
        center: Position,
        half_width: f64,
        half_height: f64,
        disabler: DisablerZone,
    ) -> EntityId {
        self.add_zone(center, half_width, half_height, Zone::disabler(disabler))
    }

    /// # Errors
    ///
    /// [`SimError::StaleReference`] if `id` is not attached.
    pub fn set_name(&mut self, id: EntityId, name: impl Into<String>) -> Result<(), SimError> {
        self.entity_mut(id)?.name = Some(name.into());
        Ok(())
    }

    /// Install or replace the handler for a collision type pair.
    pub fn register_collision(&mut self, a: CollisionType, b: CollisionType, handler: CollisionHandler) {
        self.registry.register(a, b, handler);
    }

    // -- removal ----------------------------------------------------------

    /// Remove an entity at the end of the current tick, or right away when
    /// called between ticks.
    ///
    /// A definitive removal frees the id. Otherwise the entity keeps its
    /// record and [`reset`](Self::reset) brings it back.
    ///
    /// # Errors
    ///
    /// [`SimError::StaleReference`] if `id` is not attached.
    pub fn remove(&mut self, id: EntityId, definitive: bool) -> Result<(), SimError> {
        self.entity(id)?;
        self.schedule_removal(id, definitive);
        if !self.in_step {
            self.flush_removals();
        }
        Ok(())
    }

    /// Mark `id` removed and queue its teardown. No-op if already removed.
    pub(crate) fn schedule_removal(&mut self, id: EntityId, definitive: bool) {
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        if entity.removed {
            return;
        }
        entity.removed = true;
        self.pending_removals.push((id, definitive));
    }

    fn flush_removals(&mut self) {
        for (id, definitive) in std::mem::take(&mut self.pending_removals) {
            self.release_all(id);
            self.release_from_all(id);
            let Some(entity) = self.entities.get_mut(&id) else {
                continue;
            };
            entity.body.detach(&mut self.physics, id);
            if definitive {
                self.entities.remove(&id);
                self.allocator.release(id);
            }
            debug!(tick = self.timestep, entity = %id, definitive, "entity removed");
            self.report.push(SimEvent::Removed {
                entity: id,
                definitive,
            });
        }
    }

    // -- stepping ---------------------------------------------------------

    /// Advance the world by one fixed time slice.
    pub fn step(&mut self) -> TickReport {
        let tick_start = Instant::now();
        self.report = TickReport::new(self.timestep);
        self.in_step = true;

        let t = Instant::now();
        self.pre_step();
        let pre_step = t.elapsed();

        let t = Instant::now();
        let pairs = self.physics.step(self.config.fixed_dt);
        let physics = t.elapsed();

        let t = Instant::now();
        let (pairs_dispatched, pairs_suppressed) = self.dispatch(&pairs);
        self.apply_commands();
        let dispatch = t.elapsed();

        let t = Instant::now();
        self.post_step();
        self.flush_removals();
        let post_step = t.elapsed();

        let t = Instant::now();
        self.update_sensors();
        let sensors = t.elapsed();

        self.timestep += 1;
        self.in_step = false;

        let mut report = std::mem::take(&mut self.report);
        report.diagnostics = StepDiagnostics {
            pre_step,
            physics,
            dispatch,
            post_step,
            sensors,
            total: tick_start.elapsed(),
            pairs_dispatched,
            pairs_suppressed,
        };
        report
    }

    fn pre_step(&mut self) {
        let mut release = Vec::new();
        let mut expired = Vec::new();
        for (&id, entity) in self.entities.iter_mut() {
            if entity.removed {
                continue;
            }
            match &mut entity.kind {
                EntityKind::Drone(d) => {
                    d.pre_step();
                    if d.grasper_mut().read_command() {
                        release.push(id);
                    }
                }
                EntityKind::Zone(z) => z.pre_step(),
                EntityKind::Wall | EntityKind::Wounded(_) => {}
            }
            if entity.tick_lifetime() {
                expired.push(id);
            }
        }
        for id in release {
            self.release_all(id);
        }
        for id in expired {
            trace!(tick = self.timestep, entity = %id, "temporary entity expired");
            self.schedule_removal(id, true);
        }
    }

    fn dispatch(&mut self, pairs: &[OverlapPair]) -> (usize, usize) {
        let mut dispatched = 0;
        let mut suppressed = 0;
        for pair in pairs {
            let Some((handler, contact)) = self.registry.resolve(pair) else {
                continue;
            };
            dispatched += 1;
            if !handler(self, &contact) {
                suppressed += 1;
            }
        }
        (dispatched, suppressed)
    }

    fn apply_commands(&mut self) {
        let mut release = Vec::new();
        for (&id, entity) in &self.entities {
            if entity.removed {
                continue;
            }
            if let Some(d) = entity.as_drone() {
                if d.grasper().disabled() && d.grasper().held_count() > 0 {
                    release.push(id);
                }
                d.apply_commands(&entity.body, &mut self.physics);
            }
        }
        for id in release {
            self.release_all(id);
        }
    }

    fn post_step(&mut self) {
        let mut edges = Vec::new();
        for (&id, entity) in self.entities.iter_mut() {
            if entity.removed {
                continue;
            }
            if let Some(d) = entity.as_drone_mut() {
                edges.extend(d.post_step().into_iter().map(|kind| (id, kind)));
            }
        }
        for (drone, device) in edges {
            debug!(tick = self.timestep, drone = %drone, device = device.name(), "device disabled");
            self.report.push(SimEvent::DeviceDisabled { drone, device });
        }
        self.deliver_messages();
    }

    /// Recompute peers and deliver every queued message to the sender's
    /// peers.
    fn deliver_messages(&mut self) {
        let stations: Vec<(EntityId, Position, Option<f64>)> = self
            .entities
            .iter()
            .filter(|(_, e)| !e.removed)
            .filter_map(|(&id, e)| {
                let d = e.as_drone()?;
                let pose = e.body.pose(&self.physics)?;
                Some((id, pose.position, d.communicator().range()))
            })
            .collect();

        let mut outgoing: Vec<(Vec<EntityId>, Vec<Message>)> = Vec::new();
        for &(id, position, range) in &stations {
            let peers: Vec<EntityId> = stations
                .iter()
                .filter(|&&(other, other_pos, other_range)| {
                    other != id
                        && in_transmission_range(position.distance_to(other_pos), range, other_range)
                })
                .map(|&(other, _, _)| other)
                .collect();
            let Some(d) = self.entities.get_mut(&id).and_then(Entity::as_drone_mut) else {
                continue;
            };
            let comm = d.communicator_mut();
            comm.set_in_range(peers.clone());
            let outbox = comm.take_outbox();
            if comm.disabled() {
                if !outbox.is_empty() {
                    trace!(tick = self.timestep, drone = %id, dropped = outbox.len(), "sender disabled, messages dropped");
                }
                continue;
            }
            if !outbox.is_empty() {
                outgoing.push((peers, outbox));
            }
        }

        for (peers, messages) in outgoing {
            for peer in peers {
                let Some(d) = self.entities.get_mut(&peer).and_then(Entity::as_drone_mut) else {
                    continue;
                };
                for msg in &messages {
                    d.communicator_mut().receive(msg);
                }
            }
        }
    }

    fn update_sensors(&mut self) {
        for entity in self.entities.values_mut() {
            if entity.removed {
                continue;
            }
            let Some(handles) = entity.body.handles() else {
                continue;
            };
            let Some(pose) = self.physics.pose(handles.body) else {
                continue;
            };
            if let EntityKind::Drone(d) = &mut entity.kind {
                d.update_sensors(&self.physics, pose, handles.body, &mut self.rng);
            }
        }
    }

    // -- rescue -----------------------------------------------------------

    /// Deliver `wounded` to `center`: pay the reward and remove the person.
    ///
    /// The reward is split evenly among the drones holding the person. An
    /// unheld person pays the drone closest to the center.
    pub(crate) fn rescue(&mut self, wounded: EntityId, center: EntityId) {
        let Some(center_pos) = self
            .entities
            .get(&center)
            .filter(|e| !e.removed)
            .filter(|e| {
                e.as_zone()
                    .is_some_and(|z| matches!(z.kind, ZoneKind::RescueCenter { .. }))
            })
            .and_then(|e| e.body.pose(&self.physics))
            .map(|p| p.position)
        else {
            return;
        };
        let Some(person) = self
            .entities
            .get_mut(&wounded)
            .filter(|e| !e.removed)
            .and_then(Entity::as_wounded_mut)
        else {
            return;
        };
        if person.rescued || !person.accepts(center) {
            return;
        }
        person.rescued = true;
        let reward = person.reward;
        let holders = person.grasped_by.clone();

        let credited: Vec<(EntityId, f64)> = if holders.is_empty() {
            self.closest_drone(center_pos)
                .map(|d| vec![(d, reward)])
                .unwrap_or_default()
        } else {
            let share = reward / holders.len() as f64;
            holders.into_iter().map(|d| (d, share)).collect()
        };
        if credited.is_empty() {
            warn!(tick = self.timestep, wounded = %wounded, "rescue with no drone to credit");
        }
        for &(drone, share) in &credited {
            if let Some(d) = self.entities.get_mut(&drone).and_then(Entity::as_drone_mut) {
                d.credit(share);
            }
        }
        if let Some(ZoneKind::RescueCenter { rescued }) = self
            .entities
            .get_mut(&center)
            .and_then(Entity::as_zone_mut)
            .map(|z| &mut z.kind)
        {
            *rescued += 1;
        }
        self.rescued += 1;

        debug!(tick = self.timestep, wounded = %wounded, center = %center, reward, "rescued");
        self.report.push(SimEvent::Rescued {
            wounded,
            center,
            reward,
            credited,
        });
        self.schedule_removal(wounded, true);
    }

    fn closest_drone(&self, to: Position) -> Option<EntityId> {
        self.entities
            .iter()
            .filter(|(_, e)| !e.removed && e.as_drone().is_some())
            .filter_map(|(&id, e)| Some((id, e.body.pose(&self.physics)?.position.distance_to(to))))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    // -- reset ------------------------------------------------------------

    /// Restore every entity to its initial state and re-attach entities
    /// removed non-definitively. Definitive removals stay removed. The
    /// timestep and the noise generator restart.
    pub fn reset(&mut self) {
        let ids: Vec<EntityId> = self.entities.keys().copied().collect();
        for &id in &ids {
            self.release_all(id);
        }
        self.pending_removals.clear();

        let mut reattach = Vec::new();
        for (&id, entity) in self.entities.iter_mut() {
            if entity.removed {
                entity.removed = false;
                reattach.push(id);
            }
            entity.lifetime = entity.initial_lifetime;
            entity.body.reset(&mut self.physics);
            match &mut entity.kind {
                EntityKind::Drone(d) => d.reset(),
                EntityKind::Wounded(w) => {
                    w.grasped_by.clear();
                    w.rescued = false;
                }
                EntityKind::Zone(z) => z.reset(),
                EntityKind::Wall => {}
            }
        }
        for id in reattach {
            self.attach(id);
        }

        self.timestep = 0;
        self.rescued = 0;
        self.rng = Pcg64::seed_from_u64(self.config.seed);
        self.report = TickReport::new(0);
        debug!(entities = self.entities.len(), "world reset");
    }

    // -- agent API ----------------------------------------------------------

    /// Set the commands `drone` acts on from the next tick on. Whether a
    /// controller obeys is decided by that tick's disabled flags, not by the
    /// flags of the tick that just ended.
    ///
    /// # Errors
    ///
    /// [`SimError::StaleReference`] if `drone` is not an attached drone;
    /// [`SimError::InvalidCommand`] in strict mode.
    pub fn set_command(&mut self, drone: EntityId, command: &DroneCommand) -> Result<(), SimError> {
        self.drone_mut(drone)?.set_command(command)
    }

    /// Stage a message from `drone` for the next tick. Whether it reaches
    /// anyone depends on that tick: a communicator disabled during its
    /// physics phase delivers nothing.
    ///
    /// # Errors
    ///
    /// [`SimError::StaleReference`] if `drone` is not an attached drone.
    pub fn send_message(
        &mut self,
        drone: EntityId,
        payload: serde_json::Value,
    ) -> Result<Message, SimError> {
        Ok(self.drone_mut(drone)?.communicator_mut().stage(payload))
    }

    // -- accessors ----------------------------------------------------------

    /// The validated config the world was built with.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Ticks completed since construction or the last reset.
    pub fn timestep(&self) -> u64 {
        self.timestep
    }

    /// Read access for ray queries and inspection.
    pub fn physics(&self) -> &PhysicsSpace {
        &self.physics
    }

    /// Wounded persons rescued since construction or the last reset.
    pub fn rescued_count(&self) -> u32 {
        self.rescued
    }

    /// Wounded persons still in the world.
    pub fn wounded_remaining(&self) -> usize {
        self.entities()
            .filter(|e| e.as_wounded().is_some())
            .count()
    }

    /// Whether `id` is attached and not pending removal.
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.get(&id).is_some_and(|e| !e.removed)
    }

    /// # Errors
    ///
    /// [`SimError::StaleReference`] if `id` is not attached.
    pub fn entity(&self, id: EntityId) -> Result<&Entity, SimError> {
        self.entities
            .get(&id)
            .filter(|e| !e.removed)
            .ok_or(SimError::StaleReference { entity: id })
    }

    fn entity_mut(&mut self, id: EntityId) -> Result<&mut Entity, SimError> {
        self.entities
            .get_mut(&id)
            .filter(|e| !e.removed)
            .ok_or(SimError::StaleReference { entity: id })
    }

    /// # Errors
    ///
    /// [`SimError::StaleReference`] if `id` is not an attached drone.
    pub fn drone(&self, id: EntityId) -> Result<&Drone, SimError> {
        self.entity(id)?
            .as_drone()
            .ok_or(SimError::StaleReference { entity: id })
    }

    fn drone_mut(&mut self, id: EntityId) -> Result<&mut Drone, SimError> {
        self.entity_mut(id)?
            .as_drone_mut()
            .ok_or(SimError::StaleReference { entity: id })
    }

    /// # Errors
    ///
    /// [`SimError::StaleReference`] if `id` is not an attached wounded person.
    pub fn wounded(&self, id: EntityId) -> Result<&WoundedPerson, SimError> {
        self.entity(id)?
            .as_wounded()
            .ok_or(SimError::StaleReference { entity: id })
    }

    /// # Errors
    ///
    /// [`SimError::StaleReference`] if `id` is not an attached zone.
    pub fn zone(&self, id: EntityId) -> Result<&Zone, SimError> {
        self.entity(id)?
            .as_zone()
            .ok_or(SimError::StaleReference { entity: id })
    }

    /// Current pose of an attached entity.
    ///
    /// # Errors
    ///
    /// [`SimError::StaleReference`] if `id` is not attached.
    pub fn pose(&self, id: EntityId) -> Result<Pose, SimError> {
        self.entity(id)?
            .body
            .pose(&self.physics)
            .ok_or(SimError::StaleReference { entity: id })
    }

    /// Attached drones in id order.
    pub fn drone_ids(&self) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|(_, e)| !e.removed && e.as_drone().is_some())
            .map(|(&id, _)| id)
            .collect()
    }

    /// Attached entities in id order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.values().filter(|e| !e.removed)
    }

    pub(crate) fn live_body(&self, id: EntityId) -> Option<RigidBodyHandle> {
        let entity = self.entities.get(&id).filter(|e| !e.removed)?;
        entity.body.handles().map(|h| h.body)
    }

    // -- reporting ------------------------------------------------------------

    /// Snapshot of rewards, health, grasps and zone occupancy.
    pub fn scoreboard(&self) -> Scoreboard {
        let mut drones = Vec::new();
        let mut zones = Vec::new();
        let mut wounded_remaining = 0;
        for (&id, entity) in self.entities.iter().filter(|(_, e)| !e.removed) {
            match &entity.kind {
                EntityKind::Drone(d) => drones.push(DroneScore {
                    id,
                    name: entity.name.clone(),
                    reward: d.reward(),
                    health: d.drone_health(),
                    grasped: d.grasper().held_count(),
                    collisions: d.collisions(),
                    killed: d.killed(),
                }),
                EntityKind::Zone(z) => zones.push(ZoneScore {
                    id,
                    kind: z.label(),
                    occupancy: z.occupancy(),
                }),
                EntityKind::Wounded(_) => wounded_remaining += 1,
                EntityKind::Wall => {}
            }
        }
        Scoreboard {
            timestep: self.timestep,
            rescued: self.rescued,
            wounded_remaining,
            drones,
            zones,
        }
    }

    /// BLAKE3 digest of poses, rewards, health, grasps and the timestep.
    /// Two runs with the same seed and inputs produce the same digest.
    pub fn state_hash(&self) -> String {
        let states: Vec<EntityState> = self
            .entities
            .iter()
            .map(|(&id, e)| {
                let drone = e.as_drone();
                EntityState {
                    id: id.to_raw(),
                    removed: e.removed,
                    pose: e.body.pose(&self.physics).map(EntityState::pose_bits),
                    reward: drone.map(|d| d.reward().to_bits()),
                    health: drone.map(Drone::drone_health),
                    grasped: drone
                        .map(|d| d.grasper().held().map(EntityId::to_raw).collect())
                        .unwrap_or_default(),
                }
            })
            .collect();
        compute_hash(self.timestep, &states)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> World {
        World::new(SimConfig::default()).unwrap()
    }

    #[test]
    fn invalid_config_rejected() {
        let config = SimConfig {
            fixed_dt: -1.0,
            ..Default::default()
        };
        assert!(matches!(World::new(config), Err(SimError::Configuration { .. })));
    }

    #[test]
    fn timestep_advances_once_per_step() {
        let mut w = world();
        w.add_wall(Position::new(0.0, 0.0), Position::new(10.0, 0.0));
        for i in 0..5 {
            let report = w.step();
            assert_eq!(report.tick, i);
        }
        assert_eq!(w.timestep(), 5);
    }

    #[test]
    fn removal_between_ticks_is_immediate() {
        let mut w = world();
        let wall = w.add_wall(Position::new(0.0, 0.0), Position::new(10.0, 0.0));
        w.remove(wall, true).unwrap();
        assert!(!w.contains(wall));
        assert!(!w.physics().has_entity(wall));
        assert!(matches!(w.remove(wall, true), Err(SimError::StaleReference { .. })));
    }

    #[test]
    fn temporary_wall_expires_after_its_lifetime() {
        let mut w = world();
        let wall = w.add_temporary_wall(Position::new(0.0, 0.0), Position::new(10.0, 0.0), 3);
        w.step();
        w.step();
        assert!(w.contains(wall));
        let report = w.step();
        assert!(!w.contains(wall));
        assert!(report.events.contains(&SimEvent::Removed {
            entity: wall,
            definitive: true
        }));
    }

    #[test]
    fn non_definitive_removal_is_undone_by_reset() {
        let mut w = world();
        let drone = w.add_drone(Pose::new(0.0, 0.0, 0.0)).unwrap();
        w.remove(drone, false).unwrap();
        assert!(w.drone(drone).is_err());
        w.reset();
        assert!(w.drone(drone).is_ok());
        assert!(w.physics().has_entity(drone));
    }

    #[test]
    fn stale_generation_is_rejected() {
        let mut w = world();
        let old = w.add_wall(Position::new(0.0, 0.0), Position::new(1.0, 0.0));
        w.remove(old, true).unwrap();
        let new = w.add_wall(Position::new(0.0, 0.0), Position::new(1.0, 0.0));
        assert_eq!(old.index(), new.index());
        assert!(w.entity(old).is_err());
        assert!(w.entity(new).is_ok());
    }

    #[test]
    fn wounded_for_requires_rescue_center() {
        let mut w = world();
        let wall = w.add_wall(Position::new(0.0, 0.0), Position::new(1.0, 0.0));
        assert!(w.add_wounded_for(Position::new(5.0, 5.0), 1.0, wall).is_err());
        let center = w.add_rescue_center(Position::new(50.0, 50.0), 10.0, 10.0);
        assert!(w.add_wounded_for(Position::new(5.0, 5.0), 1.0, center).is_ok());
    }

    #[test]
    fn state_hash_tracks_time() {
        let mut w = world();
        w.add_drone(Pose::new(0.0, 0.0, 0.0)).unwrap();
        let before = w.state_hash();
        w.step();
        assert_ne!(before, w.state_hash());
    }

    #[test]
    fn scoreboard_counts_entities() {
        let mut w = world();
        let drone = w.add_drone(Pose::new(0.0, 0.0, 0.0)).unwrap();
        w.set_name(drone, "alpha").unwrap();
        w.add_wounded(Position::new(100.0, 0.0), 1.0);
        w.add_return_area(Position::new(0.0, 0.0), 30.0, 30.0);
        w.step();
        let board = w.scoreboard();
        assert_eq!(board.drones.len(), 1);
        assert_eq!(board.drones[0].name.as_deref(), Some("alpha"));
        assert_eq!(board.wounded_remaining, 1);
        assert_eq!(board.zones[0].occupancy, 1);
    }
}
