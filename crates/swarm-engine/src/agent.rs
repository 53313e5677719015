//! Drones and the commands that steer them.
//!
//! A [`Drone`] owns every device anchored to its base body. Controllers
//! read the command set through [`World::set_command`](crate::world::World::set_command);
//! sensors are recomputed by the world at the end of each tick.

use std::collections::BTreeSet;

use rand::Rng;
use rapier2d::prelude::RigidBodyHandle;
use serde::{Deserialize, Serialize};
use swarm_core::prelude::*;

use crate::body::PhysicalBody;
use crate::config::{DroneConfig, SimConfig};
use crate::device::communicator::{Communicator, Message};
use crate::device::controller::{ContinuousController, Controller};
use crate::device::sensor::{
    CompassSensor, DistanceSensor, GpsSensor, SemanticReading, SemanticSensor, TouchSensor,
};
use crate::device::Device;
use crate::grasp::Grasper;
use crate::physics::PhysicsSpace;

/// One tick's worth of actuator commands.
///
/// Deserializes from a JSON map; missing keys keep their neutral value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DroneCommand {
    /// Thrust along the heading, in `[-1, 1]`.
    pub forward: f64,
    /// Thrust to the left of the heading, in `[-1, 1]`.
    pub lateral: f64,
    /// Counter-clockwise torque, in `[-1, 1]`.
    pub rotation: f64,
    /// `0` releases and disarms the grasper, `1` arms it.
    pub grasper: i32,
}

/// An agent-controlled body with its full device suite.
///
/// Commands are stored as given (after validation) and masked by the
/// current tick's disabled flags when they are acted on, so a drone that
/// leaves a disabling zone obeys the very next command.
#[derive(Debug, Clone)]
pub struct Drone {
    id: EntityId,
    forward: ContinuousController,
    lateral: ContinuousController,
    rotation: ContinuousController,
    grasper: Grasper,
    touch: TouchSensor,
    lidar: DistanceSensor,
    semantic: SemanticSensor,
    gps: GpsSensor,
    compass: CompassSensor,
    communicator: Communicator,
    config: DroneConfig,
    reward: f64,
    health: i32,
    collisions: u64,
    killed: bool,
}

impl Drone {
    /// Build a drone and its device suite from the world config.
    ///
    /// # Errors
    ///
    /// [`SimError::Configuration`] if a sensor section is invalid.
    pub fn new(id: EntityId, config: &SimConfig) -> Result<Self, SimError> {
        Self::with_drone_config(id, config, &config.drone)
    }

    /// Like [`new`](Self::new), with body and device parameters of its own
    /// instead of the world's shared [`DroneConfig`].
    ///
    /// # Errors
    ///
    /// [`SimError::Configuration`] if `drone` or a sensor section is invalid.
    pub fn with_drone_config(
        id: EntityId,
        config: &SimConfig,
        drone: &DroneConfig,
    ) -> Result<Self, SimError> {
        drone.validate()?;
        let strict = config.strict_commands;
        Ok(Self {
            id,
            forward: ContinuousController::new(DeviceKind::ForwardController, id, strict),
            lateral: ContinuousController::new(DeviceKind::LateralController, id, strict),
            rotation: ContinuousController::new(DeviceKind::RotationController, id, strict),
            grasper: Grasper::new(id, drone.max_grasped, strict),
            touch: TouchSensor::new(id, &config.touch)?,
            lidar: DistanceSensor::new(id, &config.lidar)?,
            semantic: SemanticSensor::new(id, &config.semantic)?,
            gps: GpsSensor::new(id, config.gps_noise.as_ref())?,
            compass: CompassSensor::new(id, config.compass_noise.as_ref())?,
            communicator: Communicator::new(id, drone.comm_range),
            config: drone.clone(),
            reward: 0.0,
            health: drone.initial_health,
            collisions: 0,
            killed: false,
        })
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Body and device parameters this drone was built with.
    pub fn config(&self) -> &DroneConfig {
        &self.config
    }

    // -- agent-facing readings -------------------------------------------

    /// Lidar distances, one per ray. `NaN` while absent.
    pub fn lidar_values(&self) -> &[f64] {
        self.lidar.values()
    }

    /// One reading per semantic ray that hit something.
    pub fn semantic_values(&self) -> &[SemanticReading] {
        self.semantic.values()
    }

    pub fn touch_values(&self) -> &[f64] {
        self.touch.values()
    }

    pub fn measured_gps_position(&self) -> Option<Position> {
        self.gps.value()
    }

    pub fn measured_compass_angle(&self) -> Option<f64> {
        self.compass.value()
    }

    /// Messages delivered at the end of the last tick.
    pub fn received_messages(&self) -> &[Message] {
        self.communicator.received()
    }

    // -- scoring ----------------------------------------------------------

    /// Wounded persons held right now, in grasp order.
    pub fn grasped_wounded_persons(&self) -> Vec<EntityId> {
        self.grasper.held().collect()
    }

    /// Reward accumulated from rescues.
    pub fn reward(&self) -> f64 {
        self.reward
    }

    pub fn drone_health(&self) -> i32 {
        self.health
    }

    /// Ticks spent in contact with a wall or another drone.
    pub fn collisions(&self) -> u64 {
        self.collisions
    }

    /// Set while the drone overlaps a kill zone. Presentation only.
    pub fn killed(&self) -> bool {
        self.killed
    }

    // -- devices ----------------------------------------------------------

    pub fn grasper(&self) -> &Grasper {
        &self.grasper
    }

    pub fn grasper_mut(&mut self) -> &mut Grasper {
        &mut self.grasper
    }

    pub fn lidar(&self) -> &DistanceSensor {
        &self.lidar
    }

    pub fn semantic(&self) -> &SemanticSensor {
        &self.semantic
    }

    pub fn touch(&self) -> &TouchSensor {
        &self.touch
    }

    pub fn gps(&self) -> &GpsSensor {
        &self.gps
    }

    pub fn compass(&self) -> &CompassSensor {
        &self.compass
    }

    pub fn communicator(&self) -> &Communicator {
        &self.communicator
    }

    pub fn communicator_mut(&mut self) -> &mut Communicator {
        &mut self.communicator
    }

    /// Visit every device in [`DeviceKind::ALL`] order.
    pub fn for_each_device(&self, mut f: impl FnMut(&dyn Device)) {
        f(&self.forward);
        f(&self.lateral);
        f(&self.rotation);
        f(&self.grasper);
        f(self.touch.ray());
        f(self.lidar.ray());
        f(self.semantic.ray());
        f(&self.gps);
        f(&self.compass);
        f(&self.communicator);
    }

    fn for_each_device_mut(&mut self, mut f: impl FnMut(&mut dyn Device)) {
        f(&mut self.forward);
        f(&mut self.lateral);
        f(&mut self.rotation);
        f(&mut self.grasper);
        f(self.touch.ray_mut());
        f(self.lidar.ray_mut());
        f(self.semantic.ray_mut());
        f(&mut self.gps);
        f(&mut self.compass);
        f(&mut self.communicator);
    }

    pub fn is_disabled(&self, kind: DeviceKind) -> bool {
        let mut disabled = false;
        self.for_each_device(|d| {
            if d.kind() == kind {
                disabled = d.disabled();
            }
        });
        disabled
    }

    /// Disable every device whose kind is in `kinds` for the rest of the tick.
    pub fn disable_devices(&mut self, kinds: &BTreeSet<DeviceKind>) {
        self.for_each_device_mut(|d| {
            if kinds.contains(&d.kind()) {
                d.disable();
            }
        });
    }

    pub(crate) fn mark_killed(&mut self) {
        self.killed = true;
    }

    // -- commands ---------------------------------------------------------

    /// Store one tick's commands. Every controller is updated even when an
    /// earlier one rejects its value.
    ///
    /// # Errors
    ///
    /// The first [`SimError::InvalidCommand`] in strict mode.
    pub fn set_command(&mut self, command: &DroneCommand) -> Result<(), SimError> {
        let results = [
            self.forward.set_command(command.forward).map(drop),
            self.lateral.set_command(command.lateral).map(drop),
            self.rotation.set_command(command.rotation).map(drop),
            self.grasper.controller_mut().set_command(command.grasper).map(drop),
        ];
        results.into_iter().collect()
    }

    /// Drive the base body with the current effective commands.
    pub(crate) fn apply_commands(&self, body: &PhysicalBody, physics: &mut PhysicsSpace) {
        body.apply_local_force(
            physics,
            self.forward.effective_command() * self.config.max_force,
            self.lateral.effective_command() * self.config.max_force,
            self.rotation.effective_command() * self.config.max_torque,
        );
    }

    // -- grasp visibility ------------------------------------------------

    pub(crate) fn hide_from_sensors(&mut self, target: EntityId) {
        self.lidar.ray_mut().hide_grasped(target);
        self.semantic.ray_mut().hide_grasped(target);
        self.touch.ray_mut().hide_grasped(target);
    }

    pub(crate) fn reveal_to_sensors(&mut self, target: EntityId) {
        self.lidar.ray_mut().reveal_released(target);
        self.semantic.ray_mut().reveal_released(target);
        self.touch.ray_mut().reveal_released(target);
    }

    // -- lifecycle --------------------------------------------------------

    /// Start of tick: re-enable every device, drop last tick's inbox and
    /// queue the messages staged since then.
    pub(crate) fn pre_step(&mut self) {
        self.for_each_device_mut(|d| d.state_mut().pre_step());
        self.communicator.clear_received();
        self.communicator.send_staged();
        self.killed = false;
    }

    /// Compute disable edges. Returns the kinds that just became disabled.
    pub(crate) fn post_step(&mut self) -> Vec<DeviceKind> {
        let mut edges = Vec::new();
        self.for_each_device_mut(|d| {
            d.state_mut().post_step();
            if d.state().just_disabled() {
                edges.push(d.kind());
            }
        });
        edges
    }

    pub(crate) fn update_sensors<R: Rng + ?Sized>(
        &mut self,
        physics: &PhysicsSpace,
        pose: Pose,
        body: RigidBodyHandle,
        rng: &mut R,
    ) {
        self.touch.update(physics, pose, body, rng);
        self.lidar.update(physics, pose, body, rng);
        self.semantic.update(physics, pose, body, rng);
        self.gps.update(pose, rng);
        self.compass.update(pose, rng);
    }

    /// Take damage. Returns `true` once health is exhausted.
    pub(crate) fn record_collision(&mut self) -> bool {
        let damage = self.config.collision_damage;
        self.collisions += 1;
        self.health = self.health.saturating_sub(damage);
        damage > 0 && self.health <= 0
    }

    pub(crate) fn credit(&mut self, reward: f64) {
        self.reward += reward;
    }

    /// Back to the state right after construction. Grasps must already have
    /// been released by the world.
    pub(crate) fn reset(&mut self) {
        for controller in [&mut self.forward, &mut self.lateral, &mut self.rotation] {
            controller.state_mut().reset();
            controller.clear();
        }
        self.grasper.reset();
        self.touch.reset();
        self.lidar.reset();
        self.semantic.reset();
        self.gps.reset();
        self.compass.reset();
        self.communicator.reset();
        self.reward = 0.0;
        self.health = self.config.initial_health;
        self.collisions = 0;
        self.killed = false;
    }
}
