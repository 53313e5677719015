//! Ray-cast and pose sensors.
//!
//! Ray sensors cast `resolution` rays spread evenly over the field of view,
//! centred on the anchor heading. Readings are recomputed once per tick, after
//! physics and command application, so they describe the state the tick ends
//! in. Until the first recomputation (i.e. before any physics step) and on any
//! tick the sensor is disabled, a sensor reports its *absent* value: `NaN` for
//! numeric readings, an empty list for semantic readings, `None` for GPS and
//! compass. Absent is never confused with a valid `0.0` or max-range reading.

use std::collections::BTreeSet;

use rand::Rng;
use rand_distr::{Distribution, Normal};
use rapier2d::prelude::RigidBodyHandle;
use serde::Serialize;
use swarm_core::prelude::*;

use super::{Device, DeviceState};
use crate::config::{NoiseConfig, RaySensorConfig};
use crate::physics::{PhysicsSpace, RayHit};

// ---------------------------------------------------------------------------
// Noise
// ---------------------------------------------------------------------------

/// Additive Gaussian noise.
#[derive(Debug, Clone, Copy)]
pub struct GaussianNoise {
    normal: Normal<f64>,
}

impl GaussianNoise {
    /// # Errors
    ///
    /// [`SimError::Configuration`] for a negative or non-finite deviation.
    pub fn new(config: &NoiseConfig, name: &str) -> Result<Self, SimError> {
        config.validate(name)?;
        let normal = Normal::new(config.mean, config.std_dev)
            .map_err(|e| SimError::config(name, e.to_string()))?;
        Ok(Self { normal })
    }

    pub fn apply<R: Rng + ?Sized>(&self, value: f64, rng: &mut R) -> f64 {
        value + self.normal.sample(rng)
    }
}

fn noise_from(config: Option<&NoiseConfig>, name: &str) -> Result<Option<GaussianNoise>, SimError> {
    config.map(|c| GaussianNoise::new(c, name)).transpose()
}

// ---------------------------------------------------------------------------
// RaySensor
// ---------------------------------------------------------------------------

/// Body-frame angles of `resolution` rays spread over `fov_deg`.
///
/// A single ray points straight ahead. A full-circle field of view spaces
/// rays by `fov / n` so that the first and last rays do not coincide.
pub fn ray_angles(fov_deg: f64, resolution: usize) -> Vec<f64> {
    if resolution <= 1 {
        return vec![0.0; resolution];
    }
    let fov = fov_deg.to_radians();
    let step = if fov_deg >= 360.0 {
        fov / resolution as f64
    } else {
        fov / (resolution - 1) as f64
    };
    (0..resolution).map(|i| -fov / 2.0 + i as f64 * step).collect()
}

/// Shared ray-casting machinery of the lidar, semantic and touch sensors.
#[derive(Debug, Clone)]
pub struct RaySensor {
    state: DeviceState,
    config: RaySensorConfig,
    angles: Vec<f64>,
    noise: Option<GaussianNoise>,
    invisible: BTreeSet<EntityId>,
    grasp_hidden: BTreeSet<EntityId>,
    hits: Vec<Option<RayHit>>,
}

impl RaySensor {
    /// # Errors
    ///
    /// [`SimError::Configuration`] when the field of view, resolution, range,
    /// spatial step or noise is invalid.
    pub fn new(kind: DeviceKind, anchor: EntityId, config: &RaySensorConfig) -> Result<Self, SimError> {
        config.validate(kind.name())?;
        Ok(Self {
            state: DeviceState::new(kind, anchor),
            angles: ray_angles(config.fov_deg, config.resolution),
            noise: noise_from(config.noise.as_ref(), kind.name())?,
            config: config.clone(),
            invisible: BTreeSet::new(),
            grasp_hidden: BTreeSet::new(),
            hits: Vec::new(),
        })
    }

    pub fn config(&self) -> &RaySensorConfig {
        &self.config
    }

    /// Body-frame angle of every ray.
    pub fn angles(&self) -> &[f64] {
        &self.angles
    }

    /// Raw hits of the last scan, one per ray. Empty while absent.
    pub fn raw_hits(&self) -> &[Option<RayHit>] {
        &self.hits
    }

    /// Never report `entity` to this sensor.
    pub fn add_invisible(&mut self, entity: EntityId) {
        self.invisible.insert(entity);
    }

    /// `entity` was grasped by the owning drone.
    pub fn hide_grasped(&mut self, entity: EntityId) {
        self.grasp_hidden.insert(entity);
    }

    /// `entity` was released by the owning drone.
    pub fn reveal_released(&mut self, entity: EntityId) {
        self.grasp_hidden.remove(&entity);
    }

    pub fn is_visible(&self, entity: EntityId) -> bool {
        !self.invisible.contains(&entity)
            && !(self.config.invisible_when_grasped && self.grasp_hidden.contains(&entity))
    }

    fn scan(&mut self, physics: &PhysicsSpace, pose: Pose, body: RigidBodyHandle) {
        let visible = |e: EntityId| self.is_visible(e);
        let hits = self
            .angles
            .iter()
            .map(|&a| {
                physics.cast_ray(
                    pose.position,
                    pose.world_angle(a),
                    self.config.max_range,
                    body,
                    &visible,
                )
            })
            .collect();
        self.hits = hits;
    }

    /// Snap a distance to the spatial step, capped at the range.
    fn quantize(&self, distance: f64) -> f64 {
        let step = self.config.spatial_resolution;
        ((distance / step).round() * step).min(self.config.max_range)
    }

    fn finish<R: Rng + ?Sized>(&self, raw: f64, rng: &mut R) -> f64 {
        let noisy = match &self.noise {
            Some(noise) => noise.apply(raw, rng),
            None => raw,
        };
        if self.config.normalize {
            noisy / self.config.max_range
        } else {
            noisy
        }
    }

    fn reset(&mut self) {
        self.state.reset();
        self.grasp_hidden.clear();
        self.hits.clear();
    }
}

impl Device for RaySensor {
    fn state(&self) -> &DeviceState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut DeviceState {
        &mut self.state
    }
}

// ---------------------------------------------------------------------------
// DistanceSensor
// ---------------------------------------------------------------------------

/// Lidar: one distance per ray. A ray with no hit reads the max range.
#[derive(Debug, Clone)]
pub struct DistanceSensor {
    ray: RaySensor,
    values: Vec<f64>,
}

impl DistanceSensor {
    pub fn new(anchor: EntityId, config: &RaySensorConfig) -> Result<Self, SimError> {
        let ray = RaySensor::new(DeviceKind::Lidar, anchor, config)?;
        let values = vec![f64::NAN; ray.angles.len()];
        Ok(Self { ray, values })
    }

    pub fn ray(&self) -> &RaySensor {
        &self.ray
    }

    pub fn ray_mut(&mut self) -> &mut RaySensor {
        &mut self.ray
    }

    /// One value per ray; all `NaN` while absent.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn update<R: Rng + ?Sized>(
        &mut self,
        physics: &PhysicsSpace,
        pose: Pose,
        body: RigidBodyHandle,
        rng: &mut R,
    ) {
        if self.ray.disabled() {
            self.ray.hits.clear();
            self.values.fill(f64::NAN);
            return;
        }
        self.ray.scan(physics, pose, body);
        let max = self.ray.config.max_range;
        let values: Vec<f64> = self
            .ray
            .hits
            .iter()
            .map(|hit| {
                let raw = hit.map_or(max, |h| self.ray.quantize(h.distance));
                self.ray.finish(raw, rng)
            })
            .collect();
        self.values = values;
    }

    pub fn reset(&mut self) {
        self.ray.reset();
        self.values.fill(f64::NAN);
    }
}

// ---------------------------------------------------------------------------
// SemanticSensor
// ---------------------------------------------------------------------------

/// What a semantic ray saw.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SemanticReading {
    pub entity: EntityId,
    pub category: SemanticCategory,
    pub distance: f64,
    /// Body-frame angle of the ray.
    pub angle: f64,
}

/// Reports the id and category of the first entity along each ray. Rays that
/// hit nothing produce no reading.
#[derive(Debug, Clone)]
pub struct SemanticSensor {
    ray: RaySensor,
    values: Vec<SemanticReading>,
}

impl SemanticSensor {
    pub fn new(anchor: EntityId, config: &RaySensorConfig) -> Result<Self, SimError> {
        Ok(Self {
            ray: RaySensor::new(DeviceKind::Semantic, anchor, config)?,
            values: Vec::new(),
        })
    }

    pub fn ray(&self) -> &RaySensor {
        &self.ray
    }

    pub fn ray_mut(&mut self) -> &mut RaySensor {
        &mut self.ray
    }

    pub fn values(&self) -> &[SemanticReading] {
        &self.values
    }

    pub fn update<R: Rng + ?Sized>(
        &mut self,
        physics: &PhysicsSpace,
        pose: Pose,
        body: RigidBodyHandle,
        rng: &mut R,
    ) {
        self.values.clear();
        if self.ray.disabled() {
            self.ray.hits.clear();
            return;
        }
        self.ray.scan(physics, pose, body);
        let mut values = Vec::new();
        for (hit, &angle) in self.ray.hits.iter().zip(&self.ray.angles) {
            if let Some(h) = hit {
                values.push(SemanticReading {
                    entity: h.entity,
                    category: h.category,
                    distance: self.ray.finish(self.ray.quantize(h.distance), rng),
                    angle,
                });
            }
        }
        self.values = values;
    }

    pub fn reset(&mut self) {
        self.ray.reset();
        self.values.clear();
    }
}

// ---------------------------------------------------------------------------
// TouchSensor
// ---------------------------------------------------------------------------

/// Short-range ring: `1.0` on rays touching a solid, `0.0` otherwise.
#[derive(Debug, Clone)]
pub struct TouchSensor {
    ray: RaySensor,
    values: Vec<f64>,
}

impl TouchSensor {
    pub fn new(anchor: EntityId, config: &RaySensorConfig) -> Result<Self, SimError> {
        let ray = RaySensor::new(DeviceKind::Touch, anchor, config)?;
        let values = vec![f64::NAN; ray.angles.len()];
        Ok(Self { ray, values })
    }

    pub fn ray(&self) -> &RaySensor {
        &self.ray
    }

    pub fn ray_mut(&mut self) -> &mut RaySensor {
        &mut self.ray
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn update<R: Rng + ?Sized>(
        &mut self,
        physics: &PhysicsSpace,
        pose: Pose,
        body: RigidBodyHandle,
        rng: &mut R,
    ) {
        if self.ray.disabled() {
            self.ray.hits.clear();
            self.values.fill(f64::NAN);
            return;
        }
        self.ray.scan(physics, pose, body);
        let values: Vec<f64> = self
            .ray
            .hits
            .iter()
            .map(|hit| {
                let raw = if hit.is_some() { 1.0 } else { 0.0 };
                match &self.ray.noise {
                    Some(noise) => noise.apply(raw, rng),
                    None => raw,
                }
            })
            .collect();
        self.values = values;
    }

    pub fn reset(&mut self) {
        self.ray.reset();
        self.values.fill(f64::NAN);
    }
}

// ---------------------------------------------------------------------------
// GPS / compass
// ---------------------------------------------------------------------------

/// Measured position of the anchor.
#[derive(Debug, Clone)]
pub struct GpsSensor {
    state: DeviceState,
    noise: Option<GaussianNoise>,
    value: Option<Position>,
}

impl GpsSensor {
    pub fn new(anchor: EntityId, noise: Option<&NoiseConfig>) -> Result<Self, SimError> {
        Ok(Self {
            state: DeviceState::new(DeviceKind::Gps, anchor),
            noise: noise_from(noise, "gps")?,
            value: None,
        })
    }

    pub fn value(&self) -> Option<Position> {
        self.value
    }

    pub fn update<R: Rng + ?Sized>(&mut self, pose: Pose, rng: &mut R) {
        if self.state.disabled() {
            self.value = None;
            return;
        }
        let p = pose.position;
        self.value = Some(match &self.noise {
            Some(noise) => Position::new(noise.apply(p.x, rng), noise.apply(p.y, rng)),
            None => p,
        });
    }

    pub fn reset(&mut self) {
        self.state.reset();
        self.value = None;
    }
}

impl Device for GpsSensor {
    fn state(&self) -> &DeviceState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut DeviceState {
        &mut self.state
    }
}

/// Measured heading of the anchor, wrapped to `(-PI, PI]`.
#[derive(Debug, Clone)]
pub struct CompassSensor {
    state: DeviceState,
    noise: Option<GaussianNoise>,
    value: Option<f64>,
}

impl CompassSensor {
    pub fn new(anchor: EntityId, noise: Option<&NoiseConfig>) -> Result<Self, SimError> {
        Ok(Self {
            state: DeviceState::new(DeviceKind::Compass, anchor),
            noise: noise_from(noise, "compass")?,
            value: None,
        })
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn update<R: Rng + ?Sized>(&mut self, pose: Pose, rng: &mut R) {
        if self.state.disabled() {
            self.value = None;
            return;
        }
        let angle = match &self.noise {
            Some(noise) => noise.apply(pose.angle, rng),
            None => pose.angle,
        };
        self.value = Some(wrap_signed_angle(angle));
    }

    pub fn reset(&mut self) {
        self.state.reset();
        self.value = None;
    }
}

impl Device for CompassSensor {
    fn state(&self) -> &DeviceState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut DeviceState {
        &mut self.state
    }
}
