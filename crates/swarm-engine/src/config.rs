//! Simulation configuration.
//!
//! All structs deserialize from JSON with `#[serde(default)]`, so a config
//! file only needs the sections it overrides. A section that is present is
//! completed from its own type's defaults, not from the world preset:
//!
//! ```
//! use swarm_engine::config::SimConfig;
//!
//! let config = SimConfig::from_json_str(r#"{ "seed": 7, "lidar": { "resolution": 90 } }"#).unwrap();
//! assert_eq!(config.seed, 7);
//! assert_eq!(config.lidar.resolution, 90);
//! assert_eq!(config.lidar.max_range, 100.0);
//! assert_eq!(config.semantic.max_range, 200.0);
//! ```

use serde::{Deserialize, Serialize};
use swarm_core::SimError;

// ---------------------------------------------------------------------------
// SimConfig
// ---------------------------------------------------------------------------

/// Top-level configuration of a simulation world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Fixed time slice in seconds per tick. Must be positive and finite.
    pub fixed_dt: f64,
    /// Seed of the noise generator. Same seed + same inputs = same run.
    pub seed: u64,
    /// Escalate invalid controller commands to [`SimError::InvalidCommand`]
    /// instead of substituting the default command.
    pub strict_commands: bool,
    /// Advisory stop conditions for the driving loop.
    pub limits: RunLimits,
    /// Parameters of drones added without a config of their own.
    pub drone: DroneConfig,
    pub lidar: RaySensorConfig,
    pub semantic: RaySensorConfig,
    pub touch: RaySensorConfig,
    /// Noise on both GPS coordinates. `None` measures exactly.
    pub gps_noise: Option<NoiseConfig>,
    /// Noise on the compass heading, in radians.
    pub compass_noise: Option<NoiseConfig>,
}

impl Default for SimConfig {
    /// 60 Hz, seed 0, lenient commands, swarm-rescue style sensor suite.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            seed: 0,
            strict_commands: false,
            limits: RunLimits::default(),
            drone: DroneConfig::default(),
            lidar: RaySensorConfig {
                fov_deg: 360.0,
                resolution: 181,
                max_range: 300.0,
                spatial_resolution: 1.0,
                invisible_when_grasped: true,
                normalize: false,
                noise: None,
            },
            semantic: RaySensorConfig {
                fov_deg: 360.0,
                resolution: 35,
                max_range: 200.0,
                spatial_resolution: 1.0,
                invisible_when_grasped: true,
                normalize: false,
                noise: None,
            },
            touch: RaySensorConfig {
                fov_deg: 360.0,
                resolution: 13,
                max_range: 16.0,
                spatial_resolution: 0.5,
                invisible_when_grasped: true,
                normalize: false,
                noise: None,
            },
            gps_noise: None,
            compass_noise: None,
        }
    }
}

impl SimConfig {
    /// Parse and validate a JSON config.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Configuration`] if the JSON is malformed or any
    /// value fails validation.
    pub fn from_json_str(json: &str) -> Result<Self, SimError> {
        let config: SimConfig =
            serde_json::from_str(json).map_err(|e| SimError::config("config", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every nested section.
    pub fn validate(&self) -> Result<(), SimError> {
        if !(self.fixed_dt > 0.0 && self.fixed_dt.is_finite()) {
            return Err(SimError::config(
                "world",
                format!("fixed_dt must be positive and finite, got {}", self.fixed_dt),
            ));
        }
        self.limits.validate()?;
        self.drone.validate()?;
        self.lidar.validate("lidar")?;
        self.semantic.validate("semantic")?;
        self.touch.validate("touch")?;
        if let Some(noise) = &self.gps_noise {
            noise.validate("gps")?;
        }
        if let Some(noise) = &self.compass_noise {
            noise.validate("compass")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RunLimits
// ---------------------------------------------------------------------------

/// Stop conditions checked by the driving loop between ticks, never mid-tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunLimits {
    /// Stop after this many ticks.
    pub max_ticks: Option<u64>,
    /// Stop once this much wall-clock time has passed since the first tick.
    pub max_wall_time_secs: Option<f64>,
}

impl RunLimits {
    fn validate(&self) -> Result<(), SimError> {
        if let Some(secs) = self.max_wall_time_secs {
            if !(secs > 0.0 && secs.is_finite()) {
                return Err(SimError::config(
                    "limits",
                    format!("max_wall_time_secs must be positive, got {secs}"),
                ));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DroneConfig
// ---------------------------------------------------------------------------

/// Physical and device parameters of a drone.
///
/// The world section applies to every drone unless one is added with
/// [`World::add_drone_with`](crate::world::World::add_drone_with).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DroneConfig {
    /// Radius of the circular base body.
    pub radius: f64,
    /// Must be positive: drones are always dynamic.
    pub mass: f64,
    pub linear_damping: f64,
    pub angular_damping: f64,
    /// Force applied for a forward or lateral command of magnitude 1.
    pub max_force: f64,
    /// Torque applied for a rotation command of magnitude 1.
    pub max_torque: f64,
    /// How far beyond the base radius the grasper halo reaches.
    pub grasper_reach: f64,
    /// Entities the grasper may hold at once.
    pub max_grasped: usize,
    pub initial_health: i32,
    /// Health lost per tick spent in contact with a wall or another drone.
    pub collision_damage: i32,
    /// Communication range; `None` is infinite.
    pub comm_range: Option<f64>,
}

impl Default for DroneConfig {
    fn default() -> Self {
        Self {
            radius: 10.0,
            mass: 1.0,
            linear_damping: 2.0,
            angular_damping: 4.0,
            max_force: 200.0,
            max_torque: 500.0,
            grasper_reach: 4.0,
            max_grasped: 1,
            initial_health: 20,
            collision_damage: 0,
            comm_range: Some(250.0),
        }
    }
}

impl DroneConfig {
    /// Check body, grasper, health and radio parameters.
    pub fn validate(&self) -> Result<(), SimError> {
        if !(self.radius > 0.0 && self.radius.is_finite()) {
            return Err(SimError::config("drone", "radius must be positive"));
        }
        if !(self.mass > 0.0 && self.mass.is_finite()) {
            return Err(SimError::config("drone", "a drone must be dynamic (mass > 0)"));
        }
        if self.grasper_reach < 0.0 {
            return Err(SimError::config("drone", "grasper_reach must not be negative"));
        }
        if self.collision_damage < 0 {
            return Err(SimError::config("drone", "collision_damage must not be negative"));
        }
        if let Some(range) = self.comm_range {
            if !(range > 0.0) {
                return Err(SimError::config(
                    "communicator",
                    format!("range must be positive, got {range}"),
                ));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RaySensorConfig / NoiseConfig
// ---------------------------------------------------------------------------

/// Parameters of a ray-based sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaySensorConfig {
    /// Field of view in degrees, in `(0, 360]`.
    pub fov_deg: f64,
    /// Number of rays.
    pub resolution: usize,
    /// Maximum ray length.
    pub max_range: f64,
    /// Sampling step along a ray; reported distances are multiples of it.
    pub spatial_resolution: f64,
    /// Hide entities grasped by the owning drone from this sensor.
    pub invisible_when_grasped: bool,
    /// Divide readings by `max_range`.
    pub normalize: bool,
    pub noise: Option<NoiseConfig>,
}

impl Default for RaySensorConfig {
    fn default() -> Self {
        Self {
            fov_deg: 360.0,
            resolution: 1,
            max_range: 100.0,
            spatial_resolution: 1.0,
            invisible_when_grasped: false,
            normalize: false,
            noise: None,
        }
    }
}

impl RaySensorConfig {
    /// Validate this sensor's parameters. `name` is used in the error.
    pub fn validate(&self, name: &str) -> Result<(), SimError> {
        if !(self.fov_deg > 0.0 && self.fov_deg <= 360.0) {
            return Err(SimError::config(
                name,
                format!("fov must be in (0, 360] degrees, got {}", self.fov_deg),
            ));
        }
        if self.resolution == 0 {
            return Err(SimError::config(name, "resolution must be at least 1"));
        }
        if !(self.max_range > 0.0 && self.max_range.is_finite()) {
            return Err(SimError::config(
                name,
                format!("max_range must be positive and finite, got {}", self.max_range),
            ));
        }
        if !(self.spatial_resolution > 0.0 && self.spatial_resolution.is_finite()) {
            return Err(SimError::config(
                name,
                format!(
                    "spatial_resolution must be positive, got {}",
                    self.spatial_resolution
                ),
            ));
        }
        if let Some(noise) = &self.noise {
            noise.validate(name)?;
        }
        Ok(())
    }
}

/// Additive Gaussian noise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseConfig {
    pub mean: f64,
    /// Standard deviation, non-negative.
    pub std_dev: f64,
}

impl NoiseConfig {
    pub fn validate(&self, name: &str) -> Result<(), SimError> {
        if !self.mean.is_finite() || !(self.std_dev >= 0.0 && self.std_dev.is_finite()) {
            return Err(SimError::config(
                name,
                format!(
                    "noise needs a finite mean and non-negative std_dev, got ({}, {})",
                    self.mean, self.std_dev
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        SimConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = SimConfig::from_json_str(
            r#"{ "strict_commands": true, "drone": { "max_grasped": 3 } }"#,
        )
        .unwrap();
        assert!(config.strict_commands);
        assert_eq!(config.drone.max_grasped, 3);
        assert_eq!(config.drone.radius, DroneConfig::default().radius);
    }

    #[test]
    fn zero_resolution_is_a_configuration_error() {
        let err = SimConfig::from_json_str(r#"{ "lidar": { "resolution": 0 } }"#).unwrap_err();
        assert!(matches!(err, SimError::Configuration { .. }));
        assert!(err.to_string().contains("lidar"));
    }

    #[test]
    fn fov_over_full_circle_rejected() {
        let cfg = RaySensorConfig {
            fov_deg: 400.0,
            ..Default::default()
        };
        assert!(cfg.validate("semantic").is_err());
    }

    #[test]
    fn negative_noise_std_rejected() {
        let cfg = RaySensorConfig {
            noise: Some(NoiseConfig {
                mean: 0.0,
                std_dev: -1.0,
            }),
            ..Default::default()
        };
        assert!(cfg.validate("lidar").is_err());
    }

    #[test]
    fn malformed_json_is_a_configuration_error() {
        let err = SimConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, SimError::Configuration { .. }));
    }

    #[test]
    fn non_positive_dt_rejected() {
        assert!(SimConfig::from_json_str(r#"{ "fixed_dt": 0.0 }"#).is_err());
    }
}
