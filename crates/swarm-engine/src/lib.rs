//! Swarm engine -- embodied drone simulation on top of rapier2d.
//!
//! This crate builds on [`swarm_core`] to provide the simulation itself: a
//! [`World`](world::World) of walls, drones, wounded persons and zones, a
//! fixed-timestep step with deterministic collision dispatch, ray-cast
//! perception, grasping and range-gated communication.
//!
//! # Quick Start
//!
//! ```
//! use swarm_core::prelude::*;
//! use swarm_engine::prelude::*;
//!
//! let mut world = World::new(SimConfig::default()).unwrap();
//! world.add_wall(Position::new(-100.0, 50.0), Position::new(100.0, 50.0));
//! let drone = world.add_drone(Pose::new(0.0, 0.0, std::f64::consts::FRAC_PI_2)).unwrap();
//!
//! // Readings are absent until the first step.
//! assert!(world.drone(drone).unwrap().lidar_values()[0].is_nan());
//!
//! world.set_command(drone, &DroneCommand { forward: 0.5, ..Default::default() }).unwrap();
//! world.step();
//! assert!(world.drone(drone).unwrap().lidar_values().iter().all(|v| v.is_finite()));
//! ```

#![deny(unsafe_code)]

pub mod agent;
pub mod body;
pub mod collision;
pub mod config;
pub mod device;
pub mod entity;
pub mod grasp;
pub mod logging;
pub mod physics;
pub mod report;
pub mod tick;
pub mod world;
pub mod zone;

/// Re-export the core crate for convenience.
pub use swarm_core;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use crate::agent::{Drone, DroneCommand};
    pub use crate::body::{BodyDesc, BodyType, PhysicalBody, Shape};
    pub use crate::collision::{CollisionHandler, CollisionRegistry, Contact};
    pub use crate::config::{DroneConfig, NoiseConfig, RaySensorConfig, RunLimits, SimConfig};
    pub use crate::device::communicator::{in_transmission_range, Communicator, Message};
    pub use crate::device::controller::{ContinuousController, Controller, DiscreteController};
    pub use crate::device::sensor::{
        CompassSensor, DistanceSensor, GpsSensor, RaySensor, SemanticReading, SemanticSensor,
        TouchSensor,
    };
    pub use crate::device::{Device, DeviceState};
    pub use crate::entity::{Entity, EntityKind, WoundedPerson};
    pub use crate::grasp::Grasper;
    pub use crate::physics::{PhysicsSpace, RayHit};
    pub use crate::report::{Scoreboard, SimEvent, StepDiagnostics, TickReport};
    pub use crate::tick::{DroneController, RunSummary, StopReason, TickLoop};
    pub use crate::world::World;
    pub use crate::zone::{DisablerZone, Zone, ZoneKind};
}
