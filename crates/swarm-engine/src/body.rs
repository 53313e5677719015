//! Physical bodies: a rigid body plus one collision shape.
//!
//! A [`BodyDesc`] is the immutable recipe of a body (shape, mass, collision
//! tag, initial pose). A [`PhysicalBody`] pairs that recipe with the rapier
//! handles it currently occupies, if any. Keeping the recipe lets the world
//! detach a body on a non-definitive removal and re-attach it on reset.
//!
//! The body type follows from the recipe:
//!
//! | mass | sensor | type      | used for                |
//! |------|--------|-----------|-------------------------|
//! | 0    | no     | static    | walls, obstacles        |
//! | 0    | yes    | kinematic | zones                   |
//! | > 0  | any    | dynamic   | drones, wounded persons |

use serde::{Deserialize, Serialize};
use swarm_core::prelude::*;

use crate::config::DroneConfig;
use crate::physics::{BodyHandles, PhysicsSpace};

/// How the physics engine treats a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyType {
    /// Immovable.
    Static,
    /// Moved only by game logic; never pushed by contacts.
    Kinematic,
    /// Integrated by the solver.
    Dynamic,
}

/// Collision shape, expressed in the body frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Circle {
        radius: f64,
    },
    Box {
        half_width: f64,
        half_height: f64,
    },
    /// Thin segment between two body-frame points.
    Segment {
        a: Position,
        b: Position,
    },
}

/// Immutable recipe of a physical body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyDesc {
    pub shape: Shape,
    /// `0.0` makes the body static (or kinematic when it is a sensor).
    pub mass: f64,
    pub collision_type: CollisionType,
    /// Sensor bodies report overlaps but never block motion.
    pub sensor: bool,
    pub initial_pose: Pose,
    pub linear_damping: f64,
    pub angular_damping: f64,
}

impl BodyDesc {
    pub fn body_type(&self) -> BodyType {
        if self.mass > 0.0 {
            BodyType::Dynamic
        } else if self.sensor {
            BodyType::Kinematic
        } else {
            BodyType::Static
        }
    }

    /// A static wall segment between two world points.
    pub fn wall_segment(a: Position, b: Position) -> Self {
        Self {
            shape: Shape::Segment { a, b },
            mass: 0.0,
            collision_type: CollisionType::Wall,
            sensor: false,
            initial_pose: Pose::default(),
            linear_damping: 0.0,
            angular_damping: 0.0,
        }
    }

    /// A static axis-aligned box obstacle.
    pub fn obstacle_box(center: Position, half_width: f64, half_height: f64) -> Self {
        Self {
            shape: Shape::Box {
                half_width,
                half_height,
            },
            mass: 0.0,
            collision_type: CollisionType::Wall,
            sensor: false,
            initial_pose: Pose::new(center.x, center.y, 0.0),
            linear_damping: 0.0,
            angular_damping: 0.0,
        }
    }

    /// The circular base body of a drone.
    pub fn drone_base(pose: Pose, config: &DroneConfig) -> Self {
        Self {
            shape: Shape::Circle {
                radius: config.radius,
            },
            mass: config.mass,
            collision_type: CollisionType::DroneBody,
            sensor: false,
            initial_pose: pose,
            linear_damping: config.linear_damping,
            angular_damping: config.angular_damping,
        }
    }

    /// A liftable wounded person.
    pub fn wounded(position: Position, radius: f64, mass: f64) -> Self {
        Self {
            shape: Shape::Circle { radius },
            mass,
            collision_type: CollisionType::Liftable,
            sensor: false,
            initial_pose: Pose::new(position.x, position.y, 0.0),
            linear_damping: 4.0,
            angular_damping: 4.0,
        }
    }

    /// A non-solid rectangular zone.
    pub fn zone(center: Position, half_width: f64, half_height: f64, tag: CollisionType) -> Self {
        Self {
            shape: Shape::Box {
                half_width,
                half_height,
            },
            mass: 0.0,
            collision_type: tag,
            sensor: true,
            initial_pose: Pose::new(center.x, center.y, 0.0),
            linear_damping: 0.0,
            angular_damping: 0.0,
        }
    }
}

/// A body recipe and the physics handles it currently occupies.
#[derive(Debug, Clone)]
pub struct PhysicalBody {
    desc: BodyDesc,
    handles: Option<BodyHandles>,
}

impl PhysicalBody {
    /// A body not yet inserted into any physics space.
    pub fn detached(desc: BodyDesc) -> Self {
        Self {
            desc,
            handles: None,
        }
    }

    pub fn desc(&self) -> &BodyDesc {
        &self.desc
    }

    pub fn collision_type(&self) -> CollisionType {
        self.desc.collision_type
    }

    pub fn handles(&self) -> Option<BodyHandles> {
        self.handles
    }

    pub fn is_attached(&self) -> bool {
        self.handles.is_some()
    }

    /// Insert the body into `physics` at its initial pose. No-op if attached.
    pub fn attach(&mut self, physics: &mut PhysicsSpace, owner: EntityId) -> BodyHandles {
        if let Some(handles) = self.handles {
            return handles;
        }
        let handles = physics.insert_body(owner, &self.desc);
        self.handles = Some(handles);
        handles
    }

    /// Remove the body (and any joint touching it) from `physics`.
    pub fn detach(&mut self, physics: &mut PhysicsSpace, owner: EntityId) {
        if self.handles.take().is_some() {
            physics.remove_body(owner);
        }
    }

    /// Current pose, or `None` when detached.
    pub fn pose(&self, physics: &PhysicsSpace) -> Option<Pose> {
        self.handles.and_then(|h| physics.pose(h.body))
    }

    /// Teleport back to the initial pose with zero velocity.
    pub fn reset(&self, physics: &mut PhysicsSpace) {
        if let Some(h) = self.handles {
            physics.set_pose(h.body, self.desc.initial_pose);
        }
    }

    /// Apply a force expressed in the body frame plus a torque, replacing
    /// whatever was applied on the previous tick.
    pub fn apply_local_force(
        &self,
        physics: &mut PhysicsSpace,
        local_fx: f64,
        local_fy: f64,
        torque: f64,
    ) {
        let Some(h) = self.handles else {
            return;
        };
        let Some(pose) = physics.pose(h.body) else {
            return;
        };
        let (fx, fy) = pose.rotate(local_fx, local_fy);
        physics.apply_force(h.body, fx, fy, torque);
    }
}
