//! Small closed tags used for dispatch and perception.

use serde::{Deserialize, Serialize};

/// Tag carried by every collider, used to route overlapping pairs to a
/// collision handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CollisionType {
    /// Static walls and obstacles.
    Wall,
    /// The solid base body of a drone.
    DroneBody,
    /// An entity a grasper can lift (wounded persons).
    Liftable,
    /// The grasping halo around a drone.
    Grasper,
    /// A zone that disables devices.
    Disabler,
    /// A zone that rewards and despawns liftables.
    RescueCenter,
    /// A zone that tracks drones inside it.
    ReturnArea,
}

impl CollisionType {
    /// What a ray-based semantic sensor reports for a collider of this type.
    pub fn semantic_category(self) -> SemanticCategory {
        match self {
            CollisionType::Wall => SemanticCategory::Wall,
            CollisionType::DroneBody => SemanticCategory::Drone,
            CollisionType::Liftable => SemanticCategory::WoundedPerson,
            _ => SemanticCategory::Other,
        }
    }
}

/// Entity category reported by semantic sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SemanticCategory {
    Wall,
    Drone,
    WoundedPerson,
    Other,
}

/// Kind of a device anchored to a drone body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    ForwardController,
    LateralController,
    RotationController,
    Grasper,
    Touch,
    Lidar,
    Semantic,
    Gps,
    Compass,
    Communicator,
}

impl DeviceKind {
    /// Every device kind, in the order a drone iterates its devices.
    pub const ALL: [DeviceKind; 10] = [
        DeviceKind::ForwardController,
        DeviceKind::LateralController,
        DeviceKind::RotationController,
        DeviceKind::Grasper,
        DeviceKind::Touch,
        DeviceKind::Lidar,
        DeviceKind::Semantic,
        DeviceKind::Gps,
        DeviceKind::Compass,
        DeviceKind::Communicator,
    ];

    /// Short name used in logs and error messages.
    pub fn name(self) -> &'static str {
        match self {
            DeviceKind::ForwardController => "forward",
            DeviceKind::LateralController => "lateral",
            DeviceKind::RotationController => "rotation",
            DeviceKind::Grasper => "grasper",
            DeviceKind::Touch => "touch",
            DeviceKind::Lidar => "lidar",
            DeviceKind::Semantic => "semantic",
            DeviceKind::Gps => "gps",
            DeviceKind::Compass => "compass",
            DeviceKind::Communicator => "communicator",
        }
    }
}
