//! Swarm core -- identifiers, geometry, tags and errors shared by the swarm
//! rescue simulation.
//!
//! This crate has no physics dependency. It defines the vocabulary the engine
//! (`swarm-engine`) and its consumers (map builders, agent controllers,
//! scoring layers) speak: generational [`EntityId`](entity::EntityId)s,
//! [`Pose`](geometry::Pose)s, the [`CollisionType`](kind::CollisionType) tags
//! used for collision dispatch, and the [`SimError`] taxonomy.

#![deny(unsafe_code)]

pub mod entity;
pub mod geometry;
pub mod kind;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by simulation operations.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A sensor, device or world parameter is invalid. Raised at construction
    /// and never recovered.
    #[error("invalid configuration for {component}: {details}")]
    Configuration {
        /// Config section or device that was rejected.
        component: String,
        /// What was wrong with it.
        details: String,
    },

    /// A controller received a value outside its valid set. Only surfaced in
    /// strict mode; otherwise the default command is substituted.
    #[error("invalid command {value} for {controller} controller")]
    InvalidCommand {
        /// Short name of the controller kind.
        controller: &'static str,
        /// The rejected value, debug-formatted.
        value: String,
    },

    /// The entity is not attached to the world (removed, stale generation or
    /// never allocated).
    #[error("entity {entity} is not attached to the world (stale or removed)")]
    StaleReference {
        /// The id that no longer resolves.
        entity: entity::EntityId,
    },
}

impl SimError {
    /// Shorthand for a [`SimError::Configuration`].
    pub fn config(component: impl Into<String>, details: impl Into<String>) -> Self {
        SimError::Configuration {
            component: component.into(),
            details: details.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::entity::{EntityAllocator, EntityId};
    pub use crate::geometry::{wrap_signed_angle, Pose, Position};
    pub use crate::kind::{CollisionType, DeviceKind, SemanticCategory};
    pub use crate::SimError;
}
