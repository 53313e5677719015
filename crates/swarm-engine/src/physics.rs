//! rapier2d integration: bodies, overlaps, rays and grasp joints.
//!
//! The [`PhysicsSpace`] owns the rapier sets and maps rapier handles back to
//! simulation [`EntityId`]s and [`CollisionType`] tags. Each tick the world:
//!
//! 1. steps the space with the fixed dt ([`PhysicsSpace::step`]),
//! 2. receives every collider pair currently in contact or overlapping,
//!    deduplicated and sorted so that collision dispatch runs in the same
//!    order on every run,
//! 3. later casts sensor rays against the refreshed query pipeline.
//!
//! Overlaps are read from the narrow phase after the step rather than from
//! rapier's started/stopped events: a zone must see a drone on *every* tick
//! the drone stays inside it, and exactly once per tick regardless of how many
//! solver iterations ran.
//!
//! # Determinism
//!
//! rapier2d is compiled with `enhanced-determinism`. Combined with a fixed
//! timestep and sorted pair ordering, a run is reproducible on the same
//! platform.

use std::collections::HashMap;

use rapier2d::prelude::*;
use swarm_core::prelude::*;

use crate::body::{BodyDesc, BodyType, Shape};

/// Rapier handles occupied by one body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyHandles {
    pub body: RigidBodyHandle,
    pub collider: ColliderHandle,
}

/// Which entity a collider belongs to and how it is tagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColliderTag {
    pub entity: EntityId,
    pub collision_type: CollisionType,
}

/// Two colliders in contact (solids) or overlapping (at least one sensor)
/// during the last step. `a <= b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapPair {
    pub a: ColliderTag,
    pub b: ColliderTag,
}

/// First surface hit along a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Position,
    pub distance: f64,
    pub entity: EntityId,
    pub category: SemanticCategory,
}

// ---------------------------------------------------------------------------
// PhysicsSpace
// ---------------------------------------------------------------------------

/// rapier2d simulation state plus handle/entity bookkeeping.
pub struct PhysicsSpace {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    entity_to_body: HashMap<EntityId, BodyHandles>,
    collider_tags: HashMap<ColliderHandle, ColliderTag>,
    steps_taken: u64,
}

impl Default for PhysicsSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsSpace {
    /// Create an empty space. The arena is seen from above, so there is no
    /// gravity.
    pub fn new() -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: vector![0.0, 0.0],
            integration_params: IntegrationParameters::default(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            entity_to_body: HashMap::new(),
            collider_tags: HashMap::new(),
            steps_taken: 0,
        }
    }

    /// Insert the rigid body and main collider described by `desc`.
    ///
    /// If `owner` already has a body, its existing handles are returned and
    /// nothing is inserted.
    pub fn insert_body(&mut self, owner: EntityId, desc: &BodyDesc) -> BodyHandles {
        if let Some(&handles) = self.entity_to_body.get(&owner) {
            return handles;
        }

        let pose = desc.initial_pose;
        let translation = vector![pose.position.x as Real, pose.position.y as Real];
        let rb = match desc.body_type() {
            BodyType::Dynamic => RigidBodyBuilder::dynamic()
                .linear_damping(desc.linear_damping as Real)
                .angular_damping(desc.angular_damping as Real)
                .can_sleep(false),
            BodyType::Kinematic => RigidBodyBuilder::kinematic_position_based(),
            BodyType::Static => RigidBodyBuilder::fixed(),
        }
        .translation(translation)
        .rotation(pose.angle as Real)
        .build();

        let body = self.rigid_body_set.insert(rb);

        let shape = match &desc.shape {
            Shape::Circle { radius } => SharedShape::ball(*radius as Real),
            Shape::Box {
                half_width,
                half_height,
            } => SharedShape::cuboid(*half_width as Real, *half_height as Real),
            Shape::Segment { a, b } => SharedShape::segment(
                point![a.x as Real, a.y as Real],
                point![b.x as Real, b.y as Real],
            ),
        };
        let mut builder = ColliderBuilder::new(shape).sensor(desc.sensor);
        if desc.body_type() == BodyType::Dynamic {
            builder = builder.mass(desc.mass as Real);
        }
        let collider =
            self.collider_set
                .insert_with_parent(builder.build(), body, &mut self.rigid_body_set);
        self.collider_tags.insert(
            collider,
            ColliderTag {
                entity: owner,
                collision_type: desc.collision_type,
            },
        );

        let handles = BodyHandles { body, collider };
        self.entity_to_body.insert(owner, handles);
        handles
    }

    /// Attach an extra massless sensor disc to `owner`'s body (e.g. a grasper
    /// halo). Returns `None` if `owner` has no body.
    pub fn insert_sensor_disc(
        &mut self,
        owner: EntityId,
        radius: f64,
        tag: CollisionType,
    ) -> Option<ColliderHandle> {
        let body = self.entity_to_body.get(&owner)?.body;
        let collider = ColliderBuilder::ball(radius as Real)
            .sensor(true)
            .density(0.0)
            .build();
        let handle =
            self.collider_set
                .insert_with_parent(collider, body, &mut self.rigid_body_set);
        self.collider_tags.insert(
            handle,
            ColliderTag {
                entity: owner,
                collision_type: tag,
            },
        );
        Some(handle)
    }

    /// Remove `owner`'s body with all its colliders and joints.
    ///
    /// Returns `false` (and does nothing) if `owner` has no body.
    pub fn remove_body(&mut self, owner: EntityId) -> bool {
        let Some(handles) = self.entity_to_body.remove(&owner) else {
            return false;
        };
        self.rigid_body_set.remove(
            handles.body,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        self.collider_tags.retain(|_, tag| tag.entity != owner);
        true
    }

    pub fn has_entity(&self, owner: EntityId) -> bool {
        self.entity_to_body.contains_key(&owner)
    }

    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    pub fn joint_count(&self) -> usize {
        self.impulse_joint_set.len()
    }

    /// Number of completed [`step`](Self::step) calls.
    pub fn steps_taken(&self) -> u64 {
        self.steps_taken
    }

    pub fn pose(&self, body: RigidBodyHandle) -> Option<Pose> {
        let rb = self.rigid_body_set.get(body)?;
        let t = rb.translation();
        Some(Pose::new(
            t.x as f64,
            t.y as f64,
            rb.rotation().angle() as f64,
        ))
    }

    /// Linear velocity `(vx, vy)` and angular velocity.
    pub fn velocity(&self, body: RigidBodyHandle) -> Option<(f64, f64, f64)> {
        let rb = self.rigid_body_set.get(body)?;
        let v = rb.linvel();
        Some((v.x as f64, v.y as f64, rb.angvel() as f64))
    }

    /// Teleport a body and stop it.
    pub fn set_pose(&mut self, body: RigidBodyHandle, pose: Pose) {
        if let Some(rb) = self.rigid_body_set.get_mut(body) {
            rb.set_position(
                Isometry::new(
                    vector![pose.position.x as Real, pose.position.y as Real],
                    pose.angle as Real,
                ),
                true,
            );
            rb.set_linvel(vector![0.0, 0.0], true);
            rb.set_angvel(0.0, true);
            rb.reset_forces(true);
            rb.reset_torques(true);
        }
    }

    /// Replace the persistent world-frame force and torque on a body.
    pub fn apply_force(&mut self, body: RigidBodyHandle, fx: f64, fy: f64, torque: f64) {
        if let Some(rb) = self.rigid_body_set.get_mut(body) {
            rb.reset_forces(true);
            rb.reset_torques(true);
            rb.add_force(vector![fx as Real, fy as Real], true);
            rb.add_torque(torque as Real, true);
        }
    }

    /// Express a world point in `body`'s frame.
    pub fn world_to_local(&self, body: RigidBodyHandle, p: Position) -> Option<Position> {
        let rb = self.rigid_body_set.get(body)?;
        let local = rb
            .position()
            .inverse_transform_point(&point![p.x as Real, p.y as Real]);
        Some(Position::new(local.x as f64, local.y as f64))
    }

    // -- stepping ------------------------------------------------------------

    /// Integrate one step and return the colliders touching afterwards.
    ///
    /// Solid pairs count when they have at least one active contact; pairs
    /// involving a sensor count while their shapes intersect. Each collider
    /// pair appears once, with `a <= b`, sorted by `(a, b)`.
    pub fn step(&mut self, dt: f64) -> Vec<OverlapPair> {
        self.integration_params.dt = dt as Real;

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
        self.steps_taken += 1;

        let mut pairs = Vec::new();
        for contact in self.narrow_phase.contact_pairs() {
            if contact.has_any_active_contact {
                self.push_pair(&mut pairs, contact.collider1, contact.collider2);
            }
        }
        for (h1, h2, intersecting) in self.narrow_phase.intersection_pairs() {
            if intersecting {
                self.push_pair(&mut pairs, h1, h2);
            }
        }

        pairs.sort_by_key(|p| (p.a, p.b));
        pairs.dedup();
        pairs
    }

    fn push_pair(&self, out: &mut Vec<OverlapPair>, h1: ColliderHandle, h2: ColliderHandle) {
        let (Some(&t1), Some(&t2)) = (self.collider_tags.get(&h1), self.collider_tags.get(&h2))
        else {
            return;
        };
        if t1.entity == t2.entity {
            return;
        }
        let (a, b) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
        out.push(OverlapPair { a, b });
    }

    // -- queries -------------------------------------------------------------

    /// Cast a ray from `origin` along world angle `angle`.
    ///
    /// Sensors and the `exclude` body are skipped; so is every entity for
    /// which `visible` returns `false`. Only valid after at least one
    /// [`step`](Self::step), which builds the query structure.
    pub fn cast_ray(
        &self,
        origin: Position,
        angle: f64,
        max_range: f64,
        exclude: RigidBodyHandle,
        visible: &dyn Fn(EntityId) -> bool,
    ) -> Option<RayHit> {
        let (sin, cos) = angle.sin_cos();
        let ray = Ray::new(
            point![origin.x as Real, origin.y as Real],
            vector![cos as Real, sin as Real],
        );
        let tags = &self.collider_tags;
        let predicate = |handle: ColliderHandle, _: &Collider| {
            tags.get(&handle).is_some_and(|tag| visible(tag.entity))
        };
        let filter = QueryFilter::default()
            .exclude_sensors()
            .exclude_rigid_body(exclude)
            .predicate(&predicate);

        let (handle, toi) = self.query_pipeline.cast_ray(
            &self.rigid_body_set,
            &self.collider_set,
            &ray,
            max_range as Real,
            true,
            filter,
        )?;
        let tag = tags.get(&handle)?;
        let distance = toi as f64;
        Some(RayHit {
            point: origin.offset(angle, distance),
            distance,
            entity: tag.entity,
            category: tag.collision_type.semantic_category(),
        })
    }

    // -- joints --------------------------------------------------------------

    /// Pin two bodies together at body-frame anchors. The pinned bodies stop
    /// colliding with each other.
    pub fn insert_pin_joint(
        &mut self,
        body1: RigidBodyHandle,
        anchor1: Position,
        body2: RigidBodyHandle,
        anchor2: Position,
    ) -> Option<ImpulseJointHandle> {
        if !self.rigid_body_set.contains(body1) || !self.rigid_body_set.contains(body2) {
            return None;
        }
        let joint = RevoluteJointBuilder::new()
            .local_anchor1(point![anchor1.x as Real, anchor1.y as Real])
            .local_anchor2(point![anchor2.x as Real, anchor2.y as Real])
            .contacts_enabled(false)
            .build();
        Some(self.impulse_joint_set.insert(body1, body2, joint, true))
    }

    /// Remove a joint. Returns `false` if it was already gone, e.g. because
    /// one of its bodies was removed first.
    pub fn remove_joint(&mut self, joint: ImpulseJointHandle) -> bool {
        self.impulse_joint_set.remove(joint, true).is_some()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DroneConfig;

    fn id(i: u32) -> EntityId {
        EntityId::new(i, 0)
    }

    #[test]
    fn insert_and_remove_body() {
        let mut space = PhysicsSpace::new();
        space.insert_body(
            id(0),
            &BodyDesc::wounded(Position::new(0.0, 0.0), 5.0, 1.0),
        );
        assert!(space.has_entity(id(0)));
        assert_eq!(space.body_count(), 1);

        assert!(space.remove_body(id(0)));
        assert!(!space.has_entity(id(0)));
        assert_eq!(space.body_count(), 0);
        assert!(!space.remove_body(id(0)), "second removal is a no-op");
    }

    #[test]
    fn zone_overlap_reported_every_step() {
        let mut space = PhysicsSpace::new();
        space.insert_body(
            id(0),
            &BodyDesc::zone(Position::new(0.0, 0.0), 50.0, 50.0, CollisionType::Disabler),
        );
        space.insert_body(
            id(1),
            &BodyDesc::drone_base(Pose::new(0.0, 0.0, 0.0), &DroneConfig::default()),
        );

        for _ in 0..3 {
            let pairs = space.step(1.0 / 60.0);
            assert_eq!(pairs.len(), 1, "overlap should be reported each step");
            assert_eq!(pairs[0].a.collision_type, CollisionType::Disabler);
            assert_eq!(pairs[0].b.collision_type, CollisionType::DroneBody);
        }
    }

    #[test]
    fn ray_hits_segment_wall() {
        let mut space = PhysicsSpace::new();
        space.insert_body(
            id(0),
            &BodyDesc::wall_segment(Position::new(0.0, 0.0), Position::new(100.0, 0.0)),
        );
        let probe = space.insert_body(
            id(1),
            &BodyDesc::drone_base(Pose::new(50.0, -50.0, 0.0), &DroneConfig::default()),
        );
        space.step(1.0 / 60.0);

        let hit = space
            .cast_ray(
                Position::new(50.0, -50.0),
                std::f64::consts::FRAC_PI_2,
                200.0,
                probe.body,
                &|_| true,
            )
            .expect("ray should hit the wall");
        assert!((hit.distance - 50.0).abs() < 1e-3, "got {}", hit.distance);
        assert_eq!(hit.entity, id(0));
        assert_eq!(hit.category, SemanticCategory::Wall);
    }

    #[test]
    fn ray_skips_invisible_entities() {
        let mut space = PhysicsSpace::new();
        space.insert_body(
            id(0),
            &BodyDesc::wall_segment(Position::new(0.0, 0.0), Position::new(100.0, 0.0)),
        );
        let probe = space.insert_body(
            id(1),
            &BodyDesc::drone_base(Pose::new(50.0, -50.0, 0.0), &DroneConfig::default()),
        );
        space.step(1.0 / 60.0);

        let hidden = id(0);
        let hit = space.cast_ray(
            Position::new(50.0, -50.0),
            std::f64::consts::FRAC_PI_2,
            200.0,
            probe.body,
            &|e| e != hidden,
        );
        assert!(hit.is_none());
    }

    #[test]
    fn joint_removed_with_body_is_noop_to_remove_again() {
        let mut space = PhysicsSpace::new();
        let a = space.insert_body(id(0), &BodyDesc::wounded(Position::new(0.0, 0.0), 5.0, 1.0));
        let b = space.insert_body(id(1), &BodyDesc::wounded(Position::new(12.0, 0.0), 5.0, 1.0));
        let joint = space
            .insert_pin_joint(a.body, Position::new(8.0, 0.0), b.body, Position::new(-4.0, 0.0))
            .unwrap();
        assert_eq!(space.joint_count(), 1);

        space.remove_body(id(1));
        assert_eq!(space.joint_count(), 0);
        assert!(!space.remove_joint(joint));
    }

    #[test]
    fn identical_runs_are_bitwise_equal() {
        fn run() -> Vec<(f64, f64)> {
            let mut space = PhysicsSpace::new();
            let d = space.insert_body(
                id(0),
                &BodyDesc::drone_base(Pose::new(0.0, 0.0, 0.3), &DroneConfig::default()),
            );
            space.insert_body(
                id(1),
                &BodyDesc::wall_segment(Position::new(40.0, -100.0), Position::new(40.0, 100.0)),
            );
            space.apply_force(d.body, 300.0, 40.0, 5.0);
            (0..120)
                .map(|_| {
                    space.step(1.0 / 60.0);
                    let p = space.pose(d.body).unwrap();
                    (p.position.x, p.position.y)
                })
                .collect()
        }
        assert_eq!(run(), run());
    }
}
