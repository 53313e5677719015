//! Integration tests for drone collision bookkeeping and health.

use swarm_core::prelude::*;
use swarm_engine::prelude::*;

/// A drone at the origin facing a vertical wall at `x = 15`.
fn wall_ahead(config: SimConfig) -> (World, EntityId, EntityId) {
    let mut world = World::new(config).unwrap();
    let wall = world.add_wall(Position::new(15.0, -50.0), Position::new(15.0, 50.0));
    let drone = world.add_drone(Pose::new(0.0, 0.0, 0.0)).unwrap();
    (world, drone, wall)
}

fn push_forward(world: &mut World, drone: EntityId) -> TickReport {
    world
        .set_command(
            drone,
            &DroneCommand {
                forward: 1.0,
                ..Default::default()
            },
        )
        .unwrap();
    world.step()
}

#[test]
fn pressing_into_a_wall_counts_collisions() {
    let (mut world, drone, wall) = wall_ahead(SimConfig::default());
    let mut reported = 0;
    for _ in 0..60 {
        let report = push_forward(&mut world, drone);
        reported += report
            .events
            .iter()
            .filter(|e| **e == SimEvent::Collision { drone, other: wall })
            .count();
    }
    let d = world.drone(drone).unwrap();
    assert!(d.collisions() > 0);
    assert_eq!(d.collisions(), reported as u64);
    assert_eq!(d.drone_health(), 20, "no damage by default");
    assert!(world.pose(drone).unwrap().position.x < 15.0);
}

#[test]
fn free_flight_never_collides() {
    let (mut world, drone, _) = wall_ahead(SimConfig::default());
    world.set_command(
        drone,
        &DroneCommand {
            forward: -1.0,
            ..Default::default()
        },
    )
    .unwrap();
    for _ in 0..30 {
        world.step();
    }
    assert_eq!(world.drone(drone).unwrap().collisions(), 0);
}

#[test]
fn drone_out_of_health_is_removed() {
    let config = SimConfig {
        drone: DroneConfig {
            initial_health: 3,
            collision_damage: 1,
            ..Default::default()
        },
        ..Default::default()
    };
    let (mut world, drone, _) = wall_ahead(config);

    let mut removed_at = None;
    for tick in 0..120 {
        let report = push_forward(&mut world, drone);
        if report.events.contains(&SimEvent::Removed {
            entity: drone,
            definitive: true,
        }) {
            removed_at = Some(tick);
            break;
        }
    }
    assert!(removed_at.is_some(), "drone should be destroyed against the wall");
    assert!(!world.contains(drone));
    assert!(matches!(world.drone(drone), Err(SimError::StaleReference { .. })));
    assert!(!world.physics().has_entity(drone));
}
