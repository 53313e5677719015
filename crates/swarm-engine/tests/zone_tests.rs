//! Integration tests for disabler zones and return areas.

use swarm_core::prelude::*;
use swarm_engine::prelude::*;

fn world() -> World {
    World::new(SimConfig::default()).unwrap()
}

#[test]
fn no_gps_zone_blanks_position_until_it_is_gone() {
    let mut world = world();
    let drone = world.add_drone(Pose::new(0.0, 0.0, 0.0)).unwrap();
    let zone = world.add_disabler_zone(Position::new(0.0, 0.0), 40.0, 40.0, DisablerZone::no_gps());

    world.step();
    let d = world.drone(drone).unwrap();
    assert!(d.is_disabled(DeviceKind::Gps));
    assert!(d.measured_gps_position().is_none());
    assert!(d.measured_compass_angle().is_none());
    assert!(!d.is_disabled(DeviceKind::Lidar));
    assert!(d.lidar_values().iter().all(|v| v.is_finite()));

    world.remove(zone, true).unwrap();
    world.step();
    let d = world.drone(drone).unwrap();
    assert!(!d.is_disabled(DeviceKind::Gps));
    assert!(d.measured_gps_position().is_some());
}

#[test]
fn disable_edge_is_reported_once() {
    let mut world = world();
    let drone = world.add_drone(Pose::new(0.0, 0.0, 0.0)).unwrap();
    world.add_disabler_zone(
        Position::new(0.0, 0.0),
        40.0,
        40.0,
        DisablerZone::no_communication(),
    );

    let first = world.step();
    let edge = SimEvent::DeviceDisabled {
        drone,
        device: DeviceKind::Communicator,
    };
    assert_eq!(first.events.iter().filter(|e| **e == edge).count(), 1);

    for _ in 0..5 {
        let report = world.step();
        assert!(!report.events.contains(&edge));
        assert!(world.drone(drone).unwrap().is_disabled(DeviceKind::Communicator));
    }
}

#[test]
fn kill_zone_disables_everything_and_flags_drone() {
    let mut world = world();
    let drone = world.add_drone(Pose::new(0.0, 0.0, 0.0)).unwrap();
    world.add_disabler_zone(Position::new(0.0, 0.0), 40.0, 40.0, DisablerZone::kill());

    world.step();
    let d = world.drone(drone).unwrap();
    assert!(d.killed());
    assert!(d.lidar_values().iter().all(|v| v.is_nan()));
    assert!(d.semantic_values().is_empty());
    assert!(d.measured_gps_position().is_none());
    let mut enabled = 0;
    d.for_each_device(|dev| {
        if !dev.disabled() {
            enabled += 1;
        }
    });
    assert_eq!(enabled, 0);
    assert!(world.scoreboard().drones[0].killed);
}

#[test]
fn no_communication_zone_blocks_messages() {
    let mut world = world();
    let inside = world.add_drone(Pose::new(0.0, 0.0, 0.0)).unwrap();
    let outside = world.add_drone(Pose::new(100.0, 0.0, 0.0)).unwrap();
    world.add_disabler_zone(
        Position::new(0.0, 0.0),
        30.0,
        30.0,
        DisablerZone::no_communication(),
    );
    world.step();

    let staged = world.send_message(inside, serde_json::json!("help")).unwrap();
    assert_eq!(staged.sender, inside);
    world.send_message(outside, serde_json::json!("hello")).unwrap();
    world.step();

    // The sender inside is muted and messages toward it are not received.
    assert!(world.drone(inside).unwrap().received_messages().is_empty());
    assert!(world.drone(outside).unwrap().received_messages().is_empty());
}

#[test]
fn controllers_obey_on_the_tick_after_leaving_a_kill_zone() {
    let mut world = world();
    let drone = world.add_drone(Pose::new(0.0, 0.0, 0.0)).unwrap();
    let wounded = world.add_wounded(Position::new(0.0, 18.0), 1.0);
    let zone = world.add_disabler_zone(Position::new(0.0, 0.0), 40.0, 40.0, DisablerZone::kill());
    world.step();
    assert!(world.drone(drone).unwrap().is_disabled(DeviceKind::Grasper));

    // Commands arrive while the flags still describe the killed tick.
    world.remove(zone, true).unwrap();
    let command = DroneCommand {
        forward: 1.0,
        grasper: 1,
        ..Default::default()
    };
    world.set_command(drone, &command).unwrap();
    let report = world.step();

    let d = world.drone(drone).unwrap();
    assert!(!d.is_disabled(DeviceKind::ForwardController));
    assert_eq!(d.grasper().controller().command(), 1);
    assert!(d.grasper().can_grasp());
    assert_eq!(d.grasped_wounded_persons(), vec![wounded]);
    assert!(report
        .events
        .contains(&SimEvent::Grasped { drone, wounded }));

    let start = world.pose(drone).unwrap().position.x;
    for _ in 0..30 {
        world.step();
    }
    assert!(world.pose(drone).unwrap().position.x > start + 1.0);
    assert_eq!(world.drone(drone).unwrap().grasped_wounded_persons(), vec![wounded]);
}

#[test]
fn radio_works_on_the_tick_after_a_no_communication_zone_is_gone() {
    let mut world = world();
    let a = world.add_drone(Pose::new(0.0, 0.0, 0.0)).unwrap();
    let b = world.add_drone(Pose::new(100.0, 0.0, 0.0)).unwrap();
    let zone = world.add_disabler_zone(
        Position::new(0.0, 0.0),
        30.0,
        30.0,
        DisablerZone::no_communication(),
    );
    world.step();
    assert!(world.drone(a).unwrap().is_disabled(DeviceKind::Communicator));

    world.remove(zone, true).unwrap();
    let sent = world.send_message(a, serde_json::json!("back online")).unwrap();
    world.send_message(b, serde_json::json!("welcome back")).unwrap();
    world.step();

    assert!(!world.drone(a).unwrap().is_disabled(DeviceKind::Communicator));
    assert_eq!(world.drone(b).unwrap().received_messages(), &[sent]);
    assert_eq!(world.drone(a).unwrap().received_messages().len(), 1);
}

#[test]
fn return_area_tracks_only_current_occupants() {
    let mut world = world();
    let drone = world.add_drone(Pose::new(0.0, 0.0, 0.0)).unwrap();
    let area = world.add_return_area(Position::new(0.0, 0.0), 20.0, 20.0);

    world.step();
    assert_eq!(world.zone(area).unwrap().occupancy(), 1);

    let forward = DroneCommand {
        forward: 1.0,
        ..Default::default()
    };
    for _ in 0..120 {
        world.set_command(drone, &forward).unwrap();
        world.step();
    }
    assert!(world.pose(drone).unwrap().position.x > 40.0);
    assert_eq!(world.zone(area).unwrap().occupancy(), 0);
}

#[test]
fn zones_do_not_block_motion() {
    let mut world = world();
    let drone = world.add_drone(Pose::new(-60.0, 0.0, 0.0)).unwrap();
    world.add_disabler_zone(Position::new(0.0, 0.0), 20.0, 40.0, DisablerZone::no_gps());

    let forward = DroneCommand {
        forward: 1.0,
        ..Default::default()
    };
    for _ in 0..120 {
        world.set_command(drone, &forward).unwrap();
        world.step();
    }
    assert!(world.pose(drone).unwrap().position.x > 40.0);
    assert!(world.drone(drone).unwrap().measured_gps_position().is_some());
}
