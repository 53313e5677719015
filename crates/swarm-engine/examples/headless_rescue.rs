//! Headless rescue run -- three drones search a walled arena, carry wounded
//! persons to the rescue center and share what they see over the radio.
//!
//! Run with:
//!   cargo run --example headless_rescue -p swarm-engine
//!
//! Set `RUST_LOG=swarm_engine=debug` to follow grasps and rescues tick by tick.

use std::f64::consts::PI;

use swarm_core::prelude::*;
use swarm_engine::logging::init_tracing;
use swarm_engine::prelude::*;

const CENTER: Position = Position { x: -250.0, y: -250.0 };

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Go for the nearest visible wounded person, then fly home by GPS.
/// Wanders when nothing is in sight.
struct Rescuer {
    wander: f64,
}

impl Rescuer {
    fn steer(bearing: f64) -> DroneCommand {
        let bearing = wrap_signed_angle(bearing);
        DroneCommand {
            forward: if bearing.abs() < 0.5 { 1.0 } else { 0.2 },
            lateral: 0.0,
            rotation: (bearing * 2.0).clamp(-1.0, 1.0),
            grasper: 0,
        }
    }
}

impl DroneController for Rescuer {
    fn control(&mut self, drone: &Drone) -> DroneCommand {
        if !drone.grasped_wounded_persons().is_empty() {
            let (Some(at), Some(heading)) =
                (drone.measured_gps_position(), drone.measured_compass_angle())
            else {
                return DroneCommand {
                    grasper: 1,
                    ..Default::default()
                };
            };
            let bearing = (CENTER.y - at.y).atan2(CENTER.x - at.x) - heading;
            return DroneCommand {
                grasper: 1,
                ..Self::steer(bearing)
            };
        }

        let target = drone
            .semantic_values()
            .iter()
            .filter(|r| r.category == SemanticCategory::WoundedPerson)
            .min_by(|a, b| a.distance.total_cmp(&b.distance));
        if let Some(seen) = target {
            return DroneCommand {
                grasper: i32::from(seen.distance < 30.0),
                ..Self::steer(seen.angle)
            };
        }

        // Turn away from whatever is closest ahead.
        let blocked = drone
            .lidar_values()
            .iter()
            .zip(drone.lidar().ray().angles())
            .any(|(&d, &a)| a.abs() < PI / 6.0 && d < 40.0);
        if blocked {
            self.wander += 0.8;
        }
        Self::steer(wrap_signed_angle(self.wander) * 0.1)
    }

    fn message(&mut self, drone: &Drone) -> Option<serde_json::Value> {
        let at = drone.measured_gps_position()?;
        Some(serde_json::json!({
            "at": [at.x, at.y],
            "carrying": drone.grasped_wounded_persons().len(),
        }))
    }
}

// ---------------------------------------------------------------------------
// Scene setup
// ---------------------------------------------------------------------------

fn main() -> Result<(), anyhow::Error> {
    init_tracing("info");

    let config = SimConfig::from_json_str(
        r#"{
            "seed": 2024,
            "limits": { "max_ticks": 3600 },
            "gps_noise": { "mean": 0.0, "std_dev": 1.5 }
        }"#,
    )?;
    let mut world = World::new(config)?;

    let h = 300.0;
    world.add_wall(Position::new(-h, -h), Position::new(h, -h));
    world.add_wall(Position::new(h, -h), Position::new(h, h));
    world.add_wall(Position::new(h, h), Position::new(-h, h));
    world.add_wall(Position::new(-h, h), Position::new(-h, -h));
    world.add_obstacle(Position::new(60.0, 40.0), 20.0, 80.0);

    let center = world.add_rescue_center(CENTER, 40.0, 40.0);
    world.set_name(center, "rescue center")?;
    world.add_return_area(Position::new(-220.0, 220.0), 50.0, 50.0);
    world.add_disabler_zone(
        Position::new(180.0, -120.0),
        60.0,
        40.0,
        DisablerZone::no_gps(),
    );

    for (x, y) in [(150.0, 150.0), (-60.0, 200.0), (200.0, -220.0)] {
        world.add_wounded(Position::new(x, y), 1.0);
    }

    let mut drones = Vec::new();
    for (i, (x, y)) in [(-220.0, 220.0), (-200.0, 200.0), (-240.0, 190.0)]
        .into_iter()
        .enumerate()
    {
        let id = world.add_drone(Pose::new(x, y, -PI / 4.0))?;
        world.set_name(id, format!("drone-{i}"))?;
        drones.push(id);
    }

    let mut tick_loop = TickLoop::new(world);
    for (i, &id) in drones.iter().enumerate() {
        tick_loop.attach_controller(id, Rescuer { wander: i as f64 })?;
    }

    let summary = tick_loop.run()?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    println!(
        "{}",
        serde_json::to_string_pretty(&tick_loop.world().scoreboard().to_json())?
    );
    Ok(())
}
