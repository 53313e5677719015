//! Driving loop for a [`World`].
//!
//! The [`TickLoop`] asks each attached [`DroneController`] for a command,
//! queues any outgoing message, then steps the world. Controllers run in
//! drone-id order, so a run is reproducible from the world seed and the
//! controllers' own state.
//!
//! Stop conditions ([`RunLimits`]) are checked between ticks only:
//!
//! ```
//! use swarm_core::prelude::*;
//! use swarm_engine::prelude::*;
//!
//! let config = SimConfig {
//!     limits: RunLimits { max_ticks: Some(30), ..Default::default() },
//!     ..Default::default()
//! };
//! let mut world = World::new(config).unwrap();
//! world.add_drone(Pose::new(0.0, 0.0, 0.0)).unwrap();
//! world.add_wounded(Position::new(200.0, 0.0), 1.0);
//!
//! let mut tick_loop = TickLoop::new(world);
//! let summary = tick_loop.run().unwrap();
//! assert_eq!(summary.ticks, 30);
//! assert_eq!(summary.stop_reason, StopReason::MaxTicks);
//! ```

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use swarm_core::prelude::*;
use tracing::{debug, info};

use crate::agent::{Drone, DroneCommand};
use crate::config::RunLimits;
use crate::report::{StepDiagnostics, TickReport};
use crate::world::World;

// ---------------------------------------------------------------------------
// DroneController
// ---------------------------------------------------------------------------

/// Per-drone decision logic. Sees only the drone's own readings.
pub trait DroneController {
    /// Commands for the coming tick.
    fn control(&mut self, drone: &Drone) -> DroneCommand;

    /// Payload to broadcast this tick, if any.
    fn message(&mut self, _drone: &Drone) -> Option<serde_json::Value> {
        None
    }
}

impl<F> DroneController for F
where
    F: FnMut(&Drone) -> DroneCommand,
{
    fn control(&mut self, drone: &Drone) -> DroneCommand {
        self(drone)
    }
}

// ---------------------------------------------------------------------------
// RunSummary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    MaxTicks,
    WallTime,
    /// No wounded person is left in the world.
    AllRescued,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub stop_reason: StopReason,
    pub rescued: u32,
    pub elapsed: Duration,
    pub state_hash: String,
}

// ---------------------------------------------------------------------------
// TickLoop
// ---------------------------------------------------------------------------

pub struct TickLoop {
    world: World,
    controllers: BTreeMap<EntityId, Box<dyn DroneController>>,
    limits: RunLimits,
    tick_counter: u64,
    fixed_dt: f64,
    started: Option<Instant>,
    last_diagnostics: StepDiagnostics,
}

impl TickLoop {
    /// Wrap `world`; limits come from its config.
    pub fn new(world: World) -> Self {
        let fixed_dt = world.config().fixed_dt;
        assert!(
            fixed_dt > 0.0 && fixed_dt.is_finite(),
            "fixed_dt must be positive and finite, got {fixed_dt}"
        );
        Self {
            limits: world.config().limits.clone(),
            world,
            controllers: BTreeMap::new(),
            tick_counter: 0,
            fixed_dt,
            started: None,
            last_diagnostics: StepDiagnostics::default(),
        }
    }

    /// Drive `drone` with `controller`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// [`SimError::StaleReference`] if `drone` is not an attached drone.
    pub fn attach_controller(
        &mut self,
        drone: EntityId,
        controller: impl DroneController + 'static,
    ) -> Result<(), SimError> {
        self.world.drone(drone)?;
        self.controllers.insert(drone, Box::new(controller));
        Ok(())
    }

    /// Run controllers, then step the world once.
    ///
    /// Controllers of drones that left the world are dropped.
    ///
    /// # Errors
    ///
    /// [`SimError::InvalidCommand`] when a controller emits an invalid
    /// command in strict mode. The world is not stepped.
    pub fn tick(&mut self) -> Result<TickReport, SimError> {
        self.started.get_or_insert_with(Instant::now);

        let world = &mut self.world;
        self.controllers.retain(|&id, _| world.drone(id).is_ok());
        for (&id, controller) in self.controllers.iter_mut() {
            let (command, payload) = {
                let drone = world.drone(id)?;
                (controller.control(drone), controller.message(drone))
            };
            world.set_command(id, &command)?;
            if let Some(payload) = payload {
                world.send_message(id, payload)?;
            }
        }

        let report = self.world.step();
        self.tick_counter += 1;
        self.last_diagnostics = report.diagnostics.clone();
        Ok(report)
    }

    /// Tick `count` times, returning the last report.
    pub fn run_ticks(&mut self, count: u64) -> Result<Option<TickReport>, SimError> {
        let mut last = None;
        for _ in 0..count {
            last = Some(self.tick()?);
        }
        Ok(last)
    }

    /// Which stop condition holds right now, if any.
    pub fn should_stop(&self) -> Option<StopReason> {
        if self
            .limits
            .max_ticks
            .is_some_and(|max| self.tick_counter >= max)
        {
            return Some(StopReason::MaxTicks);
        }
        if let (Some(max), Some(started)) = (self.limits.max_wall_time_secs, self.started) {
            if started.elapsed().as_secs_f64() >= max {
                return Some(StopReason::WallTime);
            }
        }
        if self.world.wounded_remaining() == 0 {
            return Some(StopReason::AllRescued);
        }
        None
    }

    /// Tick until a stop condition holds.
    ///
    /// # Errors
    ///
    /// Propagates [`tick`](Self::tick) errors.
    pub fn run(&mut self) -> Result<RunSummary, SimError> {
        let started = *self.started.get_or_insert_with(Instant::now);
        let first_tick = self.tick_counter;
        let stop_reason = loop {
            if let Some(reason) = self.should_stop() {
                break reason;
            }
            let report = self.tick()?;
            for wounded in report.rescued() {
                debug!(tick = report.tick, wounded = %wounded, "rescue reported");
            }
        };
        let summary = RunSummary {
            ticks: self.tick_counter - first_tick,
            stop_reason,
            rescued: self.world.rescued_count(),
            elapsed: started.elapsed(),
            state_hash: self.world.state_hash(),
        };
        info!(
            ticks = summary.ticks,
            rescued = summary.rescued,
            stop = ?summary.stop_reason,
            "run finished"
        );
        Ok(summary)
    }

    // -- accessors ----------------------------------------------------------

    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    /// Computed as `tick_count * fixed_dt` to avoid drift.
    pub fn sim_time(&self) -> f64 {
        self.tick_counter as f64 * self.fixed_dt
    }

    pub fn fixed_dt(&self) -> f64 {
        self.fixed_dt
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// For scenario setup between ticks.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn controller_count(&self) -> usize {
        self.controllers.len()
    }

    pub fn last_diagnostics(&self) -> &StepDiagnostics {
        &self.last_diagnostics
    }
}
