//! Actuator controllers.
//!
//! A controller stores the last command it was given. Setting a command runs
//! it through [`Controller::check`]; an invalid value is replaced by the
//! controller's default, and only a strict controller reports it as
//! [`SimError::InvalidCommand`] (after still storing the default).
//!
//! Commands arrive between ticks, when the disabled flags still describe the
//! tick that just ended. The flag is therefore applied when the command is
//! acted on: [`Controller::effective_command`] yields the default for any
//! tick the controller is disabled in.

use std::fmt;

use swarm_core::prelude::*;
use tracing::warn;

use super::{Device, DeviceState};

/// A device that accepts one command per tick.
pub trait Controller: Device {
    type Command: Copy + PartialEq + fmt::Debug;

    /// Whether `value` is a valid command for this controller.
    fn check(&self, value: Self::Command) -> bool;

    /// Command used when nothing valid was received.
    fn default_command(&self) -> Self::Command;

    /// Whether invalid commands are escalated to errors.
    fn strict(&self) -> bool;

    /// Last stored command.
    fn command(&self) -> Self::Command;

    #[doc(hidden)]
    fn store(&mut self, value: Self::Command);

    /// Validate and store a command. Returns the command actually stored.
    ///
    /// # Errors
    ///
    /// [`SimError::InvalidCommand`] when the value fails [`check`](Self::check)
    /// and the controller is strict. The default command is stored first.
    fn set_command(&mut self, value: Self::Command) -> Result<Self::Command, SimError> {
        if self.check(value) {
            self.store(value);
            return Ok(value);
        }

        let fallback = self.default_command();
        self.store(fallback);
        if self.strict() {
            return Err(SimError::InvalidCommand {
                controller: self.kind().name(),
                value: format!("{value:?}"),
            });
        }
        warn!(
            drone = %self.anchor(),
            controller = self.kind().name(),
            value = ?value,
            "invalid command replaced by default"
        );
        Ok(fallback)
    }

    /// The command to act on this tick: the default while disabled.
    fn effective_command(&self) -> Self::Command {
        if self.disabled() {
            self.default_command()
        } else {
            self.command()
        }
    }

    /// Forget the stored command.
    fn clear(&mut self) {
        let fallback = self.default_command();
        self.store(fallback);
    }
}

// ---------------------------------------------------------------------------
// DiscreteController
// ---------------------------------------------------------------------------

/// Accepts only values from a fixed integer set.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteController {
    state: DeviceState,
    valid: Vec<i32>,
    default: i32,
    command: i32,
    strict: bool,
}

impl DiscreteController {
    /// # Errors
    ///
    /// [`SimError::Configuration`] if `default` is not part of `valid`.
    pub fn new(
        kind: DeviceKind,
        anchor: EntityId,
        valid: Vec<i32>,
        default: i32,
        strict: bool,
    ) -> Result<Self, SimError> {
        if !valid.contains(&default) {
            return Err(SimError::config(
                kind.name(),
                format!("default command {default} not in valid set {valid:?}"),
            ));
        }
        Ok(Self {
            state: DeviceState::new(kind, anchor),
            valid,
            default,
            command: default,
            strict,
        })
    }

    /// The `{0, 1}` controller driving a grasper.
    pub fn grasper(anchor: EntityId, strict: bool) -> Self {
        Self {
            state: DeviceState::new(DeviceKind::Grasper, anchor),
            valid: vec![0, 1],
            default: 0,
            command: 0,
            strict,
        }
    }

    pub fn valid_commands(&self) -> &[i32] {
        &self.valid
    }
}

impl Device for DiscreteController {
    fn state(&self) -> &DeviceState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut DeviceState {
        &mut self.state
    }
}

impl Controller for DiscreteController {
    type Command = i32;

    fn check(&self, value: i32) -> bool {
        self.valid.contains(&value)
    }

    fn default_command(&self) -> i32 {
        self.default
    }

    fn strict(&self) -> bool {
        self.strict
    }

    fn command(&self) -> i32 {
        self.command
    }

    fn store(&mut self, value: i32) {
        self.command = value;
    }
}

// ---------------------------------------------------------------------------
// ContinuousController
// ---------------------------------------------------------------------------

/// Accepts finite values in `[-1, 1]`; default `0.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuousController {
    state: DeviceState,
    command: f64,
    strict: bool,
}

impl ContinuousController {
    pub const MIN: f64 = -1.0;
    pub const MAX: f64 = 1.0;

    pub fn new(kind: DeviceKind, anchor: EntityId, strict: bool) -> Self {
        Self {
            state: DeviceState::new(kind, anchor),
            command: 0.0,
            strict,
        }
    }
}

impl Device for ContinuousController {
    fn state(&self) -> &DeviceState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut DeviceState {
        &mut self.state
    }
}

impl Controller for ContinuousController {
    type Command = f64;

    fn check(&self, value: f64) -> bool {
        value.is_finite() && (Self::MIN..=Self::MAX).contains(&value)
    }

    fn default_command(&self) -> f64 {
        0.0
    }

    fn strict(&self) -> bool {
        self.strict
    }

    fn command(&self) -> f64 {
        self.command
    }

    fn store(&mut self, value: f64) {
        self.command = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn anchor() -> EntityId {
        EntityId::new(0, 0)
    }

    #[test]
    fn valid_continuous_command_is_stored() {
        let mut c = ContinuousController::new(DeviceKind::ForwardController, anchor(), false);
        assert_eq!(c.set_command(0.5).unwrap(), 0.5);
        assert_eq!(c.effective_command(), 0.5);
    }

    #[test]
    fn out_of_range_falls_back_to_default() {
        let mut c = ContinuousController::new(DeviceKind::LateralController, anchor(), false);
        c.set_command(0.3).unwrap();
        assert_eq!(c.set_command(1.5).unwrap(), 0.0);
        assert_eq!(c.command(), 0.0);
        assert_eq!(c.set_command(f64::NAN).unwrap(), 0.0);
    }

    #[test]
    fn strict_mode_reports_invalid_command() {
        let mut c = DiscreteController::grasper(anchor(), true);
        c.set_command(1).unwrap();
        let err = c.set_command(7).unwrap_err();
        assert!(matches!(err, SimError::InvalidCommand { controller: "grasper", .. }));
        assert_eq!(c.command(), 0, "default still stored in strict mode");
    }

    #[test]
    fn disabled_controller_acts_on_default() {
        let mut c = DiscreteController::grasper(anchor(), false);
        c.disable();
        assert_eq!(c.set_command(1).unwrap(), 1);
        assert_eq!(c.effective_command(), 0);
    }

    #[test]
    fn command_set_while_disabled_applies_once_reenabled() {
        let mut c = ContinuousController::new(DeviceKind::ForwardController, anchor(), false);
        c.state_mut().pre_step();
        c.disable();
        c.state_mut().post_step();
        // Between ticks: the flag still reflects the last tick.
        c.set_command(1.0).unwrap();
        c.state_mut().pre_step();
        assert!(!c.disabled());
        assert_eq!(c.effective_command(), 1.0);
    }

    #[test]
    fn disabling_after_set_masks_effective_command() {
        let mut c = ContinuousController::new(DeviceKind::RotationController, anchor(), false);
        c.set_command(-0.8).unwrap();
        c.disable();
        assert_eq!(c.command(), -0.8);
        assert_eq!(c.effective_command(), 0.0);
        c.state_mut().pre_step();
        assert_eq!(c.effective_command(), -0.8);
    }

    #[test]
    fn discrete_default_must_be_valid() {
        let err = DiscreteController::new(DeviceKind::Grasper, anchor(), vec![1, 2], 0, false);
        assert!(err.is_err());
    }

    proptest! {
        #[test]
        fn continuous_command_always_within_bounds(value in proptest::num::f64::ANY) {
            let mut c = ContinuousController::new(DeviceKind::ForwardController, anchor(), false);
            let stored = c.set_command(value).unwrap();
            prop_assert!((-1.0..=1.0).contains(&stored));
            prop_assert_eq!(stored == value, value.is_finite() && (-1.0..=1.0).contains(&value));
        }
    }
}
