//! Devices anchored to a drone body: controllers, sensors, the communicator
//! and the grasper.
//!
//! Every device carries a [`DeviceState`]. The `disabled` flag has exactly two
//! write sites:
//!
//! - [`DeviceState::pre_step`] clears it at the start of every tick;
//! - [`Device::disable`], called only from a zone collision handler during
//!   the physics phase, sets it for the rest of the tick.
//!
//! A device inside a disabling zone is therefore disabled again on every tick
//! it stays there, and enabled on the first tick after it leaves.
//! [`DeviceState::post_step`] turns the flag into a "just became disabled"
//! edge for reporting.

pub mod communicator;
pub mod controller;
pub mod sensor;

use swarm_core::prelude::*;

/// Lifecycle and anchor bookkeeping shared by all devices.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceState {
    kind: DeviceKind,
    anchor: EntityId,
    disabled: bool,
    disabled_last_tick: bool,
    just_disabled: bool,
}

impl DeviceState {
    /// An enabled device of `kind` attached to `anchor`.
    pub fn new(kind: DeviceKind, anchor: EntityId) -> Self {
        Self {
            kind,
            anchor,
            disabled: false,
            disabled_last_tick: false,
            just_disabled: false,
        }
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Entity whose body this device is attached to.
    pub fn anchor(&self) -> EntityId {
        self.anchor
    }

    pub fn disabled(&self) -> bool {
        self.disabled
    }

    /// `true` on the tick the device went from enabled to disabled.
    pub fn just_disabled(&self) -> bool {
        self.just_disabled
    }

    /// Start of tick: the device is enabled until a zone says otherwise.
    pub fn pre_step(&mut self) {
        self.disabled = false;
    }

    /// End of tick: derive the disable edge from this tick's flag.
    pub fn post_step(&mut self) {
        self.just_disabled = self.disabled && !self.disabled_last_tick;
        self.disabled_last_tick = self.disabled;
    }

    pub fn reset(&mut self) {
        self.disabled = false;
        self.disabled_last_tick = false;
        self.just_disabled = false;
    }

    fn disable(&mut self) {
        self.disabled = true;
    }
}

/// Common surface of every device.
pub trait Device {
    fn state(&self) -> &DeviceState;
    fn state_mut(&mut self) -> &mut DeviceState;

    fn kind(&self) -> DeviceKind {
        self.state().kind()
    }

    fn anchor(&self) -> EntityId {
        self.state().anchor()
    }

    fn disabled(&self) -> bool {
        self.state().disabled()
    }

    /// Disable for the remainder of the current tick.
    fn disable(&mut self) {
        self.state_mut().disable();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disable_lasts_one_tick() {
        let mut state = DeviceState::new(DeviceKind::Lidar, EntityId::new(0, 0));
        state.pre_step();
        state.disable();
        state.post_step();
        assert!(state.disabled());
        assert!(state.just_disabled());

        state.pre_step();
        assert!(!state.disabled(), "pre_step must re-enable the device");
        state.post_step();
        assert!(!state.just_disabled());
    }

    #[test]
    fn edge_fires_once_while_disabled_on_consecutive_ticks() {
        let mut state = DeviceState::new(DeviceKind::Gps, EntityId::new(0, 0));
        let mut edges = 0;
        for _ in 0..5 {
            state.pre_step();
            state.disable();
            state.post_step();
            if state.just_disabled() {
                edges += 1;
            }
        }
        assert_eq!(edges, 1);
    }
}
