//! Range-gated message passing between drones.
//!
//! Controllers [`stage`](Communicator::stage) payloads between ticks. The
//! next tick sends them right after its `pre_step` re-enabled the device,
//! and the world delivers them in `post_step` to every communicator in range
//! of the sender. A communicator disabled during the physics phase neither
//! delivers nor receives. What a drone received is visible to its controller
//! until the next tick clears it.

use serde::{Deserialize, Serialize};
use swarm_core::prelude::*;
use tracing::trace;

use super::{Device, DeviceState};

/// A message in flight. The payload is opaque to the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Drone whose communicator sent the message.
    pub sender: EntityId,
    pub payload: serde_json::Value,
}

/// Whether two communicators `distance` apart can hear each other. `None`
/// is an infinite range.
///
/// The relation is symmetric: with two finite ranges the distance must be
/// below both.
pub fn in_transmission_range(distance: f64, range_a: Option<f64>, range_b: Option<f64>) -> bool {
    match (range_a, range_b) {
        (None, None) => true,
        (Some(r), None) | (None, Some(r)) => distance < r,
        (Some(a), Some(b)) => distance < a && distance < b,
    }
}

/// Radio of a drone.
#[derive(Debug, Clone)]
pub struct Communicator {
    state: DeviceState,
    range: Option<f64>,
    staged: Vec<serde_json::Value>,
    outbox: Vec<Message>,
    received: Vec<Message>,
    in_range: Vec<EntityId>,
}

impl Communicator {
    pub fn new(anchor: EntityId, range: Option<f64>) -> Self {
        Self {
            state: DeviceState::new(DeviceKind::Communicator, anchor),
            range,
            staged: Vec::new(),
            outbox: Vec::new(),
            received: Vec::new(),
            in_range: Vec::new(),
        }
    }

    /// Transmission range; `None` is infinite.
    pub fn range(&self) -> Option<f64> {
        self.range
    }

    /// Hold `payload` until the next tick starts. Returns the message it
    /// will become.
    pub fn stage(&mut self, payload: serde_json::Value) -> Message {
        self.staged.push(payload.clone());
        Message {
            sender: self.anchor(),
            payload,
        }
    }

    /// Send everything staged. Returns how many payloads were refused.
    pub fn send_staged(&mut self) -> usize {
        let mut refused = 0;
        for payload in std::mem::take(&mut self.staged) {
            if self.send(payload).is_none() {
                refused += 1;
            }
        }
        if refused > 0 {
            trace!(drone = %self.anchor(), refused, "communicator disabled, staged messages refused");
        }
        refused
    }

    /// Queue `payload` for delivery at the end of this tick.
    ///
    /// Returns the queued message, or `None` if the communicator is disabled.
    pub fn send(&mut self, payload: serde_json::Value) -> Option<Message> {
        if self.disabled() {
            return None;
        }
        let msg = Message {
            sender: self.anchor(),
            payload,
        };
        self.outbox.push(msg.clone());
        Some(msg)
    }

    /// Accept `msg`. Nothing is accepted while disabled or from ourselves.
    pub fn receive(&mut self, msg: &Message) -> Option<Message> {
        if self.disabled() || msg.sender == self.anchor() {
            return None;
        }
        self.received.push(msg.clone());
        Some(msg.clone())
    }

    pub fn received(&self) -> &[Message] {
        &self.received
    }

    /// Drones in range as of the last delivery, sorted by id.
    pub fn in_range(&self) -> &[EntityId] {
        &self.in_range
    }

    pub(crate) fn set_in_range(&mut self, peers: Vec<EntityId>) {
        self.in_range = peers;
    }

    pub(crate) fn take_outbox(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.outbox)
    }

    /// Drop last tick's inbox.
    pub fn clear_received(&mut self) {
        self.received.clear();
    }

    pub fn reset(&mut self) {
        self.state.reset();
        self.staged.clear();
        self.outbox.clear();
        self.received.clear();
        self.in_range.clear();
    }
}

impl Device for Communicator {
    fn state(&self) -> &DeviceState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut DeviceState {
        &mut self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn infinite_ranges_always_connect() {
        assert!(in_transmission_range(1e9, None, None));
    }

    #[test]
    fn finite_range_gates_infinite_peer() {
        assert!(in_transmission_range(99.0, Some(100.0), None));
        assert!(!in_transmission_range(100.0, None, Some(100.0)));
    }

    #[test]
    fn both_finite_uses_the_shorter() {
        assert!(!in_transmission_range(60.0, Some(100.0), Some(50.0)));
        assert!(in_transmission_range(40.0, Some(100.0), Some(50.0)));
    }

    #[test]
    fn disabled_sender_sends_nothing() {
        let mut c = Communicator::new(EntityId::new(0, 0), None);
        c.disable();
        assert!(c.send(json!("hello")).is_none());
        assert!(c.take_outbox().is_empty());
    }

    #[test]
    fn self_sent_and_disabled_receipt_ignored() {
        let me = EntityId::new(0, 0);
        let mut c = Communicator::new(me, None);
        let own = Message {
            sender: me,
            payload: json!(1),
        };
        assert!(c.receive(&own).is_none());

        let other = Message {
            sender: EntityId::new(1, 0),
            payload: json!({"x": 3}),
        };
        assert!(c.receive(&other).is_some());
        c.disable();
        assert!(c.receive(&other).is_none());
        assert_eq!(c.received().len(), 1);
    }

    #[test]
    fn clear_received_empties_inbox_only() {
        let mut c = Communicator::new(EntityId::new(0, 0), None);
        c.receive(&Message {
            sender: EntityId::new(1, 0),
            payload: json!(null),
        });
        c.disable();
        c.clear_received();
        assert!(c.received().is_empty());
        assert!(c.disabled(), "device state is left to the owner");
    }

    #[test]
    fn staged_payloads_are_sent_once_enabled() {
        let mut c = Communicator::new(EntityId::new(0, 0), None);
        c.disable();
        let msg = c.stage(json!("later"));
        assert_eq!(msg.sender, EntityId::new(0, 0));
        assert!(c.take_outbox().is_empty());

        c.state_mut().pre_step();
        assert_eq!(c.send_staged(), 0);
        assert_eq!(c.take_outbox(), vec![msg]);
        assert_eq!(c.send_staged(), 0, "staged payloads go out once");
        assert!(c.take_outbox().is_empty());
    }

    #[test]
    fn staged_payloads_refused_while_disabled() {
        let mut c = Communicator::new(EntityId::new(0, 0), None);
        c.stage(json!(1));
        c.disable();
        assert_eq!(c.send_staged(), 1);
        assert!(c.take_outbox().is_empty());
    }

    fn range() -> impl Strategy<Value = Option<f64>> {
        prop_oneof![Just(None), (1.0f64..500.0).prop_map(Some)]
    }

    proptest! {
        #[test]
        fn range_relation_is_symmetric(d in 0.0f64..1000.0, a in range(), b in range()) {
            prop_assert_eq!(in_transmission_range(d, a, b), in_transmission_range(d, b, a));
        }
    }
}
