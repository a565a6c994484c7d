//! One-shot arming sequence.
//!
//! After boot the device refuses to send anything until the operator has
//! pressed and released the button once. The gate only moves forward; a
//! reset is the only way back to [`ArmingState::AwaitingFirstPress`].

use log::info;

use crate::debounce::ButtonEvent;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ArmingState {
    #[default]
    AwaitingFirstPress,
    AwaitingFirstRelease,
    Armed,
}

/// What the gate did with an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Swallowed by the arming sequence. Carries the new state when the
    /// event moved the sequence forward.
    Consumed { advanced_to: Option<ArmingState> },
    /// Armed: hand the event on to alert dispatch.
    Forward(ButtonEvent),
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ArmingGate {
    state: ArmingState,
}

impl ArmingGate {
    pub const fn new() -> Self {
        Self {
            state: ArmingState::AwaitingFirstPress,
        }
    }

    pub fn admit(&mut self, event: ButtonEvent) -> Admission {
        let next = match (self.state, event) {
            (ArmingState::Armed, event) => return Admission::Forward(event),
            (ArmingState::AwaitingFirstPress, ButtonEvent::Pressed) => {
                ArmingState::AwaitingFirstRelease
            }
            (ArmingState::AwaitingFirstRelease, ButtonEvent::Released) => ArmingState::Armed,
            // release before any press, or a repeated press
            _ => return Admission::Consumed { advanced_to: None },
        };

        info!("Arming: {:?} -> {:?}", self.state, next);
        self.state = next;
        Admission::Consumed {
            advanced_to: Some(next),
        }
    }

    pub fn state(&self) -> ArmingState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state == ArmingState::Armed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ButtonEvent::{Pressed, Released};

    #[test]
    fn press_then_release_arms() {
        let mut gate = ArmingGate::new();
        assert_eq!(
            gate.admit(Pressed),
            Admission::Consumed {
                advanced_to: Some(ArmingState::AwaitingFirstRelease)
            }
        );
        assert!(!gate.is_armed());
        assert_eq!(
            gate.admit(Released),
            Admission::Consumed {
                advanced_to: Some(ArmingState::Armed)
            }
        );
        assert!(gate.is_armed());
    }

    #[test]
    fn stray_events_are_ignored_while_arming() {
        let mut gate = ArmingGate::new();
        assert_eq!(gate.admit(Released), Admission::Consumed { advanced_to: None });
        assert_eq!(gate.state(), ArmingState::AwaitingFirstPress);

        gate.admit(Pressed);
        assert_eq!(gate.admit(Pressed), Admission::Consumed { advanced_to: None });
        assert_eq!(gate.state(), ArmingState::AwaitingFirstRelease);
    }

    #[test]
    fn nothing_is_forwarded_before_a_full_cycle() {
        let mut gate = ArmingGate::new();
        for event in [Released, Released, Pressed, Pressed, Pressed] {
            assert!(!matches!(gate.admit(event), Admission::Forward(_)));
        }
        assert!(!matches!(gate.admit(Released), Admission::Forward(_)));
        assert!(matches!(gate.admit(Pressed), Admission::Forward(Pressed)));
    }

    #[test]
    fn armed_forwards_every_event_in_order() {
        let mut gate = ArmingGate::new();
        gate.admit(Pressed);
        gate.admit(Released);

        let input = [Pressed, Released, Released, Pressed, Pressed, Released];
        let forwarded: Vec<_> = input
            .iter()
            .filter_map(|&e| match gate.admit(e) {
                Admission::Forward(e) => Some(e),
                Admission::Consumed { .. } => None,
            })
            .collect();
        assert_eq!(forwarded, input);
        assert_eq!(gate.state(), ArmingState::Armed);
    }
}
