//! Per-tick driver tying debounce, arming, dispatch and feedback together.

use embassy_time::Instant;
use log::{info, warn};
use smart_leds::RGB8;

use crate::OFF;
use crate::arming::{Admission, ArmingGate, ArmingState};
use crate::config::{Config, Palette};
use crate::debounce::{ButtonEvent, Debouncer};
use crate::dispatch::{AlertDispatcher, Dispatch, Link};
use crate::feedback::{FeedbackController, Hold, Indicator};

/// What happened during one [`Device::step`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Step {
    pub event: Option<ButtonEvent>,
    pub admission: Option<Admission>,
    pub dispatch: Option<Dispatch>,
}

pub struct Device<I, L> {
    debouncer: Debouncer,
    gate: ArmingGate,
    feedback: FeedbackController<I>,
    dispatcher: AlertDispatcher<L>,
    palette: Palette,
    /// Link readiness as of the last step
    link_up: bool,
}

impl<I: Indicator, L: Link> Device<I, L> {
    /// Fresh device: unarmed, link assumed down until the first step sees
    /// it ready. `boot_level` is the button level sampled at startup.
    pub fn new(config: &Config, indicator: I, link: L, boot_level: bool, now: Instant) -> Self {
        let mut feedback = FeedbackController::new(indicator);
        feedback.request(config.palette.link_down, Hold::Indefinite, now);

        Self {
            debouncer: Debouncer::with_level(config.debounce, boot_level, now),
            gate: ArmingGate::new(),
            feedback,
            dispatcher: AlertDispatcher::new(link, config),
            palette: config.palette,
            link_up: false,
        }
    }

    /// Runs one tick: link indication, debounce, arming, dispatch, then the
    /// feedback deadline check.
    pub async fn step(&mut self, raw: bool, now: Instant) -> Step {
        self.track_link(now);

        let mut step = Step {
            event: self.debouncer.observe(raw, now),
            ..Default::default()
        };

        if let Some(event) = step.event {
            let admission = self.gate.admit(event);
            step.admission = Some(admission);

            match admission {
                Admission::Consumed {
                    advanced_to: Some(_),
                } if self.link_up => {
                    self.show_arming_phase(now);
                }
                Admission::Consumed { .. } => {}
                Admission::Forward(event) => {
                    step.dispatch = Some(
                        self.dispatcher
                            .handle(event, now, &mut self.feedback)
                            .await,
                    );
                }
            }
        }

        self.feedback.tick(now);
        step
    }

    /// Link down paints the link color over everything; coming back restores
    /// whatever the arming phase wants, resuming arming where it stopped.
    fn track_link(&mut self, now: Instant) {
        let ready = self.dispatcher.link().is_ready();
        if ready == self.link_up {
            return;
        }
        self.link_up = ready;

        if ready {
            info!("Link up, arming state {:?}", self.gate.state());
            self.show_arming_phase(now);
        } else {
            warn!("Link down");
            self.feedback
                .request(self.palette.link_down, Hold::Indefinite, now);
        }
    }

    fn show_arming_phase(&mut self, now: Instant) {
        let color = self.arming_color();
        self.feedback.request(color, Hold::Indefinite, now);
    }

    fn arming_color(&self) -> RGB8 {
        match self.gate.state() {
            ArmingState::AwaitingFirstPress => self.palette.arming_prompt,
            ArmingState::AwaitingFirstRelease => self.palette.armed_wait,
            ArmingState::Armed => OFF,
        }
    }

    pub fn arming_state(&self) -> ArmingState {
        self.gate.state()
    }

    pub fn color(&self) -> RGB8 {
        self.feedback.color()
    }

    pub fn feedback(&self) -> &FeedbackController<I> {
        &self.feedback
    }
}
