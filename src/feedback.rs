//! Status pixel state management

use embassy_time::{Duration, Instant};
use log::debug;
use smart_leds::RGB8;

use crate::OFF;

/// Physical pixel driver.
pub trait Indicator {
    /// Show `color` right away.
    fn set_color(&mut self, color: RGB8);
}

/// How long a requested color stays on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hold {
    /// Until the next request.
    Indefinite,
    /// Then back to off.
    For(Duration),
}

impl Hold {
    pub fn millis(ms: u64) -> Self {
        Self::For(Duration::from_millis(ms)).normalized()
    }

    fn normalized(self) -> Self {
        match self {
            Hold::For(d) if d.as_ticks() == 0 => Hold::Indefinite,
            hold => hold,
        }
    }
}

/// Drives one pixel and reverts timed colors to off without blocking.
pub struct FeedbackController<I> {
    indicator: I,
    /// Color currently shown
    color: RGB8,
    /// Pending auto-off
    deadline: Option<Instant>,
}

impl<I: Indicator> FeedbackController<I> {
    /// Takes over the pixel and switches it off.
    pub fn new(mut indicator: I) -> Self {
        indicator.set_color(OFF);
        Self {
            indicator,
            color: OFF,
            deadline: None,
        }
    }

    /// Show `color` now. A finite hold replaces any pending auto-off, an
    /// indefinite one cancels it.
    pub fn request(&mut self, color: RGB8, hold: Hold, now: Instant) {
        self.deadline = match hold.normalized() {
            Hold::Indefinite => None,
            Hold::For(d) => Some(now.checked_add(d).unwrap_or(Instant::MAX)),
        };
        self.show(color);
    }

    /// Runs the auto-off. Call on every tick.
    pub fn tick(&mut self, now: Instant) {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                debug!("Feedback hold expired");
                self.deadline = None;
                self.show(OFF);
            }
            _ => {}
        }
    }

    pub fn color(&self) -> RGB8 {
        self.color
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    pub fn into_inner(self) -> I {
        self.indicator
    }

    fn show(&mut self, color: RGB8) {
        if color == self.color {
            debug!("Feedback unchanged, skipping pixel write");
            return;
        }
        self.color = color;
        self.indicator.set_color(color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: RGB8 = RGB8 { r: 255, g: 0, b: 0 };
    const GREEN: RGB8 = RGB8 { r: 0, g: 255, b: 0 };

    #[derive(Default)]
    struct Recorder {
        writes: Vec<RGB8>,
    }

    impl Indicator for Recorder {
        fn set_color(&mut self, color: RGB8) {
            self.writes.push(color);
        }
    }

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    #[test]
    fn starts_off() {
        let feedback = FeedbackController::new(Recorder::default());
        assert_eq!(feedback.color(), OFF);
        assert_eq!(feedback.indicator().writes, vec![OFF]);
    }

    #[test]
    fn timed_color_holds_then_reverts() {
        let mut feedback = FeedbackController::new(Recorder::default());
        feedback.request(RED, Hold::millis(3_000), at(1_000));

        for t in (1_000..4_000).step_by(10) {
            feedback.tick(at(t));
            assert_eq!(feedback.color(), RED, "at {t} ms");
        }
        feedback.tick(at(4_000));
        assert_eq!(feedback.color(), OFF);
        assert_eq!(feedback.deadline(), None);
    }

    #[test]
    fn indefinite_color_stays() {
        let mut feedback = FeedbackController::new(Recorder::default());
        feedback.request(GREEN, Hold::Indefinite, at(0));
        feedback.tick(at(1_000_000));
        assert_eq!(feedback.color(), GREEN);
    }

    #[test]
    fn zero_hold_is_indefinite() {
        let mut feedback = FeedbackController::new(Recorder::default());
        feedback.request(GREEN, Hold::millis(0), at(0));
        assert_eq!(feedback.deadline(), None);
        feedback.tick(at(10_000));
        assert_eq!(feedback.color(), GREEN);
    }

    #[test]
    fn new_request_replaces_pending_deadline() {
        let mut feedback = FeedbackController::new(Recorder::default());
        feedback.request(RED, Hold::millis(1_000), at(0));
        feedback.request(GREEN, Hold::millis(5_000), at(500));

        feedback.tick(at(1_000));
        assert_eq!(feedback.color(), GREEN);
        feedback.tick(at(5_499));
        assert_eq!(feedback.color(), GREEN);
        feedback.tick(at(5_500));
        assert_eq!(feedback.color(), OFF);
    }

    #[test]
    fn indefinite_request_cancels_pending_deadline() {
        let mut feedback = FeedbackController::new(Recorder::default());
        feedback.request(RED, Hold::millis(1_000), at(0));
        feedback.request(GREEN, Hold::Indefinite, at(100));
        feedback.tick(at(2_000));
        assert_eq!(feedback.color(), GREEN);
    }

    #[test]
    fn one_write_per_change() {
        let mut feedback = FeedbackController::new(Recorder::default());
        feedback.request(RED, Hold::millis(100), at(0));
        feedback.request(RED, Hold::millis(100), at(50));
        feedback.tick(at(150));
        feedback.tick(at(160));
        assert_eq!(feedback.into_inner().writes, vec![OFF, RED, OFF]);
    }
}
