//! Button debounce state management

use embassy_time::{Duration, Instant};
use log::info;

/// Debounce window used when nothing else is configured (milliseconds)
pub const DEBOUNCE_MS: u64 = 50;

/// Settled edge of the button.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonEvent {
    Pressed,
    Released,
}

impl ButtonEvent {
    fn from_level(active: bool) -> Self {
        if active {
            ButtonEvent::Pressed
        } else {
            ButtonEvent::Released
        }
    }
}

/// Button debounce state tracker
///
/// Levels are logical: `true` is the active (pressed) electrical state,
/// whatever the pin polarity is.
#[derive(Clone, Copy, Debug)]
pub struct Debouncer {
    window: Duration,
    /// Last level considered stable
    stable: bool,
    /// Last raw level observed
    raw: bool,
    /// When the current raw level first appeared
    raw_since: Instant,
}

impl Debouncer {
    /// Debouncer resting in the released state.
    pub fn new(window: Duration) -> Self {
        Self::with_level(window, false, Instant::from_ticks(0))
    }

    /// Debouncer seeded with a level sampled at boot, so that whatever
    /// position the button rests in does not produce an edge on startup.
    pub fn with_level(window: Duration, level: bool, now: Instant) -> Self {
        Self {
            window,
            stable: level,
            raw: level,
            raw_since: now,
        }
    }

    /// Feed one raw sample. Returns an event when a new level has been held
    /// for the whole window.
    pub fn observe(&mut self, raw: bool, now: Instant) -> Option<ButtonEvent> {
        if raw != self.raw {
            self.raw = raw;
            self.raw_since = now;
        }

        if raw == self.stable || now.saturating_duration_since(self.raw_since) < self.window {
            return None;
        }

        self.stable = raw;
        let event = ButtonEvent::from_level(raw);
        info!("Button {:?}", event);
        Some(event)
    }

    /// Current stable level.
    pub fn level(&self) -> bool {
        self.stable
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEBOUNCE_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    /// Feeds `level` every `step` ms over `[from, to)` and collects events.
    fn hold(
        debouncer: &mut Debouncer,
        level: bool,
        from: u64,
        to: u64,
        step: u64,
    ) -> Vec<(u64, ButtonEvent)> {
        (from..to)
            .step_by(step as usize)
            .filter_map(|t| debouncer.observe(level, at(t)).map(|e| (t, e)))
            .collect()
    }

    #[test]
    fn press_held_past_window_emits_once() {
        let mut debouncer = Debouncer::default();
        assert!(hold(&mut debouncer, false, 0, 100, 10).is_empty());

        let events = hold(&mut debouncer, true, 100, 300, 10);
        assert_eq!(events, vec![(150, ButtonEvent::Pressed)]);
        assert!(debouncer.level());
    }

    #[test]
    fn release_is_reported_after_press() {
        let mut debouncer = Debouncer::default();
        hold(&mut debouncer, true, 0, 100, 10);

        let events = hold(&mut debouncer, false, 100, 200, 10);
        assert_eq!(events, vec![(150, ButtonEvent::Released)]);
        assert!(!debouncer.level());
    }

    #[test]
    fn jitter_shorter_than_window_is_discarded() {
        let mut debouncer = Debouncer::default();
        let mut t = 0;
        for level in [true, false, true, false, true, false, true, false] {
            for _ in 0..4 {
                assert_eq!(debouncer.observe(level, at(t)), None, "at {t} ms");
                t += 10;
            }
        }
        assert!(!debouncer.level());
    }

    #[test]
    fn bounce_restarts_the_window() {
        let mut debouncer = Debouncer::default();
        assert_eq!(debouncer.observe(true, at(0)), None);
        assert_eq!(debouncer.observe(true, at(40)), None);
        assert_eq!(debouncer.observe(false, at(45)), None);
        assert_eq!(debouncer.observe(true, at(48)), None);
        // 50 ms after 0 but only 2 ms after the last flip
        assert_eq!(debouncer.observe(true, at(50)), None);
        assert_eq!(debouncer.observe(true, at(97)), None);
        assert_eq!(debouncer.observe(true, at(98)), Some(ButtonEvent::Pressed));
    }

    #[test]
    fn return_to_stable_level_cancels_pending_change() {
        let mut debouncer = Debouncer::default();
        assert_eq!(debouncer.observe(true, at(0)), None);
        assert_eq!(debouncer.observe(false, at(20)), None);
        assert!(hold(&mut debouncer, false, 30, 500, 10).is_empty());
    }

    #[test]
    fn boot_level_does_not_produce_an_edge() {
        let mut debouncer = Debouncer::with_level(Duration::from_millis(50), true, at(1_000));
        assert!(hold(&mut debouncer, true, 1_000, 2_000, 10).is_empty());
        assert_eq!(
            hold(&mut debouncer, false, 2_000, 2_100, 10),
            vec![(2_050, ButtonEvent::Released)]
        );
    }

    #[test]
    fn sparse_sampling_commits_on_first_sample_past_window() {
        let mut debouncer = Debouncer::default();
        assert_eq!(debouncer.observe(true, at(0)), None);
        assert_eq!(debouncer.observe(true, at(500)), Some(ButtonEvent::Pressed));
        assert_eq!(debouncer.observe(true, at(1_000)), None);
    }
}
