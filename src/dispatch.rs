//! Alert publishing and its feedback.

use core::fmt;
use core::future::Future;

use embassy_time::{Duration, Instant};
use log::{debug, info, warn};

use crate::config::{Config, Palette, Payloads};
use crate::debounce::ButtonEvent;
use crate::feedback::{FeedbackController, Hold, Indicator};

/// Outbound messaging link.
///
/// The link owns connection handling, reconnects and its online
/// announcement. The alert logic only asks whether it is usable and hands
/// it one message at a time.
pub trait Link {
    fn is_ready(&self) -> bool;

    /// One delivery attempt. Implementations bound the call in time; no
    /// retry is expected.
    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), LinkError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkError {
    /// Not connected to the broker
    NotReady,
    /// Broker or transport refused the message
    Rejected,
    /// No answer in time
    Timeout,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::NotReady => write!(f, "Link not ready"),
            LinkError::Rejected => write!(f, "Publish rejected"),
            LinkError::Timeout => write!(f, "Publish timed out"),
        }
    }
}

/// Outcome of one publish attempt, tagged with the attempt it answers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub seq: u32,
    pub result: Result<(), LinkError>,
}

/// Waits for the receipt of attempt `seq`, discarding late answers to earlier
/// attempts that the caller already gave up on.
pub async fn await_receipt<F, Fut>(seq: u32, mut next: F) -> Result<(), LinkError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Receipt>,
{
    loop {
        let receipt = next().await;
        if receipt.seq == seq {
            return receipt.result;
        }
        debug!("Discarding receipt of publish #{} while waiting for #{}", receipt.seq, seq);
    }
}

/// Alert severity, derived from the edge that triggered it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertKind {
    /// Press edge
    Short,
    /// Release edge
    Long,
}

impl AlertKind {
    pub fn payload(self, payloads: &Payloads) -> &'static [u8] {
        match self {
            AlertKind::Short => payloads.short_press,
            AlertKind::Long => payloads.long_press,
        }
    }
}

impl From<ButtonEvent> for AlertKind {
    fn from(event: ButtonEvent) -> Self {
        match event {
            ButtonEvent::Pressed => AlertKind::Short,
            ButtonEvent::Released => AlertKind::Long,
        }
    }
}

/// Result of dispatching one forwarded event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    Delivered(AlertKind),
    Failed(AlertKind, LinkError),
    /// Link was down, nothing was sent
    Skipped(AlertKind),
}

pub struct AlertDispatcher<L> {
    link: L,
    topic: &'static str,
    payloads: Payloads,
    palette: Palette,
    failure_hold: Duration,
    long_ok_hold: Duration,
}

impl<L: Link> AlertDispatcher<L> {
    pub fn new(link: L, config: &Config) -> Self {
        Self {
            link,
            topic: config.topics.alert,
            payloads: config.payloads.clone(),
            palette: config.palette,
            failure_hold: config.failure_hold,
            long_ok_hold: config.long_ok_hold,
        }
    }

    /// Publishes the alert for an armed event and shows the outcome.
    pub async fn handle<I: Indicator>(
        &mut self,
        event: ButtonEvent,
        now: Instant,
        feedback: &mut FeedbackController<I>,
    ) -> Dispatch {
        let kind = AlertKind::from(event);

        if !self.link.is_ready() {
            warn!("Link not ready, {:?} alert not sent", kind);
            return Dispatch::Skipped(kind);
        }

        let payload = kind.payload(&self.payloads);
        match self.link.publish(self.topic, payload).await {
            Ok(()) => {
                info!("{:?} alert published to {}", kind, self.topic);
                let (color, hold) = match kind {
                    AlertKind::Short => (self.palette.alert_ok, Hold::Indefinite),
                    AlertKind::Long => (self.palette.alert_ok_long, Hold::For(self.long_ok_hold)),
                };
                feedback.request(color, hold, now);
                Dispatch::Delivered(kind)
            }
            Err(e) => {
                warn!("{:?} alert failed: {}", kind, e);
                feedback.request(self.palette.alert_failed, Hold::For(self.failure_hold), now);
                Dispatch::Failed(kind, e)
            }
        }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }
}
