use embassy_time::{Duration as EmbassyDuration, Instant, Ticker};
use emergency_button::{Config, Device};
use esp_hal::gpio::Input;
use log::debug;

use crate::led::Pixel;
use crate::mqtt::MqttLink;

/// Sampling period of the control loop
const POLL_INTERVAL: EmbassyDuration = EmbassyDuration::from_millis(10);

/// Button pin with its polarity resolved.
pub struct Button {
    input: Input<'static>,
    active_low: bool,
}

impl Button {
    pub fn new(input: Input<'static>, active_low: bool) -> Self {
        Self { input, active_low }
    }

    /// `true` while pressed.
    pub fn is_active(&self) -> bool {
        if self.active_low {
            self.input.is_low()
        } else {
            self.input.is_high()
        }
    }
}

#[embassy_executor::task]
pub async fn control_task(button: Button, config: Config) {
    let boot_level = button.is_active();
    debug!("Control: button level at boot {}", boot_level);

    let mut device = Device::new(&config, Pixel, MqttLink, boot_level, Instant::now());
    let mut ticker = Ticker::every(POLL_INTERVAL);

    loop {
        device.step(button.is_active(), Instant::now()).await;
        ticker.next().await;
    }
}
