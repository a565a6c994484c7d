//! Status pixel (WS2812 on GPIO8)
//!
//! The alert logic runs in the control task while the RMT driver lives in
//! the main task. Colors travel between them through a signal, so the
//! latest request always wins and nothing queues up.

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};
use emergency_button::{Indicator, RGB8};
use log::error;
use smart_leds::SmartLedsWrite;

static PIXEL_COLOR: Signal<CriticalSectionRawMutex, RGB8> = Signal::new();

/// `Indicator` used by the alert logic.
#[derive(Default)]
pub struct Pixel;

impl Indicator for Pixel {
    fn set_color(&mut self, color: RGB8) {
        PIXEL_COLOR.signal(color);
    }
}

/// Paints `color` on the pixel immediately, bypassing the alert logic.
/// Used before the control task exists.
pub fn show(color: RGB8) {
    PIXEL_COLOR.signal(color);
}

/// Applies requested colors to the pixel, forever.
pub async fn drive<W>(mut pixel: W) -> !
where
    W: SmartLedsWrite<Color = RGB8>,
    W::Error: core::fmt::Debug,
{
    loop {
        let color = PIXEL_COLOR.wait().await;
        if let Err(e) = pixel.write([color]) {
            error!("Pixel write failed: {:?}", e);
        }
    }
}
