//! Control logic of a single-button emergency alert device.
//!
//! Raw button samples are debounced into edges, the edges pass an arming
//! gate that has to see one deliberate press/release cycle after boot, and
//! armed edges are published as alerts over a messaging link. A single RGB
//! pixel reports every phase, with timed indications reverting to off on
//! their own.
//!
//! Nothing in here blocks or touches hardware: the pixel and the link are
//! reached through the [`Indicator`] and [`Link`] traits, and time is passed
//! in by the caller on every tick.

#![cfg_attr(not(test), no_std)]
#![allow(async_fn_in_trait)]

pub mod arming;
pub mod config;
pub mod debounce;
pub mod device;
pub mod dispatch;
pub mod feedback;

pub use arming::{Admission, ArmingGate, ArmingState};
pub use config::{Config, ConfigError, Overrides, Palette, Payloads, Topics, parse_port};
pub use debounce::{ButtonEvent, Debouncer};
pub use device::{Device, Step};
pub use dispatch::{AlertDispatcher, AlertKind, Dispatch, Link, LinkError, Receipt, await_receipt};
pub use feedback::{FeedbackController, Hold, Indicator};

pub use smart_leds::RGB8;

/// Indicator color meaning "off".
pub const OFF: RGB8 = RGB8 { r: 0, g: 0, b: 0 };
