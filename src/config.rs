//! Deployment configuration of the alert logic.
//!
//! Defaults match the deployed device wiring and broker topics. The firmware may
//! override the timings, the button polarity and the broker port with
//! build-time environment values, which are parsed and validated here so a bad
//! value is caught at startup.

use core::fmt;

use embassy_time::Duration;
use smart_leds::RGB8;

use crate::OFF;
use crate::debounce::DEBOUNCE_MS;

/// Auto-off for the failure indication (milliseconds)
pub const FAILURE_HOLD_MS: u64 = 3_000;
/// Auto-off for a delivered long-press alert (milliseconds)
pub const LONG_OK_HOLD_MS: u64 = 5_000;

const MAX_DEBOUNCE_MS: u64 = 1_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Topics {
    /// Alert state, carries the short/long payloads
    pub alert: &'static str,
    /// Liveness, announced by the link on every connect
    pub online: &'static str,
}

impl Default for Topics {
    fn default() -> Self {
        Self {
            alert: "home/emergency_button/state",
            online: "home/emergency_button/online",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payloads {
    pub short_press: &'static [u8],
    pub long_press: &'static [u8],
    pub online: &'static [u8],
}

impl Default for Payloads {
    fn default() -> Self {
        Self {
            short_press: b"1",
            long_press: b"L",
            online: b"true",
        }
    }
}

/// Concrete colors behind each indication.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    /// Waiting for the first press after boot
    pub arming_prompt: RGB8,
    /// First press seen, waiting for its release
    pub armed_wait: RGB8,
    pub alert_ok: RGB8,
    pub alert_ok_long: RGB8,
    pub alert_failed: RGB8,
    /// Link down or reconnecting
    pub link_down: RGB8,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            arming_prompt: RGB8 { r: 0, g: 0, b: 40 },
            armed_wait: RGB8 { r: 40, g: 30, b: 0 },
            alert_ok: RGB8 { r: 0, g: 40, b: 0 },
            alert_ok_long: RGB8 { r: 0, g: 40, b: 40 },
            alert_failed: RGB8 { r: 60, g: 0, b: 0 },
            link_down: RGB8 { r: 30, g: 0, b: 30 },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub debounce: Duration,
    pub failure_hold: Duration,
    pub long_ok_hold: Duration,
    pub topics: Topics,
    pub payloads: Payloads,
    pub palette: Palette,
    /// Button reads LOW while pressed
    pub button_active_low: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEBOUNCE_MS),
            failure_hold: Duration::from_millis(FAILURE_HOLD_MS),
            long_ok_hold: Duration::from_millis(LONG_OK_HOLD_MS),
            topics: Topics::default(),
            payloads: Payloads::default(),
            palette: Palette::default(),
            button_active_low: false,
        }
    }
}

/// Raw overrides, usually straight from `option_env!`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Overrides<'a> {
    pub debounce_ms: Option<&'a str>,
    pub failure_hold_ms: Option<&'a str>,
    pub long_ok_hold_ms: Option<&'a str>,
    pub button_active_low: Option<&'a str>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Value is not a number of milliseconds
    InvalidNumber(&'static str),
    /// Duration must not be zero
    ZeroDuration(&'static str),
    DebounceTooLong,
    EmptyTopic,
    EmptyPayload,
    /// Short and long press would be indistinguishable on the wire
    AmbiguousPayloads,
    /// Indication would be invisible
    InvisibleColor(&'static str),
    /// Value is not one of true/false/1/0
    InvalidFlag(&'static str),
    /// Value is not a non-zero TCP port
    InvalidPort(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidNumber(name) => write!(f, "{name} is not a valid number"),
            ConfigError::ZeroDuration(name) => write!(f, "{name} must be greater than zero"),
            ConfigError::DebounceTooLong => {
                write!(f, "debounce window must be below {MAX_DEBOUNCE_MS} ms")
            }
            ConfigError::EmptyTopic => write!(f, "MQTT topics must not be empty"),
            ConfigError::EmptyPayload => write!(f, "MQTT payloads must not be empty"),
            ConfigError::AmbiguousPayloads => {
                write!(f, "short and long press payloads must differ")
            }
            ConfigError::InvisibleColor(name) => write!(f, "{name} color must not be off"),
            ConfigError::InvalidFlag(name) => write!(f, "{name} must be true, false, 1 or 0"),
            ConfigError::InvalidPort(name) => write!(f, "{name} is not a valid port number"),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debounce.as_ticks() == 0 {
            return Err(ConfigError::ZeroDuration("debounce"));
        }
        if self.debounce >= Duration::from_millis(MAX_DEBOUNCE_MS) {
            return Err(ConfigError::DebounceTooLong);
        }
        if self.failure_hold.as_ticks() == 0 {
            return Err(ConfigError::ZeroDuration("failure hold"));
        }
        if self.long_ok_hold.as_ticks() == 0 {
            return Err(ConfigError::ZeroDuration("long press hold"));
        }

        if self.topics.alert.is_empty() || self.topics.online.is_empty() {
            return Err(ConfigError::EmptyTopic);
        }
        let payloads = &self.payloads;
        if payloads.short_press.is_empty()
            || payloads.long_press.is_empty()
            || payloads.online.is_empty()
        {
            return Err(ConfigError::EmptyPayload);
        }
        if payloads.short_press == payloads.long_press {
            return Err(ConfigError::AmbiguousPayloads);
        }

        if self.palette.alert_failed == OFF {
            return Err(ConfigError::InvisibleColor("alert failed"));
        }
        if self.palette.link_down == OFF {
            return Err(ConfigError::InvisibleColor("link down"));
        }
        Ok(())
    }

    /// Applies overrides on top of `self` and validates the result.
    pub fn with_overrides(mut self, overrides: &Overrides<'_>) -> Result<Self, ConfigError> {
        if let Some(d) = parse_millis("DEBOUNCE_MS", overrides.debounce_ms)? {
            self.debounce = d;
        }
        if let Some(d) = parse_millis("FAILURE_HOLD_MS", overrides.failure_hold_ms)? {
            self.failure_hold = d;
        }
        if let Some(d) = parse_millis("LONG_OK_HOLD_MS", overrides.long_ok_hold_ms)? {
            self.long_ok_hold = d;
        }
        if let Some(active_low) = parse_flag("BUTTON_ACTIVE_LOW", overrides.button_active_low)? {
            self.button_active_low = active_low;
        }
        self.validate()?;
        Ok(self)
    }
}

fn parse_millis(name: &'static str, value: Option<&str>) -> Result<Option<Duration>, ConfigError> {
    value
        .map(|v| {
            v.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidNumber(name))
        })
        .transpose()
}

fn parse_flag(name: &'static str, value: Option<&str>) -> Result<Option<bool>, ConfigError> {
    let Some(value) = value.map(str::trim) else {
        return Ok(None);
    };
    if value.eq_ignore_ascii_case("true") || value == "1" {
        Ok(Some(true))
    } else if value.eq_ignore_ascii_case("false") || value == "0" {
        Ok(Some(false))
    } else {
        Err(ConfigError::InvalidFlag(name))
    }
}

/// Parses an optional port setting, `default` when unset.
pub fn parse_port(name: &'static str, value: Option<&str>, default: u16) -> Result<u16, ConfigError> {
    match value.map(|v| v.trim().parse::<u16>()) {
        None => Ok(default),
        Some(Ok(0)) | Some(Err(_)) => Err(ConfigError::InvalidPort(name)),
        Some(Ok(port)) => Ok(port),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.debounce, Duration::from_millis(50));
        assert_eq!(config.failure_hold, Duration::from_millis(3_000));
        assert_eq!(config.long_ok_hold, Duration::from_millis(5_000));
        assert_eq!(config.payloads.short_press, b"1");
        assert_eq!(config.payloads.long_press, b"L");
        assert!(!config.button_active_low);
    }

    #[test]
    fn overrides_are_applied() {
        let config = Config::default()
            .with_overrides(&Overrides {
                debounce_ms: Some(" 20 "),
                failure_hold_ms: Some("1500"),
                long_ok_hold_ms: None,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(config.debounce, Duration::from_millis(20));
        assert_eq!(config.failure_hold, Duration::from_millis(1_500));
        assert_eq!(config.long_ok_hold, Duration::from_millis(5_000));
    }

    #[test]
    fn malformed_override_is_rejected() {
        let err = Config::default()
            .with_overrides(&Overrides {
                debounce_ms: Some("fifty"),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidNumber("DEBOUNCE_MS"));
    }

    #[test]
    fn zero_failure_hold_is_rejected() {
        let err = Config::default()
            .with_overrides(&Overrides {
                failure_hold_ms: Some("0"),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err, ConfigError::ZeroDuration("failure hold"));
    }

    #[test]
    fn oversized_debounce_is_rejected() {
        let config = Config {
            debounce: Duration::from_millis(1_000),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::DebounceTooLong));
    }

    #[test]
    fn identical_payloads_are_rejected() {
        let config = Config {
            payloads: Payloads {
                long_press: b"1",
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::AmbiguousPayloads));
    }

    #[test]
    fn invisible_failure_color_is_rejected() {
        let config = Config {
            palette: Palette {
                alert_failed: OFF,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvisibleColor("alert failed"))
        );
    }

    #[test]
    fn polarity_flag_accepts_any_case() {
        let cases = [
            ("TRUE", true),
            ("True", true),
            (" 1 ", true),
            ("false", false),
            ("0", false),
        ];
        for (raw, expected) in cases {
            let config = Config::default()
                .with_overrides(&Overrides {
                    button_active_low: Some(raw),
                    ..Default::default()
                })
                .unwrap();
            assert_eq!(config.button_active_low, expected, "{raw:?}");
        }
    }

    #[test]
    fn malformed_polarity_is_rejected() {
        for raw in ["on", "yes", "ture", ""] {
            let err = Config::default()
                .with_overrides(&Overrides {
                    button_active_low: Some(raw),
                    ..Default::default()
                })
                .unwrap_err();
            assert_eq!(err, ConfigError::InvalidFlag("BUTTON_ACTIVE_LOW"), "{raw:?}");
        }
    }

    #[test]
    fn port_falls_back_only_when_unset() {
        assert_eq!(parse_port("BROKER_PORT", None, 1883), Ok(1883));
        assert_eq!(parse_port("BROKER_PORT", Some("8883"), 1883), Ok(8883));
        for raw in ["mqtt", "70000", "0", "-1"] {
            assert_eq!(
                parse_port("BROKER_PORT", Some(raw), 1883),
                Err(ConfigError::InvalidPort("BROKER_PORT")),
                "{raw:?}"
            );
        }
    }
}
