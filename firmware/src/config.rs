//! Build-time settings, baked in from the environment (or `.env`, see build.rs).

use emergency_button::{Config, ConfigError, Overrides, parse_port};

pub const WIFI_SSID: &str = env!("WIFI_SSID");
pub const WIFI_PASSWORD: &str = env!("WIFI_PASSWORD");

const BROKER_HOST: Option<&'static str> = option_env!("BROKER_HOST");
const BROKER_PORT: Option<&'static str> = option_env!("BROKER_PORT");
const MQTT_USER: Option<&'static str> = option_env!("MQTT_USER");
const MQTT_PASSWORD: Option<&'static str> = option_env!("MQTT_PASSWORD");
const MQTT_CLIENT_ID: Option<&'static str> = option_env!("MQTT_CLIENT_ID");
const BUTTON_ACTIVE_LOW: Option<&'static str> = option_env!("BUTTON_ACTIVE_LOW");

const DEFAULT_BROKER_PORT: u16 = 1883;
const DEFAULT_CLIENT_ID: &str = "ESP32C3_Client";

#[derive(Clone, Debug)]
pub struct BrokerSettings {
    pub host: Option<&'static str>,
    pub port: u16,
    pub client_id: &'static str,
    pub username: Option<&'static str>,
    pub password: Option<&'static str>,
}

pub fn broker() -> Result<BrokerSettings, ConfigError> {
    Ok(BrokerSettings {
        host: BROKER_HOST,
        port: parse_port("BROKER_PORT", BROKER_PORT, DEFAULT_BROKER_PORT)?,
        client_id: MQTT_CLIENT_ID.unwrap_or(DEFAULT_CLIENT_ID),
        username: MQTT_USER,
        password: MQTT_PASSWORD,
    })
}

/// Alert logic configuration with overrides applied and validated.
///
/// The reference wiring pulls the pin up and reads HIGH as pressed, so the
/// button stays active high unless `BUTTON_ACTIVE_LOW` says otherwise.
pub fn alert() -> Result<Config, ConfigError> {
    Config::default().with_overrides(&Overrides {
        debounce_ms: option_env!("DEBOUNCE_MS"),
        failure_hold_ms: option_env!("FAILURE_HOLD_MS"),
        long_ok_hold_ms: option_env!("LONG_OK_HOLD_MS"),
        button_active_low: BUTTON_ACTIVE_LOW,
    })
}
