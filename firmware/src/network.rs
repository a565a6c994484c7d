use embassy_net::{Runner, Stack, StackResources};
use embassy_time::{Duration, Timer};
use esp_hal::rng::Rng;
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiDevice, WifiEvent};
use log::{debug, error, info};

use crate::config::{WIFI_PASSWORD, WIFI_SSID};

/// Delay before reassociating after a failure or a disconnect
const RECONNECT_DELAY: Duration = Duration::from_millis(5000);

pub fn create_station_stack(
    sta_device: WifiDevice<'static>,
) -> (Stack<'static>, Runner<'static, WifiDevice<'static>>) {
    let sta_config = embassy_net::Config::dhcpv4(Default::default());

    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;

    // DNS and the MQTT TCP socket
    static STA_STACK_RESOURCES_CELL: static_cell::StaticCell<StackResources<3>> =
        static_cell::StaticCell::new();
    embassy_net::new(
        sta_device,
        sta_config,
        STA_STACK_RESOURCES_CELL
            .uninit()
            .write(StackResources::<3>::new()),
        seed,
    )
}

#[embassy_executor::task]
pub async fn connection(mut controller: WifiController<'static>) {
    debug!("start connection task");
    debug!("Device capabilities: {:?}", controller.capabilities());

    let client_config = ModeConfig::Client(
        ClientConfig::default()
            .with_ssid(WIFI_SSID.into())
            .with_password(WIFI_PASSWORD.into()),
    );
    controller
        .set_config(&client_config)
        .expect("Failed to set WiFi configuration");
    debug!("Starting wifi");
    controller
        .start_async()
        .await
        .expect("Failed to start WiFi");
    debug!("Wifi started!");

    info!("Connecting to Wi-Fi '{}'...", WIFI_SSID);
    loop {
        match controller.connect_async().await {
            Ok(()) => {
                info!("Wi-Fi connected.");
                controller.wait_for_event(WifiEvent::StaDisconnected).await;
                info!("Wi-Fi disconnected, reconnecting...");
            }
            Err(e) => {
                error!("Failed to connect to wifi: {e:?}");
            }
        }
        Timer::after(RECONNECT_DELAY).await;
    }
}

#[embassy_executor::task]
pub async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}
