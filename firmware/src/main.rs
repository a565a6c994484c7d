// Emergency button
// 1. Copy .env.example to .env and fill in the Wi-Fi and broker settings
// 2. Subscribe to the alert topics
// mosquitto_sub -h <IP> -p 1883 -u <user> -P <password> -t 'home/emergency_button/#' -v
// 3. Run the app
// cargo r -r
// 4. Press and release the button once to arm the device (pixel goes from blue to amber to off)
#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

mod button;
mod config;
mod led;
mod mqtt;
mod network;

use embassy_executor::Spawner;
use emergency_button::Palette;
use esp_alloc as _;
use esp_backtrace as _;
use esp_hal::{
    clock::CpuClock,
    gpio::{Input, InputConfig, Pull},
    interrupt::software::SoftwareInterruptControl,
    ram,
    rmt::Rmt,
    time::Rate,
    timer::timg::TimerGroup,
};
use esp_hal_smartled::{SmartLedsAdapter, smart_led_buffer};
use esp_radio::Controller;
use log::{error, info};

use crate::button::{Button, control_task};
use crate::mqtt::link_supervisor;
use crate::network::{connection, create_station_stack, net_task};

esp_bootloader_esp_idf::esp_app_desc!();

#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    esp_println::logger::init_logger_from_env();
    let hal_config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(hal_config);

    esp_alloc::heap_allocator!(#[ram(reclaimed)] size: 64 * 1024);
    esp_alloc::heap_allocator!(size: 36 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let sw_int = SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    esp_rtos::start(timg0.timer0, sw_int.software_interrupt0);

    info!("=== Emergency button ===");

    let rmt = Rmt::new(peripherals.RMT, Rate::from_mhz(80)).expect("Failed to initialize RMT");
    let mut rmt_buffer = smart_led_buffer!(1);
    let pixel = SmartLedsAdapter::new(rmt.channel0, peripherals.GPIO8, &mut rmt_buffer);

    let settings = config::alert().and_then(|alert| Ok((alert, config::broker()?)));
    let (alert_config, broker) = match settings {
        Ok(settings) => settings,
        Err(e) => {
            error!("Invalid configuration: {e}");
            led::show(Palette::default().link_down);
            led::drive(pixel).await
        }
    };

    let button_config = InputConfig::default().with_pull(Pull::Up);
    let button = Button::new(
        Input::new(peripherals.GPIO5, button_config),
        alert_config.button_active_low,
    );

    static ESP_RADIO_CTRL_CELL: static_cell::StaticCell<Controller<'static>> =
        static_cell::StaticCell::new();
    let esp_radio_ctrl = &*ESP_RADIO_CTRL_CELL
        .uninit()
        .write(esp_radio::init().expect("Failed to initialize radio controller"));

    let (controller, interfaces) =
        esp_radio::wifi::new(esp_radio_ctrl, peripherals.WIFI, Default::default())
            .expect("Failed to create WiFi controller");

    let (sta_stack, sta_runner) = create_station_stack(interfaces.sta);

    spawner.spawn(connection(controller)).ok();
    spawner.spawn(net_task(sta_runner)).ok();
    spawner
        .spawn(link_supervisor(
            sta_stack,
            broker,
            alert_config.topics.clone(),
            alert_config.payloads.clone(),
        ))
        .ok();
    spawner.spawn(control_task(button, alert_config)).ok();

    // The pixel driver borrows the RMT buffer from this frame, so it is
    // served from here for the lifetime of the firmware.
    led::drive(pixel).await
}
