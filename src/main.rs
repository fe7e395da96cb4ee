//! Chili pad firmware: main entry point
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  BluedroidGatt     HalOutputs        OpenLoopThermal         │
//! │  (GattTransport)   (DigitalOutput)   (ThermalPort)           │
//! │  LogEventSink                                                │
//! │  (EventSink)                                                 │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ─────────────────      │
//! │                                                              │
//! │  ┌──────────────────────────────────────────────────────┐    │
//! │  │  PeripheralService → DeviceController → RelayBank    │    │
//! │  └──────────────────────────────────────────────────────┘    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! After start-up every request arrives through the Bluedroid GATTS callback
//! task; the main task only idles.
#![deny(unused_must_use)]

use anyhow::{anyhow, Result};
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{AnyOutputPin, OutputPin, PinDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::info;

use chilipad::adapters::bluedroid::BluedroidGatt;
use chilipad::adapters::gpio::HalOutputs;
use chilipad::adapters::log_sink::LogEventSink;
use chilipad::adapters::thermal::OpenLoopThermal;
use chilipad::app::service::PeripheralService;
use chilipad::config::PeripheralConfig;
use chilipad::control::device::DeviceController;
use chilipad::drivers::relay::RelayChannel;

const DEVICE_NAME: &str = "ChiliPad";

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  ChiliPad v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // Bonding keys live in NVS; the partition must be up before Bluedroid.
    let _nvs = EspDefaultNvsPartition::take()?;

    // ── 2. Config ─────────────────────────────────────────────
    let config = PeripheralConfig::default();
    config.validate()?;

    // ── 3. Relay outputs ──────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let pins = peripherals.pins;
    let mut spare: [Option<AnyOutputPin>; 3] = [
        Some(pins.gpio37.downgrade_output()),
        Some(pins.gpio38.downgrade_output()),
        Some(pins.gpio40.downgrade_output()),
    ];

    let mut outputs = HalOutputs::new(config.relay_active_low);
    for &ch in &config.relay_channels {
        let slot = RelayChannel::ALL
            .iter()
            .position(|c| *c == ch)
            .and_then(|i| spare[i].take())
            .ok_or_else(|| anyhow!("{} has no free GPIO", ch))?;
        outputs.add(ch.pin(), PinDriver::output(slot)?)?;
    }

    // ── 4. Domain core ────────────────────────────────────────
    let device = DeviceController::from_config(&config, outputs, OpenLoopThermal::new())?;
    let mut service = PeripheralService::new(device, LogEventSink::new());

    // ── 5. BLE ────────────────────────────────────────────────
    let name = heapless::String::try_from(DEVICE_NAME)
        .map_err(|()| anyhow!("device name too long"))?;
    let mut ble = BluedroidGatt::new(name);
    service.register(&mut ble)?;
    ble.start(service)?;

    info!("System ready, power OFF until a central writes ON.");

    loop {
        FreeRtos::delay_ms(1000);
    }
}
