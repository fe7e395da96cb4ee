//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements     | Connects to                 |
//! |-------------|----------------|-----------------------------|
//! | `ble`       | GattTransport  | Host-side simulated server  |
//! | `bluedroid` | GattTransport  | ESP32 Bluedroid GATT server |
//! | `gpio`      | DigitalOutput  | embedded-hal `OutputPin`s   |
//! | `log_sink`  | EventSink      | Serial log output           |
//! | `thermal`   | ThermalPort    | Open-loop setpoint holder   |

pub mod ble;
#[cfg(all(feature = "espidf", target_os = "espidf"))]
pub mod bluedroid;
pub mod gpio;
pub mod log_sink;
pub mod thermal;
