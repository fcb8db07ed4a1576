// ESP-IDF collaborators: BLE stack, WiFi and HTTP.  Everything above this
// layer is target independent.

pub mod ble;
pub mod http;
pub mod wifi;
