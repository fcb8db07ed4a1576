fn main() {
    // Host builds (unit tests) have no ESP-IDF environment to forward.
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }

    for var in ["WIFI_SSID", "WIFI_PASSWORD", "THINGSPEAK_WRITE_KEY"] {
        println!("cargo:rerun-if-env-changed={var}");
    }
}
