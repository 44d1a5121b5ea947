fn main() {
    println!("cargo:rerun-if-env-changed=PULSEWATCH_WIFI_SSID");
    println!("cargo:rerun-if-env-changed=PULSEWATCH_WIFI_PASSWORD");
    println!("cargo:rerun-if-env-changed=PULSEWATCH_FAST_URL");
    println!("cargo:rerun-if-env-changed=PULSEWATCH_SLOW_BASE_URL");

    // Host builds (tests, dry-run) have no ESP-IDF environment to export.
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }
}
