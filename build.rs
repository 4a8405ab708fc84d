fn main() {
    // Cargo exposes enabled features to build scripts as env vars
    if std::env::var_os("CARGO_FEATURE_RTLSDR").is_some() {
        println!("cargo:rustc-link-lib=rtlsdr");
    }

    if std::env::var_os("CARGO_FEATURE_AIRSPY").is_some() {
        println!("cargo:rustc-link-lib=airspy");
    }

    if std::env::var_os("CARGO_FEATURE_AIRSPYHF").is_some() {
        println!("cargo:rustc-link-lib=airspyhf");
    }

    println!("cargo:rerun-if-changed=build.rs");
}
