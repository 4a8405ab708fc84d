//! Per-vendor host and stream implementations
//!
//! Each vendor talks to its C driver library through a small driver trait
//! (`RtlSdrDriver`, `AirspyDriver`, `AirspyHfDriver`). The native bindings
//! behind those traits are compiled in with the matching cargo feature.

pub mod airspy;
pub mod airspyhf;
pub mod rtlsdr;

#[cfg(test)]
pub(crate) mod mock;

/// Name suffix for devices listed but not openable during enumeration
pub(crate) const UNAVAILABLE_SUFFIX: &str = " (unavailable)";

/// Format two 32-bit serial words as 16 upper-case hex digits, big-endian
pub(crate) fn serial_words(high: u32, low: u32) -> String {
    let mut bytes = [0u8; 8];
    bytes[..4].copy_from_slice(&high.to_be_bytes());
    bytes[4..].copy_from_slice(&low.to_be_bytes());
    hex::encode_upper(bytes)
}

/// Keep only printable ASCII from a USB descriptor string
pub(crate) fn sanitize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .collect::<String>()
        .trim()
        .to_string()
}
