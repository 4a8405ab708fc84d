//! Error handling for the portsdr library
//!
//! Every host and stream operation returns [`Result`]. Vendor driver
//! primitives report raw status codes, which streams wrap into
//! [`Error::NativeDriver`] together with the name of the failing call.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::host::HostType;

/// A specialized Result type for portsdr operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result of a raw vendor driver call: the error is the vendor status code.
pub type NativeResult<T> = std::result::Result<T, i32>;

/// Error type for portsdr operations
#[derive(Debug, Error)]
pub enum Error {
    /// Bad or malformed device key, or an unsupported parameter value
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Enumeration or open failed
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// The host that discovered a device no longer exists
    #[error("host is no longer available")]
    HostUnavailable,

    /// An underlying vendor driver call failed
    #[error("{vendor} driver call {call} failed with code {code}")]
    NativeDriver {
        vendor: HostType,
        call: &'static str,
        code: i32,
    },

    /// Operation not meaningful for this vendor
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Operation attempted before `initialize` succeeded
    #[error("stream is not initialized")]
    Uninitialized,

    /// OS-level failure (spawning the acquisition thread)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Error kind, without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    DeviceNotFound,
    HostUnavailable,
    NativeDriver,
    Unsupported,
    Uninitialized,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::DeviceNotFound => "device not found",
            ErrorKind::HostUnavailable => "host unavailable",
            ErrorKind::NativeDriver => "native driver error",
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::Uninitialized => "uninitialized",
            ErrorKind::Io => "I/O error",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Create an invalid argument error with a custom message
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Create an unsupported operation error with a custom message
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        Error::Unsupported(msg.into())
    }

    /// Create a device-not-found error with a custom message
    pub fn device_not_found<S: Into<String>>(msg: S) -> Self {
        Error::DeviceNotFound(msg.into())
    }

    pub fn native(vendor: HostType, call: &'static str, code: i32) -> Self {
        Error::NativeDriver { vendor, call, code }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::DeviceNotFound(_) => ErrorKind::DeviceNotFound,
            Error::HostUnavailable => ErrorKind::HostUnavailable,
            Error::NativeDriver { .. } => ErrorKind::NativeDriver,
            Error::Unsupported(_) => ErrorKind::Unsupported,
            Error::Uninitialized => ErrorKind::Uninitialized,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Numeric status code for callers that speak integer statuses.
    ///
    /// Success is `0`; every error is negative.
    pub fn code(&self) -> i32 {
        match self {
            Error::InvalidArgument(_) | Error::Unsupported(_) => -1,
            Error::DeviceNotFound(_) => -2,
            Error::HostUnavailable => -4,
            Error::NativeDriver { .. } => -5,
            Error::Uninitialized => -6,
            Error::Io(_) => -100,
        }
    }

    /// Raw vendor status code, if this error came from a driver call
    pub fn native_code(&self) -> Option<i32> {
        match self {
            Error::NativeDriver { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Wrap a raw driver status into a crate error
pub(crate) trait NativeResultExt<T> {
    fn native(self, vendor: HostType, call: &'static str) -> Result<T>;
}

impl<T> NativeResultExt<T> for NativeResult<T> {
    fn native(self, vendor: HostType, call: &'static str) -> Result<T> {
        self.map_err(|code| Error::native(vendor, call, code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::Other, "spawn failed");
        let err: Error = io_err.into();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("I/O error"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_native_error_display() {
        let err = Error::native(HostType::RtlSdr, "rtlsdr_open", -3);
        assert_eq!(
            err.to_string(),
            "RTL-SDR driver call rtlsdr_open failed with code -3"
        );
        assert_eq!(err.native_code(), Some(-3));
        assert_eq!(err.code(), -5);
    }

    #[test]
    fn test_legacy_codes() {
        assert_eq!(Error::invalid_argument("x").code(), -1);
        assert_eq!(Error::device_not_found("x").code(), -2);
        assert_eq!(Error::HostUnavailable.code(), -4);
        assert_eq!(Error::Uninitialized.code(), -6);
        assert!(Error::unsupported("x").code() < 0);
    }

    #[test]
    fn test_native_result_ext() {
        let ok: NativeResult<u32> = Ok(7);
        assert_eq!(ok.native(HostType::AirSpy, "airspy_set_freq").unwrap(), 7);

        let failed: NativeResult<()> = Err(-1000);
        let err = failed
            .native(HostType::AirSpy, "airspy_set_freq")
            .unwrap_err();
        assert!(matches!(
            err,
            Error::NativeDriver {
                vendor: HostType::AirSpy,
                call: "airspy_set_freq",
                code: -1000
            }
        ));
    }
}
