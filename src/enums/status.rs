//! # Status Module - *Boundary status codes*
//!
//! The closed set of codes reported across the C boundary and by the
//! database-driver interface. Internal errors collapse onto these through
//! [`BridgeError::status_code`](crate::BridgeError::status_code).

use std::fmt;

use crate::enums::error::BridgeError;

/// Status code at the exchange boundary.
///
/// Numbering matches the ADBC status codes so that a `u8` returned from an
/// `extern "C"` entry point can be read by any ADBC-aware caller.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Ok = 0,
    Unknown = 1,
    NotImplemented = 2,
    NotFound = 3,
    AlreadyExists = 4,
    InvalidArgument = 5,
    InvalidState = 6,
    InvalidData = 7,
    Integrity = 8,
    Internal = 9,
    Io = 10,
    Cancelled = 11,
    Timeout = 12,
    Unauthenticated = 13,
    Unauthorized = 14,
}

impl StatusCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Unknown => "UNKNOWN",
            StatusCode::NotImplemented => "NOT_IMPLEMENTED",
            StatusCode::NotFound => "NOT_FOUND",
            StatusCode::AlreadyExists => "ALREADY_EXISTS",
            StatusCode::InvalidArgument => "INVALID_ARGUMENT",
            StatusCode::InvalidState => "INVALID_STATE",
            StatusCode::InvalidData => "INVALID_DATA",
            StatusCode::Integrity => "INTEGRITY",
            StatusCode::Internal => "INTERNAL",
            StatusCode::Io => "IO",
            StatusCode::Cancelled => "CANCELLED",
            StatusCode::Timeout => "TIMEOUT",
            StatusCode::Unauthenticated => "UNAUTHENTICATED",
            StatusCode::Unauthorized => "UNAUTHORIZED",
        }
    }

    #[inline]
    pub fn is_ok(&self) -> bool {
        matches!(self, StatusCode::Ok)
    }
}

impl TryFrom<u8> for StatusCode {
    type Error = BridgeError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => StatusCode::Ok,
            1 => StatusCode::Unknown,
            2 => StatusCode::NotImplemented,
            3 => StatusCode::NotFound,
            4 => StatusCode::AlreadyExists,
            5 => StatusCode::InvalidArgument,
            6 => StatusCode::InvalidState,
            7 => StatusCode::InvalidData,
            8 => StatusCode::Integrity,
            9 => StatusCode::Internal,
            10 => StatusCode::Io,
            11 => StatusCode::Cancelled,
            12 => StatusCode::Timeout,
            13 => StatusCode::Unauthenticated,
            14 => StatusCode::Unauthorized,
            other => {
                return Err(BridgeError::InvalidArgument(format!(
                    "unknown status code {other}"
                )));
            }
        })
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_str(), *self as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_roundtrip_through_u8() {
        for code in 0u8..=14 {
            let status = StatusCode::try_from(code).unwrap();
            assert_eq!(status as u8, code);
        }
        assert!(StatusCode::try_from(15).is_err());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(StatusCode::InvalidArgument.to_string(), "INVALID_ARGUMENT (5)");
        assert_eq!(StatusCode::Ok.as_str(), "OK");
        assert!(StatusCode::Ok.is_ok());
        assert!(!StatusCode::Io.is_ok());
    }
}
