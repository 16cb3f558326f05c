use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use thiserror::Error;

/// Numeric code of an Alpaca error, as carried in the `ErrorNumber` field.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ASCOMErrorCode(pub u16);

/// The starting value for driver-specific error numbers.
const DRIVER_BASE: u16 = 0x500;
/// The maximum value for driver-specific error numbers.
const DRIVER_MAX: u16 = 0xFFF;

impl ASCOMErrorCode {
    /// Generate a driver-specific error code.
    pub const fn new_for_driver(code: u16) -> Self {
        assert!(
            code <= DRIVER_MAX - DRIVER_BASE,
            "Driver error code out of range"
        );
        Self(DRIVER_BASE + code)
    }

    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

/// Value-type error carried through every handler; never thrown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("ASCOM error {code}: {message}")]
pub struct ASCOMError {
    #[serde(rename = "ErrorNumber")]
    pub code: ASCOMErrorCode,
    #[serde(rename = "ErrorMessage")]
    pub message: Cow<'static, str>,
}

impl ASCOMError {
    pub fn new(code: ASCOMErrorCode, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// A driver-specific error with the first reserved driver code.
    ///
    /// Argument-decoding failures use this so that they travel inside the
    /// envelope rather than failing the HTTP request.
    pub fn custom(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ASCOMErrorCode(DRIVER_BASE), message)
    }
}

pub type ASCOMResult<T = ()> = Result<T, ASCOMError>;

macro_rules! ascom_error_codes {
  ($(#[doc = $doc:literal] $name:ident = ($value:literal, $message:literal),)*) => {
    impl ASCOMErrorCode {
      $(
        #[doc = $doc]
        pub const $name: Self = Self($value);
      )*
    }

    impl std::fmt::Debug for ASCOMErrorCode {
      fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
          $(
            Self::$name => write!(f, "{}", stringify!($name)),
          )*
          Self(code @ DRIVER_BASE..=DRIVER_MAX) => write!(f, "DRIVER_ERROR[{}]", code - DRIVER_BASE),
          Self(code) => write!(f, "{code:#X}"),
        }
      }
    }

    impl std::fmt::Display for ASCOMErrorCode {
      fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
      }
    }

    impl ASCOMError {
      $(
        #[doc = $doc]
        pub const $name: Self = Self {
          code: ASCOMErrorCode::$name,
          message: Cow::Borrowed($message),
        };
      )*
    }
  };
}

ascom_error_codes! {
  #[doc = "Property or method not implemented, or capability absent."]
  NOT_IMPLEMENTED = (0x400, "Not implemented"),
  #[doc = "An argument was out of its permitted range."]
  INVALID_VALUE = (0x401, "Invalid value"),
  #[doc = "A value was read before it was first written."]
  VALUE_NOT_SET = (0x402, "Value not set"),
  #[doc = "The communications channel is not connected."]
  NOT_CONNECTED = (0x407, "Not connected"),
  #[doc = "The operation is forbidden while the mount is parked."]
  INVALID_WHILE_PARKED = (0x408, "Parked"),
  #[doc = "The operation is forbidden while the mount is slaved."]
  INVALID_WHILE_SLAVED = (0x409, "Slaved"),
  #[doc = "The driver reported that the operation could not be carried out."]
  INVALID_OPERATION = (0x40B, "Invalid operation"),
  #[doc = "The named device action is not implemented."]
  ACTION_NOT_IMPLEMENTED = (0x40C, "Action not implemented"),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_the_reserved_ranges() {
        assert_eq!(ASCOMErrorCode::NOT_IMPLEMENTED.as_u16(), 0x400);
        assert_eq!(ASCOMErrorCode::NOT_CONNECTED.as_u16(), 0x407);
        assert_eq!(ASCOMErrorCode::new_for_driver(0).as_u16(), 0x500);
        assert_eq!(
            ASCOMErrorCode::new_for_driver(DRIVER_MAX - DRIVER_BASE).as_u16(),
            0xFFF
        );
    }

    #[test]
    fn custom_errors_carry_their_message() {
        let err = ASCOMError::custom("Field 'Axis' not found");
        assert_eq!(err.code.as_u16(), 0x500);
        assert_eq!(err.message, "Field 'Axis' not found");
    }

    #[test]
    fn canonical_messages() {
        assert_eq!(ASCOMError::NOT_CONNECTED.message, "Not connected");
        assert_eq!(ASCOMError::INVALID_VALUE.message, "Invalid value");
    }
}
