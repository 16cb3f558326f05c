//! Device-independent Alpaca API types shared by the server and the
//! telescope implementation.

mod telescope;

pub use telescope::{AxisRate, Capabilities, Telescope, TelescopeDriver, TelescopeInfo};

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Entry of the `configureddevices` management listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfiguredDevice {
    pub device_name: String,
    pub device_type: String,
    pub device_number: usize,
    #[serde(rename = "UniqueID")]
    pub unique_id: String,
}

/// The fixed `description` management payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerInfo {
    pub server_name: String,
    pub manufacturer: String,
    pub manufacturer_version: String,
    pub location: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            server_name: "Alpaca Telescope Server".to_owned(),
            manufacturer: "Marrony Neris".to_owned(),
            manufacturer_version: "0.0.1".to_owned(),
            location: "US".to_owned(),
        }
    }
}

/// The alignment mode (geometry) of the mount.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum AlignmentMode {
    AltAz = 0,
    Polar = 1,
    GermanPolar = 2,
}

/// The equatorial coordinate system used by the mount.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum EquatorialSystem {
    Other = 0,
    Topocentric = 1,
    J2000 = 2,
    J2050 = 3,
    B1950 = 4,
}

/// Pointing state of the mount relative to the pier.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum PierSide {
    Unknown = -1,
    East = 0,
    West = 1,
}

/// One of the standard sidereal drive rates.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum DriveRate {
    /// Sidereal tracking rate (15.041 arcseconds per second).
    Sidereal = 0,
    /// Lunar tracking rate (14.685 arcseconds per second).
    Lunar = 1,
    /// Solar tracking rate (15.0 arcseconds per second).
    Solar = 2,
    /// King tracking rate (15.0369 arcseconds per second).
    King = 3,
}

impl DriveRate {
    pub fn from_index(index: i32) -> Option<Self> {
        Some(match index {
            0 => Self::Sidereal,
            1 => Self::Lunar,
            2 => Self::Solar,
            3 => Self::King,
            _ => return None,
        })
    }
}
