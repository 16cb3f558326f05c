//! The telescope facade: static metadata, capability word, connection
//! state, and one gated method per Alpaca operation. Gates compose left to
//! right; the first failing check is returned and the driver is never
//! reached.

use super::{AlignmentMode, ConfiguredDevice, DriveRate, EquatorialSystem, PierSide};
use crate::errors::{ASCOMError, ASCOMResult};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// `utcdate` wire format; sub-second precision is intentionally dropped.
const UTC_DATE_FORMAT: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");

/// The 21-bit capability word, fixed at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities(u32);

impl Capabilities {
    pub const NONE: Self = Self(0);
    pub const FIND_HOME: Self = Self(0x00001);
    pub const PARK: Self = Self(0x00002);
    pub const PULSE_GUIDE: Self = Self(0x00004);
    pub const SET_DECLINATION_RATE: Self = Self(0x00008);
    pub const SET_GUIDE_RATES: Self = Self(0x00010);
    pub const SET_PARK: Self = Self(0x00020);
    pub const SET_PIER_SIDE: Self = Self(0x00040);
    pub const SET_RIGHT_ASCENSION_RATE: Self = Self(0x00080);
    pub const SET_TRACKING: Self = Self(0x00100);
    pub const SLEW: Self = Self(0x00200);
    pub const SLEW_ALT_AZ: Self = Self(0x00400);
    pub const SLEW_ALT_AZ_ASYNC: Self = Self(0x00800);
    pub const SLEW_ASYNC: Self = Self(0x01000);
    pub const SYNC: Self = Self(0x02000);
    pub const SYNC_ALT_AZ: Self = Self(0x04000);
    pub const UNPARK: Self = Self(0x08000);
    pub const MOVE_AXIS_0: Self = Self(0x10000);
    pub const MOVE_AXIS_1: Self = Self(0x20000);
    pub const MOVE_AXIS_2: Self = Self(0x40000);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// The move-axis bit for axis 0, 1 or 2.
    pub const fn move_axis(axis: u8) -> Self {
        Self(Self::MOVE_AXIS_0.0 << axis)
    }
}

impl std::ops::BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Capabilities {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// One permissible rate band of a mount axis (degrees per second).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AxisRate {
    pub minimum: f64,
    pub maximum: f64,
}

/// Static description of a mount, fixed at construction.
#[derive(Debug, Clone)]
pub struct TelescopeInfo {
    pub name: String,
    pub description: String,
    pub driver_info: String,
    pub driver_version: String,
    pub interface_version: i32,
    pub unique_id: String,
    pub alignment_mode: AlignmentMode,
    pub aperture_area: f64,
    pub aperture_diameter: f64,
    pub focal_length: f64,
    pub equatorial_system: EquatorialSystem,
    pub axis_rates: Vec<AxisRate>,
    pub tracking_rates: Vec<DriveRate>,
    pub capabilities: Capabilities,
}

/// Driver-facing surface of the telescope.
///
/// Defaults follow the mount base class: benign zero / no-op answers for
/// the offset-rate property family, `VALUE_NOT_SET` for targets that were
/// never written, and `NOT_IMPLEMENTED` for everything a concrete driver
/// must provide.
#[allow(unused_variables)]
pub trait TelescopeDriver: Send {
    fn model_name(&mut self) -> ASCOMResult<String> {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn altitude(&mut self) -> ASCOMResult<f64> {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn azimuth(&mut self) -> ASCOMResult<f64> {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn declination(&mut self) -> ASCOMResult<f64> {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn right_ascension(&mut self) -> ASCOMResult<f64> {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn at_home(&mut self) -> ASCOMResult<bool> {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn at_park(&mut self) -> ASCOMResult<bool> {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn is_pulse_guiding(&mut self) -> ASCOMResult<bool> {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn slewing(&mut self) -> ASCOMResult<bool> {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn sidereal_time(&mut self) -> ASCOMResult<f64> {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn destination_side_of_pier(
        &mut self,
        right_ascension: f64,
        declination: f64,
    ) -> ASCOMResult<PierSide> {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn does_refraction(&mut self) -> ASCOMResult<bool> {
        Ok(false)
    }

    fn set_does_refraction(&mut self, does_refraction: bool) -> ASCOMResult {
        Ok(())
    }

    fn side_of_pier(&mut self) -> ASCOMResult<PierSide> {
        Ok(PierSide::Unknown)
    }

    fn set_side_of_pier(&mut self, side: PierSide) -> ASCOMResult {
        Ok(())
    }

    fn declination_rate(&mut self) -> ASCOMResult<f64> {
        Ok(0.0)
    }

    fn set_declination_rate(&mut self, rate: f64) -> ASCOMResult {
        Ok(())
    }

    fn right_ascension_rate(&mut self) -> ASCOMResult<f64> {
        Ok(0.0)
    }

    fn set_right_ascension_rate(&mut self, rate: f64) -> ASCOMResult {
        Ok(())
    }

    fn guide_rate_declination(&mut self) -> ASCOMResult<f64> {
        Ok(0.0)
    }

    fn set_guide_rate_declination(&mut self, rate: f64) -> ASCOMResult {
        Ok(())
    }

    fn guide_rate_right_ascension(&mut self) -> ASCOMResult<f64> {
        Ok(0.0)
    }

    fn set_guide_rate_right_ascension(&mut self, rate: f64) -> ASCOMResult {
        Ok(())
    }

    fn site_latitude(&mut self) -> ASCOMResult<f64> {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn set_site_latitude(&mut self, latitude: f64) -> ASCOMResult {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn site_longitude(&mut self) -> ASCOMResult<f64> {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn set_site_longitude(&mut self, longitude: f64) -> ASCOMResult {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn target_declination(&mut self) -> ASCOMResult<f64> {
        Err(ASCOMError::VALUE_NOT_SET)
    }

    fn set_target_declination(&mut self, declination: f64) -> ASCOMResult {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn target_right_ascension(&mut self) -> ASCOMResult<f64> {
        Err(ASCOMError::VALUE_NOT_SET)
    }

    fn set_target_right_ascension(&mut self, right_ascension: f64) -> ASCOMResult {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn tracking(&mut self) -> ASCOMResult<bool> {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn set_tracking(&mut self, tracking: bool) -> ASCOMResult {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn tracking_rate(&mut self) -> ASCOMResult<DriveRate> {
        Ok(DriveRate::Sidereal)
    }

    fn set_tracking_rate(&mut self, rate: DriveRate) -> ASCOMResult {
        Ok(())
    }

    fn utc_date(&mut self) -> ASCOMResult<OffsetDateTime> {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn set_utc_date(&mut self, utc: OffsetDateTime) -> ASCOMResult {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn abort_slew(&mut self) -> ASCOMResult {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn find_home(&mut self) -> ASCOMResult {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn move_axis(&mut self, axis: u8, rate: f64) -> ASCOMResult {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn park(&mut self) -> ASCOMResult {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn pulse_guide(&mut self, direction: i32, duration: i32) -> ASCOMResult {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn set_park(&mut self) -> ASCOMResult {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn slew_to_alt_az(&mut self, azimuth: f64, altitude: f64) -> ASCOMResult {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn slew_to_alt_az_async(&mut self, azimuth: f64, altitude: f64) -> ASCOMResult {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn slew_to_coordinates(&mut self, right_ascension: f64, declination: f64) -> ASCOMResult {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn slew_to_coordinates_async(
        &mut self,
        right_ascension: f64,
        declination: f64,
    ) -> ASCOMResult {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn slew_to_target(&mut self) -> ASCOMResult {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn slew_to_target_async(&mut self) -> ASCOMResult {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn sync_to_alt_az(&mut self, azimuth: f64, altitude: f64) -> ASCOMResult {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn sync_to_coordinates(&mut self, right_ascension: f64, declination: f64) -> ASCOMResult {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn sync_to_target(&mut self) -> ASCOMResult {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }

    fn unpark(&mut self) -> ASCOMResult {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }
}

/// A mount as exposed over the Alpaca API.
pub struct Telescope {
    info: TelescopeInfo,
    connected: bool,
    site_elevation: f64,
    slew_settle_time: i32,
    driver: Box<dyn TelescopeDriver>,
}

impl std::fmt::Debug for Telescope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telescope")
            .field("name", &self.info.name)
            .field("unique_id", &self.info.unique_id)
            .field("connected", &self.connected)
            .finish()
    }
}

fn check_value(condition: bool) -> ASCOMResult {
    if condition {
        Ok(())
    } else {
        Err(ASCOMError::INVALID_VALUE)
    }
}

fn check_flag(flag: ASCOMResult<bool>) -> ASCOMResult {
    if flag? {
        Ok(())
    } else {
        Err(ASCOMError::NOT_IMPLEMENTED)
    }
}

impl Telescope {
    pub fn new(info: TelescopeInfo, driver: Box<dyn TelescopeDriver>) -> Self {
        Self {
            info,
            connected: false,
            site_elevation: 0.0,
            slew_settle_time: 0,
            driver,
        }
    }

    pub fn info(&self) -> &TelescopeInfo {
        &self.info
    }

    fn check_connected(&self) -> ASCOMResult {
        if self.connected {
            Ok(())
        } else {
            Err(ASCOMError::NOT_CONNECTED)
        }
    }

    fn check_not_parked(&mut self) -> ASCOMResult {
        if self.driver.at_park()? {
            Err(ASCOMError::INVALID_WHILE_PARKED)
        } else {
            Ok(())
        }
    }

    fn has(&self, capability: Capabilities) -> ASCOMResult<bool> {
        Ok(self.info.capabilities.contains(capability))
    }

    // Connection state.

    pub fn connected(&self) -> bool {
        self.connected
    }

    /// Idempotent; reconnecting an already-connected device is a no-op.
    pub fn set_connected(&mut self, connected: bool) -> ASCOMResult {
        self.connected = connected;
        Ok(())
    }

    /// Listing entry for the management API. Uses the mount-reported model
    /// name when a connection is up, the static name otherwise.
    pub fn device_info(&mut self, device_number: usize) -> ConfiguredDevice {
        let device_name = if self.connected {
            self.driver
                .model_name()
                .unwrap_or_else(|_| self.info.name.clone())
        } else {
            self.info.name.clone()
        };

        ConfiguredDevice {
            device_name,
            device_type: "telescope".to_owned(),
            device_number,
            unique_id: self.info.unique_id.clone(),
        }
    }

    pub fn supported_actions(&self) -> Vec<String> {
        Vec::new()
    }

    // Capability flags; readable without a connection.

    pub fn can_find_home(&self) -> bool {
        self.info.capabilities.contains(Capabilities::FIND_HOME)
    }

    pub fn can_park(&self) -> bool {
        self.info.capabilities.contains(Capabilities::PARK)
    }

    pub fn can_pulse_guide(&self) -> bool {
        self.info.capabilities.contains(Capabilities::PULSE_GUIDE)
    }

    pub fn can_set_declination_rate(&self) -> bool {
        self.info
            .capabilities
            .contains(Capabilities::SET_DECLINATION_RATE)
    }

    pub fn can_set_guide_rates(&self) -> bool {
        self.info.capabilities.contains(Capabilities::SET_GUIDE_RATES)
    }

    pub fn can_set_park(&self) -> bool {
        self.info.capabilities.contains(Capabilities::SET_PARK)
    }

    pub fn can_set_pier_side(&self) -> bool {
        self.info.capabilities.contains(Capabilities::SET_PIER_SIDE)
    }

    pub fn can_set_right_ascension_rate(&self) -> bool {
        self.info
            .capabilities
            .contains(Capabilities::SET_RIGHT_ASCENSION_RATE)
    }

    pub fn can_set_tracking(&self) -> bool {
        self.info.capabilities.contains(Capabilities::SET_TRACKING)
    }

    pub fn can_slew(&self) -> bool {
        self.info.capabilities.contains(Capabilities::SLEW)
    }

    pub fn can_slew_alt_az(&self) -> bool {
        self.info.capabilities.contains(Capabilities::SLEW_ALT_AZ)
    }

    pub fn can_slew_alt_az_async(&self) -> bool {
        self.info
            .capabilities
            .contains(Capabilities::SLEW_ALT_AZ_ASYNC)
    }

    pub fn can_slew_async(&self) -> bool {
        self.info.capabilities.contains(Capabilities::SLEW_ASYNC)
    }

    pub fn can_sync(&self) -> bool {
        self.info.capabilities.contains(Capabilities::SYNC)
    }

    pub fn can_sync_alt_az(&self) -> bool {
        self.info.capabilities.contains(Capabilities::SYNC_ALT_AZ)
    }

    pub fn can_unpark(&self) -> bool {
        self.info.capabilities.contains(Capabilities::UNPARK)
    }

    /// Fallible on purpose: the axis index is validated first, so a bad
    /// axis reports `invalid_value` rather than `not_implemented`.
    pub fn can_move_axis(&self, axis: i32) -> ASCOMResult<bool> {
        check_value((0..=2).contains(&axis))?;
        Ok(self
            .info
            .capabilities
            .contains(Capabilities::move_axis(axis as u8)))
    }

    /// The statically-declared rate bands; the axis index is validated.
    pub fn axis_rates(&self, axis: i32) -> ASCOMResult<Vec<AxisRate>> {
        check_value((0..=2).contains(&axis))?;
        Ok(self.info.axis_rates.clone())
    }

    // Read-only properties.

    pub fn altitude(&mut self) -> ASCOMResult<f64> {
        self.check_connected()?;
        self.driver.altitude()
    }

    pub fn azimuth(&mut self) -> ASCOMResult<f64> {
        self.check_connected()?;
        self.driver.azimuth()
    }

    pub fn declination(&mut self) -> ASCOMResult<f64> {
        self.check_connected()?;
        self.driver.declination()
    }

    pub fn right_ascension(&mut self) -> ASCOMResult<f64> {
        self.check_connected()?;
        self.driver.right_ascension()
    }

    pub fn at_home(&mut self) -> ASCOMResult<bool> {
        self.check_connected()?;
        self.driver.at_home()
    }

    pub fn at_park(&mut self) -> ASCOMResult<bool> {
        self.check_connected()?;
        self.driver.at_park()
    }

    pub fn is_pulse_guiding(&mut self) -> ASCOMResult<bool> {
        self.check_connected()?;
        check_flag(self.has(Capabilities::PULSE_GUIDE))?;
        self.driver.is_pulse_guiding()
    }

    pub fn slewing(&mut self) -> ASCOMResult<bool> {
        self.check_connected()?;
        self.driver.slewing()
    }

    pub fn sidereal_time(&mut self) -> ASCOMResult<f64> {
        self.check_connected()?;
        self.driver.sidereal_time()
    }

    pub fn destination_side_of_pier(
        &mut self,
        right_ascension: f64,
        declination: f64,
    ) -> ASCOMResult<PierSide> {
        self.check_connected()?;
        self.driver
            .destination_side_of_pier(right_ascension, declination)
    }

    // Read-write properties.

    pub fn does_refraction(&mut self) -> ASCOMResult<bool> {
        self.check_connected()?;
        self.driver.does_refraction()
    }

    pub fn set_does_refraction(&mut self, does_refraction: bool) -> ASCOMResult {
        self.check_connected()?;
        self.driver.set_does_refraction(does_refraction)
    }

    pub fn side_of_pier(&mut self) -> ASCOMResult<PierSide> {
        self.check_connected()?;
        self.driver.side_of_pier()
    }

    pub fn set_side_of_pier(&mut self, side: i32) -> ASCOMResult {
        self.check_connected()?;
        check_flag(self.has(Capabilities::SET_PIER_SIDE))?;
        let side = match side {
            0 => PierSide::East,
            1 => PierSide::West,
            _ => return Err(ASCOMError::INVALID_VALUE),
        };
        self.driver.set_side_of_pier(side)
    }

    pub fn declination_rate(&mut self) -> ASCOMResult<f64> {
        self.check_connected()?;
        self.driver.declination_rate()
    }

    pub fn set_declination_rate(&mut self, rate: f64) -> ASCOMResult {
        self.check_connected()?;
        check_flag(self.has(Capabilities::SET_DECLINATION_RATE))?;
        self.driver.set_declination_rate(rate)
    }

    pub fn right_ascension_rate(&mut self) -> ASCOMResult<f64> {
        self.check_connected()?;
        self.driver.right_ascension_rate()
    }

    pub fn set_right_ascension_rate(&mut self, rate: f64) -> ASCOMResult {
        self.check_connected()?;
        check_flag(self.has(Capabilities::SET_RIGHT_ASCENSION_RATE))?;
        self.driver.set_right_ascension_rate(rate)
    }

    pub fn guide_rate_declination(&mut self) -> ASCOMResult<f64> {
        self.check_connected()?;
        self.driver.guide_rate_declination()
    }

    pub fn set_guide_rate_declination(&mut self, rate: f64) -> ASCOMResult {
        self.check_connected()?;
        check_flag(self.has(Capabilities::SET_GUIDE_RATES))?;
        self.driver.set_guide_rate_declination(rate)
    }

    pub fn guide_rate_right_ascension(&mut self) -> ASCOMResult<f64> {
        self.check_connected()?;
        self.driver.guide_rate_right_ascension()
    }

    pub fn set_guide_rate_right_ascension(&mut self, rate: f64) -> ASCOMResult {
        self.check_connected()?;
        check_flag(self.has(Capabilities::SET_GUIDE_RATES))?;
        self.driver.set_guide_rate_right_ascension(rate)
    }

    pub fn site_elevation(&mut self) -> ASCOMResult<f64> {
        self.check_connected()?;
        Ok(self.site_elevation)
    }

    pub fn set_site_elevation(&mut self, elevation: f64) -> ASCOMResult {
        self.check_connected()?;
        check_value((-300.0..=10_000.0).contains(&elevation))?;
        self.site_elevation = elevation;
        Ok(())
    }

    pub fn site_latitude(&mut self) -> ASCOMResult<f64> {
        self.check_connected()?;
        self.driver.site_latitude()
    }

    pub fn set_site_latitude(&mut self, latitude: f64) -> ASCOMResult {
        self.check_connected()?;
        check_value((-90.0..=90.0).contains(&latitude))?;
        self.driver.set_site_latitude(latitude)
    }

    pub fn site_longitude(&mut self) -> ASCOMResult<f64> {
        self.check_connected()?;
        self.driver.site_longitude()
    }

    pub fn set_site_longitude(&mut self, longitude: f64) -> ASCOMResult {
        self.check_connected()?;
        check_value((-180.0..=180.0).contains(&longitude))?;
        self.driver.set_site_longitude(longitude)
    }

    pub fn slew_settle_time(&mut self) -> ASCOMResult<i32> {
        self.check_connected()?;
        Ok(self.slew_settle_time)
    }

    pub fn set_slew_settle_time(&mut self, seconds: i32) -> ASCOMResult {
        self.check_connected()?;
        check_value(seconds >= 0)?;
        self.slew_settle_time = seconds;
        Ok(())
    }

    pub fn target_declination(&mut self) -> ASCOMResult<f64> {
        self.check_connected()?;
        self.driver.target_declination()
    }

    pub fn set_target_declination(&mut self, declination: f64) -> ASCOMResult {
        self.check_connected()?;
        check_value((-90.0..=90.0).contains(&declination))?;
        self.driver.set_target_declination(declination)
    }

    pub fn target_right_ascension(&mut self) -> ASCOMResult<f64> {
        self.check_connected()?;
        self.driver.target_right_ascension()
    }

    pub fn set_target_right_ascension(&mut self, right_ascension: f64) -> ASCOMResult {
        self.check_connected()?;
        check_value((0.0..=24.0).contains(&right_ascension))?;
        self.driver.set_target_right_ascension(right_ascension)
    }

    pub fn tracking(&mut self) -> ASCOMResult<bool> {
        self.check_connected()?;
        self.driver.tracking()
    }

    pub fn set_tracking(&mut self, tracking: bool) -> ASCOMResult {
        self.check_connected()?;
        self.driver.set_tracking(tracking)
    }

    pub fn tracking_rate(&mut self) -> ASCOMResult<DriveRate> {
        self.check_connected()?;
        self.driver.tracking_rate()
    }

    pub fn set_tracking_rate(&mut self, rate: i32) -> ASCOMResult {
        self.check_connected()?;
        check_value((0..=3).contains(&rate))?;
        let rate = DriveRate::from_index(rate).ok_or(ASCOMError::INVALID_VALUE)?;
        self.driver.set_tracking_rate(rate)
    }

    pub fn utc_date(&mut self) -> ASCOMResult<String> {
        self.check_connected()?;
        let utc = self.driver.utc_date()?.to_offset(UtcOffset::UTC);

        utc.format(&UTC_DATE_FORMAT)
            .map_err(|_| ASCOMError::INVALID_OPERATION)
    }

    pub fn set_utc_date(&mut self, raw: &str) -> ASCOMResult {
        self.check_connected()?;
        let utc = OffsetDateTime::parse(raw, &Rfc3339).map_err(|_| ASCOMError::INVALID_VALUE)?;
        self.driver.set_utc_date(utc.to_offset(UtcOffset::UTC))
    }

    // Operations.

    pub fn abort_slew(&mut self) -> ASCOMResult {
        self.check_connected()?;
        self.driver.abort_slew()
    }

    pub fn find_home(&mut self) -> ASCOMResult {
        self.check_connected()?;
        check_flag(self.has(Capabilities::FIND_HOME))?;
        self.driver.find_home()
    }

    pub fn move_axis(&mut self, axis: i32, rate: f64) -> ASCOMResult {
        self.check_connected()?;
        check_flag(self.can_move_axis(axis))?;
        check_value(rate > -9.0 && rate < 9.0)?;
        self.driver.move_axis(axis as u8, rate)
    }

    pub fn park(&mut self) -> ASCOMResult {
        self.check_connected()?;
        check_flag(self.has(Capabilities::PARK))?;
        self.driver.park()
    }

    pub fn pulse_guide(&mut self, direction: i32, duration: i32) -> ASCOMResult {
        self.check_connected()?;
        check_flag(self.has(Capabilities::PULSE_GUIDE))?;
        self.driver.pulse_guide(direction, duration)
    }

    pub fn set_park(&mut self) -> ASCOMResult {
        self.check_connected()?;
        check_flag(self.has(Capabilities::SET_PARK))?;
        self.driver.set_park()
    }

    pub fn slew_to_alt_az(&mut self, azimuth: f64, altitude: f64) -> ASCOMResult {
        self.check_connected()?;
        check_flag(self.has(Capabilities::SLEW_ALT_AZ))?;
        check_value((0.0..=360.0).contains(&azimuth))?;
        check_value((-90.0..=90.0).contains(&altitude))?;
        self.driver.slew_to_alt_az(azimuth, altitude)
    }

    pub fn slew_to_alt_az_async(&mut self, azimuth: f64, altitude: f64) -> ASCOMResult {
        self.check_connected()?;
        check_flag(self.has(Capabilities::SLEW_ALT_AZ_ASYNC))?;
        check_value((0.0..=360.0).contains(&azimuth))?;
        check_value((-90.0..=90.0).contains(&altitude))?;
        self.driver.slew_to_alt_az_async(azimuth, altitude)
    }

    pub fn slew_to_coordinates(&mut self, right_ascension: f64, declination: f64) -> ASCOMResult {
        self.check_connected()?;
        check_flag(self.has(Capabilities::SLEW))?;
        check_value((0.0..=24.0).contains(&right_ascension))?;
        check_value((-90.0..=90.0).contains(&declination))?;
        self.driver.slew_to_coordinates(right_ascension, declination)
    }

    pub fn slew_to_coordinates_async(
        &mut self,
        right_ascension: f64,
        declination: f64,
    ) -> ASCOMResult {
        self.check_connected()?;
        check_flag(self.has(Capabilities::SLEW_ASYNC))?;
        check_value((0.0..=24.0).contains(&right_ascension))?;
        check_value((-90.0..=90.0).contains(&declination))?;
        self.driver
            .slew_to_coordinates_async(right_ascension, declination)
    }

    pub fn slew_to_target(&mut self) -> ASCOMResult {
        self.check_connected()?;
        check_flag(self.has(Capabilities::SLEW))?;
        self.driver.slew_to_target()
    }

    pub fn slew_to_target_async(&mut self) -> ASCOMResult {
        self.check_connected()?;
        check_flag(self.has(Capabilities::SLEW_ASYNC))?;
        self.driver.slew_to_target_async()
    }

    pub fn sync_to_alt_az(&mut self, azimuth: f64, altitude: f64) -> ASCOMResult {
        self.check_connected()?;
        check_flag(self.has(Capabilities::SYNC_ALT_AZ))?;
        check_value((0.0..=360.0).contains(&azimuth))?;
        check_value((-90.0..=90.0).contains(&altitude))?;
        self.driver.sync_to_alt_az(azimuth, altitude)
    }

    pub fn sync_to_coordinates(&mut self, right_ascension: f64, declination: f64) -> ASCOMResult {
        self.check_connected()?;
        check_flag(self.has(Capabilities::SYNC))?;
        check_value((0.0..=24.0).contains(&right_ascension))?;
        check_value((-90.0..=90.0).contains(&declination))?;
        self.driver.sync_to_coordinates(right_ascension, declination)
    }

    pub fn sync_to_target(&mut self) -> ASCOMResult {
        self.check_connected()?;
        self.check_not_parked()?;
        check_flag(self.has(Capabilities::SYNC))?;
        self.driver.sync_to_target()
    }

    pub fn unpark(&mut self) -> ASCOMResult {
        self.check_connected()?;
        check_flag(self.has(Capabilities::UNPARK))?;
        self.driver.unpark()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    type CallLog = Arc<Mutex<Vec<&'static str>>>;

    /// Records which driver methods were reached.
    struct RecordingDriver {
        calls: CallLog,
        parked: bool,
    }

    impl RecordingDriver {
        fn record(&self, name: &'static str) {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(name);
            }
        }
    }

    impl TelescopeDriver for RecordingDriver {
        fn at_park(&mut self) -> ASCOMResult<bool> {
            self.record("at_park");
            Ok(self.parked)
        }

        fn slew_to_coordinates_async(&mut self, _ra: f64, _dec: f64) -> ASCOMResult {
            self.record("slew_to_coordinates_async");
            Ok(())
        }

        fn move_axis(&mut self, _axis: u8, _rate: f64) -> ASCOMResult {
            self.record("move_axis");
            Ok(())
        }

        fn find_home(&mut self) -> ASCOMResult {
            self.record("find_home");
            Ok(())
        }

        fn sync_to_target(&mut self) -> ASCOMResult {
            self.record("sync_to_target");
            Ok(())
        }

        fn set_target_declination(&mut self, _dec: f64) -> ASCOMResult {
            self.record("set_target_declination");
            Ok(())
        }
    }

    fn telescope_with(capabilities: Capabilities, parked: bool) -> Telescope {
        build_telescope(capabilities, parked).0
    }

    fn build_telescope(capabilities: Capabilities, parked: bool) -> (Telescope, CallLog) {
        let info = TelescopeInfo {
            name: "Test mount".to_owned(),
            description: "Test mount".to_owned(),
            driver_info: "Test".to_owned(),
            driver_version: "0.0.0".to_owned(),
            interface_version: 2,
            unique_id: "0000".to_owned(),
            alignment_mode: AlignmentMode::GermanPolar,
            aperture_area: 0.0,
            aperture_diameter: 0.0,
            focal_length: 0.0,
            equatorial_system: EquatorialSystem::Topocentric,
            axis_rates: vec![AxisRate {
                minimum: 0.0,
                maximum: 8.0,
            }],
            tracking_rates: vec![DriveRate::Sidereal],
            capabilities,
        };

        let log = CallLog::default();
        let telescope = Telescope::new(
            info,
            Box::new(RecordingDriver {
                calls: Arc::clone(&log),
                parked,
            }),
        );

        (telescope, log)
    }

    #[test]
    fn disconnected_wins_over_everything() {
        let (mut telescope, log) = build_telescope(Capabilities::SLEW_ASYNC, false);

        // Even an out-of-range value reports not_connected first.
        assert_eq!(
            telescope.slew_to_coordinates_async(99.0, 99.0).unwrap_err(),
            ASCOMError::NOT_CONNECTED
        );
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn capability_gate_precedes_value_checks() {
        let (mut telescope, log) = build_telescope(Capabilities::NONE, false);
        telescope.set_connected(true).unwrap();

        assert_eq!(
            telescope.slew_to_coordinates_async(99.0, 99.0).unwrap_err(),
            ASCOMError::NOT_IMPLEMENTED
        );
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn value_gate_rejects_out_of_range_coordinates() {
        let (mut telescope, log) = build_telescope(Capabilities::SLEW_ASYNC, false);
        telescope.set_connected(true).unwrap();

        assert_eq!(
            telescope.slew_to_coordinates_async(25.0, 0.0).unwrap_err(),
            ASCOMError::INVALID_VALUE
        );
        assert_eq!(
            telescope.slew_to_coordinates_async(6.0, -95.0).unwrap_err(),
            ASCOMError::INVALID_VALUE
        );
        assert!(log.lock().unwrap().is_empty());

        assert!(telescope.slew_to_coordinates_async(6.0, 45.0).is_ok());
        assert_eq!(*log.lock().unwrap(), vec!["slew_to_coordinates_async"]);
    }

    #[test]
    fn capability_projection() {
        let mut with = telescope_with(Capabilities::FIND_HOME, false);
        with.set_connected(true).unwrap();
        assert!(with.find_home().is_ok());

        let mut without = telescope_with(Capabilities::NONE, false);
        without.set_connected(true).unwrap();
        assert_eq!(without.find_home().unwrap_err(), ASCOMError::NOT_IMPLEMENTED);
    }

    #[test]
    fn move_axis_validates_axis_before_capability() {
        let mut telescope =
            telescope_with(Capabilities::MOVE_AXIS_0 | Capabilities::MOVE_AXIS_1, false);
        telescope.set_connected(true).unwrap();

        assert_eq!(
            telescope.move_axis(5, 1.0).unwrap_err(),
            ASCOMError::INVALID_VALUE
        );
        assert_eq!(
            telescope.move_axis(2, 1.0).unwrap_err(),
            ASCOMError::NOT_IMPLEMENTED
        );
        assert_eq!(
            telescope.move_axis(0, 9.5).unwrap_err(),
            ASCOMError::INVALID_VALUE
        );
        assert!(telescope.move_axis(0, 1.0).is_ok());
    }

    #[test]
    fn sync_to_target_refused_while_parked() {
        let mut telescope = telescope_with(Capabilities::SYNC, true);
        telescope.set_connected(true).unwrap();

        assert_eq!(
            telescope.sync_to_target().unwrap_err(),
            ASCOMError::INVALID_WHILE_PARKED
        );
    }

    #[test]
    fn target_reads_report_value_not_set_until_written() {
        let mut telescope = telescope_with(Capabilities::NONE, false);
        telescope.set_connected(true).unwrap();

        assert_eq!(
            telescope.target_right_ascension().unwrap_err(),
            ASCOMError::VALUE_NOT_SET
        );

        assert!(telescope.set_target_declination(10.0).is_ok());
        assert_eq!(
            telescope.set_target_declination(95.0).unwrap_err(),
            ASCOMError::INVALID_VALUE
        );
    }

    #[test]
    fn connect_is_idempotent() {
        let mut telescope = telescope_with(Capabilities::NONE, false);

        assert!(telescope.set_connected(true).is_ok());
        assert!(telescope.set_connected(true).is_ok());
        assert!(telescope.connected());

        assert!(telescope.set_connected(false).is_ok());
        assert!(telescope.set_connected(false).is_ok());
        assert!(!telescope.connected());
    }

    #[test]
    fn site_elevation_is_stored_and_range_checked() {
        let mut telescope = telescope_with(Capabilities::NONE, false);
        telescope.set_connected(true).unwrap();

        assert_eq!(telescope.site_elevation().unwrap(), 0.0);
        assert_eq!(
            telescope.set_site_elevation(12_000.0).unwrap_err(),
            ASCOMError::INVALID_VALUE
        );
        assert!(telescope.set_site_elevation(150.0).is_ok());
        assert_eq!(telescope.site_elevation().unwrap(), 150.0);
    }

    #[test]
    fn axis_rates_validates_the_axis() {
        let telescope = telescope_with(Capabilities::NONE, false);

        assert_eq!(telescope.axis_rates(0).unwrap().len(), 1);
        assert_eq!(
            telescope.axis_rates(3).unwrap_err(),
            ASCOMError::INVALID_VALUE
        );
    }

    #[test]
    fn capability_flags_readable_without_connection() {
        let telescope = telescope_with(Capabilities::PARK, false);
        assert!(telescope.can_park());
        assert!(!telescope.can_unpark());
    }

    #[test]
    fn tracking_rate_range() {
        let mut telescope = telescope_with(Capabilities::NONE, false);
        telescope.set_connected(true).unwrap();

        assert!(telescope.set_tracking_rate(0).is_ok());
        assert!(telescope.set_tracking_rate(3).is_ok());
        assert_eq!(
            telescope.set_tracking_rate(4).unwrap_err(),
            ASCOMError::INVALID_VALUE
        );
        assert_eq!(
            telescope.set_tracking_rate(-1).unwrap_err(),
            ASCOMError::INVALID_VALUE
        );
    }

    #[test]
    fn utc_date_rejects_garbage() {
        let mut telescope = telescope_with(Capabilities::NONE, false);
        telescope.set_connected(true).unwrap();

        assert_eq!(
            telescope.set_utc_date("yesterday").unwrap_err(),
            ASCOMError::INVALID_VALUE
        );
    }
}
