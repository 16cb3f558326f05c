//! Byte-level encodings of the NexStar hand-controller protocol: angle
//! scaling, hex-ASCII angle pairs, the location and RTC payloads, and the
//! motor pass-through frame.
//!
//! Every response on the wire ends in a single `0x23` (`'#'`) sentinel.

use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

/// Response terminator byte.
pub const SENTINEL: u8 = b'#';

/// Motor / peripheral addresses used by the `P` pass-through envelope.
pub mod device {
    /// Azimuth (or right ascension) motor.
    pub const AZM_MOTOR: u8 = 16;
    /// Altitude (or declination) motor.
    pub const ALT_MOTOR: u8 = 17;
    pub const GPS: u8 = 176;
    pub const RTC: u8 = 178;
}

/// Pass-through command ids.
pub mod passthrough {
    pub const SLEW_VARIABLE_POSITIVE: u8 = 6;
    pub const SLEW_VARIABLE_NEGATIVE: u8 = 7;
    pub const SLEW_FIXED_POSITIVE: u8 = 36;
    pub const SLEW_FIXED_NEGATIVE: u8 = 37;
}

/// Tracking mode as carried by the `t`/`T` commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TrackingMode {
    Off = 0,
    AltAzm = 1,
    EqNorth = 2,
    EqSouth = 3,
}

impl TrackingMode {
    pub fn from_wire(byte: u8) -> Option<Self> {
        Some(match byte {
            0 => Self::Off,
            1 => Self::AltAzm,
            2 => Self::EqNorth,
            3 => Self::EqSouth,
            _ => return None,
        })
    }
}

/// Converts degrees in [0, 360) to nexstar units: the full circle maps onto
/// [0, 2^16) in coarse mode and [0, 2^32) in precise mode.
pub fn to_nexstar_units(angle: f64, precise: bool) -> u32 {
    let scale = if precise {
        4_294_967_296.0
    } else {
        65_536.0
    };

    (angle.rem_euclid(360.0) / 360.0 * scale) as u64 as u32
}

/// Inverse of [`to_nexstar_units`].
pub fn from_nexstar_units(units: u32, precise: bool) -> f64 {
    let scale = if precise {
        4_294_967_296.0
    } else {
        65_536.0
    };

    f64::from(units) * 360.0 / scale
}

/// Folds an unsigned wire declination back into [-90°, +90°].
///
/// The mount encodes declination without sign: (90°, 270°] is the far side
/// of the pole and maps to 180° − x, while (270°, 360°) is a small negative
/// declination and maps to x − 360°.
pub fn normalize_declination(angle: f64) -> f64 {
    let angle = angle.rem_euclid(360.0);

    if angle > 90.0 && angle <= 270.0 {
        180.0 - angle
    } else if angle > 270.0 {
        angle - 360.0
    } else {
        angle
    }
}

/// Formats a two-angle command such as `R%04X,%04X` / `r%08X,%08X`.
pub fn format_angle_pair(opcode: u8, first: u32, second: u32, precise: bool) -> Vec<u8> {
    let body = if precise {
        format!("{first:08X},{second:08X}")
    } else {
        format!("{first:04X},{second:04X}")
    };

    let mut frame = Vec::with_capacity(body.len() + 1);
    frame.push(opcode);
    frame.extend_from_slice(body.as_bytes());
    frame
}

/// Parses a `XXXX,YYYY#` / `XXXXXXXX,YYYYYYYY#` response body.
pub fn parse_angle_pair(response: &[u8], precise: bool) -> Option<(u32, u32)> {
    let width = if precise { 8 } else { 4 };

    if response.len() != 2 * width + 2 {
        return None;
    }
    if response[width] != b',' || response[2 * width + 1] != SENTINEL {
        return None;
    }

    let first = std::str::from_utf8(&response[..width]).ok()?;
    let second = std::str::from_utf8(&response[width + 1..2 * width + 1]).ok()?;

    Some((
        u32::from_str_radix(first, 16).ok()?,
        u32::from_str_radix(second, 16).ok()?,
    ))
}

/// Length of a two-angle response, sentinel included.
pub const fn angle_pair_len(precise: bool) -> usize {
    if precise {
        18
    } else {
        10
    }
}

/// Degrees/minutes/seconds split of an angle, rounded to the nearest second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dms {
    pub degree: i32,
    pub minute: u8,
    pub second: u8,
}

impl Dms {
    pub fn from_degrees(angle: f64) -> Self {
        let angle = angle % 360.0;
        let total_seconds = if angle >= 0.0 {
            (angle * 3600.0 + 0.5) as i64
        } else {
            (angle * 3600.0 - 0.5) as i64
        };

        let seconds = (total_seconds.abs() % 3600) as u32;

        Self {
            degree: (total_seconds / 3600) as i32,
            minute: (seconds / 60) as u8,
            second: (seconds % 60) as u8,
        }
    }

    pub fn to_degrees(self) -> f64 {
        let fraction = f64::from(self.minute) / 60.0 + f64::from(self.second) / 3600.0;

        if self.degree < 0 {
            f64::from(self.degree) - fraction
        } else {
            f64::from(self.degree) + fraction
        }
    }
}

/// The 8-byte site location payload of the `w`/`W` commands.
///
/// Layout: lat degree, minute, second, south flag, lon degree, minute,
/// second, west flag.
pub fn encode_location(latitude: f64, longitude: f64) -> [u8; 8] {
    let lat = Dms::from_degrees(latitude);
    let lon = Dms::from_degrees(longitude);

    [
        lat.degree.unsigned_abs() as u8,
        lat.minute,
        lat.second,
        u8::from(latitude < 0.0),
        lon.degree.unsigned_abs() as u8,
        lon.minute,
        lon.second,
        u8::from(longitude < 0.0),
    ]
}

pub fn decode_location(payload: &[u8; 8]) -> (f64, f64) {
    let lat = Dms {
        degree: i32::from(payload[0]),
        minute: payload[1],
        second: payload[2],
    };
    let lon = Dms {
        degree: i32::from(payload[4]),
        minute: payload[5],
        second: payload[6],
    };

    let latitude = if payload[3] == 1 {
        -lat.to_degrees()
    } else {
        lat.to_degrees()
    };
    let longitude = if payload[7] == 1 {
        -lon.to_degrees()
    } else {
        lon.to_degrees()
    };

    (latitude, longitude)
}

/// The 8-byte RTC payload of the `h`/`H` commands.
///
/// The carried clock time is mount-local; `offset` holds the GMT offset in
/// hours with 128–255 standing for −128…−1.
pub fn encode_rtc(local: OffsetDateTime) -> [u8; 8] {
    let offset_hours = local.offset().whole_hours();

    [
        local.hour(),
        local.minute(),
        local.second(),
        u8::from(local.month()),
        local.day(),
        (local.year() - 2000).clamp(0, 255) as u8,
        offset_hours as u8,
        0,
    ]
}

pub fn decode_rtc(payload: &[u8; 8]) -> Option<OffsetDateTime> {
    let offset_hours = payload[6] as i8;

    let date = Date::from_calendar_date(
        2000 + i32::from(payload[5]),
        Month::try_from(payload[3]).ok()?,
        payload[4],
    )
    .ok()?;
    let time = Time::from_hms(payload[0], payload[1], payload[2]).ok()?;
    let offset = UtcOffset::from_hms(offset_hours, 0, 0).ok()?;

    Some(PrimitiveDateTime::new(date, time).assume_offset(offset))
}

/// Builds the `P` slew-variable frame for an axis.
///
/// The rate travels in quarter-arcseconds per second, big-endian, clamped
/// to 16 bits; the sign selects the command byte (positive 6, negative 7).
/// Axis 0 addresses the azimuth/RA motor, axis 1 the altitude/Dec motor.
pub fn encode_slew_variable(axis: u8, rate: f64) -> [u8; 8] {
    let steps = (rate.abs() * 3600.0 * 4.0) as u64;
    let steps = steps.min(0xFFFF) as u16;

    let command = if rate >= 0.0 {
        passthrough::SLEW_VARIABLE_POSITIVE
    } else {
        passthrough::SLEW_VARIABLE_NEGATIVE
    };

    let dev = if axis == 0 {
        device::AZM_MOTOR
    } else {
        device::ALT_MOTOR
    };

    [
        b'P',
        3,
        dev,
        command,
        (steps >> 8) as u8,
        (steps & 0xFF) as u8,
        0,
        0,
    ]
}

/// Decodes a slew-variable frame back into (axis, rate in °/s).
pub fn decode_slew_variable(frame: &[u8; 8]) -> Option<(u8, f64)> {
    let axis = match frame[2] {
        device::AZM_MOTOR => 0,
        device::ALT_MOTOR => 1,
        _ => return None,
    };

    let steps = f64::from(u16::from_be_bytes([frame[4], frame[5]]));
    let rate = steps / (3600.0 * 4.0);

    match frame[3] {
        passthrough::SLEW_VARIABLE_POSITIVE => Some((axis, rate)),
        passthrough::SLEW_VARIABLE_NEGATIVE => Some((axis, -rate)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn unit_round_trip_coarse() {
        for angle in [0.0, 0.5, 45.0, 123.456, 359.9] {
            let units = to_nexstar_units(angle, false);
            let back = from_nexstar_units(units, false);
            assert!((angle - back).abs() <= 360.0 / 65_536.0, "{angle} -> {back}");
        }
    }

    #[test]
    fn unit_round_trip_precise() {
        for angle in [0.0, 0.5, 45.0, 123.456, 359.999_999] {
            let units = to_nexstar_units(angle, true);
            let back = from_nexstar_units(units, true);
            assert!(
                (angle - back).abs() <= 360.0 / 4_294_967_296.0,
                "{angle} -> {back}"
            );
        }
    }

    #[test]
    fn full_circle_wraps_to_zero() {
        assert_eq!(to_nexstar_units(360.0, false), 0);
        assert_eq!(to_nexstar_units(720.0, true), 0);
    }

    #[test]
    fn declination_fold() {
        assert_eq!(normalize_declination(45.0), 45.0);
        assert_eq!(normalize_declination(90.0), 90.0);
        assert_eq!(normalize_declination(135.0), 45.0);
        assert_eq!(normalize_declination(270.0), -90.0);
        assert_eq!(normalize_declination(350.0), -10.0);
    }

    #[test]
    fn declination_encode_round_trip() {
        for dec in [-90.0, -45.5, -0.25, 0.0, 30.0, 90.0] {
            let shifted = if dec < 0.0 { dec + 360.0 } else { dec };
            let wire = from_nexstar_units(to_nexstar_units(shifted, true), true);
            assert!((normalize_declination(wire) - dec).abs() < 1e-6);
        }
    }

    #[test]
    fn angle_pair_format_is_zero_padded() {
        let frame = format_angle_pair(b'R', 0x12, 0x345, false);
        assert_eq!(frame, b"R0012,0345");

        let frame = format_angle_pair(b'r', 0xDEAD_BEEF, 0x1, true);
        assert_eq!(frame, b"rDEADBEEF,00000001");
    }

    #[test]
    fn angle_pair_parse() {
        assert_eq!(parse_angle_pair(b"12AB,FFFF#", false), Some((0x12AB, 0xFFFF)));
        assert_eq!(
            parse_angle_pair(b"DEADBEEF,00000001#", true),
            Some((0xDEAD_BEEF, 1))
        );
        // Missing sentinel and short bodies are framing errors.
        assert_eq!(parse_angle_pair(b"12AB,FFFF!", false), None);
        assert_eq!(parse_angle_pair(b"12AB,FFF#", false), None);
    }

    #[test]
    fn location_round_trip() {
        let payload = encode_location(37.5, -122.25);
        assert_eq!(payload[3], 0);
        assert_eq!(payload[7], 1);

        let (lat, lon) = decode_location(&payload);
        assert!((lat - 37.5).abs() < 1.0 / 3600.0);
        assert!((lon + 122.25).abs() < 1.0 / 3600.0);
    }

    #[test]
    fn rtc_round_trip_with_negative_offset() {
        let local = datetime!(2023-08-01 18:30:15 -05:00);
        let payload = encode_rtc(local);
        assert_eq!(payload[6], 251); // -5 as u8

        let decoded = decode_rtc(&payload).unwrap();
        assert_eq!(decoded, local);
        assert_eq!(decoded.offset().whole_hours(), -5);
    }

    #[test]
    fn rtc_rejects_bad_month() {
        let mut payload = encode_rtc(datetime!(2023-08-01 00:00 UTC));
        payload[3] = 13;
        assert_eq!(decode_rtc(&payload), None);
    }

    #[test]
    fn slew_variable_one_degree_per_second() {
        // 1°/s = 14400 quarter-arcseconds/s = 0x3840.
        assert_eq!(
            encode_slew_variable(0, 1.0),
            [b'P', 3, 16, 6, 0x38, 0x40, 0, 0]
        );
        assert_eq!(
            encode_slew_variable(1, -1.0),
            [b'P', 3, 17, 7, 0x38, 0x40, 0, 0]
        );
    }

    #[test]
    fn slew_variable_clamps_to_16_bits() {
        let frame = encode_slew_variable(0, 1e9);
        assert_eq!((frame[4], frame[5]), (0xFF, 0xFF));
    }

    #[test]
    fn slew_variable_round_trip() {
        for &(axis, rate) in &[(0, 0.5), (1, -2.0), (0, 8.0)] {
            let frame = encode_slew_variable(axis, rate);
            let (axis2, rate2) = decode_slew_variable(&frame).unwrap();
            assert_eq!(axis, axis2);
            assert!((rate - rate2).abs() < 1.0 / 14_400.0);
        }
    }
}
