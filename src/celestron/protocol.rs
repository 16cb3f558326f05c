//! The NexStar command set, expressed as typed request/response exchanges
//! over a half-duplex [`Channel`].
//!
//! Response lengths are fixed per command and known to the caller; a short
//! read or a missing `#` sentinel is a framing error and surfaces as
//! `invalid_operation`.

use super::wire::{self, TrackingMode, SENTINEL};
use crate::errors::{ASCOMError, ASCOMResult};
use time::OffsetDateTime;

/// A blocking request/response transport with one in-flight transaction.
///
/// Implementations write the full request, then read into `response` until
/// it is full or the line goes quiet, returning the byte count actually
/// read. Transport failures surface as `std::io::Error`.
pub trait Channel: Send {
    fn send_command(&mut self, request: &[u8], response: &mut [u8]) -> std::io::Result<usize>;
}

impl<C: Channel + ?Sized> Channel for &mut C {
    fn send_command(&mut self, request: &[u8], response: &mut [u8]) -> std::io::Result<usize> {
        (**self).send_command(request, response)
    }
}

/// Typed front-end for the hand-controller command set.
#[derive(Debug)]
pub struct NexStar<C> {
    channel: C,
}

impl<C: Channel> NexStar<C> {
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    /// One framed exchange: write `request`, read exactly `response_len`
    /// bytes ending in the sentinel.
    fn transact(&mut self, request: &[u8], response_len: usize) -> ASCOMResult<Vec<u8>> {
        let mut response = vec![0_u8; response_len];

        let read = self
            .channel
            .send_command(request, &mut response)
            .map_err(|err| {
                tracing::debug!(%err, "Serial exchange failed");
                ASCOMError::INVALID_OPERATION
            })?;

        if read != response_len || response[response_len - 1] != SENTINEL {
            tracing::debug!(
                expected = response_len,
                got = read,
                "Framing error in NexStar response"
            );
            return Err(ASCOMError::INVALID_OPERATION);
        }

        Ok(response)
    }

    /// `Kc` — the controller echoes the byte back.
    pub fn echo(&mut self, byte: u8) -> ASCOMResult<()> {
        let response = self.transact(&[b'K', byte], 2)?;

        if response[0] == byte {
            Ok(())
        } else {
            Err(ASCOMError::INVALID_OPERATION)
        }
    }

    /// `V` — firmware (major, minor).
    pub fn firmware_version(&mut self) -> ASCOMResult<(u8, u8)> {
        let response = self.transact(&[b'V'], 3)?;
        Ok((response[0], response[1]))
    }

    /// `m` — model code; see [`super::driver::model_name`].
    pub fn model(&mut self) -> ASCOMResult<u8> {
        let response = self.transact(&[b'm'], 2)?;
        Ok(response[0])
    }

    /// `E`/`e` — current (RA in hours, Dec in degrees).
    pub fn get_ra_dec(&mut self, precise: bool) -> ASCOMResult<(f64, f64)> {
        let opcode = if precise { b'e' } else { b'E' };
        let response = self.transact(&[opcode], wire::angle_pair_len(precise))?;

        let (ra_units, dec_units) =
            wire::parse_angle_pair(&response, precise).ok_or(ASCOMError::INVALID_OPERATION)?;

        // RA travels as degrees (hours * 15).
        let ra = wire::from_nexstar_units(ra_units, precise) / 15.0;
        let dec = wire::normalize_declination(wire::from_nexstar_units(dec_units, precise));

        Ok((ra, dec))
    }

    /// `R`/`r` — slew to (RA in hours, Dec in degrees).
    pub fn goto_ra_dec(&mut self, ra: f64, dec: f64, precise: bool) -> ASCOMResult<()> {
        let opcode = if precise { b'r' } else { b'R' };
        let dec = if dec < 0.0 { dec + 360.0 } else { dec };

        let frame = wire::format_angle_pair(
            opcode,
            wire::to_nexstar_units(ra * 15.0, precise),
            wire::to_nexstar_units(dec, precise),
            precise,
        );

        self.transact(&frame, 1).map(|_| ())
    }

    /// `Z`/`z` — current (azimuth, altitude) in degrees.
    pub fn get_azm_alt(&mut self, precise: bool) -> ASCOMResult<(f64, f64)> {
        let opcode = if precise { b'z' } else { b'Z' };
        let response = self.transact(&[opcode], wire::angle_pair_len(precise))?;

        let (azm_units, alt_units) =
            wire::parse_angle_pair(&response, precise).ok_or(ASCOMError::INVALID_OPERATION)?;

        let azm = wire::from_nexstar_units(azm_units, precise);
        let alt = wire::normalize_declination(wire::from_nexstar_units(alt_units, precise));

        Ok((azm, alt))
    }

    /// `B`/`b` — slew to (azimuth, altitude) in degrees.
    pub fn goto_azm_alt(&mut self, azimuth: f64, altitude: f64, precise: bool) -> ASCOMResult<()> {
        let opcode = if precise { b'b' } else { b'B' };
        let altitude = if altitude < 0.0 {
            altitude + 360.0
        } else {
            altitude
        };

        let frame = wire::format_angle_pair(
            opcode,
            wire::to_nexstar_units(azimuth, precise),
            wire::to_nexstar_units(altitude, precise),
            precise,
        );

        self.transact(&frame, 1).map(|_| ())
    }

    /// `w` — site (latitude, longitude) in degrees.
    pub fn get_location(&mut self) -> ASCOMResult<(f64, f64)> {
        let response = self.transact(&[b'w'], 9)?;

        let mut payload = [0_u8; 8];
        payload.copy_from_slice(&response[..8]);

        Ok(wire::decode_location(&payload))
    }

    /// `W` — set the site location.
    pub fn set_location(&mut self, latitude: f64, longitude: f64) -> ASCOMResult<()> {
        let mut frame = [0_u8; 9];
        frame[0] = b'W';
        frame[1..].copy_from_slice(&wire::encode_location(latitude, longitude));

        self.transact(&frame, 1).map(|_| ())
    }

    /// `h` — the controller's clock, offset-aware.
    pub fn get_rtc(&mut self) -> ASCOMResult<OffsetDateTime> {
        let response = self.transact(&[b'h'], 9)?;

        let mut payload = [0_u8; 8];
        payload.copy_from_slice(&response[..8]);

        wire::decode_rtc(&payload).ok_or(ASCOMError::INVALID_OPERATION)
    }

    /// `H` — set the controller's clock to the given local time.
    pub fn set_rtc(&mut self, local: OffsetDateTime) -> ASCOMResult<()> {
        let mut frame = [0_u8; 9];
        frame[0] = b'H';
        frame[1..].copy_from_slice(&wire::encode_rtc(local));

        self.transact(&frame, 1).map(|_| ())
    }

    /// `t` — current tracking mode.
    pub fn get_tracking_mode(&mut self) -> ASCOMResult<TrackingMode> {
        let response = self.transact(&[b't'], 2)?;
        TrackingMode::from_wire(response[0]).ok_or(ASCOMError::INVALID_OPERATION)
    }

    /// `T` — set the tracking mode.
    pub fn set_tracking_mode(&mut self, mode: TrackingMode) -> ASCOMResult<()> {
        self.transact(&[b'T', mode as u8], 1).map(|_| ())
    }

    /// `J` — alignment complete flag.
    pub fn alignment_complete(&mut self) -> ASCOMResult<bool> {
        let response = self.transact(&[b'J'], 2)?;
        Ok(response[0] != 0)
    }

    /// `L` — goto in progress, reported as ASCII `'0'`/`'1'`.
    pub fn goto_in_progress(&mut self) -> ASCOMResult<bool> {
        let response = self.transact(&[b'L'], 2)?;
        Ok(response[0] == b'1')
    }

    /// `M` — cancel the goto in progress.
    pub fn cancel_goto(&mut self) -> ASCOMResult<()> {
        self.transact(&[b'M'], 1).map(|_| ())
    }

    /// Variable-rate motor slew via the `P` pass-through envelope.
    ///
    /// Axis 0 drives the azimuth/RA motor, axis 1 the altitude/Dec motor;
    /// `rate` is in degrees per second, sign selects direction.
    pub fn slew_variable(&mut self, axis: u8, rate: f64) -> ASCOMResult<()> {
        let frame = wire::encode_slew_variable(axis, rate);
        self.transact(&frame, 1).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays a canned response, optionally truncating it.
    struct Scripted {
        response: Vec<u8>,
        truncate: usize,
        last_request: Vec<u8>,
    }

    impl Scripted {
        fn new(response: &[u8]) -> Self {
            Self {
                response: response.to_vec(),
                truncate: 0,
                last_request: Vec::new(),
            }
        }
    }

    impl Channel for Scripted {
        fn send_command(
            &mut self,
            request: &[u8],
            response: &mut [u8],
        ) -> std::io::Result<usize> {
            self.last_request = request.to_vec();

            let available = self.response.len().saturating_sub(self.truncate);
            let count = available.min(response.len());
            response[..count].copy_from_slice(&self.response[..count]);

            Ok(count)
        }
    }

    #[test]
    fn version_parses_major_minor() {
        let mut nexstar = NexStar::new(Scripted::new(&[4, 21, b'#']));
        assert_eq!(nexstar.firmware_version().unwrap(), (4, 21));
    }

    #[test]
    fn short_read_is_a_framing_error() {
        let mut channel = Scripted::new(&[4, 21, b'#']);
        channel.truncate = 1;

        let mut nexstar = NexStar::new(channel);
        assert_eq!(
            nexstar.firmware_version().unwrap_err(),
            ASCOMError::INVALID_OPERATION
        );
    }

    #[test]
    fn missing_sentinel_is_a_framing_error() {
        let mut nexstar = NexStar::new(Scripted::new(&[4, 21, b'!']));
        assert_eq!(
            nexstar.firmware_version().unwrap_err(),
            ASCOMError::INVALID_OPERATION
        );
    }

    #[test]
    fn echo_checks_the_returned_byte() {
        let mut nexstar = NexStar::new(Scripted::new(&[b'x', b'#']));
        assert!(nexstar.echo(b'x').is_ok());

        let mut nexstar = NexStar::new(Scripted::new(&[b'y', b'#']));
        assert_eq!(nexstar.echo(b'x').unwrap_err(), ASCOMError::INVALID_OPERATION);
    }

    #[test]
    fn ra_comes_back_in_hours() {
        // 90° = 6h; coarse units for 90° are 0x4000.
        let mut nexstar = NexStar::new(Scripted::new(b"4000,0000#"));
        let (ra, dec) = nexstar.get_ra_dec(false).unwrap();
        assert!((ra - 6.0).abs() < 1e-3);
        assert_eq!(dec, 0.0);
    }

    #[test]
    fn goto_encodes_negative_declination_shifted() {
        let mut nexstar = NexStar::new(Scripted::new(&[b'#']));
        nexstar.goto_ra_dec(0.0, -10.0, false).unwrap();

        // -10° is sent as 350°: 350/360 * 0x10000 = 0xF8E3.
        assert_eq!(nexstar.channel.last_request, b"R0000,F8E3");
    }

    #[test]
    fn io_error_becomes_invalid_operation() {
        struct Broken;

        impl Channel for Broken {
            fn send_command(&mut self, _: &[u8], _: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::from(std::io::ErrorKind::TimedOut))
            }
        }

        let mut nexstar = NexStar::new(Broken);
        assert_eq!(
            nexstar.cancel_goto().unwrap_err(),
            ASCOMError::INVALID_OPERATION
        );
    }
}
