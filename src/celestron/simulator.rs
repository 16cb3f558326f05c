//! In-memory implementation of the hand-controller wire protocol, driven
//! by a small kinematic state machine. Used by tests and by `--conform`.

use super::protocol::Channel;
use super::wire::{self, TrackingMode};
use crate::astro;
use std::time::Instant;
use time::{Duration, OffsetDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Slewing,
    Moving,
}

/// Simulated mount. Coordinates are kept in degrees; right ascension uses
/// the wire convention (hours × 15).
#[derive(Debug)]
pub struct Simulator {
    right_ascension: f64,
    declination: f64,
    target_right_ascension: f64,
    target_declination: f64,
    latitude: f64,
    longitude: f64,
    tracking_mode: TrackingMode,
    slew_rate: [f64; 2],
    state: State,
    last_step: Instant,
    clock: OffsetDateTime,
    clock_set_at: Instant,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulator {
    pub fn new() -> Self {
        let now = Instant::now();

        Self {
            right_ascension: 0.0,
            declination: 0.0,
            target_right_ascension: 0.0,
            target_declination: 0.0,
            latitude: 0.0,
            longitude: 0.0,
            tracking_mode: TrackingMode::Off,
            slew_rate: [0.0, 0.0],
            state: State::Idle,
            last_step: now,
            clock: OffsetDateTime::now_utc(),
            clock_set_at: now,
        }
    }

    /// Pretend `seconds` of wall clock have passed before the next step.
    #[cfg(test)]
    pub(crate) fn rewind(&mut self, seconds: f64) {
        let delta = std::time::Duration::from_secs_f64(seconds);
        self.last_step = self.last_step.checked_sub(delta).unwrap_or(self.last_step);
    }

    /// One slew step for a single axis: snap inside 0.1°, otherwise close
    /// in at a distance-dependent fraction, at most 9°/s.
    fn step_axis(current: &mut f64, target: f64, delta_time: f64) {
        let diff = target - *current;
        let dist = diff.abs();

        if dist <= 0.1 {
            *current = target;
            return;
        }

        let factor = if dist <= 5.0 {
            0.25
        } else if dist <= 10.0 {
            0.5
        } else if dist <= 20.0 {
            0.75
        } else {
            1.0
        };

        *current += (diff * factor).clamp(-9.0, 9.0) * delta_time;
    }

    fn step(&mut self) {
        let now = Instant::now();
        let delta_time = now.duration_since(self.last_step).as_secs_f64();
        self.last_step = now;

        match self.state {
            State::Idle => {}

            State::Slewing => {
                Self::step_axis(
                    &mut self.right_ascension,
                    self.target_right_ascension,
                    delta_time,
                );
                Self::step_axis(&mut self.declination, self.target_declination, delta_time);

                if self.right_ascension == self.target_right_ascension
                    && self.declination == self.target_declination
                {
                    self.state = State::Idle;
                }
            }

            State::Moving => {
                self.right_ascension += self.slew_rate[0] * delta_time;
                self.declination += self.slew_rate[1] * delta_time;
            }
        }
    }

    /// The drifting controller clock: the stored time plus the wall-clock
    /// delta since the last `H` write.
    fn clock_now(&self) -> OffsetDateTime {
        let elapsed = self.clock_set_at.elapsed();
        self.clock + Duration::seconds_f64(elapsed.as_secs_f64())
    }

    fn angle_pair_response(first: f64, second: f64, precise: bool) -> Vec<u8> {
        let first = wire::to_nexstar_units(first, precise);
        let second = wire::to_nexstar_units(second, precise);

        if precise {
            format!("{first:08X},{second:08X}#").into_bytes()
        } else {
            format!("{first:04X},{second:04X}#").into_bytes()
        }
    }

    fn parse_angle_pair_request(request: &[u8], precise: bool) -> Option<(f64, f64)> {
        let width = if precise { 8 } else { 4 };
        let body = request.get(1..2 * width + 2)?;

        if body[width] != b',' {
            return None;
        }

        let first = std::str::from_utf8(&body[..width]).ok()?;
        let second = std::str::from_utf8(&body[width + 1..]).ok()?;

        Some((
            wire::from_nexstar_units(u32::from_str_radix(first, 16).ok()?, precise),
            wire::from_nexstar_units(u32::from_str_radix(second, 16).ok()?, precise),
        ))
    }

    fn handle(&mut self, request: &[u8]) -> Vec<u8> {
        match request[0] {
            b'K' if request.len() >= 2 => vec![request[1], b'#'],

            b'V' => vec![1, 2, b'#'],

            // Advanced VX
            b'm' => vec![20, b'#'],

            b'E' | b'e' => Self::angle_pair_response(
                self.right_ascension,
                self.declination,
                request[0] == b'e',
            ),

            b'Z' | b'z' => {
                let (azimuth, altitude) = astro::equatorial_to_horizontal(
                    OffsetDateTime::now_utc(),
                    self.right_ascension,
                    self.declination,
                    self.latitude,
                    self.longitude,
                );
                Self::angle_pair_response(azimuth, altitude, request[0] == b'z')
            }

            b'R' | b'r' => {
                match Self::parse_angle_pair_request(request, request[0] == b'r') {
                    Some((ra, dec)) => {
                        self.target_right_ascension = ra;
                        self.target_declination = dec;
                        self.state = State::Slewing;
                        vec![b'#']
                    }
                    None => Vec::new(),
                }
            }

            b'B' | b'b' => {
                match Self::parse_angle_pair_request(request, request[0] == b'b') {
                    Some((azimuth, altitude)) => {
                        let (ra, dec) = astro::horizontal_to_equatorial(
                            OffsetDateTime::now_utc(),
                            azimuth,
                            wire::normalize_declination(altitude),
                            self.latitude,
                            self.longitude,
                        );
                        self.right_ascension = ra;
                        self.declination = dec;
                        vec![b'#']
                    }
                    None => Vec::new(),
                }
            }

            b'w' => {
                let mut response = wire::encode_location(self.latitude, self.longitude).to_vec();
                response.push(b'#');
                response
            }

            b'W' => match request.get(1..9) {
                Some(payload) => {
                    let mut bytes = [0_u8; 8];
                    bytes.copy_from_slice(payload);
                    (self.latitude, self.longitude) = wire::decode_location(&bytes);
                    vec![b'#']
                }
                None => Vec::new(),
            },

            b'h' => {
                let mut response = wire::encode_rtc(self.clock_now()).to_vec();
                response.push(b'#');
                response
            }

            b'H' => {
                let decoded = request.get(1..9).and_then(|payload| {
                    let mut bytes = [0_u8; 8];
                    bytes.copy_from_slice(payload);
                    wire::decode_rtc(&bytes)
                });

                match decoded {
                    Some(clock) => {
                        self.clock = clock;
                        self.clock_set_at = Instant::now();
                        vec![b'#']
                    }
                    None => Vec::new(),
                }
            }

            b't' => vec![self.tracking_mode as u8, b'#'],

            b'T' => match request.get(1).copied().and_then(TrackingMode::from_wire) {
                Some(mode) => {
                    self.tracking_mode = mode;
                    vec![b'#']
                }
                None => Vec::new(),
            },

            b'J' => vec![1, b'#'],

            b'L' => {
                let in_progress = self.state != State::Idle;
                vec![if in_progress { b'1' } else { b'0' }, b'#']
            }

            b'M' => {
                self.state = State::Idle;
                self.target_right_ascension = self.right_ascension;
                self.target_declination = self.declination;
                vec![b'#']
            }

            b'P' => {
                let frame: Option<[u8; 8]> = request.try_into().ok();

                match frame.as_ref().and_then(wire::decode_slew_variable) {
                    Some((axis, rate)) => {
                        self.slew_rate[usize::from(axis)] = rate;
                        self.state = if rate != 0.0 {
                            State::Moving
                        } else {
                            State::Idle
                        };
                        vec![b'#']
                    }
                    None => Vec::new(),
                }
            }

            _ => Vec::new(),
        }
    }
}

impl Channel for Simulator {
    fn send_command(&mut self, request: &[u8], response: &mut [u8]) -> std::io::Result<usize> {
        if request.is_empty() {
            return Ok(0);
        }

        self.step();

        let produced = self.handle(request);
        let count = produced.len().min(response.len());
        response[..count].copy_from_slice(&produced[..count]);

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::celestron::protocol::NexStar;

    #[test]
    fn reports_static_identity() {
        let mut sim = Simulator::new();
        assert_eq!(NexStar::new(&mut sim).firmware_version().unwrap(), (1, 2));
        assert_eq!(NexStar::new(&mut sim).model().unwrap(), 20);
        assert!(NexStar::new(&mut sim).alignment_complete().unwrap());
    }

    #[test]
    fn slew_converges_on_the_target() {
        let mut sim = Simulator::new();

        // 6h = 90°, Dec 45°.
        NexStar::new(&mut sim).goto_ra_dec(6.0, 45.0, false).unwrap();
        assert!(NexStar::new(&mut sim).goto_in_progress().unwrap());

        for _ in 0..600 {
            sim.rewind(0.1);
            if !NexStar::new(&mut sim).goto_in_progress().unwrap() {
                break;
            }
        }

        assert!(!NexStar::new(&mut sim).goto_in_progress().unwrap());

        let (ra, dec) = NexStar::new(&mut sim).get_ra_dec(false).unwrap();
        assert!((ra - 6.0).abs() < 0.02, "ra = {ra}");
        assert!((dec - 45.0).abs() < 0.2, "dec = {dec}");
    }

    #[test]
    fn cancel_stops_the_slew() {
        let mut sim = Simulator::new();

        NexStar::new(&mut sim).goto_ra_dec(12.0, 0.0, false).unwrap();
        assert!(NexStar::new(&mut sim).goto_in_progress().unwrap());

        NexStar::new(&mut sim).cancel_goto().unwrap();
        assert!(!NexStar::new(&mut sim).goto_in_progress().unwrap());
    }

    #[test]
    fn variable_slew_moves_the_axis() {
        let mut sim = Simulator::new();

        NexStar::new(&mut sim).slew_variable(0, 2.0).unwrap();
        assert!(NexStar::new(&mut sim).goto_in_progress().unwrap());

        sim.rewind(3.0);
        let (ra, _) = NexStar::new(&mut sim).get_ra_dec(false).unwrap();
        // ~6° of motion = 0.4h of RA.
        assert!(ra > 0.3, "ra = {ra}");

        NexStar::new(&mut sim).slew_variable(0, 0.0).unwrap();
        assert!(!NexStar::new(&mut sim).goto_in_progress().unwrap());
    }

    #[test]
    fn tracking_mode_round_trip() {
        let mut sim = Simulator::new();

        assert_eq!(
            NexStar::new(&mut sim).get_tracking_mode().unwrap(),
            TrackingMode::Off
        );

        NexStar::new(&mut sim)
            .set_tracking_mode(TrackingMode::EqNorth)
            .unwrap();
        assert_eq!(
            NexStar::new(&mut sim).get_tracking_mode().unwrap(),
            TrackingMode::EqNorth
        );
    }

    #[test]
    fn location_round_trip() {
        let mut sim = Simulator::new();

        NexStar::new(&mut sim).set_location(37.5, -122.25).unwrap();
        let (lat, lon) = NexStar::new(&mut sim).get_location().unwrap();

        assert!((lat - 37.5).abs() < 1.0 / 3600.0);
        assert!((lon + 122.25).abs() < 1.0 / 3600.0);
    }

    #[test]
    fn clock_round_trip_keeps_the_offset() {
        use time::macros::datetime;

        let mut sim = Simulator::new();
        let written = datetime!(2023-08-01 20:15:00 -04:00);

        NexStar::new(&mut sim).set_rtc(written).unwrap();
        let read = NexStar::new(&mut sim).get_rtc().unwrap();

        assert_eq!(read.offset().whole_hours(), -4);
        // The clock drifts with wall time, so allow a small delta.
        assert!((read - written).whole_seconds().abs() < 5);
    }

    #[test]
    fn negative_declination_round_trip() {
        let mut sim = Simulator::new();

        NexStar::new(&mut sim).goto_ra_dec(0.0, -10.0, true).unwrap();
        for _ in 0..600 {
            sim.rewind(0.1);
            if !NexStar::new(&mut sim).goto_in_progress().unwrap() {
                break;
            }
        }

        let (_, dec) = NexStar::new(&mut sim).get_ra_dec(true).unwrap();
        assert!((dec + 10.0).abs() < 0.2, "dec = {dec}");
    }

    #[test]
    fn unknown_opcode_is_a_framing_error() {
        let mut sim = Simulator::new();
        let mut out = [0_u8; 4];
        assert_eq!(sim.send_command(b"Q", &mut out).unwrap(), 0);
    }
}
