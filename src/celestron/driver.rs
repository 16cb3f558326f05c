//! The telescope driver for NexStar hand controllers: every facade-facing
//! method is one or two codec transactions.

use super::protocol::{Channel, NexStar};
use super::wire::TrackingMode;
use crate::api::{PierSide, TelescopeDriver};
use crate::astro;
use crate::errors::{ASCOMError, ASCOMResult};
use time::OffsetDateTime;

/// Marketing name for a model code reported by the `m` command.
pub fn model_name(model: u8) -> &'static str {
    match model {
        1 => "GPS Series",
        3 => "i-Series",
        4 => "i-Series SE",
        5 => "CGE",
        6 => "Advanced GT",
        7 => "SLT",
        9 => "CPC",
        10 => "GT",
        11 => "4/5 SE",
        12 => "6/8 SE",
        13 => "GCE Pro",
        14 => "CGEM DX",
        15 => "LCM",
        16 => "Sky Prodigy",
        17 => "CPC Deluxe",
        18 => "GT 16",
        19 => "StarSeeker",
        20 => "Advanced VX",
        21 => "Cosmos",
        22 => "Evolution",
        23 => "CGX",
        24 => "CGXL",
        25 => "Astrofi",
        26 => "SkyWatcher",
        _ => "Unknown model",
    }
}

/// Celestron mount behind a [`Channel`]. The slew/sync target is cached
/// here and is unset until first written.
#[derive(Debug)]
pub struct CelestronTelescope<C> {
    nexstar: NexStar<C>,
    target_right_ascension: Option<f64>,
    target_declination: Option<f64>,
}

impl<C: Channel> CelestronTelescope<C> {
    pub fn new(channel: C) -> Self {
        Self {
            nexstar: NexStar::new(channel),
            target_right_ascension: None,
            target_declination: None,
        }
    }
}

impl<C: Channel> TelescopeDriver for CelestronTelescope<C> {
    fn model_name(&mut self) -> ASCOMResult<String> {
        let model = self.nexstar.model()?;
        Ok(model_name(model).to_owned())
    }

    fn altitude(&mut self) -> ASCOMResult<f64> {
        let (_, altitude) = self.nexstar.get_azm_alt(false)?;
        Ok(altitude)
    }

    fn azimuth(&mut self) -> ASCOMResult<f64> {
        let (azimuth, _) = self.nexstar.get_azm_alt(false)?;
        Ok(azimuth)
    }

    fn declination(&mut self) -> ASCOMResult<f64> {
        let (_, declination) = self.nexstar.get_ra_dec(false)?;
        Ok(declination)
    }

    fn right_ascension(&mut self) -> ASCOMResult<f64> {
        let (right_ascension, _) = self.nexstar.get_ra_dec(false)?;
        Ok(right_ascension)
    }

    fn at_home(&mut self) -> ASCOMResult<bool> {
        Ok(false)
    }

    fn at_park(&mut self) -> ASCOMResult<bool> {
        Ok(false)
    }

    fn is_pulse_guiding(&mut self) -> ASCOMResult<bool> {
        Ok(false)
    }

    fn slewing(&mut self) -> ASCOMResult<bool> {
        self.nexstar.goto_in_progress()
    }

    fn sidereal_time(&mut self) -> ASCOMResult<f64> {
        let (_, longitude) = self.nexstar.get_location()?;
        Ok(astro::lst(OffsetDateTime::now_utc(), longitude) / 15.0)
    }

    fn destination_side_of_pier(&mut self, _ra: f64, _dec: f64) -> ASCOMResult<PierSide> {
        Ok(PierSide::Unknown)
    }

    fn site_latitude(&mut self) -> ASCOMResult<f64> {
        let (latitude, _) = self.nexstar.get_location()?;
        Ok(latitude)
    }

    fn set_site_latitude(&mut self, latitude: f64) -> ASCOMResult {
        let (_, longitude) = self.nexstar.get_location()?;
        self.nexstar.set_location(latitude, longitude)
    }

    fn site_longitude(&mut self) -> ASCOMResult<f64> {
        let (_, longitude) = self.nexstar.get_location()?;
        Ok(longitude)
    }

    fn set_site_longitude(&mut self, longitude: f64) -> ASCOMResult {
        let (latitude, _) = self.nexstar.get_location()?;
        self.nexstar.set_location(latitude, longitude)
    }

    fn target_declination(&mut self) -> ASCOMResult<f64> {
        self.target_declination.ok_or(ASCOMError::VALUE_NOT_SET)
    }

    fn set_target_declination(&mut self, declination: f64) -> ASCOMResult {
        self.target_declination = Some(declination);
        Ok(())
    }

    fn target_right_ascension(&mut self) -> ASCOMResult<f64> {
        self.target_right_ascension.ok_or(ASCOMError::VALUE_NOT_SET)
    }

    fn set_target_right_ascension(&mut self, right_ascension: f64) -> ASCOMResult {
        self.target_right_ascension = Some(right_ascension);
        Ok(())
    }

    fn tracking(&mut self) -> ASCOMResult<bool> {
        let mode = self.nexstar.get_tracking_mode()?;
        Ok(mode != TrackingMode::Off)
    }

    fn set_tracking(&mut self, tracking: bool) -> ASCOMResult {
        let mode = if tracking {
            TrackingMode::EqNorth
        } else {
            TrackingMode::Off
        };
        self.nexstar.set_tracking_mode(mode)
    }

    fn utc_date(&mut self) -> ASCOMResult<OffsetDateTime> {
        self.nexstar.get_rtc()
    }

    fn set_utc_date(&mut self, utc: OffsetDateTime) -> ASCOMResult {
        // The bridge speaks UTC to the mount: offset zero, no DST flag.
        self.nexstar.set_rtc(utc)
    }

    fn abort_slew(&mut self) -> ASCOMResult {
        self.nexstar.cancel_goto()
    }

    fn move_axis(&mut self, axis: u8, rate: f64) -> ASCOMResult {
        self.nexstar.slew_variable(axis, rate)
    }

    fn slew_to_alt_az(&mut self, azimuth: f64, altitude: f64) -> ASCOMResult {
        self.nexstar.goto_azm_alt(azimuth, altitude, false)
    }

    fn slew_to_alt_az_async(&mut self, azimuth: f64, altitude: f64) -> ASCOMResult {
        self.nexstar.goto_azm_alt(azimuth, altitude, false)
    }

    fn slew_to_coordinates_async(
        &mut self,
        right_ascension: f64,
        declination: f64,
    ) -> ASCOMResult {
        self.target_right_ascension = Some(right_ascension);
        self.target_declination = Some(declination);
        self.nexstar.goto_ra_dec(right_ascension, declination, false)
    }

    fn slew_to_target_async(&mut self) -> ASCOMResult {
        let right_ascension = self.target_right_ascension.ok_or(ASCOMError::VALUE_NOT_SET)?;
        let declination = self.target_declination.ok_or(ASCOMError::VALUE_NOT_SET)?;
        self.nexstar.goto_ra_dec(right_ascension, declination, false)
    }

    fn sync_to_alt_az(&mut self, azimuth: f64, altitude: f64) -> ASCOMResult {
        self.nexstar.goto_azm_alt(azimuth, altitude, false)
    }

    fn sync_to_coordinates(&mut self, right_ascension: f64, declination: f64) -> ASCOMResult {
        self.target_right_ascension = Some(right_ascension);
        self.target_declination = Some(declination);
        self.nexstar.goto_ra_dec(right_ascension, declination, false)
    }

    fn sync_to_target(&mut self) -> ASCOMResult {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::celestron::Simulator;

    fn driver() -> CelestronTelescope<Simulator> {
        CelestronTelescope::new(Simulator::new())
    }

    #[test]
    fn model_name_table() {
        assert_eq!(model_name(20), "Advanced VX");
        assert_eq!(model_name(1), "GPS Series");
        assert_eq!(model_name(2), "Unknown model");
        assert_eq!(model_name(200), "Unknown model");
    }

    #[test]
    fn simulator_reports_advanced_vx() {
        assert_eq!(driver().model_name().unwrap(), "Advanced VX");
    }

    #[test]
    fn targets_are_cached_locally() {
        let mut driver = driver();

        assert_eq!(
            driver.target_right_ascension().unwrap_err(),
            ASCOMError::VALUE_NOT_SET
        );
        assert_eq!(
            driver.slew_to_target_async().unwrap_err(),
            ASCOMError::VALUE_NOT_SET
        );

        driver.set_target_right_ascension(6.0).unwrap();
        driver.set_target_declination(45.0).unwrap();
        assert_eq!(driver.target_right_ascension().unwrap(), 6.0);

        driver.slew_to_target_async().unwrap();
        assert!(driver.slewing().unwrap());
    }

    #[test]
    fn async_slew_caches_the_target() {
        let mut driver = driver();

        driver.slew_to_coordinates_async(6.0, 45.0).unwrap();
        assert_eq!(driver.target_right_ascension().unwrap(), 6.0);
        assert_eq!(driver.target_declination().unwrap(), 45.0);
        assert!(driver.slewing().unwrap());

        driver.abort_slew().unwrap();
        assert!(!driver.slewing().unwrap());
    }

    #[test]
    fn tracking_maps_to_modes() {
        let mut driver = driver();

        assert!(!driver.tracking().unwrap());
        driver.set_tracking(true).unwrap();
        assert!(driver.tracking().unwrap());
        driver.set_tracking(false).unwrap();
        assert!(!driver.tracking().unwrap());
    }

    #[test]
    fn site_setters_replace_one_component() {
        let mut driver = driver();

        driver.set_site_latitude(37.5).unwrap();
        driver.set_site_longitude(-122.25).unwrap();

        assert!((driver.site_latitude().unwrap() - 37.5).abs() < 1.0 / 3600.0);
        assert!((driver.site_longitude().unwrap() + 122.25).abs() < 1.0 / 3600.0);
    }

    #[test]
    fn move_axis_reports_motion() {
        let mut driver = driver();

        driver.move_axis(0, 1.0).unwrap();
        assert!(driver.slewing().unwrap());

        driver.move_axis(0, 0.0).unwrap();
        assert!(!driver.slewing().unwrap());
    }

    #[test]
    fn utc_round_trip() {
        use time::macros::datetime;

        let mut driver = driver();
        let written = datetime!(2023-08-01 12:00:00 UTC);

        driver.set_utc_date(written).unwrap();
        let read = driver.utc_date().unwrap();

        assert!((read - written).whole_seconds().abs() < 5);
    }
}
