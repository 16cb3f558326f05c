//! Just enough positional astronomy for a hand-controller bridge: Greenwich
//! and local sidereal time, and the equatorial ↔ horizontal transforms the
//! simulator needs. All angles are degrees unless noted otherwise.

use time::OffsetDateTime;

const J2000: f64 = 2_451_545.0;
const SECONDS_PER_DAY: f64 = 86_400.0;
/// Julian day of the Unix epoch.
const UNIX_EPOCH_JD: f64 = 2_440_587.5;

pub fn julian_day(t: OffsetDateTime) -> f64 {
    let seconds = t.unix_timestamp() as f64 + f64::from(t.nanosecond()) * 1e-9;
    UNIX_EPOCH_JD + seconds / SECONDS_PER_DAY
}

/// Greenwich mean sidereal time, degrees in [0, 360).
pub fn gmst(t: OffsetDateTime) -> f64 {
    let jd = julian_day(t);
    let d = jd - J2000;
    let t_cent = d / 36_525.0;
    let theta0 = 280.460_618_37
        + 360.985_647_366_29 * d
        + 0.000_387_933 * t_cent * t_cent
        - t_cent * t_cent * t_cent / 38_710_000.0;

    theta0.rem_euclid(360.0)
}

/// Local sidereal time at the given east-positive longitude, degrees.
pub fn lst(t: OffsetDateTime, longitude: f64) -> f64 {
    (gmst(t) + longitude).rem_euclid(360.0)
}

/// Equatorial (RA/Dec, degrees) to horizontal (Az/Alt, degrees) at a site.
pub fn equatorial_to_horizontal(
    t: OffsetDateTime,
    ra: f64,
    dec: f64,
    latitude: f64,
    longitude: f64,
) -> (f64, f64) {
    let ha = (lst(t, longitude) - ra).rem_euclid(360.0);

    let (ha, dec_r, lat_r) = (ha.to_radians(), dec.to_radians(), latitude.to_radians());

    let sin_alt = dec_r.sin() * lat_r.sin() + dec_r.cos() * lat_r.cos() * ha.cos();
    let alt = sin_alt.asin();

    let cos_az = (dec_r.sin() - sin_alt * lat_r.sin()) / (alt.cos() * lat_r.cos());
    let mut az = cos_az.clamp(-1.0, 1.0).acos();

    if ha.sin() > 0.0 {
        az = std::f64::consts::TAU - az;
    }

    (az.to_degrees(), alt.to_degrees())
}

/// Horizontal (Az/Alt, degrees) to equatorial (RA/Dec, degrees) at a site.
pub fn horizontal_to_equatorial(
    t: OffsetDateTime,
    azimuth: f64,
    altitude: f64,
    latitude: f64,
    longitude: f64,
) -> (f64, f64) {
    let (az_r, alt_r, lat_r) = (
        azimuth.to_radians(),
        altitude.to_radians(),
        latitude.to_radians(),
    );

    let sin_dec = alt_r.sin() * lat_r.sin() + alt_r.cos() * lat_r.cos() * az_r.cos();
    let dec = sin_dec.asin();

    let cos_ha = (alt_r.sin() - sin_dec * lat_r.sin()) / (dec.cos() * lat_r.cos());
    let mut ha = cos_ha.clamp(-1.0, 1.0).acos().to_degrees();

    if az_r.sin() > 0.0 {
        ha = 360.0 - ha;
    }

    let ra = (lst(t, longitude) - ha).rem_euclid(360.0);

    (ra, dec.to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn gmst_at_j2000_epoch() {
        // 2000-01-01T12:00:00 UTC is the J2000 reference; GMST is ~280.46°.
        let t = datetime!(2000-01-01 12:00 UTC);
        assert!((gmst(t) - 280.460_618_37).abs() < 1e-3);
    }

    #[test]
    fn lst_wraps_longitude() {
        let t = datetime!(2023-06-01 03:30 UTC);
        let east = lst(t, 170.0);
        let west = lst(t, -170.0);
        assert!((0.0..360.0).contains(&east));
        assert!((0.0..360.0).contains(&west));
        assert!(((east - west).rem_euclid(360.0) - 340.0).abs() < 1e-6);
    }

    #[test]
    fn horizontal_round_trip() {
        let t = datetime!(2023-08-15 06:00 UTC);
        let (lat, lon) = (37.5, -122.3);

        for &(ra, dec) in &[(15.0, 10.0), (120.0, 45.0), (300.0, -20.0)] {
            let (az, alt) = equatorial_to_horizontal(t, ra, dec, lat, lon);
            let (ra2, dec2) = horizontal_to_equatorial(t, az, alt, lat, lon);
            assert!((ra - ra2).rem_euclid(360.0).min((ra2 - ra).rem_euclid(360.0)) < 1e-6);
            assert!((dec - dec2).abs() < 1e-6);
        }
    }

    #[test]
    fn zenith_points_at_latitude_declination() {
        let t = datetime!(2023-08-15 06:00 UTC);
        let (lat, lon) = (40.0, 0.0);
        let ra = lst(t, lon);

        let (_, alt) = equatorial_to_horizontal(t, ra, lat, lat, lon);
        assert!((alt - 90.0).abs() < 1e-3);
    }
}
