//! Table-driven dispatch for the telescope device type: two ordered maps
//! from operation name to handler, populated once at construction and
//! immutable afterwards.

use super::error::Error;
use super::params::{ActionParams, BoolParam, OpaqueParams};
use crate::api::{ConfiguredDevice, Telescope};
use crate::errors::{ASCOMError, ASCOMResult};
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};

type Getter = fn(&mut Telescope, &mut OpaqueParams) -> ASCOMResult<Value>;
type Setter = fn(&mut Telescope, &mut OpaqueParams) -> ASCOMResult<()>;

fn to_json<T: serde::Serialize>(value: T) -> ASCOMResult<Value> {
    serde_json::to_value(value)
        .map_err(|err| ASCOMError::new(crate::errors::ASCOMErrorCode::INVALID_VALUE, err.to_string()))
}

/// The `/api/v1/telescope` resource: devices plus the two handler tables.
pub struct TelescopeResource {
    devices: Vec<Arc<Mutex<Telescope>>>,
    getters: IndexMap<&'static str, Getter>,
    setters: IndexMap<&'static str, Setter>,
}

impl std::fmt::Debug for TelescopeResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelescopeResource")
            .field("devices", &self.devices.len())
            .field("getters", &self.getters.len())
            .field("setters", &self.setters.len())
            .finish()
    }
}

impl Default for TelescopeResource {
    fn default() -> Self {
        Self::new()
    }
}

impl TelescopeResource {
    pub fn new() -> Self {
        let mut getters: IndexMap<&'static str, Getter> = IndexMap::new();
        let mut setters: IndexMap<&'static str, Setter> = IndexMap::new();

        // Universal device operations.
        getters.insert("connected", |tel, _| to_json(tel.connected()));
        setters.insert("connected", |tel, params| {
            let connected: BoolParam = params.extract("Connected")?;
            tel.set_connected(connected.into())
        });
        getters.insert("description", |tel, _| to_json(&tel.info().description));
        getters.insert("driverinfo", |tel, _| to_json(&tel.info().driver_info));
        getters.insert("driverversion", |tel, _| to_json(&tel.info().driver_version));
        getters.insert("interfaceversion", |tel, _| {
            to_json(tel.info().interface_version)
        });
        getters.insert("name", |tel, _| to_json(&tel.info().name));
        getters.insert("supportedactions", |tel, _| to_json(tel.supported_actions()));
        setters.insert("action", |_, _| Ok(()));
        setters.insert("commandblind", |_, _| Ok(()));
        setters.insert("commandbool", |_, _| Ok(()));
        setters.insert("commandstring", |_, _| Ok(()));

        // Read-only telescope properties.
        getters.insert("altitude", |tel, _| to_json(tel.altitude()?));
        getters.insert("azimuth", |tel, _| to_json(tel.azimuth()?));
        getters.insert("declination", |tel, _| to_json(tel.declination()?));
        getters.insert("rightascension", |tel, _| to_json(tel.right_ascension()?));
        getters.insert("athome", |tel, _| to_json(tel.at_home()?));
        getters.insert("atpark", |tel, _| to_json(tel.at_park()?));
        getters.insert("ispulseguiding", |tel, _| to_json(tel.is_pulse_guiding()?));
        getters.insert("slewing", |tel, _| to_json(tel.slewing()?));
        getters.insert("siderealtime", |tel, _| to_json(tel.sidereal_time()?));
        getters.insert("destinationsideofpier", |tel, params| {
            let right_ascension = params.extract("RightAscension")?;
            let declination = params.extract("Declination")?;
            to_json(tel.destination_side_of_pier(right_ascension, declination)?)
        });

        // Static metadata.
        getters.insert("alignmentmode", |tel, _| to_json(tel.info().alignment_mode));
        getters.insert("aperturearea", |tel, _| to_json(tel.info().aperture_area));
        getters.insert("aperturediameter", |tel, _| {
            to_json(tel.info().aperture_diameter)
        });
        getters.insert("focallength", |tel, _| to_json(tel.info().focal_length));
        getters.insert("equatorialsystem", |tel, _| {
            to_json(tel.info().equatorial_system)
        });
        getters.insert("axisrates", |tel, params| {
            let axis = params.extract("Axis")?;
            to_json(tel.axis_rates(axis)?)
        });
        getters.insert("trackingrates", |tel, _| to_json(&tel.info().tracking_rates));

        // Capability flags.
        getters.insert("canfindhome", |tel, _| to_json(tel.can_find_home()));
        getters.insert("canmoveaxis", |tel, params| {
            let axis = params.extract("Axis")?;
            to_json(tel.can_move_axis(axis)?)
        });
        getters.insert("canpark", |tel, _| to_json(tel.can_park()));
        getters.insert("canpulseguide", |tel, _| to_json(tel.can_pulse_guide()));
        getters.insert("cansetdeclinationrate", |tel, _| {
            to_json(tel.can_set_declination_rate())
        });
        getters.insert("cansetguiderates", |tel, _| to_json(tel.can_set_guide_rates()));
        getters.insert("cansetpark", |tel, _| to_json(tel.can_set_park()));
        getters.insert("cansetpierside", |tel, _| to_json(tel.can_set_pier_side()));
        getters.insert("cansetrightascensionrate", |tel, _| {
            to_json(tel.can_set_right_ascension_rate())
        });
        getters.insert("cansettracking", |tel, _| to_json(tel.can_set_tracking()));
        getters.insert("canslew", |tel, _| to_json(tel.can_slew()));
        getters.insert("canslewaltaz", |tel, _| to_json(tel.can_slew_alt_az()));
        getters.insert("canslewaltazasync", |tel, _| {
            to_json(tel.can_slew_alt_az_async())
        });
        getters.insert("canslewasync", |tel, _| to_json(tel.can_slew_async()));
        getters.insert("cansync", |tel, _| to_json(tel.can_sync()));
        getters.insert("cansyncaltaz", |tel, _| to_json(tel.can_sync_alt_az()));
        getters.insert("canunpark", |tel, _| to_json(tel.can_unpark()));

        // Read-write properties.
        getters.insert("declinationrate", |tel, _| to_json(tel.declination_rate()?));
        setters.insert("declinationrate", |tel, params| {
            let rate = params.extract("DeclinationRate")?;
            tel.set_declination_rate(rate)
        });
        getters.insert("rightascensionrate", |tel, _| {
            to_json(tel.right_ascension_rate()?)
        });
        setters.insert("rightascensionrate", |tel, params| {
            let rate = params.extract("RightAscensionRate")?;
            tel.set_right_ascension_rate(rate)
        });
        getters.insert("doesrefraction", |tel, _| to_json(tel.does_refraction()?));
        setters.insert("doesrefraction", |tel, params| {
            let does_refraction: BoolParam = params.extract("DoesRefraction")?;
            tel.set_does_refraction(does_refraction.into())
        });
        getters.insert("guideratedeclination", |tel, _| {
            to_json(tel.guide_rate_declination()?)
        });
        setters.insert("guideratedeclination", |tel, params| {
            let rate = params.extract("GuideRateDeclination")?;
            tel.set_guide_rate_declination(rate)
        });
        getters.insert("guideraterightascension", |tel, _| {
            to_json(tel.guide_rate_right_ascension()?)
        });
        setters.insert("guideraterightascension", |tel, params| {
            let rate = params.extract("GuideRateRightAscension")?;
            tel.set_guide_rate_right_ascension(rate)
        });
        getters.insert("sideofpier", |tel, _| to_json(tel.side_of_pier()?));
        setters.insert("sideofpier", |tel, params| {
            let side = params.extract("SideOfPier")?;
            tel.set_side_of_pier(side)
        });
        getters.insert("siteelevation", |tel, _| to_json(tel.site_elevation()?));
        setters.insert("siteelevation", |tel, params| {
            let elevation = params.extract("SiteElevation")?;
            tel.set_site_elevation(elevation)
        });
        getters.insert("sitelatitude", |tel, _| to_json(tel.site_latitude()?));
        setters.insert("sitelatitude", |tel, params| {
            let latitude = params.extract("SiteLatitude")?;
            tel.set_site_latitude(latitude)
        });
        getters.insert("sitelongitude", |tel, _| to_json(tel.site_longitude()?));
        setters.insert("sitelongitude", |tel, params| {
            let longitude = params.extract("SiteLongitude")?;
            tel.set_site_longitude(longitude)
        });
        getters.insert("slewsettletime", |tel, _| to_json(tel.slew_settle_time()?));
        setters.insert("slewsettletime", |tel, params| {
            let seconds = params.extract("SlewSettleTime")?;
            tel.set_slew_settle_time(seconds)
        });
        getters.insert("targetdeclination", |tel, _| {
            to_json(tel.target_declination()?)
        });
        setters.insert("targetdeclination", |tel, params| {
            let declination = params.extract("TargetDeclination")?;
            tel.set_target_declination(declination)
        });
        getters.insert("targetrightascension", |tel, _| {
            to_json(tel.target_right_ascension()?)
        });
        setters.insert("targetrightascension", |tel, params| {
            let right_ascension = params.extract("TargetRightAscension")?;
            tel.set_target_right_ascension(right_ascension)
        });
        getters.insert("tracking", |tel, _| to_json(tel.tracking()?));
        setters.insert("tracking", |tel, params| {
            let tracking: BoolParam = params.extract("Tracking")?;
            tel.set_tracking(tracking.into())
        });
        getters.insert("trackingrate", |tel, _| to_json(tel.tracking_rate()?));
        setters.insert("trackingrate", |tel, params| {
            let rate = params.extract("TrackingRate")?;
            tel.set_tracking_rate(rate)
        });
        getters.insert("utcdate", |tel, _| to_json(tel.utc_date()?));
        setters.insert("utcdate", |tel, params| {
            let utc: String = params.extract("UTCDate")?;
            tel.set_utc_date(&utc)
        });

        // Operations.
        setters.insert("abortslew", |tel, _| tel.abort_slew());
        setters.insert("findhome", |tel, _| tel.find_home());
        setters.insert("moveaxis", |tel, params| {
            let axis = params.extract("Axis")?;
            let rate = params.extract("Rate")?;
            tel.move_axis(axis, rate)
        });
        setters.insert("park", |tel, _| tel.park());
        setters.insert("pulseguide", |tel, params| {
            let direction = params.extract("Direction")?;
            let duration = params.extract("Duration")?;
            tel.pulse_guide(direction, duration)
        });
        setters.insert("setpark", |tel, _| tel.set_park());
        setters.insert("slewtoaltaz", |tel, params| {
            let azimuth = params.extract("Azimuth")?;
            let altitude = params.extract("Altitude")?;
            tel.slew_to_alt_az(azimuth, altitude)
        });
        setters.insert("slewtoaltazasync", |tel, params| {
            let azimuth = params.extract("Azimuth")?;
            let altitude = params.extract("Altitude")?;
            tel.slew_to_alt_az_async(azimuth, altitude)
        });
        setters.insert("slewtocoordinates", |tel, params| {
            let right_ascension = params.extract("RightAscension")?;
            let declination = params.extract("Declination")?;
            tel.slew_to_coordinates(right_ascension, declination)
        });
        setters.insert("slewtocoordinatesasync", |tel, params| {
            let right_ascension = params.extract("RightAscension")?;
            let declination = params.extract("Declination")?;
            tel.slew_to_coordinates_async(right_ascension, declination)
        });
        setters.insert("slewtotarget", |tel, _| tel.slew_to_target());
        setters.insert("slewtotargetasync", |tel, _| tel.slew_to_target_async());
        setters.insert("synctoaltaz", |tel, params| {
            let azimuth = params.extract("Azimuth")?;
            let altitude = params.extract("Altitude")?;
            tel.sync_to_alt_az(azimuth, altitude)
        });
        setters.insert("synctocoordinates", |tel, params| {
            let right_ascension = params.extract("RightAscension")?;
            let declination = params.extract("Declination")?;
            tel.sync_to_coordinates(right_ascension, declination)
        });
        setters.insert("synctotarget", |tel, _| tel.sync_to_target());
        setters.insert("unpark", |tel, _| tel.unpark());

        Self {
            devices: Vec::new(),
            getters,
            setters,
        }
    }

    pub fn register(&mut self, telescope: Telescope) {
        self.devices.push(Arc::new(Mutex::new(telescope)));
    }

    fn device(&self, device_number: &str) -> super::error::Result<MutexGuard<'_, Telescope>> {
        let index: usize = device_number
            .parse()
            .map_err(|_| Error::UnknownDeviceIndex(device_number.to_owned()))?;

        let device = self
            .devices
            .get(index)
            .ok_or_else(|| Error::UnknownDeviceIndex(device_number.to_owned()))?;

        // Lock poisoning only means a previous handler panicked mid-call;
        // the device state itself stays usable.
        Ok(match device.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        })
    }

    /// Route one request to its handler. The device mutex is held for the
    /// whole call, serializing the half-duplex wire transaction within.
    pub(crate) fn dispatch(
        &self,
        device_type: &str,
        device_number: &str,
        operation: &str,
        params: &mut ActionParams,
    ) -> super::error::Result<ASCOMResult<Value>> {
        if device_type != "telescope" {
            return Err(Error::UnknownDeviceType(device_type.to_owned()));
        }

        let mut telescope = self.device(device_number)?;

        let outcome = match params {
            ActionParams::Get(params) => {
                let handler = self
                    .getters
                    .get(operation)
                    .ok_or_else(|| Error::UnknownOperation(operation.to_owned()))?;
                handler(&mut telescope, params)
            }
            ActionParams::Put(params) => {
                let handler = self
                    .setters
                    .get(operation)
                    .ok_or_else(|| Error::UnknownOperation(operation.to_owned()))?;
                handler(&mut telescope, params).map(|()| Value::Null)
            }
        };

        params.finish_extraction();

        Ok(outcome)
    }

    /// Snapshot for the `configureddevices` management listing.
    pub(crate) fn configured_devices(&self) -> Vec<ConfiguredDevice> {
        self.devices
            .iter()
            .enumerate()
            .filter_map(|(device_number, device)| {
                let mut telescope = device.lock().ok()?;
                Some(telescope.device_info(device_number))
            })
            .collect()
    }
}
