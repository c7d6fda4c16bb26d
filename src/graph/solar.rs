// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermowatch

//! Sunrise, sunset and civil twilight for chart shading
//!
//! Uses the NOAA "Almanac for Computers" approximation, good to a couple
//! of minutes, which is plenty for shading a chart.

use chrono::{Datelike, Local, NaiveDate, Offset};

const SECS_PER_DAY: u32 = 86_400;

/// Official sunrise/sunset: centre of the sun 50' below the horizon
const ZENITH_OFFICIAL: f64 = 90.833;

/// Civil twilight: 6 degrees below the horizon
const ZENITH_CIVIL: f64 = 96.0;

/// Solar events as seconds after local midnight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SunTimes {
    pub dawn: u32,
    pub sunrise: u32,
    pub sunset: u32,
    pub dusk: u32,
}

enum Event {
    Rising,
    Setting,
}

/// Local hour at which the sun crosses a zenith angle
#[derive(Debug, Clone, Copy, PartialEq)]
enum Crossing {
    At(f64),
    /// Sun never reaches the zenith angle: stays below all day
    NeverAbove,
    /// Sun never drops to the zenith angle: stays above all day
    NeverBelow,
}

fn solar_hour(day_of_year: u32, latitude: f64, longitude: f64, zenith: f64, offset_hours: f64, event: Event) -> Crossing {
    let lng_hour = longitude / 15.0;
    let t = match event {
        Event::Rising => day_of_year as f64 + (6.0 - lng_hour) / 24.0,
        Event::Setting => day_of_year as f64 + (18.0 - lng_hour) / 24.0,
    };

    let m = 0.9856 * t - 3.289;
    let l = (m + 1.916 * m.to_radians().sin() + 0.020 * (2.0 * m).to_radians().sin() + 282.634).rem_euclid(360.0);

    let mut ra = (0.91764 * l.to_radians().tan()).atan().to_degrees().rem_euclid(360.0);
    ra += (l / 90.0).floor() * 90.0 - (ra / 90.0).floor() * 90.0;
    let ra_hours = ra / 15.0;

    let sin_dec = 0.39782 * l.to_radians().sin();
    let cos_dec = sin_dec.asin().cos();

    let cos_h = (zenith.to_radians().cos() - sin_dec * latitude.to_radians().sin())
        / (cos_dec * latitude.to_radians().cos());
    if cos_h > 1.0 {
        return Crossing::NeverAbove;
    }
    if cos_h < -1.0 {
        return Crossing::NeverBelow;
    }

    let h = match event {
        Event::Rising => 360.0 - cos_h.acos().to_degrees(),
        Event::Setting => cos_h.acos().to_degrees(),
    } / 15.0;

    let local_mean = h + ra_hours - 0.06571 * t - 6.622;
    let utc = (local_mean - lng_hour).rem_euclid(24.0);
    Crossing::At((utc + offset_hours).rem_euclid(24.0))
}

fn to_secs(hours: f64) -> u32 {
    ((hours * 3600.0).round() as u32).min(SECS_PER_DAY)
}

/// Rising and setting second for one zenith angle.
///
/// Polar night maps to `(86400, 86400)` so the whole day is shaded;
/// midnight sun maps to `(0, 86400)` so nothing is.
fn crossing_pair(day: u32, lat: f64, lon: f64, zenith: f64, offset_hours: f64) -> (u32, u32) {
    let rise = solar_hour(day, lat, lon, zenith, offset_hours, Event::Rising);
    let set = solar_hour(day, lat, lon, zenith, offset_hours, Event::Setting);
    match (rise, set) {
        (Crossing::At(r), Crossing::At(s)) => {
            let (r, s) = (to_secs(r), to_secs(s));
            // a setting that wraps past midnight ends the day unshaded
            if s < r {
                (r, SECS_PER_DAY)
            } else {
                (r, s)
            }
        }
        (Crossing::NeverAbove, _) | (_, Crossing::NeverAbove) => (SECS_PER_DAY, SECS_PER_DAY),
        _ => (0, SECS_PER_DAY),
    }
}

/// Solar events for `date` at the given location and UTC offset
pub fn sun_times(date: NaiveDate, latitude: f64, longitude: f64, utc_offset_secs: i32) -> SunTimes {
    let day = date.ordinal();
    let offset_hours = utc_offset_secs as f64 / 3600.0;

    let (sunrise, sunset) = crossing_pair(day, latitude, longitude, ZENITH_OFFICIAL, offset_hours);
    let (dawn, dusk) = crossing_pair(day, latitude, longitude, ZENITH_CIVIL, offset_hours);

    SunTimes {
        dawn: dawn.min(sunrise),
        sunrise,
        sunset,
        dusk: dusk.max(sunset),
    }
}

/// Per-day cache of [`sun_times`] in server-local time
#[derive(Debug, Clone)]
pub struct SolarCalendar {
    latitude: f64,
    longitude: f64,
    cached: Option<(NaiveDate, SunTimes)>,
}

impl SolarCalendar {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            cached: None,
        }
    }

    pub fn today(&mut self) -> SunTimes {
        let now = Local::now();
        let offset = now.offset().fix().local_minus_utc();
        self.for_date(now.date_naive(), offset)
    }

    pub fn for_date(&mut self, date: NaiveDate, utc_offset_secs: i32) -> SunTimes {
        if let Some((cached_date, times)) = self.cached {
            if cached_date == date {
                return times;
            }
        }
        let times = sun_times(date, self.latitude, self.longitude, utc_offset_secs);
        self.cached = Some((date, times));
        times
    }
}
