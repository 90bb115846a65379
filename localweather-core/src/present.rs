//! Turns a [`WeatherRecord`] into the strings shown on screen.

use chrono::{Local, TimeZone};
use serde::Serialize;
use std::fmt::{self, Display};

use crate::model::{Units, WeatherRecord};

/// Regions that read temperatures in Fahrenheit.
pub const FAHRENHEIT_REGIONS: [&str; 3] = ["US", "LR", "MM"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }

    /// Convert a temperature reported in `units` to this unit.
    pub fn convert(&self, value: f64, units: Units) -> f64 {
        match (units, self) {
            (Units::Metric, TemperatureUnit::Celsius)
            | (Units::Imperial, TemperatureUnit::Fahrenheit) => value,
            (Units::Metric, TemperatureUnit::Fahrenheit) => value * 9.0 / 5.0 + 32.0,
            (Units::Imperial, TemperatureUnit::Celsius) => (value - 32.0) * 5.0 / 9.0,
            (Units::Standard, TemperatureUnit::Celsius) => value - 273.15,
            (Units::Standard, TemperatureUnit::Fahrenheit) => (value - 273.15) * 9.0 / 5.0 + 32.0,
        }
    }
}

/// Fahrenheit only for an exact member of [`FAHRENHEIT_REGIONS`].
pub fn unit_for_region(region: Option<&str>) -> TemperatureUnit {
    match region {
        Some(code) if FAHRENHEIT_REGIONS.iter().any(|r| r.eq_ignore_ascii_case(code.trim())) => {
            TemperatureUnit::Fahrenheit
        }
        _ => TemperatureUnit::Celsius,
    }
}

/// Region code from a locale such as `en_US.UTF-8`, `en-US` or `sr_RS@latin`.
pub fn region_from_locale(locale: &str) -> Option<String> {
    let base = locale.split(['.', '@']).next()?;
    base.split(['_', '-'])
        .skip(1)
        .find(|part| {
            (part.len() == 2 && part.chars().all(|c| c.is_ascii_alphabetic()))
                || (part.len() == 3 && part.chars().all(|c| c.is_ascii_digit()))
        })
        .map(|part| part.to_ascii_uppercase())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IconCategory {
    Sunny,
    Cloud,
    Rain,
    Storm,
    Snow,
}

impl IconCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IconCategory::Sunny => "sunny",
            IconCategory::Cloud => "cloud",
            IconCategory::Rain => "rain",
            IconCategory::Storm => "storm",
            IconCategory::Snow => "snow",
        }
    }
}

impl Display for IconCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Icon codes the screen knows how to draw. Night codes follow the
/// artwork actually shipped, so `01n` is a cloud and `11n` is rain.
pub static ICON_TABLE: &[(&str, IconCategory)] = &[
    ("01d", IconCategory::Sunny),
    ("02d", IconCategory::Cloud),
    ("03d", IconCategory::Cloud),
    ("04d", IconCategory::Cloud),
    ("04n", IconCategory::Cloud),
    ("10d", IconCategory::Rain),
    ("11d", IconCategory::Storm),
    ("13d", IconCategory::Snow),
    ("01n", IconCategory::Cloud),
    ("02n", IconCategory::Cloud),
    ("03n", IconCategory::Cloud),
    ("10n", IconCategory::Cloud),
    ("11n", IconCategory::Rain),
    ("13n", IconCategory::Snow),
];

pub fn icon_for(code: &str) -> Option<IconCategory> {
    ICON_TABLE.iter().find(|(c, _)| *c == code).map(|(_, icon)| *icon)
}

/// `HH:MM` (24 h) for a Unix timestamp in `tz`.
pub fn unix_time<Tz>(seconds: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    tz.timestamp_opt(seconds, 0)
        .single()
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

/// Half-up to the nearest integer: 2.5 -> 3, -2.5 -> -2.
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

fn format_decimal(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    // avoid "-0"
    if rounded == 0.0 { "0".to_string() } else { rounded.to_string() }
}

/// Pre-formatted screen contents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayModel {
    pub main: String,
    pub description: String,
    pub temperature: String,
    pub humidity: String,
    pub sunrise: String,
    pub sunset: String,
    pub min: String,
    pub max: String,
    pub wind_speed: String,
    pub name: String,
    pub country: String,
    pub icon: Option<IconCategory>,
    pub unit: TemperatureUnit,
}

/// Present `record` using the machine's local time zone.
pub fn present(record: &WeatherRecord, region: Option<&str>) -> DisplayModel {
    present_in(record, region, &Local)
}

pub fn present_in<Tz>(record: &WeatherRecord, region: Option<&str>, tz: &Tz) -> DisplayModel
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let unit = unit_for_region(region);
    let temp = &record.temperature;
    let convert = |value| unit.convert(value, record.units);

    let (main, description, icon) = match record.shown_condition() {
        Some(c) => (c.main.clone(), c.description.clone(), icon_for(&c.icon)),
        None => (String::new(), String::new(), None),
    };

    DisplayModel {
        main,
        description,
        temperature: format!("{}{}", format_decimal(convert(temp.current)), unit.symbol()),
        humidity: format!("{} per cent", temp.humidity),
        sunrise: unix_time(record.sun.sunrise, tz),
        sunset: unix_time(record.sun.sunset, tz),
        min: format!("{}° min", round_half_up(convert(temp.min))),
        max: format!("{}° max", round_half_up(convert(temp.max))),
        wind_speed: format!(
            "{} {}",
            format_decimal(record.wind.speed),
            record.units.wind_speed_suffix()
        ),
        name: record.location.name.clone(),
        country: record.location.country_code.clone(),
        icon,
        unit,
    }
}
