//! Plain-text rendering of reports and saved places.

use std::fmt::Write;

use atmos_core::{LocationReport, SavedPlace, WeatherSnapshot};
use chrono::{DateTime, Offset, Utc};

const HOURS_SHOWN: usize = 12;

pub fn report(report: &LocationReport) -> String {
    let weather = &report.weather;
    let now = &weather.current;
    let mut out = String::new();

    let _ = writeln!(out, "{} ({})", report.place_name, report.coordinate);
    let _ = writeln!(
        out,
        "  {:.1}°C, feels like {:.1}°C, {} ({})",
        now.temperature, now.feels_like, now.description, now.primary_condition
    );
    let _ = writeln!(
        out,
        "  humidity {}%, pressure {} hPa, wind {:.1} m/s from {}°, clouds {}%",
        now.humidity, now.pressure, now.wind_speed, now.wind_direction_deg, now.cloudiness
    );
    if let Some(mm) = now.precipitation_last_hour {
        let _ = writeln!(out, "  precipitation last hour: {mm:.1} mm");
    }

    if let Some(aq) = report.air_quality.latest() {
        let _ = write!(out, "  air quality: {}", aq.aqi);
        if let Some(pm) = aq.pollutant_concentrations.get("pm2_5") {
            let _ = write!(out, ", PM2.5 {pm:.1} μg/m³");
        }
        let _ = writeln!(out);
    }

    if !weather.hourly.is_empty() {
        let _ = writeln!(out, "\nNext hours:");
        for h in weather.hourly.iter().take(HOURS_SHOWN) {
            let _ = writeln!(
                out,
                "  {}  {:>5.1}°C  {}",
                local(weather, h.time(), "%H:%M"),
                h.temperature,
                h.description
            );
        }
    }

    if !weather.daily.is_empty() {
        let _ = writeln!(out, "\nNext days:");
        for d in &weather.daily {
            let _ = writeln!(
                out,
                "  {}  {:>5.1} / {:>5.1}°C  rain {:>3.0}%  {}",
                local(weather, d.time(), "%a %d %b"),
                d.temp_min,
                d.temp_max,
                d.precipitation_probability * 100.0,
                d.primary_condition
            );
        }
    }

    out
}

pub fn places(places: &[SavedPlace]) -> String {
    if places.is_empty() {
        return "No saved places.\n".to_string();
    }

    let mut out = String::new();
    for p in places {
        let condition = p
            .last_known_condition
            .as_ref()
            .map(|c| format!("  [{c}]"))
            .unwrap_or_default();
        let _ = writeln!(out, "{}  {} ({}){}", p.id, p.name, p.coordinate, condition);
    }
    out
}

/// Format a timestamp in the forecast location's own offset.
fn local(weather: &WeatherSnapshot, time: Option<DateTime<Utc>>, fmt: &str) -> String {
    let offset = weather.local_offset().unwrap_or_else(|| Utc.fix());

    match time {
        Some(t) => t.with_timezone(&offset).format(fmt).to_string(),
        None => "?".to_string(),
    }
}
