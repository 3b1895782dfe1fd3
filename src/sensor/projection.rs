use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::coordinator::Snapshot;
use crate::sensor::types::{
    ForecastAttributes, SensorKind, SensorState, StateValue, WindowField,
};

/// Timestamp layout used by the API; the offset is always written as +01:00
pub const AMS_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M+01:00";

/// Which end of the greenest window a time sensor shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowBound {
    Start,
    End,
}

/// Round half to even, the way the upstream integration rounds percentages
pub fn round_percentage(value: f64) -> i64 {
    value.round_ties_even() as i64
}

/// Parse an API timestamp into a naive wall-clock time
///
/// The literal `+01:00` is matched, not interpreted, so summer timestamps keep
/// their printed digits.
pub fn parse_ams_timestamp(raw: &str) -> Option<NaiveDateTime> {
    match NaiveDateTime::parse_from_str(raw, AMS_TIMESTAMP_FORMAT) {
        Ok(ts) => Some(ts),
        Err(e) => {
            warn!("Unparseable Vandebron timestamp {:?}: {}", raw, e);
            None
        }
    }
}

/// Render one sensor from a snapshot
pub fn project(kind: &SensorKind, snapshot: &Snapshot, now: DateTime<Utc>, tz: Tz) -> SensorState {
    match kind {
        SensorKind::GreenestWindow { field, day } => greenest_window(snapshot, *field, *day),
        SensorKind::WindowStartTime => window_time(snapshot, WindowBound::Start),
        SensorKind::WindowEndTime => window_time(snapshot, WindowBound::End),
        SensorKind::MinutesUntilNextWindow => minutes_until_next_window(snapshot, now, tz),
        SensorKind::Forecast => forecast(snapshot),
    }
}

/// One field of the window at `day`; `None` when that index is missing
pub fn greenest_window(snapshot: &Snapshot, field: WindowField, day: usize) -> SensorState {
    let Some(window) = snapshot.window(day) else {
        return SensorState::unknown();
    };
    match field {
        WindowField::WindowStartAms => SensorState::text(Some(window.window_start_ams.clone())),
        WindowField::WindowEndAms => SensorState::text(Some(window.window_end_ams.clone())),
        WindowField::GreenPercentage => {
            SensorState::integer(Some(round_percentage(window.green_percentage)))
        }
    }
}

/// `HH:MM` of the first window's start or end
///
/// The timestamp is relabelled as UTC without converting, so the digits are
/// the Amsterdam wall-clock digits as printed by the API.
pub fn window_time(snapshot: &Snapshot, bound: WindowBound) -> SensorState {
    let Some(window) = snapshot.first_window() else {
        return SensorState::unknown();
    };
    let raw = match bound {
        WindowBound::Start => &window.window_start_ams,
        WindowBound::End => &window.window_end_ams,
    };
    let formatted = parse_ams_timestamp(raw).map(|ts| ts.and_utc().format("%H:%M").to_string());
    SensorState::text(formatted)
}

/// Whole minutes from now until the first window starts, floored, at least zero
pub fn minutes_until_next_window(snapshot: &Snapshot, now: DateTime<Utc>, tz: Tz) -> SensorState {
    let Some(window) = snapshot.first_window() else {
        return SensorState::unknown();
    };
    let Some(start) = parse_ams_timestamp(&window.window_start_ams) else {
        return SensorState::unknown();
    };
    let local_now = now.with_timezone(&tz).naive_local();
    let seconds = (start - local_now).num_seconds();
    SensorState::integer(Some(seconds.div_euclid(60).max(0)))
}

/// First forecast timestamp as the value, every timepoint as attributes
///
/// The value is a timestamp rather than a percentage; consumers rely on it.
pub fn forecast(snapshot: &Snapshot) -> SensorState {
    let value = snapshot
        .forecast_data
        .first()
        .and_then(|day| day.first())
        .map(|point| point.datetime_ams.clone());

    let mut attrs = ForecastAttributes::default();
    for point in snapshot.forecast_data.iter().flatten() {
        attrs.timestamps.push(point.datetime_ams.clone());
        attrs
            .solar_percentages
            .push(round_percentage(point.solar_percentage));
        attrs
            .wind_percentages
            .push(round_percentage(point.wind_percentage));
        attrs
            .green_percentages
            .push(round_percentage(point.green_percentage));
    }

    SensorState {
        value: value.map(StateValue::Text),
        attributes: Some(attrs),
    }
}
