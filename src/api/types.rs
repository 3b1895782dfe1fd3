use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Greenest window of one forecast day, as returned by `/api/v1/window`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowRecord {
    /// Window start, `YYYY-MM-DDTHH:MM+01:00`
    pub window_start_ams: String,
    /// Window end, same shape as the start
    pub window_end_ams: String,
    /// Share of green generation during the window (0-100)
    pub green_percentage: f64,
}

/// One timepoint of the green-share forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    pub datetime_ams: String,
    pub solar_percentage: f64,
    pub wind_percentage: f64,
    pub green_percentage: f64,
}

/// All forecast timepoints of one day, in API order
pub type ForecastDay = Vec<ForecastPoint>;

/// Envelope of `/api/v1/forecast`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ForecastResponse {
    pub data: ForecastDay,
}

/// Why a single endpoint call produced no data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Upstream answered with something other than 200
    #[error("HTTP {0}")]
    Status(u16),

    /// Connection, timeout or body read failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Body was not the expected JSON shape
    #[error("malformed response body: {0}")]
    Decode(String),

    /// Request could not be built at all (bad base URL and the like)
    #[error("invalid request: {0}")]
    Request(String),
}

impl FetchError {
    /// Whether the failure only means "no data for this day"
    ///
    /// A request that cannot even be built will fail the same way for every
    /// day, so it is escalated instead of skipped.
    pub fn is_data_gap(&self) -> bool {
        !matches!(self, FetchError::Request(_))
    }
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_record_uses_camel_case_wire_names() {
        let rec: WindowRecord = serde_json::from_str(
            r#"{"windowStartAms":"2025-03-10T11:00+01:00","windowEndAms":"2025-03-10T14:00+01:00","greenPercentage":87.6}"#,
        )
        .unwrap();
        assert_eq!(rec.window_start_ams, "2025-03-10T11:00+01:00");
        assert_eq!(rec.window_end_ams, "2025-03-10T14:00+01:00");
        assert!((rec.green_percentage - 87.6).abs() < f64::EPSILON);

        let back = serde_json::to_value(&rec).unwrap();
        assert!(back.get("windowStartAms").is_some());
    }

    #[test]
    fn only_request_errors_escalate() {
        assert!(FetchError::Status(500).is_data_gap());
        assert!(FetchError::Transport("reset".into()).is_data_gap());
        assert!(FetchError::Decode("eof".into()).is_data_gap());
        assert!(!FetchError::Request("no host".into()).is_data_gap());
    }
}
