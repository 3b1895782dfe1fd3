use crate::api::{ForecastDay, WindowRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of one complete refresh, replaced wholesale on every refresh
///
/// Both lists are in day order but days whose fetch failed are left out, so
/// index `n` is not necessarily day `n`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub greenest_windows: Vec<WindowRecord>,
    pub forecast_data: Vec<ForecastDay>,
}

impl Snapshot {
    pub fn window(&self, index: usize) -> Option<&WindowRecord> {
        self.greenest_windows.get(index)
    }

    /// First window, the one the time-based sensors describe
    pub fn first_window(&self) -> Option<&WindowRecord> {
        self.window(0)
    }

    pub fn is_empty(&self) -> bool {
        self.greenest_windows.is_empty() && self.forecast_data.is_empty()
    }
}

/// Coordinator lifecycle state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum CoordinatorState {
    /// No refresh has run yet
    Idle,
    /// A refresh is in flight
    Fetching,
    /// Last refresh published a snapshot
    Published,
    /// Last refresh failed; the previous snapshot is still served
    Failed(String),
}

/// Observable coordinator status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorStatus {
    pub state: CoordinatorState,
    pub last_update_success: bool,
    pub last_refreshed_at: Option<DateTime<Utc>>,
    pub day_offset: u8,
}

impl CoordinatorStatus {
    pub(crate) fn initial(day_offset: u8) -> Self {
        Self {
            state: CoordinatorState::Idle,
            last_update_success: false,
            last_refreshed_at: None,
            day_offset,
        }
    }
}

/// Commands accepted by the coordinator task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorCommand {
    Refresh,
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_state_serializes_with_reason() {
        let v = serde_json::to_value(CoordinatorState::Failed("HTTP 500".into())).unwrap();
        assert_eq!(v, serde_json::json!({"kind": "failed", "reason": "HTTP 500"}));
        let v = serde_json::to_value(CoordinatorState::Idle).unwrap();
        assert_eq!(v, serde_json::json!({"kind": "idle"}));
    }

    #[test]
    fn empty_snapshot_has_no_windows() {
        let s = Snapshot::default();
        assert!(s.is_empty());
        assert!(s.first_window().is_none());
        assert!(s.window(3).is_none());
    }
}
