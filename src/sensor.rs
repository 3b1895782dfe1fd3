//! Sensor platform
//!
//! Read-only sensors projected from the coordinator's latest snapshot. The
//! platform registers itself as a [`SnapshotListener`] and re-renders every
//! entity when a new snapshot is published; it never polls on its own.

pub mod projection;
pub mod types;

pub use projection::{project, round_percentage};
pub use types::{
    ForecastAttributes, SensorEntity, SensorKind, SensorReading, SensorState, StateValue,
    WindowField,
};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::sync::watch;

use crate::coordinator::{RefreshCoordinator, Snapshot, SnapshotListener};
use crate::logging::{StructuredLogger, get_logger};

/// Entity catalogue for an entry fetching `day_offset` days
///
/// Per-day sensors come first, grouped by field, followed by the first-window
/// time sensors, the forecast and the countdown.
pub fn build_entities(day_offset: u8) -> Vec<SensorEntity> {
    let mut entities: Vec<SensorEntity> = WindowField::ALL
        .iter()
        .flat_map(|field| {
            (0..usize::from(day_offset)).map(move |day| {
                SensorEntity::new(SensorKind::GreenestWindow { field: *field, day })
            })
        })
        .collect();

    entities.extend(
        [
            SensorKind::WindowStartTime,
            SensorKind::WindowEndTime,
            SensorKind::Forecast,
            SensorKind::MinutesUntilNextWindow,
        ]
        .into_iter()
        .map(SensorEntity::new),
    );
    entities
}

/// All sensors of one config entry with their cached states
pub struct SensorPlatform {
    entities: Vec<SensorEntity>,
    timezone: Tz,
    readings_tx: watch::Sender<Arc<Vec<SensorReading>>>,
    logger: StructuredLogger,
}

impl SensorPlatform {
    pub fn new(day_offset: u8, timezone: Tz) -> Self {
        let entities = build_entities(day_offset);
        let logger = get_logger("sensor");
        for entity in &entities {
            logger.debug(&format!("Registering sensor: {}", entity.name));
        }
        let initial = entities
            .iter()
            .map(|e| SensorReading::new(e, SensorState::unknown()))
            .collect();
        let (readings_tx, _) = watch::channel(Arc::new(initial));
        Self {
            entities,
            timezone,
            readings_tx,
            logger,
        }
    }

    /// Create the platform for `coordinator`, render its current snapshot and
    /// subscribe to future ones
    pub fn setup(coordinator: &mut RefreshCoordinator) -> Arc<Self> {
        let platform = Arc::new(Self::new(
            coordinator.day_offset(),
            coordinator.settings().timezone,
        ));
        platform.render_at(&coordinator.snapshot(), Utc::now());
        coordinator.add_listener(platform.clone());
        platform
    }

    pub fn entities(&self) -> &[SensorEntity] {
        &self.entities
    }

    /// Re-render every entity from `snapshot` as of `now`
    pub fn render_at(&self, snapshot: &Snapshot, now: DateTime<Utc>) {
        let readings: Vec<SensorReading> = self
            .entities
            .iter()
            .map(|e| SensorReading::new(e, project(&e.kind, snapshot, now, self.timezone)))
            .collect();
        let known = readings.iter().filter(|r| r.state.is_some()).count();
        self.logger.debug(&format!(
            "Rendered {} sensors ({} with a value)",
            readings.len(),
            known
        ));
        self.readings_tx.send_replace(Arc::new(readings));
    }

    /// Current readings of every entity, in registration order
    pub fn readings(&self) -> Arc<Vec<SensorReading>> {
        self.readings_tx.borrow().clone()
    }

    pub fn reading(&self, unique_id: &str) -> Option<SensorReading> {
        self.readings_tx
            .borrow()
            .iter()
            .find(|r| r.unique_id == unique_id)
            .cloned()
    }

    /// Receiver that changes whenever the sensors are re-rendered
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<SensorReading>>> {
        self.readings_tx.subscribe()
    }
}

impl SnapshotListener for SensorPlatform {
    fn on_snapshot(&self, snapshot: &Snapshot) {
        self.render_at(snapshot, Utc::now());
    }
}
