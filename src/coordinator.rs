//! Periodic refresh of forecast data
//!
//! The coordinator owns the latest [`Snapshot`]. One task runs [`RefreshCoordinator::run`],
//! refreshing on a fixed interval and on demand; everything else talks to it
//! through a cloneable [`CoordinatorHandle`].

pub mod types;

pub use types::{CoordinatorCommand, CoordinatorState, CoordinatorStatus, Snapshot};

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;
use tokio::sync::{mpsc, watch};
use tokio::time::{MissedTickBehavior, interval};

use crate::api::ForecastSource;
use crate::config::CoordinatorConfig;
use crate::error::{Result, VandebronError};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};

/// Lowest and highest number of forecast days an entry may request
pub const MIN_DAY_OFFSET: u8 = 1;
pub const MAX_DAY_OFFSET: u8 = 7;

/// Observer notified synchronously after every published snapshot
pub trait SnapshotListener: Send + Sync {
    fn on_snapshot(&self, snapshot: &Snapshot);
}

/// Per-entry coordinator parameters
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    /// Number of calendar days fetched per refresh, starting today
    pub day_offset: u8,
    pub update_interval: Duration,
    /// Zone whose civil date defines "today"
    pub timezone: Tz,
}

impl CoordinatorSettings {
    pub fn from_config(cfg: &CoordinatorConfig, day_offset: u8) -> Result<Self> {
        if !(MIN_DAY_OFFSET..=MAX_DAY_OFFSET).contains(&day_offset) {
            return Err(VandebronError::validation(
                "day_offset",
                format!(
                    "Must be between {} and {}, got {}",
                    MIN_DAY_OFFSET, MAX_DAY_OFFSET, day_offset
                ),
            ));
        }
        if cfg.update_interval_secs == 0 {
            return Err(VandebronError::validation(
                "coordinator.update_interval_secs",
                "Must be greater than 0",
            ));
        }
        Ok(Self {
            day_offset,
            update_interval: cfg.update_interval(),
            timezone: cfg.tz()?,
        })
    }
}

/// Civil dates covered by a refresh at `now`
///
/// Today is taken from the wall clock in `tz`, then whole calendar days are
/// added so DST transitions never shift the date.
pub fn target_dates(now: DateTime<Utc>, tz: Tz, day_offset: u8) -> Result<Vec<NaiveDate>> {
    let today = now.with_timezone(&tz).date_naive();
    (0..u64::from(day_offset))
        .map(|day| {
            today.checked_add_days(Days::new(day)).ok_or_else(|| {
                VandebronError::generic(format!("Date overflow adding {} days to {}", day, today))
            })
        })
        .collect()
}

/// Refresh coordinator for one config entry
pub struct RefreshCoordinator {
    source: Arc<dyn ForecastSource>,
    settings: CoordinatorSettings,
    logger: StructuredLogger,
    snapshot_tx: watch::Sender<Arc<Snapshot>>,
    status_tx: watch::Sender<CoordinatorStatus>,
    listeners: Vec<Arc<dyn SnapshotListener>>,
    commands_rx: mpsc::UnboundedReceiver<CoordinatorCommand>,
}

/// Cloneable access to a running coordinator
#[derive(Clone)]
pub struct CoordinatorHandle {
    commands_tx: mpsc::UnboundedSender<CoordinatorCommand>,
    snapshot_rx: watch::Receiver<Arc<Snapshot>>,
    status_rx: watch::Receiver<CoordinatorStatus>,
    day_offset: u8,
}

impl RefreshCoordinator {
    /// Create a coordinator and the first handle to it
    pub fn new(
        source: Arc<dyn ForecastSource>,
        settings: CoordinatorSettings,
        entry_id: Option<&str>,
    ) -> (Self, CoordinatorHandle) {
        let mut context = LogContext::new("coordinator")
            .with_field("day_offset", settings.day_offset.to_string());
        if let Some(id) = entry_id {
            context = context.with_entry_id(id.to_string());
        }
        let logger = get_logger_with_context(context);

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(Snapshot::default()));
        let (status_tx, status_rx) =
            watch::channel(CoordinatorStatus::initial(settings.day_offset));

        let handle = CoordinatorHandle {
            commands_tx,
            snapshot_rx,
            status_rx,
            day_offset: settings.day_offset,
        };

        let coordinator = Self {
            source,
            settings,
            logger,
            snapshot_tx,
            status_tx,
            listeners: Vec::new(),
            commands_rx,
        };
        (coordinator, handle)
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    pub fn day_offset(&self) -> u8 {
        self.settings.day_offset
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot_tx.borrow().clone()
    }

    pub fn status(&self) -> CoordinatorStatus {
        self.status_tx.borrow().clone()
    }

    /// Register an observer; it is called after every successful refresh
    pub fn add_listener(&mut self, listener: Arc<dyn SnapshotListener>) {
        self.listeners.push(listener);
    }

    /// Refresh using the current time
    pub async fn refresh(&mut self) -> Result<Arc<Snapshot>> {
        self.refresh_at(Utc::now()).await
    }

    /// Fetch every configured day as of `now` and publish the result
    ///
    /// On failure the previous snapshot stays published and an
    /// [`VandebronError::UpdateFailed`] carrying the cause is returned.
    pub async fn refresh_at(&mut self, now: DateTime<Utc>) -> Result<Arc<Snapshot>> {
        self.status_tx
            .send_modify(|s| s.state = CoordinatorState::Fetching);

        match self.fetch_all(now).await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.snapshot_tx.send_replace(snapshot.clone());
                self.status_tx.send_modify(|s| {
                    s.state = CoordinatorState::Published;
                    s.last_update_success = true;
                    s.last_refreshed_at = Some(now);
                });
                for listener in &self.listeners {
                    listener.on_snapshot(&snapshot);
                }
                Ok(snapshot)
            }
            Err(e) => {
                self.logger
                    .error(&format!("Error fetching data from Vandebron: {}", e));
                let reason = e.to_string();
                self.status_tx.send_modify(|s| {
                    s.state = CoordinatorState::Failed(reason.clone());
                    s.last_update_success = false;
                });
                Err(VandebronError::update_failed(format!(
                    "Failed to update Vandebron data: {}",
                    reason
                )))
            }
        }
    }

    async fn fetch_all(&self, now: DateTime<Utc>) -> Result<Snapshot> {
        let dates = target_dates(now, self.settings.timezone, self.settings.day_offset)?;
        let mut snapshot = Snapshot::default();

        for date in dates {
            match self.source.fetch_window(date).await {
                Ok(window) => snapshot.greenest_windows.push(window),
                Err(e) if e.is_data_gap() => {
                    self.logger
                        .debug(&format!("No greenest window for {}: {}", date, e));
                }
                Err(e) => return Err(VandebronError::api(e.to_string())),
            }

            match self.source.fetch_forecast(date).await {
                Ok(day) => snapshot.forecast_data.push(day),
                Err(e) if e.is_data_gap() => {
                    self.logger.debug(&format!("No forecast for {}: {}", date, e));
                }
                Err(e) => return Err(VandebronError::api(e.to_string())),
            }
        }

        self.logger.debug(&format!(
            "Fetched greenest windows for {}/{} days and forecasts for {}/{} days",
            snapshot.greenest_windows.len(),
            self.settings.day_offset,
            snapshot.forecast_data.len(),
            self.settings.day_offset
        ));
        Ok(snapshot)
    }

    async fn refresh_logged(&mut self) {
        // Failure is already logged and reflected in the status
        let _ = self.refresh().await;
    }

    /// Run the refresh loop until shutdown or until every handle is dropped
    ///
    /// The first periodic refresh happens one interval after start; entry
    /// setup performs the initial refresh itself.
    pub async fn run(mut self) -> Result<()> {
        self.logger.info(&format!(
            "Starting refresh loop: {} day(s) every {}s",
            self.settings.day_offset,
            self.settings.update_interval.as_secs()
        ));

        let mut ticker = interval(self.settings.update_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh_logged().await;
                }
                cmd = self.commands_rx.recv() => {
                    match cmd {
                        Some(CoordinatorCommand::Refresh) => {
                            // Requests queued behind this one collapse into it
                            let mut shutdown = false;
                            while let Ok(next) = self.commands_rx.try_recv() {
                                if next == CoordinatorCommand::Shutdown {
                                    shutdown = true;
                                }
                            }
                            if shutdown {
                                break;
                            }
                            self.refresh_logged().await;
                            ticker.reset();
                        }
                        Some(CoordinatorCommand::Shutdown) | None => break,
                    }
                }
            }
        }

        self.logger.info("Refresh loop stopped");
        Ok(())
    }
}

impl CoordinatorHandle {
    /// Ask the coordinator task for an out-of-schedule refresh
    pub fn request_refresh(&self) -> Result<()> {
        self.commands_tx
            .send(CoordinatorCommand::Refresh)
            .map_err(|_| VandebronError::generic("Coordinator is not running"))
    }

    /// Ask the coordinator task to stop; a no-op if it already has
    pub fn shutdown(&self) {
        let _ = self.commands_tx.send(CoordinatorCommand::Shutdown);
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot_rx.borrow().clone()
    }

    pub fn status(&self) -> CoordinatorStatus {
        self.status_rx.borrow().clone()
    }

    /// Receiver that changes on every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshot_rx.clone()
    }

    pub fn day_offset(&self) -> u8 {
        self.day_offset
    }
}
