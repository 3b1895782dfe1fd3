//! Config entry lifecycle
//!
//! A config entry is the persisted outcome of the setup flow. Setting one up
//! wires the API client, the refresh coordinator and the sensor platform
//! together and starts the refresh loop; unloading stops it again.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::api::{ForecastSource, VandebronClient};
use crate::config::Config;
use crate::coordinator::{CoordinatorHandle, CoordinatorSettings, RefreshCoordinator};
use crate::error::{Result, VandebronError};
use crate::logging::{LogContext, StructuredLogger, get_logger, get_logger_with_context};
use crate::sensor::SensorPlatform;
use crate::setup::{ENTRY_TITLE, EntryData, FlowResult, SetupFlow};

/// Persisted config entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub entry_id: String,
    pub title: String,
    pub version: u32,
    pub data: EntryData,
    pub created_at: DateTime<Utc>,
}

impl ConfigEntry {
    pub fn new(data: EntryData) -> Self {
        Self {
            entry_id: Uuid::new_v4().to_string(),
            title: ENTRY_TITLE.to_string(),
            version: SetupFlow::VERSION,
            data,
            created_at: Utc::now(),
        }
    }

    /// Entry created by a finished setup flow, if it finished
    pub fn from_flow(result: &FlowResult) -> Option<Self> {
        match result {
            FlowResult::CreateEntry { title, data } => Some(Self {
                title: title.clone(),
                ..Self::new(data.clone())
            }),
            FlowResult::Form { .. } => None,
        }
    }

    pub fn day_offset(&self) -> u8 {
        self.data.day_offset()
    }
}

/// JSON file holding the single config entry
pub struct EntryStore {
    path: PathBuf,
    logger: StructuredLogger,
}

impl EntryStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            logger: get_logger("entry_store"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored entry; `None` when nothing has been stored yet
    pub fn load(&self) -> Result<Option<ConfigEntry>> {
        if !self.path.exists() {
            self.logger.info(&format!(
                "No config entry found at {}",
                self.path.display()
            ));
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&self.path)?;
        let entry: ConfigEntry = serde_json::from_str(&contents)?;
        self.logger
            .info(&format!("Loaded config entry {}", entry.entry_id));
        Ok(Some(entry))
    }

    pub fn save(&self, entry: &ConfigEntry) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(entry)?;
        std::fs::write(&self.path, contents)?;
        self.logger
            .debug(&format!("Saved config entry {}", entry.entry_id));
        Ok(())
    }

    /// Delete the stored entry; a missing file is not an error
    pub fn remove(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
            self.logger.info("Removed stored config entry");
        }
        Ok(())
    }
}

/// Shared view of a running entry
#[derive(Clone)]
pub struct ActiveEntry {
    pub entry: ConfigEntry,
    pub handle: CoordinatorHandle,
    pub sensors: Arc<SensorPlatform>,
}

/// An entry whose refresh loop is running
pub struct RunningEntry {
    active: ActiveEntry,
    task: JoinHandle<Result<()>>,
}

impl RunningEntry {
    pub fn entry(&self) -> &ConfigEntry {
        &self.active.entry
    }

    pub fn handle(&self) -> &CoordinatorHandle {
        &self.active.handle
    }

    pub fn sensors(&self) -> &Arc<SensorPlatform> {
        &self.active.sensors
    }

    pub fn active(&self) -> ActiveEntry {
        self.active.clone()
    }

    /// Stop the refresh loop and wait for it to finish
    pub async fn unload(self) -> Result<()> {
        self.active.handle.shutdown();
        self.task
            .await
            .map_err(|e| VandebronError::generic(format!("Coordinator task failed: {}", e)))?
    }
}

/// Set up `entry` against the real Vandebron API
pub async fn setup_entry(config: &Config, entry: ConfigEntry) -> Result<RunningEntry> {
    let client = VandebronClient::new(&config.api)?;
    setup_entry_with_source(config, entry, Arc::new(client)).await
}

/// Set up `entry` against any forecast source
///
/// The first refresh runs before anything is started; if it fails the entry
/// is not set up and the error is returned.
pub async fn setup_entry_with_source(
    config: &Config,
    entry: ConfigEntry,
    source: Arc<dyn ForecastSource>,
) -> Result<RunningEntry> {
    let logger = get_logger_with_context(
        LogContext::new("entry").with_entry_id(entry.entry_id.clone()),
    );
    let settings = CoordinatorSettings::from_config(&config.coordinator, entry.day_offset())?;
    let (mut coordinator, handle) =
        RefreshCoordinator::new(source, settings, Some(&entry.entry_id));

    coordinator.refresh().await.map_err(|e| {
        VandebronError::setup(format!(
            "First refresh of entry {} failed: {}",
            entry.entry_id, e
        ))
    })?;

    let sensors = SensorPlatform::setup(&mut coordinator);
    let task = tokio::spawn(coordinator.run());

    logger.info(&format!(
        "Set up '{}' with {} sensors for {} day(s)",
        entry.title,
        sensors.entities().len(),
        entry.day_offset()
    ));

    Ok(RunningEntry {
        active: ActiveEntry {
            entry,
            handle,
            sensors,
        },
        task,
    })
}

/// Service-level owner of the entry store and the (at most one) running entry
pub struct Integration {
    config: Config,
    store: EntryStore,
    source: Option<Arc<dyn ForecastSource>>,
    running: Mutex<Option<RunningEntry>>,
    logger: StructuredLogger,
}

impl Integration {
    pub fn new(config: Config) -> Self {
        let store = EntryStore::new(&config.storage.entry_file);
        Self {
            config,
            store,
            source: None,
            running: Mutex::new(None),
            logger: get_logger("integration"),
        }
    }

    /// Use `source` instead of the HTTP client for every entry set up
    pub fn with_source(config: Config, source: Arc<dyn ForecastSource>) -> Self {
        Self {
            source: Some(source),
            ..Self::new(config)
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    /// Snapshot of the running entry, if any
    pub async fn active(&self) -> Option<ActiveEntry> {
        self.running.lock().await.as_ref().map(RunningEntry::active)
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    async fn start(&self, entry: ConfigEntry) -> Result<RunningEntry> {
        match &self.source {
            Some(source) => setup_entry_with_source(&self.config, entry, source.clone()).await,
            None => setup_entry(&self.config, entry).await,
        }
    }

    /// Stop an entry that was started but never installed
    async fn discard(&self, started: RunningEntry) {
        let entry_id = started.entry().entry_id.clone();
        if let Err(e) = started.unload().await {
            self.logger
                .warn(&format!("Failed to stop discarded entry {}: {}", entry_id, e));
        }
    }

    /// Set up `entry`; fails if another entry is already running
    ///
    /// The first refresh runs without holding the lock, so readers of the
    /// running entry are not blocked while it is in flight.
    pub async fn setup(&self, entry: ConfigEntry) -> Result<()> {
        if let Some(current) = self.running.lock().await.as_ref() {
            return Err(already_running(current));
        }

        let started = self.start(entry).await?;

        let mut running = self.running.lock().await;
        if let Some(current) = running.as_ref() {
            let err = already_running(current);
            drop(running);
            self.discard(started).await;
            return Err(err);
        }
        *running = Some(started);
        Ok(())
    }

    /// Unload the running entry; returns whether one was running
    pub async fn unload(&self) -> Result<bool> {
        let current = self.running.lock().await.take();
        match current {
            Some(entry) => {
                let entry_id = entry.entry().entry_id.clone();
                entry.unload().await?;
                self.logger.info(&format!("Unloaded entry {}", entry_id));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Replace the stored and running entry with one built from `data`
    ///
    /// The new entry is started first. Persisting it and swapping it in
    /// happen under one lock, so the stored entry is always the running one.
    /// If the first refresh fails, nothing changes.
    pub async fn reconfigure(&self, data: EntryData) -> Result<ConfigEntry> {
        let entry = ConfigEntry::new(data);
        let started = self.start(entry.clone()).await?;

        let previous = {
            let mut running = self.running.lock().await;
            if let Err(e) = self.store.save(&entry) {
                drop(running);
                self.discard(started).await;
                return Err(e);
            }
            running.replace(started)
        };

        if let Some(previous) = previous {
            let previous_id = previous.entry().entry_id.clone();
            previous.unload().await?;
            self.logger
                .info(&format!("Unloaded replaced entry {}", previous_id));
        }
        self.logger
            .info(&format!("Reconfigured with entry {}", entry.entry_id));
        Ok(entry)
    }
}

fn already_running(current: &RunningEntry) -> VandebronError {
    VandebronError::setup(format!(
        "Entry {} is already running",
        current.entry().entry_id
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::SetupMode;

    #[test]
    fn new_entry_carries_title_and_version() {
        let entry = ConfigEntry::new(EntryData {
            setup_mode: Some(SetupMode::Default),
            day_offset: None,
        });
        assert_eq!(entry.title, "Vandebron Green Energy");
        assert_eq!(entry.version, 1);
        assert_eq!(entry.day_offset(), 1);
        assert!(Uuid::parse_str(&entry.entry_id).is_ok());
    }

    #[test]
    fn from_flow_ignores_forms() {
        let flow = SetupFlow::new();
        assert!(ConfigEntry::from_flow(&flow.step_user(None)).is_none());
        let done = flow.step_confirm(EntryData {
            setup_mode: None,
            day_offset: Some(4),
        });
        assert_eq!(ConfigEntry::from_flow(&done).map(|e| e.day_offset()), Some(4));
    }
}
