//! # Vandebron Green - green energy forecast sensors
//!
//! Polls the Vandebron forecast API on a fixed interval and exposes the
//! greenest three-hour window and the solar/wind/green forecast of the next
//! few days as read-only sensors.
//!
//! ## Architecture
//!
//! - `api`: HTTP client for the two forecast endpoints
//! - `coordinator`: periodic and on-demand refresh, snapshot publication
//! - `sensor`: sensor catalogue and projections over the latest snapshot
//! - `setup`: two-step setup flow producing the entry data
//! - `entry`: config entry persistence and setup/unload of a running entry
//! - `config`: YAML service configuration and validation
//! - `logging`: structured logging and tracing
//! - `web`: HTTP API (feature `web`)

pub mod api;
pub mod config;
pub mod coordinator;
pub mod entry;
pub mod error;
pub mod logging;
pub mod sensor;
pub mod setup;
#[cfg(feature = "web")]
pub mod web;

#[cfg(all(test, feature = "web"))]
mod web_tests;

// Re-export commonly used types
pub use config::Config;
pub use coordinator::{CoordinatorHandle, RefreshCoordinator, Snapshot};
pub use entry::{ConfigEntry, EntryStore, Integration};
pub use error::{Result, VandebronError};
pub use sensor::SensorPlatform;
pub use setup::{EntryData, SetupFlow};
