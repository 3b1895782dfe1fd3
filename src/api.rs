//! Vandebron forecast API integration
//!
//! Two endpoints are used per forecast day: the greenest three-hour window
//! and the solar/wind/green share forecast. Failures come back as
//! [`FetchError`] so callers can tell a missing day apart from a broken setup.

pub mod client;
pub mod types;

pub use client::{ForecastSource, VandebronClient, WINDOW_SIZE};
pub use types::{FetchError, FetchResult, ForecastDay, ForecastPoint, WindowRecord};
