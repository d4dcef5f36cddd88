#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Statistical analytics over historical civic issue reports.
//!
//! Each stage is a pure function over a record slice: [`patterns`] builds
//! the frequency tables, [`trends`] the period deltas, [`anomalies`] flags
//! spikes and concentration, [`correlation`] finds dimension associations,
//! [`risk`] and [`forecast`] score and project, and [`recommend`] turns the
//! results into action items. [`AnalyticsEngine`] runs them in order and
//! assembles the dashboard payload.

pub mod anomalies;
pub mod config;
pub mod correlation;
pub mod engine;
pub mod forecast;
pub mod patterns;
pub mod recommend;
pub mod risk;
pub mod trends;

pub use config::AnalyticsConfig;
pub use engine::AnalyticsEngine;

use thiserror::Error;

/// Errors that can occur during analytics operations.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Threshold configuration could not be parsed.
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// A threshold configuration value is out of range.
    #[error("Invalid config: {message}")]
    InvalidConfig {
        /// Description of what went wrong.
        message: String,
    },

    /// Threshold configuration could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A time window boundary fell outside the representable range.
    #[error("Time window error: {message}")]
    TimeWindow {
        /// Description of what went wrong.
        message: String,
    },

    /// A statistic came out as NaN or infinite.
    #[error("Non-finite statistic: {message}")]
    NonFinite {
        /// Description of what went wrong.
        message: String,
    },
}
