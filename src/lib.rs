//! Student performance insights.
//!
//! Turns the roster, analytics and prediction payloads of the student
//! performance service into dashboard view models: cohort metrics, chart-ready
//! series, a cohort/individual analytics mode, a last-selection-wins prediction
//! flow and threshold-based study recommendations.

pub mod analytics;
pub mod client;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod model;
pub mod navigation;
pub mod prediction;
pub mod recommend;
pub mod roster;
pub mod server;
pub mod session;
pub mod token;

pub use error::{InsightsError, Result};
