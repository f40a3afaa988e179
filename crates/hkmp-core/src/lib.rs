pub mod analytics;
pub mod app_config;
pub mod config;
pub mod points;

pub use analytics::{
    Analytics, AnalyticsEvent, MemoryAnalytics, NoopAnalytics, SharedAnalytics, TracingAnalytics,
};
pub use app_config::{AnalyticsMode, AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use points::ParkingPoint;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for env var {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
