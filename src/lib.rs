pub mod app;
pub mod config;
pub mod detector;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod state;
pub mod ui;

pub use app::router;
pub use config::{load_settings, resolve_config_path, Settings};
pub use detector::{DetectorConfig, Sample, ShakeDetector, ShakeEvent};
pub use errors::ConfigurationError;
pub use state::AppState;
