// Configuration loading

pub mod settings;

pub use settings::{CacheSettings, ConfigError, MatrixSettings, Settings, ENV_CONFIG};
