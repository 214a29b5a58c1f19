pub mod manager;

pub use manager::{AssistantConfig, Config, ConfigError, ConfigManager, ProviderConfig};
