use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Default model for the assistant
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const OPENAI_PROVIDER: &str = "openai";
pub const CAT_PROVIDER: &str = "cat";

const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";
const CAT_API_URL_VAR: &str = "CAT_API_URL";
const CAT_API_KEY_VAR: &str = "CAT_API_KEY";

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    /// Request timeout in seconds
    pub timeout: Option<u64>,
}

/// How the remote assistant is created and instructed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssistantConfig {
    pub name: String,
    pub description: String,
    pub instructions: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            name: "Cat Chatbot".to_string(),
            description: "You are great at finding images of cats on the internet.".to_string(),
            instructions: "Please help the user find cats.".to_string(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Model the assistant is bound to
    pub model: Option<String>,

    /// Provider configurations, keyed by `openai` and `cat`
    #[serde(default)]
    pub provider: HashMap<String, ProviderConfig>,

    pub assistant: Option<AssistantConfig>,

    pub log_level: Option<String>,
}

impl Config {
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn assistant(&self) -> AssistantConfig {
        self.assistant.clone().unwrap_or_default()
    }

    pub fn openai(&self) -> ProviderConfig {
        self.provider.get(OPENAI_PROVIDER).cloned().unwrap_or_default()
    }

    pub fn cat(&self) -> ProviderConfig {
        self.provider.get(CAT_PROVIDER).cloned().unwrap_or_default()
    }

    pub fn openai_api_key(&self) -> Result<String, ConfigError> {
        self.openai()
            .api_key
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::Missing(OPENAI_API_KEY_VAR))
    }

    /// The cat endpoint, validated as an http(s) URL
    pub fn cat_api_url(&self) -> Result<url::Url, ConfigError> {
        let raw = self
            .cat()
            .base_url
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::Missing(CAT_API_URL_VAR))?;

        let parsed = url::Url::parse(&raw)
            .map_err(|e| ConfigError::Invalid(format!("{} '{}': {}", CAT_API_URL_VAR, raw, e)))?;

        if matches!(parsed.scheme(), "http" | "https") {
            return Ok(parsed);
        }
        Err(ConfigError::Invalid(format!(
            "{} must use http or https, got '{}'",
            CAT_API_URL_VAR,
            parsed.scheme()
        )))
    }

    /// Provisioned for the cat endpoint; the fetch does not send it.
    pub fn cat_api_key(&self) -> Option<String> {
        self.cat().api_key
    }
}

/// Configuration manager that handles loading and merging configs
pub struct ConfigManager {
    global_config: Option<Config>,
    local_config: Option<Config>,
    merged_config: Config,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            global_config: None,
            local_config: None,
            merged_config: Config::default(),
        }
    }

    /// Load global and local config files, then apply environment overrides.
    /// A `.env` file in the workspace fills in variables the process
    /// environment does not set.
    pub fn load(&mut self, workspace_path: Option<&Path>) -> Result<(), ConfigError> {
        let dotenv = match workspace_path {
            Some(path) => Self::load_dotenv(&Self::dotenv_path(path))?,
            None => HashMap::new(),
        };

        self.load_with(workspace_path, |var| {
            std::env::var(var).ok().or_else(|| dotenv.get(var).cloned())
        })
    }

    fn load_with<F>(&mut self, workspace_path: Option<&Path>, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.global_config = match Self::global_config_path() {
            Some(path) => Self::load_file(&path)?,
            None => None,
        };

        self.local_config = match workspace_path {
            Some(path) => Self::load_file(&Self::local_config_path(path))?,
            None => None,
        };

        self.merged_config = self.merge_configs(&lookup);
        Self::apply_env(&mut self.merged_config, lookup);

        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.merged_config
    }

    /// ~/.config/catchat/catchat.json
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("catchat").join("catchat.json"))
    }

    /// .catchat/catchat.json
    fn local_config_path(workspace: &Path) -> PathBuf {
        workspace.join(".catchat").join("catchat.json")
    }

    /// .env
    fn dotenv_path(workspace: &Path) -> PathBuf {
        workspace.join(".env")
    }

    /// Reads `KEY=value` pairs without touching the process environment
    fn load_dotenv(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let vars = dotenvy::from_path_iter(path)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?
            .collect::<Result<HashMap<_, _>, _>>()
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), vars = vars.len(), "loaded .env file");
        Ok(vars)
    }

    fn load_file(path: &Path) -> Result<Option<Config>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.kind()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(Some(config))
    }

    /// Merge global and local configs (local takes precedence)
    fn merge_configs<F>(&self, lookup: &F) -> Config
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut merged = self.global_config.clone().unwrap_or_default();

        if let Some(ref local) = self.local_config {
            if local.model.is_some() {
                merged.model = local.model.clone();
            }

            // Per-field so a local file can set just a key or just a URL
            for (name, local_provider) in &local.provider {
                let entry = merged.provider.entry(name.clone()).or_default();
                if local_provider.api_key.is_some() {
                    entry.api_key = local_provider.api_key.clone();
                }
                if local_provider.base_url.is_some() {
                    entry.base_url = local_provider.base_url.clone();
                }
                if local_provider.timeout.is_some() {
                    entry.timeout = local_provider.timeout;
                }
            }

            if local.assistant.is_some() {
                merged.assistant = local.assistant.clone();
            }

            if local.log_level.is_some() {
                merged.log_level = local.log_level.clone();
            }
        }

        for provider in merged.provider.values_mut() {
            provider.api_key = provider.api_key.as_deref().map(|v| resolve_env_var(v, lookup));
            provider.base_url = provider.base_url.as_deref().map(|v| resolve_env_var(v, lookup));
        }

        merged
    }

    /// Environment variables win over anything read from disk
    fn apply_env<F>(config: &mut Config, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(OPENAI_API_KEY_VAR) {
            config.provider.entry(OPENAI_PROVIDER.to_string()).or_default().api_key = Some(key);
        }
        if let Some(url) = lookup(CAT_API_URL_VAR) {
            config.provider.entry(CAT_PROVIDER.to_string()).or_default().base_url = Some(url);
        }
        if let Some(key) = lookup(CAT_API_KEY_VAR) {
            config.provider.entry(CAT_PROVIDER.to_string()).or_default().api_key = Some(key);
        }
    }

}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve environment variable placeholders like {env:VAR_NAME}
fn resolve_env_var<F>(value: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if value.starts_with("{env:") && value.ends_with('}') {
        let var_name = &value[5..value.len() - 1];
        lookup(var_name).unwrap_or_else(|| value.to_string())
    } else {
        value.to_string()
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    IoError(std::io::ErrorKind),
    ParseError(String),
    Missing(&'static str),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(kind) => write!(f, "IO error: {:?}", kind),
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::Missing(var) => write!(f, "Missing setting: {}", var),
            ConfigError::Invalid(msg) => write!(f, "Invalid setting: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
