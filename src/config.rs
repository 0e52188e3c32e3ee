use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

/// Process-wide configuration, constructed once at startup and passed into
/// each component explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    // LLM configuration (OpenAI-compatible: Ollama, LM Studio, vLLM, OpenAI, etc.)
    #[serde(default = "default_llm_url")]
    pub llm_api_url: String,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    #[serde(default)]
    pub llm_api_key: Option<String>,
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,

    // HTTP surface
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    // Note store
    #[serde(default = "default_database_path")]
    pub database_path: String,

    // Calendar side effect
    #[serde(default = "default_calendar_events_url")]
    pub calendar_events_url: String,
    #[serde(default = "default_calendar_token_env")]
    pub calendar_token_env: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_llm_url() -> String {
    "http://localhost:11434/v1".to_string()
}

fn default_llm_model() -> String {
    "llama3.2".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    30
}

fn default_bind_addr() -> String {
    "127.0.0.1:8787".to_string()
}

fn default_database_path() -> String {
    "braindump_notes.db".to_string()
}

fn default_calendar_events_url() -> String {
    "https://www.googleapis.com/calendar/v3/calendars/primary/events".to_string()
}

fn default_calendar_token_env() -> String {
    "CALENDAR_ACCESS_TOKEN".to_string()
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm_api_url: default_llm_url(),
            llm_model: default_llm_model(),
            llm_api_key: None,
            llm_timeout_secs: default_llm_timeout_secs(),
            bind_addr: default_bind_addr(),
            database_path: default_database_path(),
            calendar_events_url: default_calendar_events_url(),
            calendar_token_env: default_calendar_token_env(),
            timezone: default_timezone(),
        }
    }
}

impl AppConfig {
    /// Get the directory containing the executable
    fn get_base_dir() -> PathBuf {
        match std::env::current_exe() {
            Ok(exe_path) => exe_path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")),
            Err(_) => PathBuf::from("."),
        }
    }

    /// Get the path to the config file (relative to executable)
    pub fn config_path() -> PathBuf {
        Self::get_base_dir().join("braindump_config.toml")
    }

    /// Load config from braindump_config.toml (next to executable), falling
    /// back to defaults plus environment variables.
    pub fn load() -> Self {
        let path = Self::config_path();

        if let Ok(contents) = fs::read_to_string(&path) {
            match toml::from_str::<AppConfig>(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {:?}", path);
                    return config;
                }
                Err(e) => {
                    tracing::error!("Failed to parse {:?}: {}", path, e);
                }
            }
        }

        tracing::warn!("No config file found, using defaults + env vars");
        Self::from_env()
    }

    /// Load from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = env::var("LLM_API_URL") {
            config.llm_api_url = url;
        }
        if let Ok(model) = env::var("LLM_MODEL") {
            config.llm_model = model;
        }
        if let Ok(key) = env::var("LLM_API_KEY") {
            config.llm_api_key = Some(key);
        }
        if let Ok(secs) = env::var("LLM_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                config.llm_timeout_secs = secs;
            }
        }
        if let Ok(addr) = env::var("BRAINDUMP_BIND") {
            config.bind_addr = addr;
        }
        if let Ok(path) = env::var("BRAINDUMP_DATABASE_PATH") {
            if !path.trim().is_empty() {
                config.database_path = path;
            }
        }
        if let Ok(url) = env::var("CALENDAR_EVENTS_URL") {
            config.calendar_events_url = url;
        }
        if let Ok(var) = env::var("CALENDAR_TOKEN_ENV") {
            if !var.trim().is_empty() {
                config.calendar_token_env = var;
            }
        }
        if let Ok(tz) = env::var("BRAINDUMP_TIMEZONE") {
            if !tz.trim().is_empty() {
                config.timezone = tz;
            }
        }

        config
    }

    pub fn llm_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.llm_timeout_secs)
    }
}
