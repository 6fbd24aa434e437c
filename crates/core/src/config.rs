use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variables checked for the API key, in order, before `llm.api_key`.
pub const API_KEY_VARS: [&str; 2] = ["OPENROUTER_API_KEY", "DEEPSEEK_API_KEY"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub categorize: CategorizeConfig,
    pub resume: ResumeConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub app_title: Option<String>,
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "anthropic/claude-sonnet-4".to_string(),
            timeout_secs: 30,
            app_title: Some("Job Data Extractor".to_string()),
            api_key: None,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CategorizeConfig {
    pub max_tokens: u32,
    pub temperature: f32,
    /// Minimum spacing between consecutive remote calls.
    pub courtesy_delay_ms: u64,
    pub rate_limit_backoff_ms: u64,
    /// Attempts per company when the endpoint answers 429.
    pub max_attempts: u32,
    /// Directory of extra `*.toml` category rules.
    pub rules_path: Option<String>,
}

impl Default for CategorizeConfig {
    fn default() -> Self {
        Self {
            max_tokens: 50,
            temperature: 0.1,
            courtesy_delay_ms: 1200,
            rate_limit_backoff_ms: 2000,
            max_attempts: 2,
            rules_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeConfig {
    pub max_chars: usize,
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for ResumeConfig {
    fn default() -> Self {
        Self {
            max_chars: 15_000,
            max_tokens: 200,
            temperature: 0.1,
            max_attempts: 3,
            backoff_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub max_column_width: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            max_column_width: 50,
        }
    }
}

impl AppConfig {
    /// Resolves the API key from the environment first, then the config file.
    pub fn api_key(&self) -> Option<String> {
        API_KEY_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .chain(self.llm.api_key.clone())
            .map(|k| k.trim().to_string())
            .find(|k| !k.is_empty())
    }
}

/// Loads settings from `path` (or optional `config/default`), then `JOBSHEET_*` env vars.
pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    settings = settings.add_source(
        config::Environment::with_prefix("JOBSHEET")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}
