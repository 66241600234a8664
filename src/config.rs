use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.toml";
const DEFAULT_BASE_API_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    server: ServerSection,
    provider: ProviderSection,
    generation: GenerationSection,
    storage: StorageSection,
    cors: CorsSection,
    dashboard: DashboardSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ServerSection {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ProviderSection {
    binding: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct GenerationSection {
    temperature: Option<f64>,
    top_p: Option<f64>,
    top_k: Option<u32>,
    max_output_tokens: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct StorageSection {
    database_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct CorsSection {
    origins: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct DashboardSection {
    host: Option<String>,
    port: Option<u16>,
    base_api_url: Option<String>,
    api_url: Option<String>,
    logs_url: Option<String>,
    feedback_url: Option<String>,
    offline_feedback_path: Option<String>,
}

/// Which Gemini binding serves completions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderBinding {
    /// The rig-core Gemini client.
    Rig,
    /// Direct calls to the `generateContent` REST endpoint.
    Rest,
}

impl ProviderBinding {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rig" | "generativeai" => Ok(Self::Rig),
            "rest" | "genai" => Ok(Self::Rest),
            other => bail!("Unknown provider binding '{}' (expected 'rig' or 'rest')", other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rig => "rig",
            Self::Rest => "rest",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Rig => "gemini-2.5-flash",
            Self::Rest => "gemini-2.0-flash-001",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub binding: ProviderBinding,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

/// Sampling parameters sent with every completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub max_output_tokens: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            top_k: 50,
            max_output_tokens: 2048,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

impl CorsOrigins {
    /// Parses a comma-separated origin list. `*` allows any origin; a list with no
    /// usable entries allows none.
    pub fn parse(raw: &str) -> Self {
        Self::from_list(raw.split(',').map(str::to_string).collect())
    }

    pub fn from_list(origins: Vec<String>) -> Self {
        let origins: Vec<String> = origins
            .into_iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        if origins.iter().any(|o| o == "*") {
            Self::Any
        } else {
            Self::List(origins)
        }
    }
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub host: String,
    pub port: u16,
    pub base_api_url: String,
    pub diagnose_url: String,
    pub logs_url: String,
    pub feedback_url: String,
    pub offline_feedback_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub provider: ProviderConfig,
    pub generation: GenerationConfig,
    pub database_path: PathBuf,
    pub cors: CorsOrigins,
    pub dashboard: DashboardConfig,
}

impl Config {
    /// Builds the configuration from an optional TOML document and an environment lookup.
    /// Environment values win over file values, which win over defaults.
    pub fn from_sources<F>(toml_source: Option<&str>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: ConfigFile = match toml_source {
            Some(content) => toml::from_str(content).context("Failed to parse config file")?,
            None => ConfigFile::default(),
        };
        let env = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match env("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT: {}", raw))?,
            None => file.server.port.unwrap_or(8000),
        };

        let binding = match env("LLM_BINDING").or(file.provider.binding) {
            Some(raw) => ProviderBinding::parse(&raw)?,
            None => ProviderBinding::Rig,
        };
        let api_key = env("GEMINI_API_KEY")
            .or_else(|| env("GOOGLE_API_KEY"))
            .or(file.provider.api_key)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        let model = env("LLM_MODEL")
            .or(file.provider.model)
            .unwrap_or_else(|| binding.default_model().to_string());

        let defaults = GenerationConfig::default();
        let generation = GenerationConfig {
            temperature: file.generation.temperature.unwrap_or(defaults.temperature),
            top_p: file.generation.top_p.unwrap_or(defaults.top_p),
            top_k: file.generation.top_k.unwrap_or(defaults.top_k),
            max_output_tokens: file
                .generation
                .max_output_tokens
                .unwrap_or(defaults.max_output_tokens),
        };

        let cors = match (lookup("CORS_ORIGINS"), file.cors.origins) {
            (Some(raw), _) => CorsOrigins::parse(&raw),
            (None, Some(origins)) => CorsOrigins::from_list(origins),
            (None, None) => CorsOrigins::Any,
        };

        let base_api_url = env("BASE_API_URL")
            .or(file.dashboard.base_api_url)
            .unwrap_or_else(|| DEFAULT_BASE_API_URL.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();
        let dashboard_port = match env("DASHBOARD_PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid DASHBOARD_PORT: {}", raw))?,
            None => file.dashboard.port.unwrap_or(8501),
        };

        let dashboard = DashboardConfig {
            host: env("DASHBOARD_HOST")
                .or(file.dashboard.host)
                .unwrap_or_else(|| "127.0.0.1".to_string()),
            port: dashboard_port,
            diagnose_url: env("API_URL")
                .or(file.dashboard.api_url)
                .unwrap_or_else(|| format!("{}/api/diagnose", base_api_url)),
            logs_url: env("LOGS_URL")
                .or(file.dashboard.logs_url)
                .unwrap_or_else(|| format!("{}/api/logs", base_api_url)),
            feedback_url: env("FEEDBACK_URL")
                .or(file.dashboard.feedback_url)
                .unwrap_or_else(|| format!("{}/api/feedback", base_api_url)),
            offline_feedback_path: env("OFFLINE_FEEDBACK_PATH")
                .or(file.dashboard.offline_feedback_path)
                .unwrap_or_else(|| "feedback_offline.jsonl".to_string())
                .into(),
            base_api_url,
        };

        Ok(Self {
            host: env("HOST")
                .or(file.server.host)
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            provider: ProviderConfig {
                binding,
                api_key,
                model,
                base_url: file
                    .provider
                    .base_url
                    .unwrap_or_else(|| crate::llm::GEMINI_BASE_URL.to_string()),
                timeout_secs: file.provider.timeout_secs.unwrap_or(60),
            },
            generation,
            database_path: env("DATABASE_PATH")
                .or(file.storage.database_path)
                .unwrap_or_else(|| "symptom_history.db".to_string())
                .into(),
            cors,
            dashboard,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = if path.exists() {
            Some(
                std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?,
            )
        } else {
            None
        };

        Self::from_sources(content.as_deref(), |key| std::env::var(key).ok())
    }

    pub fn load() -> Result<Self> {
        Self::from_file(Path::new(CONFIG_FILE))
    }
}
