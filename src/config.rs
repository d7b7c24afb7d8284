use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::constants::{endpoints::DEFAULT_SERVICE_URL, limits};
use crate::credential::Credential;
use crate::error::ConfigError;
use crate::llm::{DEFAULT_LLM_BASE_URL, DEFAULT_LLM_MODEL};
use crate::session::EngineOptions;

pub const CONFIG_PATH: &str = "config.yaml";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Remote analysis service (`/api/analyze/...`)
    #[default]
    Service,
    /// Chat model called directly with the user's key
    Llm,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_url")]
    pub base_url: String,
    /// Transport-level timeout; the engine itself never times out a request
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_service_url(),
            timeout_secs: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct LlmConfig {
    pub base_url: Option<String>,
    #[serde(default = "default_llm_model")]
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            model: default_llm_model(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,

    /// Seeds the credential store; only ever set from the environment
    #[serde(skip)]
    pub api_key: Option<Credential>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            service: ServiceConfig::default(),
            llm: LlmConfig::default(),
            server: ServerConfig::default(),
            max_concurrent_requests: default_max_concurrent(),
            bus_capacity: default_bus_capacity(),
            api_key: None,
        }
    }
}

fn default_service_url() -> String {
    DEFAULT_SERVICE_URL.to_string()
}

fn default_llm_model() -> String {
    DEFAULT_LLM_MODEL.to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_max_concurrent() -> usize {
    limits::DEFAULT_MAX_CONCURRENT_REQUESTS
}

fn default_bus_capacity() -> usize {
    limits::DEFAULT_BUS_CAPACITY
}

impl AppConfig {
    /// `.env`, then `config.yaml` (optional), then environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let mut config = if Path::new(CONFIG_PATH).exists() {
            Self::from_file(CONFIG_PATH)?
        } else {
            Self::default()
        };
        config.apply_env(|key| env::var(key).ok());
        config.service_url()?;
        if config.backend == BackendKind::Llm {
            config.llm_url()?;
        }
        Ok(config)
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // Strip BOM if present
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        Ok(serde_yaml::from_str(content)?)
    }

    /// Overlay `ANALYSIS_API_URL`, `ANALYSIS_API_KEY` and `ANALYSIS_BIND_ADDR`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("ANALYSIS_API_URL").filter(|v| !v.trim().is_empty()) {
            self.service.base_url = url.trim().to_string();
        }
        if let Some(key) = lookup("ANALYSIS_API_KEY").and_then(|v| Credential::new(v).ok()) {
            self.api_key = Some(key);
        }
        if let Some(addr) = lookup("ANALYSIS_BIND_ADDR").filter(|v| !v.trim().is_empty()) {
            self.server.bind_addr = addr.trim().to_string();
        }
    }

    pub fn service_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.service.base_url).map_err(|source| ConfigError::InvalidUrl {
            url: self.service.base_url.clone(),
            source,
        })
    }

    /// Chat endpoint base for the `llm` backend
    pub fn llm_url(&self) -> Result<Url, ConfigError> {
        let raw = self.llm.base_url.as_deref().unwrap_or(DEFAULT_LLM_BASE_URL);
        Url::parse(raw).map_err(|source| ConfigError::InvalidUrl {
            url: raw.to_string(),
            source,
        })
    }

    pub fn service_timeout(&self) -> Option<Duration> {
        self.service.timeout_secs.map(Duration::from_secs)
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            max_concurrent_requests: self.max_concurrent_requests,
            bus_capacity: self.bus_capacity,
        }
    }
}
