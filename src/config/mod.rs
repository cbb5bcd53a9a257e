// Configuration loading and management.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub const PROD: &str = "prod";
#[allow(dead_code)]
pub const DEV: &str = "dev";
#[allow(dead_code)]
pub const TEST: &str = "test";

/// Stock defaults for the tracing middleware section.
pub const DEFAULT_SERVICE_NAME: &str = "tracingplugin";
pub const DEFAULT_AGENT_URL: &str = "http://localhost:8126";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Proxy {
    #[serde(rename = "proxy")]
    pub proxy: ProxyBox,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyBox {
    pub env: String,
    pub logs: Option<Logs>,
    pub api: Option<Api>,
    pub upstream: Option<Upstream>,
    pub tracing: Option<Tracing>,
    pub metrics: Option<Metrics>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Logs {
    pub level: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Api {
    pub name: Option<String>,
    pub port: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Upstream {
    pub backend: Option<Backend>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Backend {
    pub scheme: Option<String>,
    pub host: Option<String>,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

/// Tracing middleware section: label for emitted spans, agent base URL
/// and the tags stamped on every span.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Tracing {
    #[serde(rename = "service_name")]
    pub service_name: Option<String>,
    #[serde(rename = "agent_url")]
    pub agent_url: Option<String>,
    #[serde(rename = "global_tags", default)]
    pub global_tags: HashMap<String, String>,
}

impl Default for Tracing {
    fn default() -> Self {
        Self {
            service_name: Some(DEFAULT_SERVICE_NAME.to_string()),
            agent_url: Some(DEFAULT_AGENT_URL.to_string()),
            global_tags: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Metrics {
    pub enabled: bool,
}

// Config trait
pub trait ConfigTrait {
    fn logs(&self) -> Option<&Logs>;
    fn is_prod(&self) -> bool;
    #[allow(dead_code)]
    fn is_dev(&self) -> bool;
    #[allow(dead_code)]
    fn is_test(&self) -> bool;
    fn api(&self) -> Option<&Api>;
    fn upstream(&self) -> Option<&Upstream>;
    fn tracing(&self) -> Option<&Tracing>;
    fn metrics(&self) -> Option<&Metrics>;
}

// Config type alias for convenience
pub type Config = Proxy;

impl ConfigTrait for Config {
    fn logs(&self) -> Option<&Logs> {
        self.proxy.logs.as_ref()
    }

    fn is_prod(&self) -> bool {
        self.proxy.env == PROD
    }

    fn is_dev(&self) -> bool {
        self.proxy.env == DEV
    }

    fn is_test(&self) -> bool {
        self.proxy.env == TEST
    }

    fn api(&self) -> Option<&Api> {
        self.proxy.api.as_ref()
    }

    fn upstream(&self) -> Option<&Upstream> {
        self.proxy.upstream.as_ref()
    }

    fn tracing(&self) -> Option<&Tracing> {
        self.proxy.tracing.as_ref()
    }

    fn metrics(&self) -> Option<&Metrics> {
        self.proxy.metrics.as_ref()
    }
}

impl Config {
    /// Loads configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Resolve absolute path
        let abs_path = path
            .canonicalize()
            .with_context(|| format!("failed to resolve absolute config filepath: {:?}", path))?;

        // Read file
        let data = std::fs::read_to_string(&abs_path)
            .with_context(|| format!("read config yaml file {:?}", abs_path))?;

        Self::parse(&data).with_context(|| format!("unmarshal yaml from {:?}", abs_path))
    }

    /// Parses configuration from YAML text.
    pub fn parse(data: &str) -> Result<Self> {
        let cfg: Proxy = serde_yaml::from_str(data)?;
        Ok(cfg)
    }
}

mod test_config;


pub use test_config::new_test_config;
