use std::env;
use std::net::Ipv6Addr;

use serde::{Deserialize, Serialize};

use crate::{MetricsError, Result};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BASE_PATH: &str = "/rhq-metrics/metrics";

pub const HOST_ENV: &str = "RHQ_METRICS_HOST";
pub const PORT_ENV: &str = "RHQ_METRICS_PORT";
pub const PATH_ENV: &str = "RHQ_METRICS_PATH";

/// How a received HTTP response is judged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusPolicy {
    /// Any response that arrives counts as delivered.
    Lenient,
    /// Non-2xx responses resolve with `MetricsError::UnexpectedStatus`.
    #[default]
    RequireSuccess,
}

/// Connection settings for one [`MetricsClient`](crate::MetricsClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    #[serde(alias = "path")]
    pub base_path: String,
    pub status_policy: StatusPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            base_path: DEFAULT_BASE_PATH.to_string(),
            status_policy: StatusPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `RHQ_METRICS_HOST`, `RHQ_METRICS_PORT` and `RHQ_METRICS_PATH`,
    /// falling back to the defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(host) = env::var(HOST_ENV) {
            config.host = host;
        }
        if let Ok(port) = env::var(PORT_ENV) {
            config.port = port.parse().map_err(|e| {
                MetricsError::Configuration(format!("{} must be a port number: {}", PORT_ENV, e))
            })?;
        }
        if let Ok(path) = env::var(PATH_ENV) {
            config.base_path = path;
        }

        Ok(config)
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn with_status_policy(mut self, policy: StatusPolicy) -> Self {
        self.status_policy = policy;
        self
    }

    /// `http://host:port`, with IPv6 literals in brackets.
    pub fn base_url(&self) -> String {
        if self.host.parse::<Ipv6Addr>().is_ok() {
            format!("http://[{}]:{}", self.host, self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }

    /// Non-empty segments of the base path, in order.
    pub(crate) fn path_segments(&self) -> impl Iterator<Item = &str> {
        self.base_path.split('/').filter(|s| !s.is_empty())
    }
}
