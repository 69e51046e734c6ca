use std::time::Duration;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{ConnectorError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "cronlink.toml";
pub const DEFAULT_TOPIC: &str = "cron-function";
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";
pub const DEFAULT_REBUILD_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_LISTING_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

/// Top-level config (cronlink.toml + CRONLINK_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub connector: ReconcileConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the function gateway, e.g. `http://127.0.0.1:8080`.
    pub url: String,
    /// Timeout applied to every outbound HTTP request.
    #[serde(default = "default_upstream_timeout")]
    pub upstream_timeout_secs: u64,
    /// Attach basic auth credentials to gateway requests.
    #[serde(default)]
    pub basic_auth: bool,
    /// Directory holding `basic-auth-user` and `basic-auth-password`.
    pub secret_mount_path: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Annotation value a function must carry under `topic` to be scheduled.
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_rebuild_interval")]
    pub rebuild_interval_secs: u64,
    /// Upper bound on each registry listing call, separate from the tick interval.
    #[serde(default = "default_listing_timeout")]
    pub listing_timeout_secs: u64,
    /// Route every invocation through the async endpoint.
    #[serde(default)]
    pub async_invocation: bool,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default = "bool_true")]
    pub print_response: bool,
    #[serde(default)]
    pub print_response_body: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            rebuild_interval_secs: DEFAULT_REBUILD_INTERVAL_SECS,
            listing_timeout_secs: DEFAULT_LISTING_TIMEOUT_SECS,
            async_invocation: false,
            content_type: default_content_type(),
            print_response: true,
            print_response_body: false,
        }
    }
}

impl ReconcileConfig {
    pub fn rebuild_interval(&self) -> Duration {
        Duration::from_secs(self.rebuild_interval_secs)
    }

    pub fn listing_timeout(&self) -> Duration {
        Duration::from_secs(self.listing_timeout_secs)
    }
}

impl GatewayConfig {
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

fn bool_true() -> bool {
    true
}
fn default_topic() -> String {
    DEFAULT_TOPIC.to_string()
}
fn default_content_type() -> String {
    DEFAULT_CONTENT_TYPE.to_string()
}
fn default_rebuild_interval() -> u64 {
    DEFAULT_REBUILD_INTERVAL_SECS
}
fn default_listing_timeout() -> u64 {
    DEFAULT_LISTING_TIMEOUT_SECS
}
fn default_upstream_timeout() -> u64 {
    DEFAULT_UPSTREAM_TIMEOUT_SECS
}

impl ConnectorConfig {
    /// Load config from a TOML file with environment overrides, then validate.
    ///
    /// Sources, lowest precedence first:
    ///   1. the TOML file (explicit path, else `cronlink.toml`; may be absent)
    ///   2. bare `gateway_url`, kept for compatibility with existing deployments
    ///   3. `CRONLINK_*` variables, nested with `__` (`CRONLINK_GATEWAY__URL`)
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path.unwrap_or(DEFAULT_CONFIG_PATH);

        let config: ConnectorConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::raw().only(&["gateway_url"]).map(|_| "gateway.url".into()))
            .merge(Env::prefixed("CRONLINK_").split("__"))
            .extract()
            .map_err(|e| ConnectorError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the loop cannot run with. Called once at startup.
    pub fn validate(&self) -> Result<()> {
        let url = self.gateway.url.trim();
        if url.is_empty() {
            return Err(ConnectorError::Config("gateway url not set".to_string()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConnectorError::Config(format!(
                "gateway url must start with http:// or https://, got {url}"
            )));
        }
        if self.connector.topic.trim().is_empty() {
            return Err(ConnectorError::Config("topic must not be empty".to_string()));
        }
        for (name, value) in [
            ("rebuild_interval_secs", self.connector.rebuild_interval_secs),
            ("listing_timeout_secs", self.connector.listing_timeout_secs),
            ("upstream_timeout_secs", self.gateway.upstream_timeout_secs),
        ] {
            if value == 0 {
                return Err(ConnectorError::Config(format!("{name} must be greater than 0")));
            }
        }
        if self.gateway.basic_auth
            && self.gateway.secret_mount_path.is_none()
            && (self.gateway.username.is_none() || self.gateway.password.is_none())
        {
            return Err(ConnectorError::Config(
                "basic_auth requires secret_mount_path or username and password".to_string(),
            ));
        }
        Ok(())
    }

    /// Gateway base URL without a trailing slash.
    pub fn gateway_url(&self) -> &str {
        self.gateway.url.trim().trim_end_matches('/')
    }
}
