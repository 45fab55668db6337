//! Configuration loading for the zigmon process
//!
//! Handles:
//! - Hub address and WebSocket endpoint derivation
//! - HTTP listen address and port
//! - Persistence file location
//! - Log verbosity

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Config file read when `ZIGMON_CONFIG` is not set
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Path of the Zigbee log stream on the hub, fixed by the Hubitat firmware
pub const LOG_SOCKET_PATH: &str = "/zigbeeLogsocket";

#[derive(Debug, Clone, Deserialize)]
pub struct ListenerConfig {
    /// Base URL of the Hubitat hub, e.g. `http://192.168.1.50`
    pub hub_url: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: IpAddr,
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_listen_addr() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_listen_port() -> u16 {
    8080
}

fn default_data_file() -> PathBuf {
    PathBuf::from("data.json")
}

impl ListenerConfig {
    /// Load config from `ZIGMON_CONFIG` or `./config.toml`.
    /// A missing file is fatal: without a hub address there is nothing to watch.
    pub async fn load() -> Result<Self> {
        let path = std::env::var("ZIGMON_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading config file {path}"))?;
        Self::from_toml(&content).with_context(|| format!("in config file {path}"))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ListenerConfig = toml::from_str(content)?;
        if config.hub_url.trim().is_empty() {
            bail!("hub_url must not be empty");
        }
        Ok(config)
    }

    /// Derive the hub's log socket endpoint from its base URL: plain `http`
    /// maps to `ws`, every other scheme to `wss`, and any path is dropped.
    pub fn ws_endpoint(&self) -> Result<String> {
        let Some((scheme, rest)) = self.hub_url.split_once("://") else {
            bail!("hub_url must include a scheme, e.g. http://192.168.1.50");
        };
        let authority = rest.split('/').next().unwrap_or_default();
        if authority.is_empty() {
            bail!("hub_url has no host: {}", self.hub_url);
        }
        let ws_scheme = if scheme.eq_ignore_ascii_case("http") {
            "ws"
        } else {
            "wss"
        };
        Ok(format!("{ws_scheme}://{authority}{LOG_SOCKET_PATH}"))
    }
}
