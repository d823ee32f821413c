use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::duration;
use crate::config::error::Result;

/// Broker, queue and consumer parameters read from `config.json`.
///
/// Every key is optional; anything absent keeps the zero value of its type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    #[serde(rename = "serverURL")]
    pub server_url: String,
    pub queue: QueueSettings,
    pub consume: ConsumeSettings,
    pub send: SendSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QueueSettings {
    pub queue_name: String,
    pub durable: bool,
    pub auto_delete: bool,
    pub exclusive: bool,
    pub no_wait: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConsumeSettings {
    pub consumer: String,
    pub auto_ack: bool,
    pub exclusive: bool,
    pub no_local: bool,
    pub no_wait: bool,
}

/// Publisher parameters. Parsed for completeness, nothing publishes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendSettings {
    #[serde(with = "duration")]
    pub frequency: Duration,
    pub message: String,
    pub exchange: String,
}

impl Configuration {
    /// Read and parse the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        debug!("Reading config file {}", path.display());
        let content = fs::read_to_string(path)?;

        debug!("Parsing config file");
        let config: Configuration = serde_jsonc::from_str(&content)?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// `server_url` with the password, if any, masked for logging.
    pub fn redacted_server_url(&self) -> String {
        let url = self.server_url.as_str();
        let Some((scheme, rest)) = url.split_once("://") else {
            return url.to_string();
        };

        let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        let (authority, path) = rest.split_at(authority_end);
        let Some((userinfo, host)) = authority.rsplit_once('@') else {
            return url.to_string();
        };

        match userinfo.split_once(':') {
            Some((user, _)) => format!("{scheme}://{user}:***@{host}{path}"),
            None => url.to_string(),
        }
    }

    /// Like [`Configuration::load`], but falls back to the zero-valued
    /// configuration when the file is missing or malformed.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Using default configuration, could not load {}: {}",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }
}
