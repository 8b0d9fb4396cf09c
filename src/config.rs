//! Connection settings handed to the transport, and facade tunables.

use serde::{Deserialize, Serialize};
use std::{env, str::FromStr};

use crate::{
    error::{Error, FsResult},
    facade::TextEncoding,
};

/// Transport used to reach the remote filesystem
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    #[default]
    Sftp,
}

impl FromStr for Driver {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sftp" => Ok(Self::Sftp),
            other => Err(Error::InvalidInput(format!("unknown driver: {other}"))),
        }
    }
}

/// Where and as whom to connect. Opaque to the facade: the values are only
/// passed through to whoever establishes the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub ticket: Option<String>,
    #[serde(default)]
    pub driver: Driver,
}

fn default_port() -> u16 {
    22
}

fn default_user() -> String {
    env::var("USER").unwrap_or_else(|_| "root".to_owned())
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: default_port(),
            user: default_user(),
            ticket: None,
            driver: Driver::default(),
        }
    }
}

impl RemoteConfig {
    /// Reads `RFS_HOST`, `RFS_PORT`, `RFS_USER`, `RFS_TICKET` and `RFS_DRIVER`,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> FsResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> FsResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("RFS_HOST") {
            config.host = host;
        }

        if let Some(port) = lookup("RFS_PORT") {
            config.port = port
                .parse()
                .map_err(|_| Error::InvalidInput(format!("invalid port: {port}")))?;
        }

        if let Some(user) = lookup("RFS_USER") {
            config.user = user;
        }

        config.ticket = lookup("RFS_TICKET").filter(|t| !t.is_empty());

        if let Some(driver) = lookup("RFS_DRIVER") {
            config.driver = driver.parse()?;
        }

        Ok(config)
    }

    /// Socket address pair for the connection step
    pub fn address(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }
}

/// Tunables for [`Facade`](crate::facade::Facade)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacadeConfig {
    /// Bytes requested per read while sniffing headers
    pub head_chunk_size: usize,
    pub head_encoding: TextEncoding,
    /// Decimal places used by scaled size values
    pub size_decimals: usize,
    /// Log every size measurement at `info` level
    pub echo_sizes: bool,
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            head_chunk_size: 1024,
            head_encoding: TextEncoding::default(),
            size_decimals: 2,
            echo_sizes: false,
        }
    }
}
