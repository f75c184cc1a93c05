//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Server configuration

use crate::{RconError, Result};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

/// Conventional Source RCON port.
pub const DEFAULT_PORT: u16 = 25575;

/// Smallest accepted listen backlog.
pub const MIN_BACKLOG: u32 = 5;

/// Server configuration
///
/// The host loads and owns this value; the server takes a copy at start and
/// never changes it. Use the builder methods to customize the configuration.
///
/// # Example
///
/// ```
/// use rconix_service::ServerConfig;
/// use std::time::Duration;
///
/// let config = ServerConfig::new("127.0.0.1:25575".parse().unwrap(), "hunter2")
///     .with_max_connections(10)
///     .with_write_timeout(Duration::from_secs(5));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone)]
pub struct ServerConfig {
    /// IPv4 address and port to listen on
    pub bind_address: SocketAddr,

    /// Maximum number of concurrent sessions, inclusive
    pub max_connections: usize,

    /// Shared secret every client must present in its AUTH packet
    pub password: String,

    /// Backlog passed to `listen(2)`
    pub backlog: u32,

    /// Send an empty `RESPONSE_VALUE` after a successful AUTH
    ///
    /// Some clients expect this courtesy packet; compliant clients ignore it.
    pub auth_ack: bool,

    /// Strip colour codes and ANSI escapes from command output
    pub strip_formatting: bool,

    /// Timeout for a single write to a client
    ///
    /// A session whose peer does not drain its socket within this duration is closed.
    pub write_timeout: Duration,

    /// Longest the event loop waits before running housekeeping
    pub housekeeping_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            max_connections: 50,
            password: String::new(),
            backlog: MIN_BACKLOG,
            auth_ack: true,
            strip_formatting: true,
            write_timeout: Duration::from_secs(10),
            housekeeping_interval: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with the given bind address and password
    ///
    /// All other settings will use their default values.
    pub fn new(bind_address: SocketAddr, password: impl Into<String>) -> Self {
        Self {
            bind_address,
            password: password.into(),
            ..Default::default()
        }
    }

    /// Set the maximum number of concurrent connections
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the shared password
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Set the listen backlog
    pub fn with_backlog(mut self, backlog: u32) -> Self {
        self.backlog = backlog;
        self
    }

    /// Enable or disable the post-authentication acknowledgement packet
    pub fn with_auth_ack(mut self, enabled: bool) -> Self {
        self.auth_ack = enabled;
        self
    }

    /// Enable or disable formatting cleanup of command output
    pub fn with_strip_formatting(mut self, enabled: bool) -> Self {
        self.strip_formatting = enabled;
        self
    }

    /// Set the write timeout duration
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the housekeeping interval
    pub fn with_housekeeping_interval(mut self, interval: Duration) -> Self {
        self.housekeeping_interval = interval;
        self
    }

    /// Validate the configuration
    ///
    /// Returns [`RconError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if !self.bind_address.is_ipv4() {
            return Err(RconError::InvalidConfig(format!(
                "bind_address {} is not an IPv4 address",
                self.bind_address
            )));
        }

        if self.max_connections == 0 {
            return Err(RconError::InvalidConfig(
                "max_connections must be greater than 0".to_string(),
            ));
        }

        if self.password.is_empty() {
            return Err(RconError::InvalidConfig(
                "password must not be empty".to_string(),
            ));
        }

        if self.password.as_bytes().contains(&0) {
            return Err(RconError::InvalidConfig(
                "password must not contain NUL bytes".to_string(),
            ));
        }

        if self.backlog < MIN_BACKLOG {
            return Err(RconError::InvalidConfig(format!(
                "backlog must be at least {MIN_BACKLOG}"
            )));
        }

        if self.write_timeout.is_zero() {
            return Err(RconError::InvalidConfig(
                "write_timeout must be greater than 0".to_string(),
            ));
        }

        if self.housekeeping_interval.is_zero() {
            return Err(RconError::InvalidConfig(
                "housekeeping_interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_address", &self.bind_address)
            .field("max_connections", &self.max_connections)
            .field("password", &"<redacted>")
            .field("backlog", &self.backlog)
            .field("auth_ack", &self.auth_ack)
            .field("strip_formatting", &self.strip_formatting)
            .field("write_timeout", &self.write_timeout)
            .field("housekeeping_interval", &self.housekeeping_interval)
            .finish()
    }
}
