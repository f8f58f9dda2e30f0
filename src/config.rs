use std::time::Duration;

use crate::dispatcher::DispatcherConfig;
use crate::error::ConfigError;
use crate::ports;
use crate::probe::DEFAULT_PROBE_TIMEOUT;

pub const DEFAULT_LISTEN_PORT: u16 = 8080;

/// How long in-flight HTTP requests may run after a shutdown signal.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Runtime configuration for the scan server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_port: u16,
    pub grace_period: Duration,
    pub dispatcher: DispatcherConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_port: DEFAULT_LISTEN_PORT,
            grace_period: DEFAULT_GRACE_PERIOD,
            dispatcher: DispatcherConfig::default(),
        }
    }
}

/// Unvalidated server settings, as they arrive from the command line.
#[derive(Debug, Clone, Default)]
pub struct ServerArgs {
    pub listen_port: Option<u64>,
    pub probe_timeout_ms: Option<u64>,
    pub grace_period_secs: Option<u64>,
    pub queue_capacity: Option<usize>,
    pub max_concurrent_probes: Option<usize>,
}

impl ServerArgs {
    /// Validate the raw settings and fill in defaults for anything left out.
    pub fn validate(self) -> Result<ServerConfig, ConfigError> {
        let port = self.listen_port.ok_or(ConfigError::MissingListenPort)?;
        if !ports::valid_port(port) {
            return Err(ConfigError::ListenPortOutOfRange);
        }
        let listen_port =
            u16::try_from(port).map_err(|_| ConfigError::ListenPortOutOfRange)?;

        let probe_timeout = match self.probe_timeout_ms {
            Some(0) => return Err(ConfigError::ZeroValue("probe timeout")),
            Some(ms) => Duration::from_millis(ms),
            None => DEFAULT_PROBE_TIMEOUT,
        };
        let queue_capacity = match self.queue_capacity {
            Some(0) => return Err(ConfigError::ZeroValue("queue capacity")),
            Some(n) => n,
            None => 1,
        };
        if self.max_concurrent_probes == Some(0) {
            return Err(ConfigError::ZeroValue("max concurrent probes"));
        }

        Ok(ServerConfig {
            listen_port,
            grace_period: self
                .grace_period_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_GRACE_PERIOD),
            dispatcher: DispatcherConfig {
                queue_capacity,
                probe_timeout,
                max_concurrent_probes: self.max_concurrent_probes,
            },
        })
    }
}
