use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::{error::ValidationError, ports};

/// Body of `POST /submit`: a list of IPs and the one port to probe on each of them.
///
/// `port` is wider than a TCP port so that out-of-range values reach validation
/// instead of failing deserialization.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanRequest {
    #[serde(default)]
    pub ips: Option<Vec<String>>,
    #[serde(default)]
    pub port: u64,
}

impl ScanRequest {
    pub fn new(ips: Vec<String>, port: u64) -> Self {
        Self {
            ips: Some(ips),
            port,
        }
    }

    /// Check every rule and report all of the broken ones together.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut messages = Vec::new();

        match self.ips.as_deref() {
            None | Some([]) => messages.push("you must provide a list of ips".to_string()),
            Some(ips) => {
                for ip in ips {
                    if ip.parse::<IpAddr>().is_err() {
                        messages.push(format!("{ip} is not a valid ip address"));
                    }
                }
            }
        }

        if !ports::valid_port(self.port) {
            messages.push(format!("{} is not a valid port number", self.port));
        }

        if messages.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { messages })
        }
    }
}

/// Body returned by a successful submit.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanResponse {
    pub id: u64,
}

/// Body of `POST /query`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryRequest {
    pub id: u64,
}

/// Outcome of one probe, reported to callers as `"open"` or `"closed"`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum State {
    Open,
    Closed,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Open => f.write_str("open"),
            State::Closed => f.write_str("closed"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IpStatus {
    pub ip: String,
    pub state: State,
}

/// The stored result of one scan, either pending or final.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct QueryResponse {
    pub ready: bool,
    pub port: u16,
    #[serde(default)]
    pub status: Vec<IpStatus>,
}

impl QueryResponse {
    pub fn pending(port: u16) -> Self {
        Self {
            ready: false,
            port,
            status: Vec::new(),
        }
    }

    pub fn finished(port: u16, status: Vec<IpStatus>) -> Self {
        Self {
            ready: true,
            port,
            status,
        }
    }
}
