use thiserror::Error;

/// A scan request that broke one or more rules. Every broken rule contributes a line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .messages.join("\n"))]
pub struct ValidationError {
    pub messages: Vec<String>,
}

/// Returned by `Dispatcher::submit` once the intake queue has been closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("dispatcher intake queue is closed")]
pub struct DispatcherClosed;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("must provide a listen port")]
    MissingListenPort,
    #[error("listen port is not within valid port range")]
    ListenPortOutOfRange,
    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("you must provide a pscan server host")]
    MissingHost,
    #[error("pscan server host is not valid")]
    InvalidHost,
    #[error("you must provide a list of ips to scan")]
    MissingIps,
    #[error("you must provide a port to scan")]
    MissingPort,
    #[error("{0} is not a valid port to scan")]
    InvalidPort(String),
    #[error("you must provide an scan id to query")]
    MissingScanId,
    #[error("not a valid scan id")]
    InvalidScanId,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("could not make call to pscan server, error was: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("unexpected response body from pscan server, error was: {0}")]
    UnexpectedBody(#[source] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_joins_lines() {
        let err = ValidationError {
            messages: vec!["first".into(), "second".into()],
        };
        assert_eq!(err.to_string(), "first\nsecond");
    }
}
