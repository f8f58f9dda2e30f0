use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time;
use tracing::trace;

use crate::types::State;

/// Connect timeout applied to every address, regardless of how many a job holds.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Attempt one TCP connect to `address:port`.
///
/// A successful connect is dropped straight away and reported as `Open`. Every
/// failure (refused, timed out, unreachable, unresolvable) is reported as `Closed`.
pub async fn probe(address: &str, port: u16, timeout: Duration) -> State {
    match time::timeout(timeout, TcpStream::connect((address, port))).await {
        Ok(Ok(_stream)) => State::Open,
        Ok(Err(e)) => {
            trace!(%address, port, error = %e, "connect failed");
            State::Closed
        }
        Err(_) => {
            trace!(%address, port, ?timeout, "connect timed out");
            State::Closed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn listening_port_is_open() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let state = probe("127.0.0.1", port, Duration::from_secs(2)).await;
        assert_eq!(state, State::Open);
    }

    #[tokio::test]
    async fn released_port_is_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let state = probe("127.0.0.1", port, Duration::from_secs(2)).await;
        assert_eq!(state, State::Closed);
    }

    #[tokio::test]
    async fn unresolvable_address_is_closed() {
        let state = probe("not an address", 80, Duration::from_secs(1)).await;
        assert_eq!(state, State::Closed);
    }
}
