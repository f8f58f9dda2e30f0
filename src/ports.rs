/// Largest port accepted anywhere in the system, for scanning and for listening.
///
/// One below the usual 65535 ceiling; requests above it are rejected.
pub const MAX_PORT: u64 = 65352;

/// Returns true if `port` is within `1..=MAX_PORT`.
pub fn valid_port(port: u64) -> bool {
    port > 0 && port <= MAX_PORT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_edges() {
        assert!(!valid_port(0));
        assert!(valid_port(1));
        assert!(valid_port(8080));
        assert!(valid_port(MAX_PORT));
        assert!(!valid_port(MAX_PORT + 1));
        assert!(!valid_port(70000));
    }
}
