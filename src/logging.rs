use tracing_subscriber::{
    filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

const LEVELS: [LevelFilter; 5] = [
    LevelFilter::ERROR,
    LevelFilter::WARN,
    LevelFilter::INFO,
    LevelFilter::DEBUG,
    LevelFilter::TRACE,
];

/// Pick the level `verbose` steps above `base`, saturating at TRACE.
pub fn level_for(base: LevelFilter, verbose: u8) -> LevelFilter {
    let start = LEVELS.iter().position(|l| *l == base).unwrap_or(2);
    LEVELS[(start + verbose as usize).min(LEVELS.len() - 1)]
}

/// Install the global fmt subscriber. `RUST_LOG` wins when set.
pub fn init(base: LevelFilter, verbose: u8) {
    let level = level_for(base, verbose);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level.into()));

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_filter(filter),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_steps_up_and_saturates() {
        assert_eq!(level_for(LevelFilter::INFO, 0), LevelFilter::INFO);
        assert_eq!(level_for(LevelFilter::INFO, 1), LevelFilter::DEBUG);
        assert_eq!(level_for(LevelFilter::WARN, 1), LevelFilter::INFO);
        assert_eq!(level_for(LevelFilter::INFO, 9), LevelFilter::TRACE);
    }
}
