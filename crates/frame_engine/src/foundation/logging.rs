//! Logging utilities

pub use log::{debug, error, info, trace, warn, LevelFilter};

/// Initialize the logging system from `RUST_LOG` only
pub fn init() {
    env_logger::init();
}

/// Initialize logging with a default level taken from configuration.
///
/// `RUST_LOG` directives, when present, are applied on top of the default so
/// module-level overrides keep working. Calling this twice is harmless; the
/// second call leaves the first logger in place.
pub fn init_with_level(level: &str) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(parse_level(level));

    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    if builder.try_init().is_err() {
        log::debug!("Logger already initialized, keeping existing configuration");
    }
}

/// Parse a configured level name, falling back to `Info` for unknown names
pub fn parse_level(level: &str) -> LevelFilter {
    level.trim().parse().unwrap_or(LevelFilter::Info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level_accepts_known_names() {
        assert_eq!(parse_level("debug"), LevelFilter::Debug);
        assert_eq!(parse_level("WARN"), LevelFilter::Warn);
        assert_eq!(parse_level(" trace "), LevelFilter::Trace);
        assert_eq!(parse_level("off"), LevelFilter::Off);
    }

    #[test]
    fn test_parse_level_falls_back_to_info() {
        assert_eq!(parse_level("loud"), LevelFilter::Info);
        assert_eq!(parse_level(""), LevelFilter::Info);
    }
}
