use env_logger::Builder;

pub fn initialize_logging_layer() {
    let mut builder = Builder::new();
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    builder.filter_level(level_filter_from_str(&log_level));

    if builder.try_init().is_ok() {
        log::info!("Initialized the logger ..")
    }
}

fn level_filter_from_str(log_level: &str) -> log::LevelFilter {
    match log_level.to_lowercase().as_str() {
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "off" => log::LevelFilter::Off,
        _ => log::LevelFilter::Info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parsing() {
        assert_eq!(level_filter_from_str("DEBUG"), log::LevelFilter::Debug);
        assert_eq!(level_filter_from_str("off"), log::LevelFilter::Off);
        // Anything unknown falls back to info
        assert_eq!(level_filter_from_str("loud"), log::LevelFilter::Info);
    }
}
