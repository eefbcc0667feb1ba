//! Logging setup
//!
//! Built on the standard `log` crate with `env_logger` as the backend. Call
//! [`init_logging`] once at startup, then use the `log` macros anywhere:
//!
//! ```rust,no_run
//! use tag_groups_core::config::LoggingConfig;
//!
//! tag_groups_core::logging::init_logging(&LoggingConfig::default()).unwrap();
//! log::info!("tag group store ready");
//! ```

use std::sync::Once;

use crate::config::LoggingConfig;

static INIT: Once = Once::new();

/// Initialize the global logger.
///
/// Safe to call multiple times; only the first call installs a logger. If
/// another logger is already installed the call is a no-op.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    config.validate()?;
    INIT.call_once(|| {
        let _ = env_logger::Builder::new()
            .filter_level(config.level_filter())
            .format_timestamp_millis()
            .format_module_path(false)
            .try_init();
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_ok() {
        let config = LoggingConfig { level: "debug".into() };
        assert!(init_logging(&config).is_ok());
        assert!(init_logging(&config).is_ok());
    }

    #[test]
    fn test_invalid_level_rejected() {
        let config = LoggingConfig { level: "chatty".into() };
        assert!(init_logging(&config).is_err());
    }
}
