//! Logging setup for applications
//!
//! Libraries only emit `tracing` events. Applications call [`init`] once at
//! startup to print them.

use tracing::Level;

use crate::config::AppConfig;

/// Install a formatting subscriber with the given maximum level.
///
/// Does nothing if a global subscriber is already installed.
pub fn init(level: Level) {
    let _ = tracing_subscriber::fmt().with_max_level(level).try_init();
}

/// `DEBUG` level in debug mode, `INFO` otherwise.
pub fn init_for(config: &AppConfig) {
    init(if config.debug { Level::DEBUG } else { Level::INFO });
}
