//! Tracing subscriber setup.

use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::error::ManagerError;

/// Install the global subscriber with the given level and output format.
///
/// `RUST_LOG` overrides `level` when set. Pass `format = "json"` for
/// structured JSON output; any other value is human-readable text. Returns
/// `false` when a subscriber was already installed, which is not an error.
pub fn init_logging(level: &str, format: &str) -> Result<bool, ManagerError> {
    let configured = EnvFilter::try_new(level).map_err(|e| ManagerError::Logging(format!("{level:?}: {e}")))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or(configured);

    let installed = if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true))
            .try_init()
    };
    Ok(installed.is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_is_not_an_error() {
        init_logging("info", "text").unwrap();
        assert!(!init_logging("debug", "json").unwrap());
    }

    #[test]
    fn bad_level_is_rejected() {
        assert!(matches!(init_logging("dcr_sync=loud", "text"), Err(ManagerError::Logging(_))));
    }
}
