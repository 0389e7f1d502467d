//! Logging setup shared by the ankivec binary and library callers.
//!
//! Everything is written to stderr: `ankivec search --json` and
//! `ankivec rewrite` print their results on stdout and must stay pipeable.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AppError, AppResult};

/// Filter used when neither a level nor `RUST_LOG` is given.
const DEFAULT_FILTER: &str = "info";

/// Install the global tracing subscriber.
///
/// `log_level` takes any `EnvFilter` directive (`debug`,
/// `ankivec_knowledge=trace`, ...) and wins over `RUST_LOG`. Colour is used
/// only when `no_color` is false, `NO_COLOR` is unset and stderr is a
/// terminal. A malformed directive or a second call is a `Config` error.
///
/// ```no_run
/// use ankivec_core::logging::init_logging;
///
/// init_logging(Some("ankivec_knowledge=debug"), false).expect("logging");
/// ```
pub fn init_logging(log_level: Option<&str>, no_color: bool) -> AppResult<()> {
    let directive = match log_level {
        Some(level) => level.to_string(),
        None => std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.to_string()),
    };

    let env_filter = EnvFilter::try_new(&directive)
        .map_err(|e| AppError::Config(format!("Invalid log filter '{}': {}", directive, e)))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(!no_color && supports_color());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))?;

    Ok(())
}

fn supports_color() -> bool {
    use std::io::IsTerminal;

    std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter_is_config_error() {
        let result = init_logging(Some("ankivec=loudest"), true);
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
