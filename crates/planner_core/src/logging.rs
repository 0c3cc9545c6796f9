//! Process-wide logging bootstrap.
//!
//! Core modules only use the `log` facade and emit `event=... module=...
//! status=...` messages. The binary calls [`init_logging`] once at start-up;
//! later calls with the same level are no-ops.

use flexi_logger::{Logger, LoggerHandle};
use once_cell::sync::OnceCell;

pub const LOG_ENV_VAR: &str = "PLANNER_LOG";
pub const DEFAULT_LOG_LEVEL: &str = "warn";

static LOGGING_STATE: OnceCell<LoggingState> = OnceCell::new();

struct LoggingState {
    level: &'static str,
    _logger: LoggerHandle,
}

/// Starts the stderr logger at `level`.
///
/// # Errors
/// - Unsupported level names.
/// - A second initialisation with a different level.
/// - Backend start-up failures.
pub fn init_logging(level: &str) -> Result<(), String> {
    let normalized = normalize_level(level)?;

    let state = LOGGING_STATE.get_or_try_init(|| -> Result<LoggingState, String> {
        let logger = Logger::try_with_str(normalized)
            .map_err(|err| format!("invalid log level `{normalized}`: {err}"))?
            .log_to_stderr()
            .start()
            .map_err(|err| format!("failed to start logger: {err}"))?;

        log::debug!(
            "event=logging_init module=logging status=ok level={}",
            normalized
        );
        Ok(LoggingState {
            level: normalized,
            _logger: logger,
        })
    })?;

    if state.level != normalized {
        return Err(format!(
            "logging already initialized with level `{}`; refusing to switch to `{}`",
            state.level, normalized
        ));
    }
    Ok(())
}

/// Level requested through `PLANNER_LOG`, or the default.
pub fn level_from_env() -> String {
    std::env::var(LOG_ENV_VAR)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}

fn normalize_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        "off" | "none" => Ok("off"),
        other => Err(format!("unsupported log level `{other}`")),
    }
}
