//! Logger setup for the CLI and embedders.
//!
//! Plain output is meant for an operator watching a run: a short timestamp,
//! a colored level and the message. JSON output emits one object per line
//! for log shipping.

use std::io::Write;

use chrono::{DateTime, Utc};
use colored::*;
use log::{Level, LevelFilter, Record};
use serde_json::json;

use crate::config::LogFormat;
use crate::error_handling::InitializationError;

/// Installs the global logger at `level` in the given format.
///
/// `RUST_LOG` still applies per module (e.g. `RUST_LOG=sqlx=debug`); `level`
/// wins for this crate.
///
/// # Errors
///
/// Returns `InitializationError::LoggerError` if a logger is already installed.
///
/// # Examples
///
/// ```bash
/// RUST_LOG=site_compare=trace site_compare --task task.json --catalog export.json
/// site_compare --task task.json --catalog export.json --log-format json
/// ```
pub fn init_logger_with(level: LevelFilter, format: LogFormat) -> Result<(), InitializationError> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(level);
    builder.filter_module("sqlx", LevelFilter::Warn);
    builder.filter_module("site_compare", level);

    match format {
        LogFormat::Json => {
            colored::control::set_override(false);
            builder.format(|buf, record| writeln!(buf, "{}", json_line(Utc::now(), record)));
        }
        LogFormat::Plain => {
            colored::control::set_override(true);
            builder.format(|buf, record| writeln!(buf, "{}", plain_line(Utc::now(), record)));
        }
    }

    builder.try_init()?;
    Ok(())
}

fn colored_level(level: Level) -> ColoredString {
    let label = format!("{level:<5}");
    match level {
        Level::Error => label.red().bold(),
        Level::Warn => label.yellow(),
        Level::Info => label.green(),
        Level::Debug => label.blue(),
        Level::Trace => label.purple(),
    }
}

fn plain_line(now: DateTime<Utc>, record: &Record) -> String {
    let mut line = format!(
        "{} {} {}",
        now.format("%H:%M:%S").to_string().dimmed(),
        colored_level(record.level()),
        record.args()
    );
    // Engine modules stay quiet about where they log from; dependencies do not
    if !record.target().starts_with("site_compare") {
        line.push_str(&format!(" {}", format!("[{}]", record.target()).cyan()));
    }
    line
}

fn json_line(now: DateTime<Utc>, record: &Record) -> String {
    json!({
        "ts": now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        "level": record.level().as_str(),
        "target": record.target(),
        "msg": record.args().to_string(),
    })
    .to_string()
}
