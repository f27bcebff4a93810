//! Stderr logging for the tracker binaries and tests.
//!
//! Records from the tracker's own crates are shown at the configured level;
//! records from every other target are capped at [`LoggerConfig::foreign_level`]
//! so dependency chatter stays out of per-frame debug output. Library code
//! only talks to the `log` facade.

use std::io::Write;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

/// Target prefix shared by every crate in this workspace.
const TRACKER_TARGET: &str = "marker_tracker";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoggerConfig {
    /// Level for `marker_tracker*` targets.
    pub level: LevelFilter,
    /// Level for any other target.
    pub foreign_level: LevelFilter,
    /// Prefix lines with the time since the logger was installed.
    pub elapsed: bool,
}

impl LoggerConfig {
    pub fn new(level: LevelFilter) -> Self {
        Self {
            level,
            foreign_level: level.min(LevelFilter::Warn),
            elapsed: true,
        }
    }

    fn level_for(&self, target: &str) -> LevelFilter {
        if target.starts_with(TRACKER_TARGET) {
            self.level
        } else {
            self.foreign_level
        }
    }

    fn max_level(&self) -> LevelFilter {
        self.level.max(self.foreign_level)
    }
}

fn format_line(config: &LoggerConfig, elapsed: Duration, record: &Record) -> String {
    let target = record
        .target()
        .strip_prefix(TRACKER_TARGET)
        .and_then(|rest| rest.strip_prefix("::"))
        .unwrap_or(record.target());
    if config.elapsed {
        format!(
            "[{:9.3}s {:<5} {target}] {}",
            elapsed.as_secs_f64(),
            record.level(),
            record.args()
        )
    } else {
        format!("[{:<5} {target}] {}", record.level(), record.args())
    }
}

struct TrackerLogger {
    config: LoggerConfig,
    installed_at: Instant,
}

impl Log for TrackerLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.config.level_for(metadata.target())
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let line = format_line(&self.config, self.installed_at.elapsed(), record);
            let _ = writeln!(std::io::stderr().lock(), "{line}");
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<TrackerLogger> = OnceLock::new();

/// Install the stderr logger. The first call fixes the per-target levels;
/// later calls only raise or lower the global `log` ceiling.
pub fn init(config: LoggerConfig) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let logger = LOGGER.get_or_init(|| TrackerLogger {
            config,
            installed_at: Instant::now(),
        });
        log::set_logger(logger)?;
    }
    log::set_max_level(config.max_level());
    Ok(())
}

/// [`init`] with [`LoggerConfig::new`].
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    init(LoggerConfig::new(level))
}

/// Install a `tracing` subscriber filtered by `RUST_LOG` (default `info`).
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}
