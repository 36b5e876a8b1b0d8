//! This module provides observability and diagnostics for the pull pipeline.
//!
//! A pipeline that crosses a runtime boundary on every refill needs visibility
//! into how often it pulls, how much each stage expands, and where it stops.
//! The `log_metric!` macro is the primary tool; it writes through the `log`
//! facade at debug level and is compiled out of release builds entirely.

use std::fs::OpenOptions;
use std::sync::Once;

use log::LevelFilter;

use crate::error::Fault;

/// Logs a structured key-value metric string at debug level, only in debug builds.
///
/// # Example
/// ```
/// use sevenpull::log_metric;
/// let produced = 4096;
/// log_metric!("event"="stage_pull", "codec"="zstd", "produced"=&produced);
/// ```
#[macro_export]
macro_rules! log_metric {
    ($($key:literal = $value:expr),+ $(,)?) => {
        #[cfg(debug_assertions)]
        {
            // Collect each pair as a JSON string fragment
            let mut parts = Vec::new();
            $(
                parts.push(format!("\"{}\": \"{}\"", $key, $value));
            )+

            $crate::__log::debug!(target: "sevenpull::metric", "SEVENPULL_METRIC: {{ {} }}", parts.join(", "));
        }
    };
}

static INIT_LOGGER: Once = Once::new();

/// Installs the `env_logger` backend once per process.
///
/// Later calls are no-ops. When `log_file` is given, records are appended to it
/// instead of stderr.
pub fn init_logging(level: LevelFilter, log_file: Option<&str>) -> Result<(), Fault> {
    let target = match log_file {
        Some(filename) => {
            let file = OpenOptions::new().append(true).create(true).open(filename)?;
            Some(env_logger::Target::Pipe(Box::new(file)))
        }
        None => None,
    };

    INIT_LOGGER.call_once(move || {
        let mut builder = env_logger::Builder::new();

        builder.is_test(false);
        builder.filter_level(level);

        // Custom formatter: just print the level, target and message
        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(buf, "[{}] {}: {}", record.level(), record.target(), record.args())?;
            buf.flush()?;
            Ok(())
        });

        if let Some(target) = target {
            builder.target(target);
        }

        let _ = builder.try_init();
    });
    Ok(())
}
