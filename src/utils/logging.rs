// src/utils/logging.rs
//! Logging configuration and utilities
//!
//! Worker threads log from their own OS threads, so every line carries the
//! thread name next to the source location. Uses `env_logger` under the hood.

use env_logger::{Builder, Target};
use log::LevelFilter;
use std::env;

/// Initializes logging at the given default level
///
/// `RUST_LOG`, when set, takes precedence over `level`. Unknown level
/// names fall back to `info`. Calling this twice is harmless.
pub fn init_logging(level: &str) {
    let mut builder = common_log_config();

    if env::var("RUST_LOG").is_ok() {
        builder.parse_env("RUST_LOG");
    } else {
        builder.filter_level(level.parse().unwrap_or(LevelFilter::Info));
    }

    let _ = builder.try_init();
}

/// Configures benchmark-specific logging
///
/// Defaults to `debug` so per-worker rekey and exit messages are visible.
pub fn init_bench_logging() {
    init_logging("debug");
}

/// Base builder: `[ts LEVEL thread module:line] message` on stderr
///
/// stdout is left to candidate output.
fn common_log_config() -> Builder {
    let mut builder = Builder::new();

    builder
        .format(|buf, record| {
            use std::io::Write;
            let ts = buf.timestamp_millis();
            let thread = std::thread::current();
            let name = thread.name().unwrap_or("-");

            writeln!(
                buf,
                "[{} {} {} {}:{}] {}",
                ts,
                record.level(),
                name,
                record.module_path().unwrap_or_default(),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(Target::Stderr);

    builder
}
