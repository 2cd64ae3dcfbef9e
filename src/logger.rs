use chrono::Local;
use env_logger::Builder;
use log::Level;
use std::io::Write;

/// Installs the global logger. `RUST_LOG` overrides the `info` default.
/// Calling it again is a no-op.
pub fn init_logger() {
    init_logger_with("info");
}

pub fn init_logger_with(default_filter: &str) {
    let result = Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format(|buf, record| {
            let time = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            let level_color = match record.level() {
                Level::Error => "\x1b[31m\x1b[1m",
                Level::Warn => "\x1b[33m\x1b[1m",
                Level::Info => "\x1b[32m\x1b[1m",
                Level::Debug => "\x1b[36m\x1b[1m",
                Level::Trace => "\x1b[90m\x1b[1m",
            };
            let thread = std::thread::current();
            writeln!(
                buf,
                "{}{} {:<5}\x1b[0m [{}] [{}:{}] {}",
                time,
                level_color,
                record.level(),
                thread.name().unwrap_or("-"),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args(),
            )
        })
        .try_init();

    if result.is_err() {
        log::debug!("Logger already initialized");
    }
}
