//! `log` backend that prints through Godot's output panel.

use godot::prelude::*;
use log::{Level, LevelFilter, Log, Metadata, Record};

/// Godot output channel for a log level
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Channel {
    Print,
    Warn,
    Error,
}

fn channel(level: Level) -> Channel {
    match level {
        Level::Error => Channel::Error,
        Level::Warn => Channel::Warn,
        Level::Info | Level::Debug | Level::Trace => Channel::Print,
    }
}

struct GodotLogger;

static LOGGER: GodotLogger = GodotLogger;

impl Log for GodotLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        match channel(record.level()) {
            Channel::Error => godot_error!("[{}] {}", record.target(), record.args()),
            Channel::Warn => godot_warn!("[{}] {}", record.target(), record.args()),
            Channel::Print => godot_print!("[{}] {}", record.target(), record.args()),
        }
    }

    fn flush(&self) {}
}

/// Route `log` output to Godot. Later calls (e.g. after a hot reload) keep
/// the logger already installed.
pub fn init_godot_logger(level: LevelFilter) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_map_to_godot_channels() {
        assert_eq!(channel(Level::Error), Channel::Error);
        assert_eq!(channel(Level::Warn), Channel::Warn);
        assert_eq!(channel(Level::Info), Channel::Print);
        assert_eq!(channel(Level::Trace), Channel::Print);
    }

    #[test]
    fn test_enabled_follows_max_level() {
        log::set_max_level(LevelFilter::Warn);
        let warn = Metadata::builder().level(Level::Warn).build();
        let debug = Metadata::builder().level(Level::Debug).build();
        assert!(LOGGER.enabled(&warn));
        assert!(!LOGGER.enabled(&debug));
    }
}
