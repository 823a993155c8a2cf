//! Minimal `log` backend writing coloured lines to stderr.
use std::io::Write;

use log::{Level, LevelFilter, Log, Metadata, Record};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

fn level_color(level: Level) -> ColorSpec {
    let mut spec = ColorSpec::new();
    match level {
        Level::Error => {
            spec.set_fg(Some(Color::Red)).set_bold(true);
        }
        Level::Warn => {
            spec.set_fg(Some(Color::Yellow)).set_bold(true);
        }
        Level::Info => {
            spec.set_fg(Some(Color::Green));
        }
        Level::Debug => {
            spec.set_fg(Some(Color::Blue));
        }
        Level::Trace => {
            spec.set_dimmed(true);
        }
    }
    spec
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let stderr = StandardStream::stderr(ColorChoice::Auto);
        let mut stderr = stderr.lock();
        let _ = stderr.set_color(&level_color(record.level()));
        let _ = write!(stderr, "{:>5}", record.level());
        let _ = stderr.reset();
        let _ = writeln!(stderr, " [{}] {}", record.target(), record.args());
    }

    fn flush(&self) {}
}

/// Verbosity count (`-v` occurrences) to level filter.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install the logger. Does nothing if a logger is already installed.
pub fn init(verbosity: u8) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level_for(verbosity));
    }
}
