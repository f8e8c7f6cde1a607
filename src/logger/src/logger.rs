use log::{Level, LevelFilter};
use env_logger::{Builder, Env, fmt::Color};
use std::io::Write;

/// Workspace-wide logger. Thin wrapper around `env_logger`, with a
/// verbosity ladder mapped from the number of `-v` flags on the command
/// line. The `STRIA_LOG` environment variable overrides the ladder.
#[derive(Debug)]
pub struct Logger;

impl Logger {
    /// Initialize the global logger.
    ///
    /// # Verbosity ladder:
    /// - 0 : Error
    /// - 1 : Warn
    /// - 2 : Info
    /// - 3 : Debug
    /// - 4+: Trace
    pub fn init(verbosity: u8) {
        let env = Env::default().filter("STRIA_LOG");

        Builder::new()
            .filter_level(Self::u8_to_loglevel(verbosity))
            .format(|buf, record| {
                let mut level_style = buf.style();
                let color = match record.level() {
                    Level::Error => Color::Red,
                    Level::Warn  => Color::Yellow,
                    Level::Info  => Color::Green,
                    Level::Debug => Color::Blue,
                    Level::Trace => Color::Cyan,
                };
                level_style.set_color(color).set_bold(true);

                // Errors keep a traceback tag pointing at the emitting line.
                let traceback = if record.level() == Level::Error {
                    format!("(@ {}:{}) ", record.file().unwrap_or("unknown"), record.line().unwrap_or(0))
                } else {
                    String::new()
                };

                writeln!(
                    buf,
                    "[{} {: <5} {}] {traceback}{}",
                    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"),
                    level_style.value(record.level()),
                    record.target(),
                    record.args()
                )
            })
            .parse_env(env)
            .try_init()
            .unwrap_or_else(|e| eprintln!("Failed to initialize logger: {e}"));
    }

    /// Lower or raise the global level after initialization.
    pub fn set_level(verbosity: u8) {
        log::set_max_level(Self::u8_to_loglevel(verbosity));
    }

    fn u8_to_loglevel(verbosity: u8) -> LevelFilter {
        match verbosity {
            0           => LevelFilter::Error,
            1           => LevelFilter::Warn,
            2           => LevelFilter::Info,
            3           => LevelFilter::Debug,
            4..=u8::MAX => LevelFilter::Trace,
        }
    }
}

/// Convenience free function mirroring `Logger::init`, so binaries can call
/// `logger::init_logger(&verbosity)` without importing the struct.
pub fn init_logger(verbosity: &u8) {
    Logger::init(*verbosity);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_ladder() {
        assert_eq!(Logger::u8_to_loglevel(0), LevelFilter::Error);
        assert_eq!(Logger::u8_to_loglevel(1), LevelFilter::Warn);
        assert_eq!(Logger::u8_to_loglevel(2), LevelFilter::Info);
        assert_eq!(Logger::u8_to_loglevel(3), LevelFilter::Debug);
        assert_eq!(Logger::u8_to_loglevel(4), LevelFilter::Trace);
        assert_eq!(Logger::u8_to_loglevel(255), LevelFilter::Trace);
    }

    #[test]
    fn double_init_does_not_panic() {
        Logger::init(2);
        Logger::init(3); // second init must degrade gracefully
    }
}
