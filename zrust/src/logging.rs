use anyhow::Context;
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::{Config, Handle};

// ISO 8601 timestamp and color coded level tag.
const LOG_PATTERN: &str = "{d(%Y-%m-%dT%H:%M:%S)} {h({l})} {t} - {m}{n}";

fn console_config(level: LevelFilter) -> anyhow::Result<Config> {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build();
    Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level))
        .context("invalid log configuration")
}

/// Install a console logger as the global `log` backend.
pub fn init_console_logger(level: LevelFilter) -> anyhow::Result<Handle> {
    log4rs::init_config(console_config(level)?).context("global logger already set")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builds_for_every_level() {
        for level in [LevelFilter::Off, LevelFilter::Warn, LevelFilter::Info, LevelFilter::Trace] {
            let cfg = console_config(level).unwrap();
            assert_eq!(cfg.root().level(), level);
        }
    }
}
