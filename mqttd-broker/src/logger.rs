use std::{fs, io::Write};

use colored::*;
use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};
use time::{format_description::FormatItem, OffsetDateTime};

use crate::config::MqttConfig;

const LOG_FILE: &str = "logs/mqttd.log";

const TIMESTAMP_FORMAT_UTC: &[FormatItem] = time::macros::format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
);

pub struct BrokerLogger {
    write_file: bool,
    write_console: bool,
}

impl log::Log for BrokerLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let timestamp = OffsetDateTime::now_utc()
            .format(TIMESTAMP_FORMAT_UTC)
            .expect("Logger could not format the UTC time. It is likely that your system does not support UTC.");

        if self.write_console {
            let level = format!("{:<5}", record.level().to_string());

            let colorized_level = match record.level() {
                Level::Error => level.red().to_string(),
                Level::Warn => level.yellow().to_string(),
                Level::Info => level.cyan().to_string(),
                Level::Debug => level.purple().to_string(),
                Level::Trace => level.normal().to_string(),
            };

            println!("{colorized_level} - {} - {timestamp};", record.args());
        }

        if self.write_file {
            let line = format!("{};{};{timestamp}\n", record.level(), record.args());

            match fs::OpenOptions::new().append(true).open(LOG_FILE) {
                Ok(mut file) => {
                    if let Err(err) = file.write_all(line.as_bytes()) {
                        eprintln!("Could not write log line to {LOG_FILE}: {err}");
                    }
                }
                Err(err) => {
                    eprintln!("Could not open {LOG_FILE}: {err}");
                }
            }
        }
    }

    fn flush(&self) {}
}

impl BrokerLogger {
    pub fn new(config: &MqttConfig) -> Self {
        return Self {
            write_file: config.should_log_file(),
            write_console: config.should_log_console(),
        };
    }

    pub fn init(self, level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_max_level(level);
        log::set_boxed_logger(Box::new(self))
    }
}
