use core::net::Ipv4Addr;

use std::{fs, path::Path, str::FromStr};

use log::LevelFilter;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct MqttConfig {
    connection: Connection,
    users: Users,
    logger: Logger,
}

impl MqttConfig {
    pub fn addr(&self) -> String {
        return self.connection.ip.to_string() + ":" + &self.connection.port.to_string();
    }

    pub fn require_auth(&self) -> bool {
        return self.users.authenticate;
    }

    pub fn should_log_file(&self) -> bool {
        return self.logger.file;
    }

    pub fn should_log_console(&self) -> bool {
        return self.logger.console;
    }

    pub fn log_level(&self) -> LevelFilter {
        return LevelFilter::from_str(&self.logger.level).unwrap_or_else(|_| {
            panic!(
                "Invalid log level provided: {}. Accepted levels are: Off, Error, Warn, Info, Debug",
                self.logger.level
            )
        });
    }
}

impl TryFrom<&Path> for MqttConfig {
    type Error = toml::de::Error;
    fn try_from(value: &Path) -> Result<Self, toml::de::Error> {
        let buf = match fs::read_to_string(value) {
            Ok(buf) => buf,
            Err(err) => {
                log::error!(
                    "Could not read config file {}: {err}",
                    value.to_str().unwrap_or("")
                );
                panic!();
            }
        };

        let config: MqttConfig = toml::from_str(&buf)?;

        // credentials travel in the clear; worth a nudge at startup.
        if config.users.authenticate {
            log::warn!("Requiring clients to send credentials in plaintext. Please change the configuration if this is not intended.")
        }

        return Ok(config);
    }
}

#[derive(Deserialize)]
struct Connection {
    ip: Ipv4Addr,
    port: u16,
}

#[derive(Deserialize)]
struct Users {
    authenticate: bool,
}

#[derive(Deserialize)]
struct Logger {
    console: bool,
    file: bool,
    level: String,
}

#[cfg(test)]
mod config {
    use super::MqttConfig;

    #[test]
    fn parses_full_config() {
        let config: MqttConfig = toml::from_str(
            r#"
[connection]
ip = "127.0.0.1"
port = 1884

[users]
authenticate = true

[logger]
console = true
file = false
level = "Info"
"#,
        )
        .unwrap();

        assert_eq!(config.addr(), "127.0.0.1:1884");
        assert!(config.require_auth());
        assert!(config.should_log_console());
        assert!(!config.should_log_file());
        assert_eq!(config.log_level(), log::LevelFilter::Info);
    }
}
