use std::{
    fs::{self, File},
    path::Path,
};

use crate::{config::MqttConfig, logger::BrokerLogger};

/// Startup environment: finds (or seeds) the config file, then brings the
/// logger and log directory up before the server starts.
pub struct MqttEnv {
    config: MqttConfig,
}

impl MqttEnv {
    pub fn new(config_path: &Path) -> Self {
        if !config_path.exists() {
            init_config(config_path);
        }

        let config = MqttConfig::try_from(config_path).expect("Could not parse the config file");

        return Self { config };
    }

    pub fn init(self) -> Self {
        if self.config.should_log_console() || self.config.should_log_file() {
            BrokerLogger::new(&self.config)
                .init(self.config.log_level())
                .expect("Could not install the logger");

            if self.config.should_log_file() {
                init_log_fs();
            }
        }

        return self;
    }

    pub fn config(self) -> MqttConfig {
        return self.config;
    }
}

fn init_log_fs() {
    let path = Path::new("logs");

    if !path.exists() {
        fs::create_dir(path).expect("Could not create logs directory");

        let main = path.join("mqttd.log");
        if let Err(err) = File::create(&main) {
            log::error!("Could not create file: {}\n\t{err}", main.display());
        }

        log::info!("Initialized log directory.")
    }
}

fn init_config(config_path: &Path) {
    let contents = r#"[connection]
ip = "127.0.0.1"
port = 1884

[users]
authenticate = false

[logger]
console = true
file = false
level = "Info"
"#;

    fs::write(config_path, contents).expect("Could not create config file");
}
