use serde::Deserialize;

use std::path::{Path, PathBuf};
use std::time::Duration;

mod general;
mod host;
mod log;
mod serial;
mod usb;

use self::general::General;
use self::host::Host;
use self::log::Log;
use self::serial::Serial;
use self::usb::Usb;

pub use self::log::Level;

fn default_targets() -> Vec<String> {
    vec!["1a86:fe0c".into(), "1a86:7523".into()]
}

fn timeout() -> String {
    "1500ms".into()
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    general: General,
    #[serde(default)]
    log: Log,
    #[serde(default)]
    usb: Usb,
    #[serde(default)]
    serial: Serial,
    #[serde(default)]
    host: Host,
}

impl Config {
    pub fn load(path: &dyn AsRef<Path>) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("unable to open config file: {e}"))?;

        content.parse()
    }

    pub fn general(&self) -> &General {
        &self.general
    }

    pub fn log(&self) -> &Log {
        &self.log
    }

    pub fn usb(&self) -> &Usb {
        &self.usb
    }

    pub fn serial(&self) -> &Serial {
        &self.serial
    }

    pub fn host(&self) -> &Host {
        &self.host
    }
}

impl std::str::FromStr for Config {
    type Err = String;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(content).map_err(|e| format!("failed to parse config file: {e}"))?;

        config.serial.check()?;

        Ok(config)
    }
}
