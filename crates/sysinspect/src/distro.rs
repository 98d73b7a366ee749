use std::collections::BTreeMap;

use log::debug;

use crate::tool::ToolRunner;
use crate::util::read_string;
use crate::Host;

#[non_exhaustive]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Distro {
    pub pretty: String,
    pub raw: BTreeMap<String, String>,
}

impl Distro {
    pub fn from_fields(raw: BTreeMap<String, String>) -> Self {
        let pretty = ["PRETTY_NAME", "Description", "DISTRIB_DESCRIPTION"]
            .iter()
            .find_map(|k| raw.get(*k).filter(|v| !v.is_empty()))
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string());

        Self { pretty, raw }
    }
}

/// Parses `KEY=VALUE` lines as found in `os-release`, stripping quotes.
pub fn parse_os_release(text: &str) -> BTreeMap<String, String> {
    let mut ret = BTreeMap::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        ret.insert(key.to_string(), value.trim_matches('"').to_string());
    }

    ret
}

/// Parses `Key: Value` lines as printed by `lsb_release -a`.
pub fn parse_lsb_release(text: &str) -> BTreeMap<String, String> {
    let mut ret = BTreeMap::new();

    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        ret.insert(key.trim().to_string(), value.trim().to_string());
    }

    ret
}

pub fn get_distro(host: &Host, tools: &dyn ToolRunner) -> Distro {
    let mut raw = match read_string(host.etc("os-release")) {
        Ok(text) => parse_os_release(&text),
        Err(e) => {
            debug!("{e}");
            BTreeMap::new()
        }
    };

    if raw.is_empty() && tools.available("lsb_release") {
        let out = tools.run("lsb_release", &["-a"]);
        if let Some(text) = out.text() {
            raw = parse_lsb_release(text);
        }
    }

    Distro::from_fields(raw)
}
