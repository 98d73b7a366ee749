use std::collections::HashSet;
use std::fmt;

use log::debug;

use crate::tool::ToolRunner;
use crate::util::read_string;
use crate::Host;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleSource {
    #[serde(rename = "lsmod")]
    Lsmod,
    #[serde(rename = "/proc/modules")]
    ProcModules,
    #[serde(rename = "none")]
    None,
}

impl fmt::Display for ModuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lsmod => f.write_str("lsmod"),
            Self::ProcModules => f.write_str("/proc/modules"),
            Self::None => f.write_str("none"),
        }
    }
}

#[non_exhaustive]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModuleEntry {
    pub name: String,
    pub size: String,
    pub instances: Option<String>,
    pub used_by: Vec<String>,
    pub state: Option<String>,
    pub offset: Option<String>,
}

impl ModuleEntry {
    /// What the module is used by: the dependents when known, otherwise the
    /// instance count.
    pub fn usage(&self) -> String {
        if self.used_by.is_empty() {
            self.instances.clone().unwrap_or_default()
        } else {
            self.used_by.join(" ")
        }
    }
}

#[non_exhaustive]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModuleTable {
    pub source: ModuleSource,
    pub modules: Vec<ModuleEntry>,
}

impl ModuleTable {
    pub fn empty() -> Self {
        Self {
            source: ModuleSource::None,
            modules: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModuleEntry> {
        self.modules.iter().find(|m| m.name == name)
    }
}

/// Drops rows repeating an already seen module name; the first row wins.
fn dedup(entries: Vec<ModuleEntry>) -> Vec<ModuleEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|m| {
            let fresh = seen.insert(m.name.clone());
            if !fresh {
                debug!("duplicate module row: {}", m.name);
            }
            fresh
        })
        .collect()
}

/// Parses `lsmod` output. The first line is the `Module Size Used by`
/// header; rows with fewer than three fields are skipped.
pub fn parse_lsmod(text: &str) -> Vec<ModuleEntry> {
    let entries = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .skip(1)
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 3 {
                return None;
            }
            Some(ModuleEntry {
                name: parts[0].to_string(),
                size: parts[1].to_string(),
                instances: None,
                used_by: parts[2..].iter().map(|s| s.to_string()).collect(),
                state: None,
                offset: None,
            })
        })
        .collect();

    dedup(entries)
}

/// Parses `/proc/modules`: `name size instances deps state offset`, where
/// deps is a comma separated list or `-` for none.
pub fn parse_proc_modules(text: &str) -> Vec<ModuleEntry> {
    let entries = text
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 6 {
                return None;
            }
            let used_by = if parts[3] == "-" {
                Vec::new()
            } else {
                parts[3]
                    .split(',')
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string())
                    .collect()
            };
            Some(ModuleEntry {
                name: parts[0].to_string(),
                size: parts[1].to_string(),
                instances: Some(parts[2].to_string()),
                used_by,
                state: Some(parts[4].to_string()),
                offset: Some(parts[5].to_string()),
            })
        })
        .collect();

    dedup(entries)
}

pub fn get_modules(host: &Host, tools: &dyn ToolRunner) -> ModuleTable {
    if tools.available("lsmod") {
        let out = tools.run("lsmod", &[]);
        if let Some(text) = out.text() {
            return ModuleTable {
                source: ModuleSource::Lsmod,
                modules: parse_lsmod(text),
            };
        }
        debug!("lsmod failed: {}", out.failure_reason("lsmod"));
    }

    match read_string(host.proc("modules")) {
        Ok(text) => ModuleTable {
            source: ModuleSource::ProcModules,
            modules: parse_proc_modules(&text),
        },
        Err(e) => {
            debug!("{e}");
            ModuleTable::empty()
        }
    }
}
