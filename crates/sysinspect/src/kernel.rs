use log::debug;

use crate::tool::ToolRunner;
use crate::util::read_string;
use crate::Host;

#[non_exhaustive]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Kernel {
    pub system: String,
    pub node: String,
    pub release: String,
    pub version: String,
    pub machine: String,
    pub processor: String,
    pub architecture: String,
    pub bits: String,
    pub proc_version: String,
}

impl Kernel {
    /// The build portion of `/proc/version`, i.e. whatever follows the last
    /// closing parenthesis, truncated to `max` characters.
    pub fn build_summary(&self, max: usize) -> String {
        let tail = self
            .proc_version
            .rsplit(')')
            .next()
            .unwrap_or_default()
            .trim();
        tail.chars().take(max).collect()
    }
}

fn kernel_attr(host: &Host, name: &str) -> Option<String> {
    match read_string(host.proc(format!("sys/kernel/{name}"))) {
        Ok(v) => Some(v),
        Err(e) => {
            debug!("{e}");
            None
        }
    }
}

fn bits() -> &'static str {
    if cfg!(target_pointer_width = "64") {
        "64bit"
    } else {
        "32bit"
    }
}

/// Capitalizes the compile-target OS name the way `uname -s` prints it.
fn default_system() -> String {
    let os = std::env::consts::OS;
    let mut chars = os.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn get_kernel(host: &Host, tools: &dyn ToolRunner) -> Kernel {
    let machine = tools
        .run("uname", &["-m"])
        .text()
        .map(|m| m.to_string())
        .unwrap_or_else(|| std::env::consts::ARCH.to_string());

    // `uname -p` commonly reports "unknown", which carries no information
    let processor = tools
        .run("uname", &["-p"])
        .text()
        .filter(|p| *p != "unknown")
        .map(|p| p.to_string())
        .unwrap_or_default();

    let proc_version = read_string(host.proc("version")).unwrap_or_default();

    Kernel {
        system: kernel_attr(host, "ostype").unwrap_or_else(default_system),
        node: kernel_attr(host, "hostname").unwrap_or_default(),
        release: kernel_attr(host, "osrelease").unwrap_or_default(),
        version: kernel_attr(host, "version").unwrap_or_default(),
        architecture: format!("{machine} ({})", bits()),
        bits: bits().to_string(),
        machine,
        processor,
        proc_version,
    }
}
