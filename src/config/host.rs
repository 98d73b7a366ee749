use super::*;

fn sys() -> String {
    "/sys".into()
}

fn proc() -> String {
    "/proc".into()
}

fn etc() -> String {
    "/etc".into()
}

fn dev() -> String {
    "/dev".into()
}

/// Roots of the trees a scan reads.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Host {
    #[serde(default = "sys")]
    sys: String,
    #[serde(default = "proc")]
    proc: String,
    #[serde(default = "etc")]
    etc: String,
    #[serde(default = "dev")]
    dev: String,
}

impl Default for Host {
    fn default() -> Self {
        Self {
            sys: sys(),
            proc: proc(),
            etc: etc(),
            dev: dev(),
        }
    }
}

impl Host {
    pub fn host(&self) -> sysinspect::Host {
        sysinspect::Host {
            sys: PathBuf::from(&self.sys),
            proc: PathBuf::from(&self.proc),
            etc: PathBuf::from(&self.etc),
            dev: PathBuf::from(&self.dev),
        }
    }
}
