use std::path::{Path, PathBuf};

/// Locations of the pseudo-filesystems and configuration trees a scan reads.
///
/// The defaults point at the live system. Tests and offline analysis can
/// point them at a captured copy instead.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Host {
    pub sys: PathBuf,
    pub proc: PathBuf,
    pub etc: PathBuf,
    pub dev: PathBuf,
}

impl Default for Host {
    fn default() -> Self {
        Self {
            sys: PathBuf::from("/sys"),
            proc: PathBuf::from("/proc"),
            etc: PathBuf::from("/etc"),
            dev: PathBuf::from("/dev"),
        }
    }
}

impl Host {
    /// A host whose trees all live below `root`, e.g. `<root>/sys`.
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            sys: root.join("sys"),
            proc: root.join("proc"),
            etc: root.join("etc"),
            dev: root.join("dev"),
        }
    }

    pub(crate) fn sys(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.sys.join(rel)
    }

    pub(crate) fn proc(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.proc.join(rel)
    }

    pub(crate) fn etc(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.etc.join(rel)
    }

    pub(crate) fn dev(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.dev.join(rel)
    }
}
