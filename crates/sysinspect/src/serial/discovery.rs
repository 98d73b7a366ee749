use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::debug;

use crate::util::{list_names, read_attr};
use crate::{Error, Host};

/// Character-device prefixes used by USB-serial adapters.
pub const TTY_PREFIXES: [&str; 2] = ["ttyUSB", "ttyACM"];

/// How many directories above the tty's backing device are searched for a
/// USB identity before giving up.
pub const MAX_IDENTITY_DEPTH: usize = 6;

/// A USB vendor/product pair, stored lower-case.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VidPid {
    pub vendor_id: String,
    pub product_id: String,
}

impl VidPid {
    pub fn new(vendor_id: &str, product_id: &str) -> Self {
        Self {
            vendor_id: vendor_id.trim().to_ascii_lowercase(),
            product_id: product_id.trim().to_ascii_lowercase(),
        }
    }

    pub fn matches(&self, vendor_id: &str, product_id: &str) -> bool {
        self.vendor_id.eq_ignore_ascii_case(vendor_id)
            && self.product_id.eq_ignore_ascii_case(product_id)
    }
}

impl FromStr for VidPid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (vendor, product) = s
            .split_once(':')
            .ok_or_else(|| Error::unparseable(format!("expected VID:PID, got {s:?}"), "vidpid"))?;
        let valid = |v: &str| {
            let v = v.trim();
            v.len() == 4 && v.chars().all(|c| c.is_ascii_hexdigit())
        };
        if !valid(vendor) || !valid(product) {
            return Err(Error::unparseable(format!("invalid VID:PID {s:?}"), "vidpid"));
        }
        Ok(Self::new(vendor, product))
    }
}

impl fmt::Display for VidPid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.vendor_id, self.product_id)
    }
}

/// The adapters the probe looks for when no targets are given.
pub fn default_targets() -> Vec<VidPid> {
    vec![VidPid::new("1a86", "fe0c"), VidPid::new("1a86", "7523")]
}

/// Parses a comma separated `VID:PID` list, skipping malformed entries.
pub fn parse_targets(list: &str) -> Vec<VidPid> {
    list.split(',')
        .filter(|p| !p.trim().is_empty())
        .filter_map(|p| match p.trim().parse() {
            Ok(v) => Some(v),
            Err(e) => {
                debug!("{e}");
                None
            }
        })
        .collect()
}

/// A serial device selected for probing.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialCandidate {
    pub tty: PathBuf,
    pub devpath: Option<PathBuf>,
    pub vendor_id: Option<String>,
    pub product_id: Option<String>,
}

impl SerialCandidate {
    /// `(vendor, product)` when both are known.
    pub fn identity(&self) -> Option<(&str, &str)> {
        Some((self.vendor_id.as_deref()?, self.product_id.as_deref()?))
    }
}

/// Resolved USB identity of a tty: the device directory and its ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TtyIdentity {
    pub devpath: PathBuf,
    pub vendor_id: String,
    pub product_id: String,
}

/// Follows `<sys>/class/tty/<name>/device` and walks up at most
/// [`MAX_IDENTITY_DEPTH`] directories until `idVendor` and `idProduct` are
/// both readable.
pub fn resolve_identity(host: &Host, tty_name: &str) -> Option<TtyIdentity> {
    let link = host.sys(format!("class/tty/{tty_name}/device"));
    let mut dir = std::fs::canonicalize(&link).ok()?;

    for _ in 0..MAX_IDENTITY_DEPTH {
        if let (Some(vendor), Some(product)) =
            (read_attr(&dir, "idVendor"), read_attr(&dir, "idProduct"))
        {
            return Some(TtyIdentity {
                devpath: dir,
                vendor_id: vendor.to_ascii_lowercase(),
                product_id: product.to_ascii_lowercase(),
            });
        }
        match dir.parent() {
            Some(parent) => dir = parent.to_path_buf(),
            None => break,
        }
    }

    debug!("{tty_name}: no USB identity within {MAX_IDENTITY_DEPTH} levels");
    None
}

/// Builds a candidate for an explicitly requested device. The identity is
/// resolved only for reporting.
pub fn candidate_for(host: &Host, tty: &Path) -> SerialCandidate {
    let identity = tty
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|name| resolve_identity(host, name));

    SerialCandidate {
        tty: tty.to_path_buf(),
        devpath: identity.as_ref().map(|i| i.devpath.clone()),
        vendor_id: identity.as_ref().map(|i| i.vendor_id.clone()),
        product_id: identity.map(|i| i.product_id),
    }
}

/// Finds USB-serial ttys whose identity matches one of `targets`, in device
/// name order.
pub fn find_candidates(host: &Host, targets: &[VidPid]) -> Vec<SerialCandidate> {
    let mut ret = Vec::new();

    for name in list_names(&host.dev) {
        if !TTY_PREFIXES.iter().any(|p| name.starts_with(p)) {
            continue;
        }
        let Some(identity) = resolve_identity(host, &name) else {
            continue;
        };
        if !targets
            .iter()
            .any(|t| t.matches(&identity.vendor_id, &identity.product_id))
        {
            debug!(
                "{name}: {}:{} is not a target",
                identity.vendor_id, identity.product_id
            );
            continue;
        }
        ret.push(SerialCandidate {
            tty: host.dev(&name),
            devpath: Some(identity.devpath),
            vendor_id: Some(identity.vendor_id),
            product_id: Some(identity.product_id),
        });
    }

    ret
}

#[cfg(test)]
pub(crate) mod fixture {
    use std::fs;
    use std::os::unix::fs::symlink;

    use super::*;

    /// Creates `/dev/<tty>` and a sysfs chain where the USB device sits
    /// `levels` directories above the tty's backing interface.
    pub(crate) fn add_tty(host: &Host, tty: &str, ids: Option<(&str, &str)>, levels: usize) {
        fs::create_dir_all(&host.dev).unwrap();
        fs::write(host.dev(tty), "").unwrap();

        let usb = host.sys(format!("devices/pci0000:00/usb1/1-1/{tty}-dev"));
        let mut iface = usb.clone();
        for i in 0..levels {
            iface = iface.join(format!("level{i}"));
        }
        fs::create_dir_all(&iface).unwrap();
        if let Some((vendor, product)) = ids {
            fs::write(usb.join("idVendor"), format!("{vendor}\n")).unwrap();
            fs::write(usb.join("idProduct"), format!("{product}\n")).unwrap();
        }

        let class = host.sys(format!("class/tty/{tty}"));
        fs::create_dir_all(&class).unwrap();
        symlink(&iface, class.join("device")).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::fixture::add_tty;
    use super::*;

    #[test]
    fn targets() {
        assert_eq!(
            parse_targets("1A86:FE0C, 1a86:7523,bogus,,zz:11"),
            vec![VidPid::new("1a86", "fe0c"), VidPid::new("1a86", "7523")]
        );
        assert_eq!(VidPid::new("1A86", "7523").to_string(), "1a86:7523");
        assert!(VidPid::new("1a86", "7523").matches("1A86", "7523"));
        assert!("1a86".parse::<VidPid>().is_err());
        assert!("1:2".parse::<VidPid>().is_err());
        assert!("1a86:75230".parse::<VidPid>().is_err());
        assert_eq!(parse_targets("1a86:7523,1:2"), vec![VidPid::new("1a86", "7523")]);
    }

    #[test]
    fn discovery_filters_by_identity() {
        let root = tempfile::tempdir().unwrap();
        let host = Host::with_root(root.path());

        add_tty(&host, "ttyUSB1", Some(("1A86", "7523")), 2);
        add_tty(&host, "ttyACM0", Some(("1a86", "fe0c")), 1);
        add_tty(&host, "ttyUSB0", Some(("0403", "6001")), 1);
        add_tty(&host, "ttyACM1", None, 1);
        fs::write(host.dev("ttyS0"), "").unwrap();

        let found = find_candidates(&host, &default_targets());
        let ttys: Vec<PathBuf> = found.iter().map(|c| c.tty.clone()).collect();
        assert_eq!(ttys, vec![host.dev("ttyACM0"), host.dev("ttyUSB1")]);
        assert_eq!(found[1].identity(), Some(("1a86", "7523")));
    }

    #[test]
    fn identity_walk_is_bounded() {
        let root = tempfile::tempdir().unwrap();
        let host = Host::with_root(root.path());

        add_tty(&host, "ttyUSB0", Some(("1a86", "7523")), MAX_IDENTITY_DEPTH - 1);
        add_tty(&host, "ttyUSB1", Some(("1a86", "7523")), MAX_IDENTITY_DEPTH);

        assert!(resolve_identity(&host, "ttyUSB0").is_some());
        assert!(resolve_identity(&host, "ttyUSB1").is_none());
        assert!(resolve_identity(&host, "ttyUSB9").is_none());
    }

    #[test]
    fn explicit_device() {
        let root = tempfile::tempdir().unwrap();
        let host = Host::with_root(root.path());
        add_tty(&host, "ttyACM0", Some(("1a86", "fe0c")), 1);

        let candidate = candidate_for(&host, &host.dev("ttyACM0"));
        assert_eq!(candidate.identity(), Some(("1a86", "fe0c")));

        let candidate = candidate_for(&host, Path::new("/dev/ttyS7"));
        assert_eq!(candidate.tty, PathBuf::from("/dev/ttyS7"));
        assert_eq!(candidate.identity(), None);
    }
}
