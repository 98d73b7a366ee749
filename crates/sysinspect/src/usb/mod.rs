//! USB topology from either `lsusb -t` or the `/sys/bus/usb/devices`
//! registry, enriched with vendor/product identity from plain `lsusb`.

use std::fmt;
use std::path::PathBuf;

use log::debug;

use crate::tool::ToolRunner;
use crate::Host;

mod listing;
mod sysfs;
mod tree;

pub use self::listing::{parse_lsusb, FlatTable, UsbFlatEntry};
pub use self::sysfs::{build_tree, scan_sysfs};
pub use self::tree::{parse_lsusb_tree, parse_rows, propagate_bus, TreeRow};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsbSource {
    #[serde(rename = "lsusb -t")]
    LsusbTree,
    #[serde(rename = "lsusb -t (+lsusb)")]
    LsusbTreeEnriched,
    #[serde(rename = "sysfs")]
    Sysfs,
    #[serde(rename = "sysfs (+lsusb)")]
    SysfsEnriched,
}

impl UsbSource {
    pub fn is_sysfs(&self) -> bool {
        matches!(self, Self::Sysfs | Self::SysfsEnriched)
    }
}

impl fmt::Display for UsbSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LsusbTree => f.write_str("lsusb -t"),
            Self::LsusbTreeEnriched => f.write_str("lsusb -t (+lsusb)"),
            Self::Sysfs => f.write_str("sysfs"),
            Self::SysfsEnriched => f.write_str("sysfs (+lsusb)"),
        }
    }
}

/// One device, hub port, or interface in the USB topology.
///
/// `name` is the topology key: the registry directory name for sysfs scans
/// or the port path for `lsusb -t` rows. Children are owned exclusively by
/// their parent.
#[non_exhaustive]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsbNode {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub vendor_id: Option<String>,
    pub product_id: Option<String>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial: Option<String>,
    pub bus: Option<u32>,
    pub device: Option<u32>,
    pub devpath: Option<String>,
    pub driver: Option<String>,
    pub class: Option<String>,
    pub speed: Option<String>,
    pub description: Option<String>,
    pub children: Vec<UsbNode>,
}

impl UsbNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Fills vendor, product, and description from the flat table when the
    /// bus and device numbers are known. Values already present are kept, so
    /// enriching twice changes nothing.
    pub fn enrich(&mut self, table: &FlatTable) {
        let (Some(bus), Some(device)) = (self.bus, self.device) else {
            return;
        };
        let Some(entry) = table.get(&(bus, device)) else {
            return;
        };

        self.vendor_id
            .get_or_insert_with(|| entry.vendor_id.clone());
        self.product_id
            .get_or_insert_with(|| entry.product_id.clone());
        if !entry.description.is_empty() {
            self.description
                .get_or_insert_with(|| entry.description.clone());
        }
    }

    /// The driver's grouping key: the first `/`-separated segment, so
    /// `hub/4p` groups with `hub`.
    pub fn driver_key(&self) -> Option<&str> {
        self.driver
            .as_deref()
            .and_then(|d| d.split('/').next())
            .filter(|d| !d.is_empty())
    }

    /// Product name if known, otherwise the flat-listing description.
    pub fn label(&self) -> Option<&str> {
        self.product.as_deref().or(self.description.as_deref())
    }

    /// Depth-first, pre-order traversal of this node and its descendants.
    pub fn iter(&self) -> Iter<'_> {
        Iter { stack: vec![self] }
    }
}

pub struct Iter<'a> {
    stack: Vec<&'a UsbNode>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a UsbNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Visits every node of a forest exactly once.
pub fn walk(roots: &[UsbNode]) -> impl Iterator<Item = &UsbNode> {
    roots.iter().flat_map(|r| r.iter())
}

#[non_exhaustive]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UsbSection {
    pub source: UsbSource,
    pub tree: Vec<UsbNode>,
}

fn flat_table(tools: &dyn ToolRunner) -> Option<FlatTable> {
    if !tools.available("lsusb") {
        return None;
    }
    let out = tools.run("lsusb", &[]);
    match out.text() {
        Some(text) => Some(parse_lsusb(text)),
        None => {
            debug!("lsusb failed: {}", out.failure_reason("lsusb"));
            None
        }
    }
}

/// Builds the USB topology. `lsusb -t` is preferred unless `force_sysfs` is
/// set or it yields nothing; the registry scan is the fallback. Either
/// source is enriched from plain `lsusb` when that is available.
pub fn get_usb(host: &Host, tools: &dyn ToolRunner, force_sysfs: bool) -> UsbSection {
    let table = flat_table(tools);

    if !force_sysfs && tools.available("lsusb") {
        let out = tools.run("lsusb", &["-t"]);
        if let Some(text) = out.text() {
            let tree = parse_lsusb_tree(text, table.as_ref());
            if !tree.is_empty() {
                let source = if table.is_some() {
                    UsbSource::LsusbTreeEnriched
                } else {
                    UsbSource::LsusbTree
                };
                return UsbSection { source, tree };
            }
        }
        debug!("lsusb -t unusable, scanning the device registry");
    }

    let tree = scan_sysfs(host, table.as_ref());
    let source = if table.is_some() {
        UsbSource::SysfsEnriched
    } else {
        UsbSource::Sysfs
    };

    UsbSection { source, tree }
}
