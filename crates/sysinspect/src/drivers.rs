use std::collections::BTreeMap;

use crate::modules::ModuleTable;
use crate::usb::{walk, UsbNode};

/// A USB device bound to a driver, as listed under its driver group.
#[non_exhaustive]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DriverDevice {
    pub name: String,
    pub vendor_id: Option<String>,
    pub product_id: Option<String>,
    pub label: Option<String>,
}

impl From<&UsbNode> for DriverDevice {
    fn from(node: &UsbNode) -> Self {
        Self {
            name: node.name.clone(),
            vendor_id: node.vendor_id.clone(),
            product_id: node.product_id.clone(),
            label: node.label().map(|l| l.to_string()),
        }
    }
}

/// Every USB node bound to one driver, with the driver's module status.
///
/// A driver missing from the module table is reported with `loaded =
/// false`; it may simply be built into the kernel.
#[non_exhaustive]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DriverGroup {
    pub driver: String,
    pub loaded: bool,
    pub usage: Option<String>,
    pub devices: Vec<DriverDevice>,
}

/// Groups the nodes of a USB forest by bound driver and looks each driver
/// up in the module table. Groups are ordered by driver name.
pub fn correlate(tree: &[UsbNode], modules: &ModuleTable) -> Vec<DriverGroup> {
    let mut groups: BTreeMap<&str, Vec<&UsbNode>> = BTreeMap::new();

    for node in walk(tree) {
        if let Some(driver) = node.driver_key() {
            groups.entry(driver).or_default().push(node);
        }
    }

    groups
        .into_iter()
        .map(|(driver, nodes)| {
            let module = modules.get(driver);
            DriverGroup {
                driver: driver.to_string(),
                loaded: module.is_some(),
                usage: module.map(|m| m.usage()),
                devices: nodes.into_iter().map(DriverDevice::from).collect(),
            }
        })
        .collect()
}
