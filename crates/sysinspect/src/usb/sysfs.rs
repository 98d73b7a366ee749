use std::collections::BTreeMap;
use std::path::Path;

use log::debug;

use super::{FlatTable, UsbNode};
use crate::util::{list_dirs, read_attr, read_link_name, read_u32};
use crate::Host;

/// Characters that separate a parent's key from a child's remainder, as in
/// `1-1` -> `1-1.2` -> `1-1.2.4`.
const SEPARATORS: [char; 2] = ['-', '.'];

/// Extracts vendor and product from the `PRODUCT=vvvv/pppp/rrrr` line of a
/// `uevent` file. The kernel drops leading zeros there, so ids are padded
/// back to four digits.
fn uevent_ids(uevent: &str) -> Option<(String, String)> {
    let product = uevent
        .lines()
        .find_map(|l| l.strip_prefix("PRODUCT="))?;
    let mut parts = product.split('/');
    let vendor = parts.next()?.trim();
    let product = parts.next()?.trim();
    if vendor.is_empty() || product.is_empty() {
        return None;
    }
    Some((
        format!("{:0>4}", vendor.to_ascii_lowercase()),
        format!("{:0>4}", product.to_ascii_lowercase()),
    ))
}

fn read_node(name: &str, dir: &Path, table: Option<&FlatTable>) -> UsbNode {
    let mut node = UsbNode::new(name);
    node.path = Some(dir.to_path_buf());

    node.vendor_id = read_attr(dir, "idVendor").map(|v| v.to_ascii_lowercase());
    node.product_id = read_attr(dir, "idProduct").map(|v| v.to_ascii_lowercase());
    node.manufacturer = read_attr(dir, "manufacturer");
    node.product = read_attr(dir, "product");
    node.serial = read_attr(dir, "serial");
    node.bus = read_u32(dir.join("busnum")).ok();
    node.device = read_u32(dir.join("devnum")).ok();
    node.devpath = read_attr(dir, "devpath");

    if node.vendor_id.is_none() || node.product_id.is_none() {
        if let Some((vendor, product)) = read_attr(dir, "uevent").as_deref().and_then(uevent_ids) {
            node.vendor_id.get_or_insert(vendor);
            node.product_id.get_or_insert(product);
        }
    }

    node.driver = read_link_name(dir.join("driver"));

    if let Some(table) = table {
        node.enrich(table);
    }

    node
}

/// Chooses a parent for every key: the longest other key that is a prefix
/// followed by one of the separators.
fn parents<'a>(keys: &[&'a str]) -> BTreeMap<&'a str, &'a str> {
    let mut ret = BTreeMap::new();

    for &key in keys {
        let parent = keys
            .iter()
            .filter(|&&cand| cand != key)
            .filter(|&&cand| {
                key.strip_prefix(cand)
                    .and_then(|rest| rest.chars().next())
                    .is_some_and(|c| SEPARATORS.contains(&c))
            })
            .max_by_key(|cand| cand.len());

        if let Some(&parent) = parent {
            ret.insert(key, parent);
        }
    }

    ret
}

/// Links flat nodes into a forest by key. Children and roots are ordered by
/// key.
pub fn build_tree(nodes: Vec<UsbNode>) -> Vec<UsbNode> {
    let mut nodes: BTreeMap<String, UsbNode> =
        nodes.into_iter().map(|n| (n.name.clone(), n)).collect();

    // edges are computed against a read-only snapshot of the keys
    let keys: Vec<String> = nodes.keys().cloned().collect();
    let key_refs: Vec<&str> = keys.iter().map(|k| k.as_str()).collect();
    let parents = parents(&key_refs);

    let mut children: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut roots = Vec::new();
    for &key in &key_refs {
        match parents.get(key).copied() {
            Some(parent) => children.entry(parent).or_default().push(key),
            None => roots.push(key),
        }
    }

    fn materialize(
        key: &str,
        nodes: &mut BTreeMap<String, UsbNode>,
        children: &BTreeMap<&str, Vec<&str>>,
    ) -> Option<UsbNode> {
        let mut node = nodes.remove(key)?;
        for child in children.get(key).into_iter().flatten() {
            if let Some(child) = materialize(child, nodes, children) {
                node.children.push(child);
            }
        }
        Some(node)
    }

    roots
        .into_iter()
        .filter_map(|root| materialize(root, &mut nodes, &children))
        .collect()
}

/// Reads every device directory of the USB registry and reconstructs the
/// topology from the directory names. A missing registry yields no nodes.
pub fn scan_sysfs(host: &Host, table: Option<&FlatTable>) -> Vec<UsbNode> {
    let base = host.sys("bus/usb/devices");
    if !base.is_dir() {
        debug!("{} is not present", base.display());
        return Vec::new();
    }

    let nodes = list_dirs(&base)
        .into_iter()
        .map(|(name, dir)| read_node(&name, &dir, table))
        .collect();

    build_tree(nodes)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::os::unix::fs::symlink;

    use super::*;
    use crate::usb::parse_lsusb;

    fn names(nodes: &[UsbNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    #[test]
    fn longest_prefix_parent() {
        let nodes = ["2-1", "1-1.3", "1-1", "1-1.2"]
            .into_iter()
            .map(UsbNode::new)
            .collect();
        let roots = build_tree(nodes);

        assert_eq!(names(&roots), vec!["1-1", "2-1"]);
        assert_eq!(names(&roots[0].children), vec!["1-1.2", "1-1.3"]);
        assert!(roots[1].children.is_empty());
    }

    #[test]
    fn nested_hubs_attach_to_nearest_hub() {
        let nodes = ["1-1.4.2.1", "1-1", "1-1.4", "1-1.4.2", "1-10", "usb1", "1-1:1.0"]
            .into_iter()
            .map(UsbNode::new)
            .collect();
        let roots = build_tree(nodes);

        // interface directories use ':' and are not nested
        assert_eq!(names(&roots), vec!["1-1", "1-10", "1-1:1.0", "usb1"]);
        assert_eq!(names(&roots[0].children), vec!["1-1.4"]);
        let hub = &roots[0].children[0];
        assert_eq!(names(&hub.children), vec!["1-1.4.2"]);
        assert_eq!(names(&hub.children[0].children), vec!["1-1.4.2.1"]);
    }

    #[test]
    fn uevent_product() {
        assert_eq!(
            uevent_ids("DEVTYPE=usb_device\nPRODUCT=1a86/7523/264\nTYPE=255/0/0"),
            Some(("1a86".into(), "7523".into()))
        );
        assert_eq!(
            uevent_ids("PRODUCT=46d/C52B/1211"),
            Some(("046d".into(), "c52b".into()))
        );
        assert_eq!(uevent_ids("PRODUCT=garbage"), None);
        assert_eq!(uevent_ids("DEVTYPE=usb_interface"), None);
    }

    #[test]
    fn registry_scan() {
        let root = tempfile::tempdir().unwrap();
        let host = Host::with_root(root.path());
        let base = host.sys("bus/usb/devices");

        let hub = base.join("1-1");
        fs::create_dir_all(&hub).unwrap();
        fs::write(hub.join("idVendor"), "05E3\n").unwrap();
        fs::write(hub.join("idProduct"), "0610\n").unwrap();
        fs::write(hub.join("busnum"), "1\n").unwrap();
        fs::write(hub.join("devnum"), "2\n").unwrap();

        let serial = base.join("1-1.2");
        fs::create_dir_all(&serial).unwrap();
        fs::write(serial.join("uevent"), "PRODUCT=1a86/7523/264\n").unwrap();
        fs::write(serial.join("busnum"), "1\n").unwrap();
        fs::write(serial.join("devnum"), "5\n").unwrap();
        fs::write(serial.join("product"), "USB Serial\n").unwrap();

        let driver = root.path().join("drivers/usb");
        fs::create_dir_all(&driver).unwrap();
        symlink(&driver, hub.join("driver")).unwrap();

        let table = parse_lsusb(
            "Bus 001 Device 002: ID 05e3:0610 Genesys Logic, Inc. Hub
Bus 001 Device 005: ID ffff:ffff Other",
        );
        let roots = scan_sysfs(&host, Some(&table));

        assert_eq!(names(&roots), vec!["1-1"]);
        let hub = &roots[0];
        assert_eq!(hub.vendor_id.as_deref(), Some("05e3"));
        assert_eq!(hub.driver.as_deref(), Some("usb"));
        assert_eq!(hub.description.as_deref(), Some("Genesys Logic, Inc. Hub"));

        let serial = &hub.children[0];
        assert_eq!(serial.vendor_id.as_deref(), Some("1a86"));
        assert_eq!(serial.product_id.as_deref(), Some("7523"));
        assert_eq!(serial.product.as_deref(), Some("USB Serial"));
        assert_eq!(serial.driver, None);
    }

    #[test]
    fn missing_registry() {
        let root = tempfile::tempdir().unwrap();
        assert!(scan_sysfs(&Host::with_root(root.path()), None).is_empty());
    }
}
