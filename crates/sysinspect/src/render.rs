//! Human-readable rendering of a [`Report`].

use std::fmt::Write;

use crate::drivers::DriverGroup;
use crate::serial::SerialTestReport;
use crate::usb::{UsbNode, UsbSection};
use crate::Report;

/// Width of the kernel build excerpt.
const BUILD_SUMMARY_LEN: usize = 80;

/// Distribution keys shown under the pretty name, when present.
const DISTRO_KEYS: [&str; 5] = ["NAME", "VERSION", "ID", "VERSION_ID", "PRETTY_NAME"];

/// Which optional sections to render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderOptions {
    pub modules: bool,
    pub pci: bool,
    pub usb: bool,
    /// Show at most this many modules; `0` shows all.
    pub limit_modules: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            modules: true,
            pci: true,
            usb: true,
            limit_modules: 0,
        }
    }
}

/// One line for a USB node: key, ids, label, driver, and address.
pub fn format_usb_node(node: &UsbNode) -> String {
    let mut parts = vec![node.name.clone()];

    match (&node.vendor_id, &node.product_id) {
        (Some(v), Some(p)) => parts.push(format!("[{v}:{p}]")),
        (Some(v), None) => parts.push(format!("[vid={v}]")),
        (None, Some(p)) => parts.push(format!("[pid={p}]")),
        (None, None) => {}
    }
    if let Some(label) = node.label() {
        parts.push(format!("- {label}"));
    }
    if let Some(driver) = &node.driver {
        parts.push(format!("(driver={driver})"));
    }
    if let (Some(bus), Some(device)) = (node.bus, node.device) {
        parts.push(format!("bus={bus} dev={device}"));
    }

    parts.join("  ")
}

/// The forest as indented lines, two spaces per level.
pub fn render_usb_tree(nodes: &[UsbNode]) -> String {
    let mut lines = Vec::new();
    push_usb_tree(&mut lines, nodes, 0);
    lines.join("\n")
}

fn push_usb_tree(lines: &mut Vec<String>, nodes: &[UsbNode], depth: usize) {
    for node in nodes {
        lines.push(format!("{}{}", "  ".repeat(depth), format_usb_node(node)));
        push_usb_tree(lines, &node.children, depth + 1);
    }
}

/// The serial section on its own, as printed after an interactive test.
pub fn render_serial_summary(report: &SerialTestReport) -> String {
    let mut out = String::new();

    if let Some(note) = &report.note {
        let _ = writeln!(out, "  {note}");
    }
    for device in &report.devices {
        let _ = writeln!(
            out,
            "{}  {}:{}  => {}",
            device.tty.display(),
            device.vendor_id.as_deref().unwrap_or("?"),
            device.product_id.as_deref().unwrap_or("?"),
            if device.ok { "OK" } else { "FAIL" }
        );
        match device.decisive_attempt() {
            None => {
                let _ = writeln!(out, "  no attempts");
            }
            Some(a) if a.succeeded => {
                let _ = writeln!(out, "  [baud={}] response: {}", a.baud, a.response_hex);
            }
            Some(a) => match &a.error {
                Some(e) => {
                    let _ = writeln!(out, "  [baud={}] error: {e}", a.baud);
                }
                None => {
                    let _ = writeln!(out, "  [baud={}] no response", a.baud);
                }
            },
        }
    }

    out.trim_end().to_string()
}

/// Renders every enabled section of the report.
pub fn render_text(report: &Report, opts: &RenderOptions) -> String {
    let mut out = String::new();

    distro(&mut out, report);
    kernel(&mut out, report);
    if opts.usb {
        usb(&mut out, &report.usb);
    }
    drivers(&mut out, &report.drivers);
    if opts.modules {
        modules(&mut out, report, opts.limit_modules);
    }
    if opts.pci {
        pci(&mut out, report);
    }
    if let Some(serial) = &report.serial_test {
        serial_test(&mut out, serial);
    }

    out.trim_end().to_string()
}

fn heading(out: &mut String, title: &str) {
    if !out.is_empty() {
        out.push('\n');
    }
    let _ = writeln!(out, "=== {title} ===");
}

fn distro(out: &mut String, report: &Report) {
    heading(out, "Distribution");
    let _ = writeln!(out, "{}", report.distro.pretty);

    let raw = &report.distro.raw;
    if DISTRO_KEYS.iter().any(|k| raw.contains_key(*k)) {
        out.push('\n');
        for key in DISTRO_KEYS {
            if let Some(value) = raw.get(key) {
                let _ = writeln!(out, "{key}: {value}");
            }
        }
    }
}

fn kernel(out: &mut String, report: &Report) {
    let k = &report.kernel;

    heading(out, "Kernel");
    let _ = writeln!(out, "{} {}", k.release, k.version);
    let _ = writeln!(out, "machine: {}, processor: {}", k.machine, k.processor);
    if !k.architecture.is_empty() {
        let _ = writeln!(out, "architecture: {}", k.architecture);
    }
    if !k.proc_version.is_empty() {
        let _ = writeln!(out, "kernel build: {}", k.build_summary(BUILD_SUMMARY_LEN));
    }
}

fn usb(out: &mut String, usb: &UsbSection) {
    heading(out, "USB device tree");
    let _ = writeln!(out, "source: {}", usb.source);
    if usb.tree.is_empty() {
        let _ = writeln!(out, "  (no usb devices found or insufficient permissions)");
    } else {
        let _ = writeln!(out, "{}", render_usb_tree(&usb.tree));
    }
}

fn drivers(out: &mut String, groups: &[DriverGroup]) {
    heading(out, "Drivers");
    if groups.is_empty() {
        let _ = writeln!(out, "  (no drivers detected for USB devices)");
        return;
    }

    for group in groups {
        match (&group.usage, group.loaded) {
            (Some(usage), true) => {
                let _ = writeln!(out, " - {} (loaded) used_by={usage}", group.driver);
            }
            (None, true) => {
                let _ = writeln!(out, " - {} (loaded)", group.driver);
            }
            (_, false) => {
                let _ = writeln!(out, " - {} (not listed as loaded)", group.driver);
            }
        }
        for device in &group.devices {
            let label = device.label.as_deref().unwrap_or_default();
            match (&device.vendor_id, &device.product_id) {
                (Some(v), Some(p)) => {
                    let _ = writeln!(out, "     * {} [{v}:{p}] {label}", device.name);
                }
                _ => {
                    let _ = writeln!(out, "     * {} {label}", device.name);
                }
            }
        }
    }
}

fn modules(out: &mut String, report: &Report, limit: usize) {
    let Some(table) = &report.modules else {
        return;
    };

    heading(out, "Loaded kernel modules");
    let _ = writeln!(out, "source: {}", table.source);

    let count = if limit > 0 { limit } else { table.modules.len() };
    for module in table.modules.iter().take(count) {
        let _ = writeln!(out, " - {} used_by={}", module.name, module.usage());
    }
}

fn pci(out: &mut String, report: &Report) {
    let Some(pci) = &report.pci else {
        return;
    };

    heading(out, "PCI devices & drivers");
    if !pci.available {
        let _ = writeln!(
            out,
            "  (unavailable: {})",
            pci.reason.as_deref().unwrap_or("unknown")
        );
        return;
    }

    for device in &pci.devices {
        let _ = writeln!(out, " - {}", device.device);
        if let Some(driver) = &device.kernel_driver_in_use {
            let _ = writeln!(out, "     driver: {driver}");
        }
        if let Some(modules) = &device.kernel_modules {
            let _ = writeln!(out, "     modules: {}", modules.join(", "));
        }
    }
}

fn serial_test(out: &mut String, report: &SerialTestReport) {
    heading(out, "Serial port test");
    if let Some(note) = &report.note {
        let _ = writeln!(out, "  {note}");
    }

    for device in &report.devices {
        let _ = writeln!(
            out,
            " - {}  {}:{}  => {}",
            device.tty.display(),
            device.vendor_id.as_deref().unwrap_or("?"),
            device.product_id.as_deref().unwrap_or("?"),
            if device.ok { "OK" } else { "FAIL" }
        );
        for a in &device.attempts {
            let _ = write!(out, "     * [baud={}] {}: ", a.baud, a.method);
            let _ = match (&a.error, a.succeeded) {
                (_, true) => writeln!(out, "response={}", a.response_hex),
                (Some(e), false) => writeln!(out, "error={e}"),
                (None, false) if !a.response_hex.is_empty() => {
                    writeln!(out, "no success, resp={}", a.response_hex)
                }
                (None, false) => writeln!(out, "no response"),
            };
        }
        for advice in &device.advice {
            let _ = writeln!(out, "     Advice: {advice}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use super::*;
    use crate::distro::Distro;
    use crate::kernel::Kernel;
    use crate::modules::{parse_lsmod, ModuleSource, ModuleTable};
    use crate::serial::{Checksum, ProbeAttempt, SerialProbeResult, NO_RESPONSE_ADVICE};
    use crate::usb::UsbSource;

    fn node(name: &str, ids: Option<(&str, &str)>, driver: Option<&str>) -> UsbNode {
        let mut node = UsbNode::new(name);
        node.vendor_id = ids.map(|(v, _)| v.to_string());
        node.product_id = ids.map(|(_, p)| p.to_string());
        node.driver = driver.map(|d| d.to_string());
        node
    }

    fn report() -> Report {
        let mut hub = node("usb1", Some(("1d6b", "0002")), Some("hub"));
        hub.bus = Some(1);
        hub.device = Some(1);
        let mut serial = node("1-2", Some(("1a86", "7523")), None);
        serial.product = Some("USB Serial".to_string());
        serial.children.push(node("1-2:1.0", None, Some("ch341")));
        hub.children.push(serial);

        let mut raw = BTreeMap::new();
        raw.insert("ID".to_string(), "debian".to_string());
        raw.insert("PRETTY_NAME".to_string(), "Debian 12".to_string());

        let modules = ModuleTable {
            source: ModuleSource::Lsmod,
            modules: parse_lsmod(
                "Module Size Used by\nch341 24576 0\nusbserial 65536 1 ch341\nhid 1 0\n",
            ),
        };
        let tree = vec![hub];
        let drivers = crate::drivers::correlate(&tree, &modules);

        Report {
            distro: Distro::from_fields(raw),
            kernel: Kernel {
                system: "Linux".into(),
                node: "box".into(),
                release: "6.1.0".into(),
                version: "#1 SMP".into(),
                machine: "x86_64".into(),
                processor: String::new(),
                architecture: "x86_64 (64bit)".into(),
                bits: "64bit".into(),
                proc_version: "Linux version 6.1.0 (gcc 12) #1 SMP Debian 6.1.76-1".into(),
            },
            modules: Some(modules),
            pci: None,
            usb: UsbSection {
                source: UsbSource::Sysfs,
                tree,
            },
            drivers,
            serial_test: None,
        }
    }

    #[test]
    fn usb_tree_indents_children() {
        let report = report();
        assert_eq!(
            render_usb_tree(&report.usb.tree),
            "usb1  [1d6b:0002]  (driver=hub)  bus=1 dev=1\n  \
             1-2  [1a86:7523]  - USB Serial\n    \
             1-2:1.0  (driver=ch341)"
        );
        assert_eq!(render_usb_tree(&[]), "");
    }

    #[test]
    fn partial_ids() {
        let only_vendor = node("1-3", Some(("1a86", "")), None);
        assert_eq!(format_usb_node(&only_vendor), "1-3  [1a86:]");

        let mut only_product = UsbNode::new("1-4");
        only_product.product_id = Some("7523".into());
        assert_eq!(format_usb_node(&only_product), "1-4  [pid=7523]");
    }

    #[test]
    fn sections() {
        let report = report();
        let text = render_text(&report, &RenderOptions::default());

        assert!(text.contains(
            "=== Distribution ===\nDebian 12\n\nID: debian\nPRETTY_NAME: Debian 12"
        ));
        assert!(text.contains("=== Kernel ===\n6.1.0 #1 SMP\nmachine: x86_64, processor: "));
        assert!(text.contains("kernel build: #1 SMP Debian 6.1.76-1"));
        assert!(text.contains(" - ch341 (loaded) used_by=0\n     * 1-2:1.0 "));
        assert!(text.contains(" - hub (not listed as loaded)\n     * usb1 [1d6b:0002] "));
        assert!(text.contains(
            "=== Loaded kernel modules ===\nsource: lsmod\n - ch341 used_by=0\n - usbserial used_by=1 ch341"
        ));
        assert!(!text.contains("PCI devices"));
        assert!(!text.contains("Serial port test"));

        let limited = render_text(
            &report,
            &RenderOptions {
                usb: false,
                limit_modules: 1,
                ..Default::default()
            },
        );
        assert!(!limited.contains("USB device tree"));
        assert!(!limited.contains("usbserial"));
        assert!(limited.contains("=== Drivers ==="));
    }

    #[test]
    fn serial_section() {
        let mut report = report();
        report.serial_test = Some(SerialTestReport {
            targets: Vec::new(),
            devices: vec![SerialProbeResult {
                tty: PathBuf::from("/dev/ttyUSB0"),
                vendor_id: Some("1a86".into()),
                product_id: None,
                attempts: vec![
                    ProbeAttempt {
                        baud: 9600,
                        method: Checksum::Sum,
                        sent_hex: "57ab00010003".into(),
                        response_hex: String::new(),
                        succeeded: false,
                        error: Some("Permission denied".into()),
                    },
                    ProbeAttempt {
                        baud: 9600,
                        method: Checksum::Xor,
                        sent_hex: "57ab000100fd".into(),
                        response_hex: String::new(),
                        succeeded: false,
                        error: None,
                    },
                ],
                ok: false,
                advice: vec![NO_RESPONSE_ADVICE.to_string()],
            }],
            note: None,
        });

        let text = render_text(&report, &RenderOptions::default());
        assert!(text.ends_with(&format!(
            "=== Serial port test ===\n \
             - /dev/ttyUSB0  1a86:?  => FAIL\n     \
             * [baud=9600] sum: error=Permission denied\n     \
             * [baud=9600] xor: no response\n     \
             Advice: {NO_RESPONSE_ADVICE}"
        )));

        let summary = render_serial_summary(report.serial_test.as_ref().unwrap());
        assert_eq!(summary, "/dev/ttyUSB0  1a86:?  => FAIL\n  [baud=9600] no response");
    }

    #[test]
    fn empty_serial_summary() {
        let summary = render_serial_summary(&SerialTestReport {
            note: Some("nothing here".into()),
            ..Default::default()
        });
        assert_eq!(summary, "  nothing here");
    }
}
