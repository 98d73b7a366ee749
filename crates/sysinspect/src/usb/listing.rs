use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

/// Identity of one device from the flat `lsusb` listing.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsbFlatEntry {
    pub vendor_id: String,
    pub product_id: String,
    pub description: String,
}

/// Flat listing keyed by `(bus, device)` number.
pub type FlatTable = BTreeMap<(u32, u32), UsbFlatEntry>;

fn line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^Bus\s+(\d+)\s+Device\s+(\d+):\s+ID\s+([0-9a-fA-F]{4}):([0-9a-fA-F]{4})\s*(.*)$")
            .expect("static regex")
    })
}

/// Parses plain `lsusb` output, e.g.
/// `Bus 001 Device 002: ID 8087:8000 Intel Corp.`
///
/// Lines that do not match are skipped. Ids are lower-cased.
pub fn parse_lsusb(text: &str) -> FlatTable {
    let mut ret = FlatTable::new();

    for line in text.lines() {
        let Some(caps) = line_regex().captures(line.trim()) else {
            continue;
        };
        let (Ok(bus), Ok(device)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>()) else {
            continue;
        };
        ret.insert(
            (bus, device),
            UsbFlatEntry {
                vendor_id: caps[3].to_ascii_lowercase(),
                product_id: caps[4].to_ascii_lowercase(),
                description: caps[5].trim().to_string(),
            },
        );
    }

    ret
}
