use std::sync::OnceLock;

use regex::Regex;

use super::{FlatTable, UsbNode};

/// One row of `lsusb -t` output with its indentation depth.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeRow {
    pub depth: usize,
    pub node: UsbNode,
}

fn bus_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Bus\s+(\d+)").expect("static regex"))
}

fn dev_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Dev\s+(\d+)").expect("static regex"))
}

fn capture_u32(re: &Regex, text: &str) -> Option<u32> {
    re.captures(text).and_then(|c| c[1].parse().ok())
}

fn parse_row(line: &str) -> Option<TreeRow> {
    let (lhs, rhs) = line.split_once(':')?;

    let mut node = UsbNode::new(lhs.trim());
    node.bus = capture_u32(bus_regex(), rhs);
    node.device = capture_u32(dev_regex(), rhs);

    for part in rhs.split(',').map(|p| p.trim()).filter(|p| !p.is_empty()) {
        if let Some(class) = part.strip_prefix("Class=") {
            node.class.get_or_insert_with(|| class.to_string());
        } else if let Some(driver) = part.strip_prefix("Driver=") {
            node.driver.get_or_insert_with(|| driver.to_string());
        } else if part.ends_with('M') || part.ends_with('G') {
            node.speed.get_or_insert_with(|| part.to_string());
        }
    }

    Some(TreeRow {
        depth: lhs.matches('|').count(),
        node,
    })
}

/// Splits `lsusb -t` output into rows, in order. Lines without a colon are
/// skipped.
pub fn parse_rows(text: &str) -> Vec<TreeRow> {
    text.lines()
        .map(|l| l.trim_end())
        .filter(|l| !l.trim().is_empty())
        .filter_map(parse_row)
        .collect()
}

/// Gives every row lacking a bus number the bus of the nearest preceding
/// row with strictly smaller depth that has one. Rows at depth zero never
/// inherit.
pub fn propagate_bus(rows: &mut [TreeRow]) {
    for idx in 0..rows.len() {
        if rows[idx].node.bus.is_some() || rows[idx].depth == 0 {
            continue;
        }
        let depth = rows[idx].depth;
        let inherited = rows[..idx]
            .iter()
            .rev()
            .find(|r| r.depth < depth && r.node.bus.is_some())
            .and_then(|r| r.node.bus);
        rows[idx].node.bus = inherited;
    }
}

/// Materializes rows into a forest: a row's parent is the nearest preceding
/// row with smaller depth.
///
/// Stock `lsusb -t` marks nesting by indentation and puts a single `|` on
/// every non-root row, so for its output depth only separates bus roots from
/// everything below them: devices behind a hub become siblings of that hub.
/// Bus numbers still resolve correctly since they only need the root.
fn assemble(rows: Vec<TreeRow>) -> Vec<UsbNode> {
    let mut roots = Vec::new();
    let mut open: Vec<TreeRow> = Vec::new();

    fn close(open: &mut Vec<TreeRow>, roots: &mut Vec<UsbNode>) {
        if let Some(done) = open.pop() {
            match open.last_mut() {
                Some(parent) => parent.node.children.push(done.node),
                None => roots.push(done.node),
            }
        }
    }

    for row in rows {
        while open.last().is_some_and(|top| top.depth >= row.depth) {
            close(&mut open, &mut roots);
        }
        open.push(row);
    }
    while !open.is_empty() {
        close(&mut open, &mut roots);
    }

    roots
}

/// Parses `lsusb -t` into a tree, propagating bus numbers down the
/// hierarchy and enriching rows whose bus and device are known.
pub fn parse_lsusb_tree(text: &str, table: Option<&FlatTable>) -> Vec<UsbNode> {
    let mut rows = parse_rows(text);
    propagate_bus(&mut rows);

    if let Some(table) = table {
        for row in rows.iter_mut() {
            row.node.enrich(table);
        }
    }

    assemble(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usb::{parse_lsusb, walk};

    const TREE: &str = "/:  Bus 002.Port 001: Dev 001, Class=root_hub, Driver=xhci_hcd/6p, 10000M
/:  Bus 001.Port 001: Dev 001, Class=root_hub, Driver=xhci_hcd/12p, 480M
    |__ Port 002: Dev 002, If 0, Class=Hub, Driver=hub/4p, 480M
        || |__ Port 001: Dev 004, If 0, Class=Communications, Driver=cdc_acm, 12M
        || |__ Port 001: Dev 004, If 1, Class=CDC Data, Driver=cdc_acm, 12M
    |__ Port 005: Dev 003, If 0, Class=Vendor Specific Class, Driver=ch341, 12M
not a row
";

    #[test]
    fn rows_and_depths() {
        let rows = parse_rows(TREE);
        let depths: Vec<usize> = rows.iter().map(|r| r.depth).collect();
        assert_eq!(depths, vec![0, 0, 1, 3, 3, 1]);

        let hub = &rows[2].node;
        assert_eq!(hub.name, "|__ Port 002");
        assert_eq!(hub.bus, None);
        assert_eq!(hub.device, Some(2));
        assert_eq!(hub.class.as_deref(), Some("Hub"));
        assert_eq!(hub.driver.as_deref(), Some("hub/4p"));
        assert_eq!(hub.speed.as_deref(), Some("480M"));
    }

    #[test]
    fn bus_comes_from_nearest_shallower_row() {
        let mut rows = parse_rows(TREE);
        propagate_bus(&mut rows);

        let buses: Vec<Option<u32>> = rows.iter().map(|r| r.node.bus).collect();
        assert_eq!(buses, vec![Some(2), Some(1), Some(1), Some(1), Some(1), Some(1)]);

        // check the property row by row against a naive ancestor lookup
        for (idx, row) in rows.iter().enumerate() {
            if row.depth == 0 {
                continue;
            }
            let ancestor = rows[..idx].iter().rev().find(|r| r.depth < row.depth);
            assert_eq!(row.node.bus, ancestor.and_then(|a| a.node.bus));
        }
    }

    #[test]
    fn explicit_bus_is_kept() {
        let mut rows = parse_rows("/: Bus 003.Port 001: Dev 001\n |: Bus 007 Dev 002\n |: Dev 003");
        propagate_bus(&mut rows);
        let buses: Vec<Option<u32>> = rows.iter().map(|r| r.node.bus).collect();
        assert_eq!(buses, vec![Some(3), Some(7), Some(3)]);
    }

    #[test]
    fn tree_shape_and_enrichment() {
        let table = parse_lsusb(
            "Bus 001 Device 004: ID 1a86:fe0c QinHeng Electronics
Bus 001 Device 003: ID 1a86:7523 QinHeng Electronics CH340 serial converter",
        );
        let roots = parse_lsusb_tree(TREE, Some(&table));

        assert_eq!(roots.len(), 2);
        assert!(roots[0].children.is_empty());

        let bus1 = &roots[1];
        assert_eq!(bus1.children.len(), 2);
        assert_eq!(bus1.children[0].children.len(), 2);
        assert_eq!(bus1.children[0].children[0].vendor_id.as_deref(), Some("1a86"));
        assert_eq!(bus1.children[1].product_id.as_deref(), Some("7523"));

        assert_eq!(walk(&roots).count(), 6);
    }

    #[test]
    fn empty_input() {
        assert!(parse_lsusb_tree("", None).is_empty());
        assert!(parse_lsusb_tree("no colons here\n", None).is_empty());
    }

    #[test]
    fn indented_rows_flatten_under_their_bus() {
        let text = "/:  Bus 001.Port 001: Dev 001, Class=root_hub, Driver=xhci_hcd/12p, 480M
    |__ Port 002: Dev 002, If 0, Class=Hub, Driver=hub/4p, 480M
        |__ Port 001: Dev 004, If 0, Class=Communications, Driver=cdc_acm, 12M
        |__ Port 001: Dev 004, If 1, Class=CDC Data, Driver=cdc_acm, 12M
    |__ Port 005: Dev 003, If 0, Class=Vendor Specific Class, Driver=ch341, 12M";

        let depths: Vec<usize> = parse_rows(text).iter().map(|r| r.depth).collect();
        assert_eq!(depths, vec![0, 1, 1, 1, 1]);

        let roots = parse_lsusb_tree(text, None);
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].children.len(), 4);
        assert!(roots[0].children.iter().all(|c| c.children.is_empty()));
        assert!(roots[0].children.iter().all(|c| c.bus == Some(1)));
    }
}
