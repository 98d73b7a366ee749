use anyhow::Context;
use regex::Regex;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const DEFAULT_TEXT_REPORT: &str = "devscope_report.txt";
pub const DEFAULT_JSON_REPORT: &str = "devscope_report.json";

fn numeric_name() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+(\.json)?$").expect("static regex"))
}

/// Picks the report file name. A missing name, or a bare number (usually a
/// menu choice typed at the wrong prompt), falls back to the default; JSON
/// reports always get a `.json` suffix.
pub fn report_path(name: Option<&Path>, json: bool) -> PathBuf {
    let default = || {
        PathBuf::from(if json {
            DEFAULT_JSON_REPORT
        } else {
            DEFAULT_TEXT_REPORT
        })
    };

    let Some(name) = name else {
        return default();
    };
    let text = name.to_string_lossy();
    let text = text.trim();

    if text.is_empty() || numeric_name().is_match(text) {
        return default();
    }
    if json && !text.to_ascii_lowercase().ends_with(".json") {
        return PathBuf::from(format!("{text}.json"));
    }

    PathBuf::from(text)
}

/// Writes `content` followed by a newline.
pub fn write(path: &Path, content: &str) -> anyhow::Result<()> {
    std::fs::write(path, format!("{content}\n"))
        .with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_names() {
        assert_eq!(report_path(None, false), PathBuf::from(DEFAULT_TEXT_REPORT));
        assert_eq!(report_path(None, true), PathBuf::from(DEFAULT_JSON_REPORT));
        assert_eq!(
            report_path(Some(Path::new("3")), false),
            PathBuf::from(DEFAULT_TEXT_REPORT)
        );
        assert_eq!(
            report_path(Some(Path::new("0.json")), true),
            PathBuf::from(DEFAULT_JSON_REPORT)
        );
        assert_eq!(
            report_path(Some(Path::new("out")), true),
            PathBuf::from("out.json")
        );
        assert_eq!(
            report_path(Some(Path::new("out.JSON")), true),
            PathBuf::from("out.JSON")
        );
        assert_eq!(
            report_path(Some(Path::new("report.txt")), false),
            PathBuf::from("report.txt")
        );
    }

    #[test]
    fn writes_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.txt");
        write(&path, "hello").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");

        assert!(write(&dir.path().join("missing/r.txt"), "x").is_err());
    }
}
