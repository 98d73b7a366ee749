//! Invocation of the optional external enumeration utilities (`lsmod`,
//! `lspci`, `lsusb`, `lsb_release`, `uname`).
//!
//! A missing utility is never an error here. It is reported the way a shell
//! would report it, with exit code 127, so callers can fall back to another
//! data source.

use std::process::Command;

use log::debug;

use crate::Error;

/// Exit code reported when the requested utility is not installed.
pub const NOT_FOUND: i32 = 127;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn not_found(tool: &str) -> Self {
        Self {
            code: NOT_FOUND,
            stdout: String::new(),
            stderr: Error::tool_unavailable(tool).to_string(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Standard output of a successful run that printed something.
    pub fn text(&self) -> Option<&str> {
        if self.success() && !self.stdout.is_empty() {
            Some(&self.stdout)
        } else {
            None
        }
    }

    /// Best description of why a run failed: stderr, then stdout, then the
    /// exit code.
    pub fn failure_reason(&self, tool: &str) -> String {
        if !self.stderr.is_empty() {
            self.stderr.clone()
        } else if !self.stdout.is_empty() {
            self.stdout.clone()
        } else {
            format!("{tool} rc={}", self.code)
        }
    }
}

/// Seam between the collectors and the host's external utilities.
pub trait ToolRunner {
    /// Whether `tool` can be found on the search path.
    fn available(&self, tool: &str) -> bool;

    /// Runs `tool` with `args` to completion and captures its output.
    fn run(&self, tool: &str, args: &[&str]) -> ToolOutput;
}

/// Runs utilities found on the `PATH` of the current process.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemTools;

impl ToolRunner for SystemTools {
    fn available(&self, tool: &str) -> bool {
        which::which(tool).is_ok()
    }

    fn run(&self, tool: &str, args: &[&str]) -> ToolOutput {
        let Ok(program) = which::which(tool) else {
            debug!("{tool} is not installed");
            return ToolOutput::not_found(tool);
        };

        match Command::new(&program).args(args).output() {
            Ok(output) => ToolOutput {
                code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ToolOutput::not_found(tool),
            Err(e) => {
                debug!("failed to run {}: {e}", program.display());
                ToolOutput {
                    code: -1,
                    stdout: String::new(),
                    stderr: format!("{tool}: {e}"),
                }
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tool_is_not_an_error() {
        let out = SystemTools.run("definitely-not-a-real-tool-4242", &[]);
        assert_eq!(out.code, NOT_FOUND);
        assert!(out.stdout.is_empty());
        assert_eq!(out.stderr, "definitely-not-a-real-tool-4242: not found");
        assert!(!SystemTools.available("definitely-not-a-real-tool-4242"));
    }

    #[test]
    fn failure_reason_prefers_stderr() {
        let out = ToolOutput {
            code: 1,
            stdout: "partial".into(),
            stderr: "boom".into(),
        };
        assert_eq!(out.failure_reason("lspci"), "boom");

        let out = ToolOutput {
            code: 2,
            ..Default::default()
        };
        assert_eq!(out.failure_reason("lspci"), "lspci rc=2");
        assert_eq!(out.text(), None);
    }
}
