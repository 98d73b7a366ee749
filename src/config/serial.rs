use super::*;

use sysinspect::serial::VidPid;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Serial {
    #[serde(default = "default_targets")]
    targets: Vec<String>,

    #[serde(default)]
    tty: Option<String>,

    // fixed baud rate, otherwise chosen per adapter
    #[serde(default)]
    baud: Option<u32>,

    #[serde(default = "timeout")]
    timeout: String,
}

impl Default for Serial {
    fn default() -> Self {
        Self {
            targets: default_targets(),
            tty: None,
            baud: None,
            timeout: timeout(),
        }
    }
}

impl Serial {
    pub fn check(&self) -> Result<(), String> {
        for target in &self.targets {
            if let Err(e) = target.parse::<VidPid>() {
                return Err(format!("serial target is not valid: {e}"));
            }
        }

        if self.baud == Some(0) {
            return Err("serial baud must be greater than zero".into());
        }

        if let Err(e) = self.timeout.parse::<humantime::Duration>() {
            return Err(format!("serial timeout couldn't be parsed: {e}"));
        }

        Ok(())
    }

    pub fn targets(&self) -> Vec<VidPid> {
        self.targets.iter().filter_map(|t| t.parse().ok()).collect()
    }

    pub fn tty(&self) -> Option<PathBuf> {
        self.tty.as_ref().map(PathBuf::from)
    }

    pub fn baud(&self) -> Option<u32> {
        self.baud
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
            .parse::<humantime::Duration>()
            .map(Into::into)
            .unwrap_or(sysinspect::serial::DEFAULT_TIMEOUT)
    }
}
