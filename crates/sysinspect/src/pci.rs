use crate::tool::ToolRunner;

#[non_exhaustive]
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PciDevice {
    pub device: String,
    pub kernel_driver_in_use: Option<String>,
    pub kernel_modules: Option<Vec<String>>,
    pub extra: Vec<String>,
}

impl PciDevice {
    fn new(device: &str) -> Self {
        Self {
            device: device.to_string(),
            ..Default::default()
        }
    }

    fn detail(&mut self, text: &str) {
        if let Some(driver) = text.strip_prefix("Kernel driver in use:") {
            self.kernel_driver_in_use
                .get_or_insert_with(|| driver.trim().to_string());
        } else if let Some(modules) = text.strip_prefix("Kernel modules:") {
            self.kernel_modules.get_or_insert_with(|| {
                modules
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            });
        } else {
            self.extra.push(text.to_string());
        }
    }
}

#[non_exhaustive]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PciSection {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub devices: Vec<PciDevice>,
}

impl PciSection {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            available: false,
            reason: Some(reason.into()),
            devices: Vec::new(),
        }
    }
}

/// Parses `lspci -k` output into one record per device block.
pub fn parse_lspci(text: &str) -> Vec<PciDevice> {
    let mut ret = Vec::new();
    let mut current: Option<PciDevice> = None;

    for line in text.lines() {
        if line.trim().is_empty() {
            ret.extend(current.take());
            continue;
        }

        if !line.starts_with('\t') && !line.starts_with(' ') {
            ret.extend(current.take());
            current = Some(PciDevice::new(line.trim()));
        } else if let Some(device) = current.as_mut() {
            device.detail(line.trim());
        }
    }

    ret.extend(current);
    ret
}

pub fn get_pci(tools: &dyn ToolRunner) -> PciSection {
    if !tools.available("lspci") {
        return PciSection::unavailable("lspci not found");
    }

    let out = tools.run("lspci", &["-k"]);
    if !out.success() {
        return PciSection::unavailable(out.failure_reason("lspci"));
    }

    PciSection {
        available: true,
        reason: None,
        devices: parse_lspci(&out.stdout),
    }
}
