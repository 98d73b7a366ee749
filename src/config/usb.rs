use super::*;

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Usb {
    // skip `lsusb -t` and walk the device registry
    #[serde(default)]
    force_sysfs: bool,

    // where to save the text rendering of the USB tree
    #[serde(default)]
    save: Option<String>,
}

impl Usb {
    pub fn force_sysfs(&self) -> bool {
        self.force_sysfs
    }

    pub fn save(&self) -> Option<PathBuf> {
        self.save.as_ref().map(PathBuf::from)
    }
}
