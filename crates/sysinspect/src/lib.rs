//! Inspect the distribution, kernel, drivers, and USB topology of a Linux
//! host, and probe USB-serial adapters for a response.
//!

#[macro_use]
extern crate serde;

mod error;
mod host;
mod util;

pub mod distro;
pub mod drivers;
pub mod kernel;
pub mod modules;
pub mod pci;
pub mod render;
pub mod serial;
pub mod tool;
pub mod usb;

pub use crate::error::{Error, ErrorKind, Result};
pub use crate::host::Host;

use crate::distro::Distro;
use crate::drivers::DriverGroup;
use crate::kernel::Kernel;
use crate::modules::ModuleTable;
use crate::pci::PciSection;
use crate::serial::{ProbeEngine, ProbeOptions, SerialPortTransport, SerialTestReport};
use crate::tool::{SystemTools, ToolRunner};
use crate::usb::UsbSection;

/// Inspect the live system with the default options.
pub fn inspect() -> Report {
    Inspector::new(Host::default(), SystemTools).report(&Options::default())
}

/// What a report includes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    pub modules: bool,
    pub pci: bool,
    /// Read the USB topology from the device registry even when `lsusb -t`
    /// is available.
    pub usb_force_sysfs: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            modules: true,
            pci: true,
            usb_force_sysfs: false,
        }
    }
}

#[non_exhaustive]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Report {
    pub distro: Distro,
    pub kernel: Kernel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modules: Option<ModuleTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pci: Option<PciSection>,
    pub usb: UsbSection,
    pub drivers: Vec<DriverGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_test: Option<SerialTestReport>,
}

impl Report {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Collects reports from one host through one set of utilities.
///
/// Every call scans from scratch; nothing is cached between calls.
pub struct Inspector<T> {
    host: Host,
    tools: T,
}

impl<T: ToolRunner> Inspector<T> {
    pub fn new(host: Host, tools: T) -> Self {
        Self { host, tools }
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn report(&self, opts: &Options) -> Report {
        let tools: &dyn ToolRunner = &self.tools;

        let distro = distro::get_distro(&self.host, tools);
        let kernel = kernel::get_kernel(&self.host, tools);

        // the module table backs driver correlation even when not reported
        let modules = modules::get_modules(&self.host, tools);
        let usb = usb::get_usb(&self.host, tools, opts.usb_force_sysfs);
        let drivers = drivers::correlate(&usb.tree, &modules);

        let pci = opts.pci.then(|| pci::get_pci(tools));

        Report {
            distro,
            kernel,
            modules: opts.modules.then_some(modules),
            pci,
            usb,
            drivers,
            serial_test: None,
        }
    }

    /// Runs the serial test over the real serial lines of this host.
    pub fn serial_test(&self, opts: &ProbeOptions) -> SerialTestReport {
        ProbeEngine::new(SerialPortTransport).run(&self.host, opts)
    }
}
