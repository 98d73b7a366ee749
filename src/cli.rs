use clap::{value_parser, ArgMatches, Command};

use std::path::PathBuf;

use sysinspect::render::RenderOptions;
use sysinspect::serial::{parse_targets, ProbeOptions};
use sysinspect::{Host, Options};

use crate::config::{Config, Level};

pub fn command() -> Command {
    Command::new(env!("CARGO_BIN_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_about(
            "Inspect the Linux distribution, kernel, drivers, and USB tree, and \
             probe USB-serial adapters for a response.",
        )
        .arg(
            clap::Arg::new("CONFIG")
                .help("Configuration file")
                .action(clap::ArgAction::Set)
                .value_parser(value_parser!(PathBuf))
                .index(1),
        )
        .arg(
            clap::Arg::new("JSON")
                .long("json")
                .help("Output the report as JSON")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("OUTPUT")
                .long("output")
                .short('o')
                .help("Write the report to FILE")
                .value_name("FILE")
                .action(clap::ArgAction::Set)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            clap::Arg::new("NO_MODULES")
                .long("no-modules")
                .help("Skip loaded kernel modules")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("NO_PCI")
                .long("no-pci")
                .help("Skip PCI devices")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("NO_USB")
                .long("no-usb")
                .help("Skip the USB tree")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("USB_SYSFS")
                .long("usb-sysfs")
                .help("Read the USB tree from sysfs instead of lsusb -t")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("SAVE_USB")
                .long("save-usb")
                .help("Save the USB tree as text to FILE")
                .value_name("FILE")
                .action(clap::ArgAction::Set)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            clap::Arg::new("SERIAL_TEST")
                .long("serial-test")
                .help("Find USB-serial adapters by VID:PID, send a probe, and expect a response")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("SERIAL_VIDPID")
                .long("serial-vidpid")
                .help("Comma separated VID:PID list to look for (default: 1a86:fe0c,1a86:7523)")
                .value_name("VID:PID")
                .action(clap::ArgAction::Set),
        )
        .arg(
            clap::Arg::new("SERIAL_TTY")
                .long("serial-tty")
                .help("Probe this device (e.g. /dev/ttyACM0) instead of searching")
                .value_name("TTY")
                .action(clap::ArgAction::Set)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            clap::Arg::new("SERIAL_BAUD")
                .long("serial-baud")
                .help(
                    "Baud rate for the probe. If omitted: 1a86:fe0c uses 115200, \
                     1a86:7523 tries 9600 then 115200",
                )
                .action(clap::ArgAction::Set)
                .value_parser(value_parser!(u32).range(1..)),
        )
        .arg(
            clap::Arg::new("SERIAL_TIMEOUT")
                .long("serial-timeout")
                .help("How long to wait for a probe response")
                .action(clap::ArgAction::Set)
                .value_parser(value_parser!(humantime::Duration)),
        )
        .arg(
            clap::Arg::new("REPORT_FULL")
                .long("report-full")
                .help("Inspect and run the serial test, saving the report to a file")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("LIMIT_MODULES")
                .long("limit-modules")
                .help("Show at most N modules in the text report (0 shows all)")
                .value_name("N")
                .action(clap::ArgAction::Set)
                .default_value("0")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            clap::Arg::new("MENU")
                .long("menu")
                .help("Run the interactive menu")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("VERBOSE")
                .long("verbose")
                .short('v')
                .help("Increase the verbosity")
                .action(clap::ArgAction::Count),
        )
}

/// Command line flags merged over the configuration file.
#[derive(Clone, Debug)]
pub struct Settings {
    pub json: bool,
    pub output: Option<PathBuf>,
    pub modules: bool,
    pub pci: bool,
    pub usb: bool,
    pub usb_sysfs: bool,
    pub save_usb: Option<PathBuf>,
    pub serial_test: bool,
    pub report_full: bool,
    pub limit_modules: usize,
    pub menu: bool,
    pub level: Level,
    pub probe: ProbeOptions,
    pub host: Host,
}

impl Settings {
    pub fn new(args: &ArgMatches, config: &Config) -> Result<Self, String> {
        let targets = match args.get_one::<String>("SERIAL_VIDPID") {
            Some(list) => {
                let targets = parse_targets(list);
                if targets.is_empty() {
                    return Err(format!("no valid VID:PID in {list:?}"));
                }
                targets
            }
            None => config.serial().targets(),
        };

        let timeout = args
            .get_one::<humantime::Duration>("SERIAL_TIMEOUT")
            .map(|d| **d)
            .unwrap_or_else(|| config.serial().timeout());

        let level = match args.get_count("VERBOSE") {
            0 => config.log().level(),
            1 => Level::Debug,
            _ => Level::Trace,
        };

        let report_full = args.get_flag("REPORT_FULL");

        Ok(Self {
            json: args.get_flag("JSON") || config.general().json(),
            output: args
                .get_one::<PathBuf>("OUTPUT")
                .cloned()
                .or_else(|| config.general().output()),
            modules: !args.get_flag("NO_MODULES"),
            pci: !args.get_flag("NO_PCI"),
            usb: !args.get_flag("NO_USB"),
            usb_sysfs: args.get_flag("USB_SYSFS") || config.usb().force_sysfs(),
            save_usb: args
                .get_one::<PathBuf>("SAVE_USB")
                .cloned()
                .or_else(|| config.usb().save()),
            serial_test: args.get_flag("SERIAL_TEST") || report_full,
            report_full,
            limit_modules: *args.get_one::<usize>("LIMIT_MODULES").unwrap_or(&0),
            menu: args.get_flag("MENU"),
            level,
            probe: ProbeOptions {
                targets,
                tty: args
                    .get_one::<PathBuf>("SERIAL_TTY")
                    .cloned()
                    .or_else(|| config.serial().tty()),
                baud: args
                    .get_one::<u32>("SERIAL_BAUD")
                    .copied()
                    .or_else(|| config.serial().baud()),
                timeout,
            },
            host: config.host().host(),
        })
    }

    pub fn options(&self) -> Options {
        Options {
            modules: self.modules,
            pci: self.pci,
            usb_force_sysfs: self.usb_sysfs,
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            modules: self.modules,
            pci: self.pci,
            usb: self.usb,
            limit_modules: self.limit_modules,
        }
    }
}
