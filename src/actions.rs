use log::info;

use std::io::Write;

use sysinspect::render::{render_text, render_usb_tree};
use sysinspect::tool::SystemTools;
use sysinspect::{Inspector, Report};

use crate::cli::Settings;
use crate::output;

/// Builds the report the settings ask for, with the serial test attached
/// when requested.
pub fn build(settings: &Settings) -> Report {
    let inspector = Inspector::new(settings.host.clone(), SystemTools);

    let mut report = inspector.report(&settings.options());
    if settings.serial_test {
        report.serial_test = Some(inspector.serial_test(&settings.probe));
    }

    report
}

pub fn render(settings: &Settings, report: &Report) -> anyhow::Result<String> {
    if settings.json {
        Ok(report.to_json()?)
    } else {
        Ok(render_text(report, &settings.render_options()))
    }
}

/// Saves the text rendering of the USB tree.
pub fn save_usb(path: &std::path::Path, report: &Report) -> anyhow::Result<()> {
    let text = if report.usb.tree.is_empty() {
        "(no usb devices)".to_string()
    } else {
        render_usb_tree(&report.usb.tree)
    };
    output::write(path, &text)?;
    info!("wrote USB tree to {}", path.display());
    Ok(())
}

/// One non-interactive run: collect, render, and print or save.
pub fn execute(settings: &Settings) -> anyhow::Result<()> {
    let report = build(settings);

    if let Some(path) = &settings.save_usb {
        save_usb(path, &report)?;
    }

    let body = render(settings, &report)?;

    let destination = if settings.report_full || settings.output.is_some() {
        Some(output::report_path(settings.output.as_deref(), settings.json))
    } else {
        None
    };

    match destination {
        Some(path) => {
            output::write(&path, &body)?;
            println!("Wrote report to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{body}")?;
        }
    }

    Ok(())
}
