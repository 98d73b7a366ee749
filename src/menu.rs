use log::debug;

use std::io::{BufRead, Write};

use sysinspect::render::render_serial_summary;
use sysinspect::serial::{
    candidate_for, find_candidates, ProbeEngine, SerialCandidate, SerialPortTransport,
    SerialTestReport,
};

use crate::actions;
use crate::cli::Settings;
use crate::output;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Choice {
    Inspect,
    SerialTest,
    FullReport,
    Exit,
}

impl Choice {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(Self::Inspect),
            "2" => Some(Self::SerialTest),
            "3" => Some(Self::FullReport),
            "0" | "q" | "quit" | "exit" => Some(Self::Exit),
            _ => None,
        }
    }
}

/// Reads one line, `None` at end of input.
fn prompt<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    text: &str,
) -> std::io::Result<Option<String>> {
    write!(out, "{text}")?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Lets the user narrow several matching adapters down to one. An empty
/// answer or an invalid one keeps every candidate; `0` keeps none.
pub fn choose<R: BufRead, W: Write>(
    candidates: Vec<SerialCandidate>,
    input: &mut R,
    out: &mut W,
) -> std::io::Result<Vec<SerialCandidate>> {
    if candidates.len() < 2 {
        return Ok(candidates);
    }

    writeln!(out, "Matching serial devices found:")?;
    for (idx, c) in candidates.iter().enumerate() {
        writeln!(
            out,
            "  {}) {}  {}:{}",
            idx + 1,
            c.tty.display(),
            c.vendor_id.as_deref().unwrap_or("?"),
            c.product_id.as_deref().unwrap_or("?")
        )?;
    }
    writeln!(out, "  0) Do not run serial test now")?;

    let Some(answer) = prompt(input, out, "Select device (Enter for all): ")? else {
        return Ok(candidates);
    };
    if answer.is_empty() {
        return Ok(candidates);
    }

    match answer.parse::<usize>() {
        Ok(0) => Ok(Vec::new()),
        Ok(n) if n <= candidates.len() => Ok(vec![candidates[n - 1].clone()]),
        _ => {
            writeln!(out, "Invalid selection, running all candidates.")?;
            Ok(candidates)
        }
    }
}

fn serial_test<R: BufRead, W: Write>(
    settings: &Settings,
    input: &mut R,
    out: &mut W,
) -> anyhow::Result<()> {
    let found = match &settings.probe.tty {
        Some(tty) => vec![candidate_for(&settings.host, tty)],
        None => find_candidates(&settings.host, &settings.probe.targets),
    };
    let had_candidates = !found.is_empty();
    let chosen = choose(found, input, out)?;

    let report = if chosen.is_empty() && had_candidates {
        let mut report = SerialTestReport::default();
        report.targets = settings.probe.targets.clone();
        report.note = Some("serial test skipped".to_string());
        report
    } else {
        ProbeEngine::new(SerialPortTransport).run_candidates(&chosen, &settings.probe)
    };

    writeln!(out, "{}", render_serial_summary(&report))?;
    Ok(())
}

fn full_report<W: Write>(settings: &Settings, out: &mut W) -> anyhow::Result<()> {
    let mut settings = settings.clone();
    settings.serial_test = true;

    let report = actions::build(&settings);
    let body = actions::render(&settings, &report)?;
    let path = output::report_path(settings.output.as_deref(), settings.json);
    output::write(&path, &body)?;

    writeln!(out, "Wrote report to {}", path.display())?;
    Ok(())
}

fn inspect<W: Write>(settings: &Settings, out: &mut W) -> anyhow::Result<()> {
    let mut settings = settings.clone();
    settings.serial_test = false;

    let report = actions::build(&settings);
    if let Some(path) = &settings.save_usb {
        actions::save_usb(path, &report)?;
    }
    writeln!(out, "{}", actions::render(&settings, &report)?)?;
    Ok(())
}

/// Repeats independent passes until the user exits.
pub fn run<R: BufRead, W: Write>(
    settings: &Settings,
    input: &mut R,
    out: &mut W,
) -> anyhow::Result<()> {
    loop {
        writeln!(out)?;
        writeln!(out, "Please choose an action (0 to exit):")?;
        writeln!(out, "  1) Inspect Linux distro, kernel, drivers, and USB tree")?;
        writeln!(
            out,
            "  2) Test serial port (auto-detect {})",
            settings
                .probe
                .targets
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(" or ")
        )?;
        writeln!(
            out,
            "  3) Generate full report (inspect + serial test) saved to {}",
            output::report_path(settings.output.as_deref(), settings.json).display()
        )?;
        writeln!(out, "  0) Exit")?;

        let Some(line) = prompt(input, out, "> ")? else {
            return Ok(());
        };

        let result = match Choice::parse(&line) {
            Some(Choice::Inspect) => inspect(settings, out),
            Some(Choice::SerialTest) => serial_test(settings, input, out),
            Some(Choice::FullReport) => full_report(settings, out),
            Some(Choice::Exit) => return Ok(()),
            None => {
                writeln!(out, "Invalid selection, try again.")?;
                continue;
            }
        };

        // a failed pass does not end the session
        if let Err(e) = result {
            debug!("menu action failed: {e:?}");
            writeln!(out, "error: {e}")?;
        }
    }
}
