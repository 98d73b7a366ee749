//! Discovery and active probing of USB-serial adapters.

mod discovery;
mod frame;
mod transport;

use std::path::PathBuf;
use std::time::Duration;

use log::debug;

use crate::Host;

pub use discovery::{
    candidate_for, default_targets, find_candidates, parse_targets, resolve_identity,
    SerialCandidate, TtyIdentity, VidPid, MAX_IDENTITY_DEPTH, TTY_PREFIXES,
};
pub use frame::{Checksum, PROBE_PAYLOAD};
pub use transport::{SerialPortTransport, SerialTransport, FALLBACK_BAUD};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1500);

pub const NO_RESPONSE_ADVICE: &str = "If there is no response, check that the correct driver is installed (e.g. CH34x/CDC) and verify /dev permissions.";

pub const NO_CANDIDATES_NOTE: &str =
    "no matching /dev/ttyUSB* or /dev/ttyACM* found for requested VID:PID";

/// One write-then-wait cycle at a given line rate and checksum rule.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeAttempt {
    pub baud: u32,
    pub method: Checksum,
    pub sent_hex: String,
    pub response_hex: String,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialProbeResult {
    pub tty: PathBuf,
    pub vendor_id: Option<String>,
    pub product_id: Option<String>,
    pub attempts: Vec<ProbeAttempt>,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub advice: Vec<String>,
}

impl SerialProbeResult {
    /// The attempt worth showing: the first success, else the last try.
    pub fn decisive_attempt(&self) -> Option<&ProbeAttempt> {
        self.attempts
            .iter()
            .find(|a| a.succeeded)
            .or_else(|| self.attempts.last())
    }
}

#[non_exhaustive]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialTestReport {
    pub targets: Vec<VidPid>,
    pub devices: Vec<SerialProbeResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Caller controls for a serial test.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeOptions {
    /// Identities to look for during discovery.
    pub targets: Vec<VidPid>,
    /// Probe this device instead of discovering candidates.
    pub tty: Option<PathBuf>,
    /// Use exactly this rate instead of the identity-based sequence.
    pub baud: Option<u32>,
    pub timeout: Duration,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            targets: default_targets(),
            tty: None,
            baud: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Line rates to try for a device, in order.
pub fn baud_sequence(
    vendor_id: Option<&str>,
    product_id: Option<&str>,
    explicit: Option<u32>,
) -> Vec<u32> {
    if let Some(baud) = explicit {
        return vec![baud];
    }

    let vendor = vendor_id.unwrap_or_default().to_ascii_lowercase();
    let product = product_id.unwrap_or_default().to_ascii_lowercase();

    match (vendor.as_str(), product.as_str()) {
        ("1a86", "fe0c") => vec![115_200],
        // some firmware revisions only answer at the lower rate first
        ("1a86", "7523") => vec![9_600, 115_200],
        _ => vec![115_200],
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Discovering,
    Probing,
    Done,
}

/// Drives discovery and the bounded trial sequence for every candidate,
/// one open line at a time.
pub struct ProbeEngine<T> {
    transport: T,
    state: EngineState,
}

impl<T: SerialTransport> ProbeEngine<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: EngineState::Idle,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    fn transition(&mut self, next: EngineState) {
        debug!("serial probe: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Discovers candidates (or takes the explicit device) and probes each
    /// in discovery order.
    pub fn run(&mut self, host: &Host, opts: &ProbeOptions) -> SerialTestReport {
        self.transition(EngineState::Discovering);
        let candidates = match &opts.tty {
            Some(tty) => vec![candidate_for(host, tty)],
            None => find_candidates(host, &opts.targets),
        };
        self.run_candidates(&candidates, opts)
    }

    /// Probes an already selected set of candidates.
    pub fn run_candidates(
        &mut self,
        candidates: &[SerialCandidate],
        opts: &ProbeOptions,
    ) -> SerialTestReport {
        let mut report = SerialTestReport {
            targets: opts.targets.clone(),
            ..Default::default()
        };

        if candidates.is_empty() {
            report.note = Some(NO_CANDIDATES_NOTE.to_string());
        }

        for candidate in candidates {
            self.transition(EngineState::Probing);
            report.devices.push(self.probe(candidate, opts));
        }

        self.transition(EngineState::Done);
        report
    }

    /// Walks the baud/checksum trial sequence for one candidate, stopping at
    /// the first non-empty response.
    pub fn probe(&mut self, candidate: &SerialCandidate, opts: &ProbeOptions) -> SerialProbeResult {
        let bauds = baud_sequence(
            candidate.vendor_id.as_deref(),
            candidate.product_id.as_deref(),
            opts.baud,
        );

        let mut attempts = Vec::new();
        let mut ok = false;

        'bauds: for baud in bauds {
            for method in Checksum::ALL {
                let frame = method.frame(&PROBE_PAYLOAD);
                let reply = self
                    .transport
                    .exchange(&candidate.tty, baud, &frame, opts.timeout);
                let attempt = match reply {
                    Ok(response) => ProbeAttempt {
                        baud,
                        method,
                        sent_hex: hex::encode(&frame),
                        response_hex: hex::encode(&response),
                        succeeded: !response.is_empty(),
                        error: None,
                    },
                    Err(e) => ProbeAttempt {
                        baud,
                        method,
                        sent_hex: hex::encode(&frame),
                        response_hex: String::new(),
                        succeeded: false,
                        error: Some(e.to_string()),
                    },
                };

                debug!(
                    "{} baud={baud} method={method}: {}",
                    candidate.tty.display(),
                    if attempt.succeeded { "response" } else { "no response" }
                );

                ok = attempt.succeeded;
                attempts.push(attempt);
                if ok {
                    break 'bauds;
                }
            }
        }

        SerialProbeResult {
            tty: candidate.tty.clone(),
            vendor_id: candidate.vendor_id.clone(),
            product_id: candidate.product_id.clone(),
            attempts,
            ok,
            advice: if ok {
                Vec::new()
            } else {
                vec![NO_RESPONSE_ADVICE.to_string()]
            },
        }
    }
}
