use std::io::{self, Read, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use log::{debug, warn};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::{Error, Result};

/// Line rate used when the requested one is rejected on open.
pub const FALLBACK_BAUD: u32 = 115_200;

const READ_CHUNK: usize = 256;

/// Rate to reopen at after an open failure, if any. Only a rejected rate is
/// retried, and never at the rate that was just refused.
fn retry_baud(kind: serialport::ErrorKind, baud: u32) -> Option<u32> {
    match kind {
        serialport::ErrorKind::InvalidInput if baud != FALLBACK_BAUD => Some(FALLBACK_BAUD),
        _ => None,
    }
}

/// One write-then-read exchange against a serial line.
///
/// Implementations must release the device before returning so that no
/// handle outlives a single attempt.
pub trait SerialTransport {
    /// Sends `frame` to `tty` at `baud` and returns whatever arrives within
    /// `timeout`. An empty response is not an error.
    fn exchange(
        &mut self,
        tty: &Path,
        baud: u32,
        frame: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>>;
}

/// [`SerialTransport`] backed by the `serialport` crate, configured raw 8N1
/// without flow control.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerialPortTransport;

impl SerialPortTransport {
    fn open(tty: &Path, baud: u32, timeout: Duration) -> Result<Box<dyn SerialPort>> {
        let path = tty.to_string_lossy();

        match serialport::new(path.as_ref(), baud).timeout(timeout).open() {
            Ok(port) => Ok(port),
            Err(e) => match retry_baud(e.kind(), baud) {
                Some(retry) => {
                    warn!(
                        "{}: baud {baud} rejected ({e}), continuing at {retry}",
                        tty.display()
                    );
                    serialport::new(path.as_ref(), retry)
                        .timeout(timeout)
                        .open()
                        .map_err(|e| Error::serial(e, tty))
                }
                None => Err(Error::serial(e, tty)),
            },
        }
    }

    /// Applies the line settings one at a time; a setting the driver rejects
    /// is skipped.
    fn configure(port: &mut dyn SerialPort, tty: &Path) {
        let settings: [(&str, serialport::Result<()>); 4] = [
            ("data bits", port.set_data_bits(DataBits::Eight)),
            ("parity", port.set_parity(Parity::None)),
            ("stop bits", port.set_stop_bits(StopBits::One)),
            ("flow control", port.set_flow_control(FlowControl::None)),
        ];
        for (name, result) in settings {
            if let Err(e) = result {
                debug!("{}: unable to set {name}: {e}", tty.display());
            }
        }
    }
}

impl SerialTransport for SerialPortTransport {
    fn exchange(
        &mut self,
        tty: &Path,
        baud: u32,
        frame: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>> {
        let deadline = Instant::now() + timeout;

        let mut port = Self::open(tty, baud, timeout)?;
        Self::configure(port.as_mut(), tty);

        if let Err(e) = port.clear(ClearBuffer::All) {
            debug!("{}: unable to clear buffers: {e}", tty.display());
        }

        port.write_all(frame).map_err(|e| Error::unwritable(e, tty))?;
        port.flush().map_err(|e| Error::unwritable(e, tty))?;

        let mut buf = [0u8; READ_CHUNK];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(Vec::new());
            }
            if let Err(e) = port.set_timeout(remaining) {
                debug!("{}: unable to set timeout: {e}", tty.display());
            }

            match port.read(&mut buf) {
                Ok(0) => continue,
                Ok(n) => return Ok(buf[..n].to_vec()),
                Err(e) if e.kind() == io::ErrorKind::TimedOut => return Ok(Vec::new()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::unreadable(e, tty)),
            }
        }
    }
}
