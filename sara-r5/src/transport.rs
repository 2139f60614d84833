use std::io::{self, Read, Write};
use std::thread;
use std::time::{Duration, Instant};

use serialport::SerialPort;
use tracing::{debug, trace};

use crate::at;
use crate::error::TransportError;

/// Byte channel to the modem.
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    /// Writes all of `bytes`.
    fn transmit(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Reads into `buf` for at most `timeout` and returns the number of bytes
    /// placed there. Running out of time is not an error.
    fn receive(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn transmit(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).transmit(bytes)
    }

    fn receive(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, TransportError> {
        (**self).receive(buf, timeout)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn transmit(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).transmit(bytes)
    }

    fn receive(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, TransportError> {
        (**self).receive(buf, timeout)
    }
}

const IDLE_WAIT: Duration = Duration::from_millis(50);

/// True once `received` ends in a final result code or the data prompt.
pub fn is_complete(received: &[u8]) -> bool {
    received.ends_with(at::OK)
        || received.ends_with(at::ERROR)
        || received.ends_with(at::DATA_PROMPT)
}

/// The modem's UART, opened through `serialport`.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    poll: Duration,
}

impl SerialTransport {
    pub const DEFAULT_BAUD: u32 = 115_200;

    /// Opens `device`. `poll` bounds a single blocking read.
    pub fn open(
        device: &str,
        baud: u32,
        poll: Duration,
    ) -> Result<Self, TransportError> {
        let port = serialport::new(device, baud).timeout(poll).open()?;
        debug!(device, baud, "Opened modem serial port");
        Ok(Self { port, poll })
    }
}

impl Transport for SerialTransport {
    fn transmit(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }

    fn receive(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, TransportError> {
        let deadline = Instant::now() + timeout;
        let mut filled = 0;

        while filled < buf.len() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            self.port.set_timeout((deadline - now).min(self.poll))?;

            match self.port.read(&mut buf[filled..]) {
                Ok(0) => thread::sleep(IDLE_WAIT),
                Ok(n) => {
                    filled += n;
                    if is_complete(&buf[..filled]) {
                        break;
                    }
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                    ) => {}
                Err(e) => return Err(e.into()),
            }
        }

        trace!(filled, "Serial receive finished");
        Ok(filled)
    }
}
