use std::time::Duration;

use tracing::{debug, warn};

use crate::at;
use crate::buffer::{self, Allocator, Heap};
use crate::command::{Arg, Command, CommandSpec, Form};
use crate::error::{Result, SaraError, TransportError};
use crate::transport::Transport;

/// Response buffer used for raw commands.
const RAW_RESPONSE_SIZE: usize = 1024;

const ECHO_OFF: CommandSpec = CommandSpec::new(at::ECHO_OFF, Form::Action, &[]);
const ATTENTION: CommandSpec = CommandSpec::new(at::ATTENTION, Form::Action, &[]);

/// How the received bytes are compared with the expected token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// The token appears anywhere in the received bytes.
    #[default]
    Substring,
    /// The received bytes are exactly the token.
    Exact,
}

/// Result of one command/response exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exchange {
    pub matched: bool,
    /// Bytes placed in the response buffer.
    pub received: usize,
}

/// Returns true if `needle` occurs in `haystack`. An empty needle always does.
pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

/// Maps an exchange onto the common outcome: match is success, an `ERROR`
/// final result is [`SaraError::Error`], anything else is
/// [`SaraError::NoResponse`]. Returns the received length on success.
pub(crate) fn classify(exchange: Exchange, response: &[u8]) -> Result<usize> {
    let received = &response[..exchange.received];
    if exchange.matched {
        Ok(exchange.received)
    } else if contains(received, at::ERROR) {
        warn!(
            response = %String::from_utf8_lossy(received).trim(),
            "Modem returned ERROR"
        );
        Err(SaraError::Error)
    } else {
        Err(SaraError::NoResponse)
    }
}

/// A SARA-R5 modem reached through `T`.
///
/// Exactly one command is outstanding at a time: every operation takes
/// `&mut self` and blocks until its response or timeout.
pub struct Modem<T, A = Heap> {
    transport: T,
    alloc: A,
}

impl<T: Transport> Modem<T> {
    pub fn new(transport: T) -> Self {
        Self::with_allocator(transport, Heap)
    }
}

impl<T: Transport, A: Allocator> Modem<T, A> {
    pub fn with_allocator(transport: T, alloc: A) -> Self {
        Self { transport, alloc }
    }

    pub fn transport(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    pub(crate) fn command(
        &self,
        spec: &CommandSpec,
        args: &[Arg<'_>],
    ) -> Result<Command> {
        Command::format(&self.alloc, spec, args)
    }

    pub(crate) fn response_buffer(&self, len: usize) -> Result<Vec<u8>> {
        buffer::zeroed(&self.alloc, len)
    }

    pub(crate) fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Sends `command` and waits up to `timeout` for a reply containing
    /// `expected`.
    pub fn send_with_response(
        &mut self,
        command: &[u8],
        expected: &[u8],
        response: &mut [u8],
        timeout: Duration,
    ) -> std::result::Result<Exchange, TransportError> {
        self.send_with_mode(
            command,
            expected,
            response,
            timeout,
            MatchMode::Substring,
        )
    }

    pub fn send_with_mode(
        &mut self,
        command: &[u8],
        expected: &[u8],
        response: &mut [u8],
        timeout: Duration,
        mode: MatchMode,
    ) -> std::result::Result<Exchange, TransportError> {
        debug!(
            command = %String::from_utf8_lossy(command).trim_end(),
            ?timeout,
            "Sending AT command"
        );
        self.transport.transmit(command)?;

        response.fill(0);
        let received = self
            .transport
            .receive(response, timeout)?
            .min(response.len());
        let got = &response[..received];

        let matched = match mode {
            MatchMode::Substring => contains(got, expected),
            MatchMode::Exact => got == expected,
        };
        debug!(
            received,
            matched,
            response = %String::from_utf8_lossy(got).trim(),
            "AT command response"
        );

        Ok(Exchange { matched, received })
    }

    /// Formats, sends and classifies one command expecting `expected`.
    pub(crate) fn execute(
        &mut self,
        spec: &CommandSpec,
        args: &[Arg<'_>],
        expected: &[u8],
        response: &mut [u8],
        timeout: Duration,
    ) -> Result<usize> {
        let command = self.command(spec, args)?;
        let exchange = self.send_with_response(
            command.as_bytes(),
            expected,
            response,
            timeout,
        )?;
        classify(exchange, response)
    }

    /// Turns off command echo, then checks the modem answers a bare `AT`
    /// with exactly `OK`.
    pub fn init(&mut self, response: &mut [u8]) -> Result<()> {
        let echo_off = self.command(&ECHO_OFF, &[])?;
        let exchange = self.send_with_response(
            echo_off.as_bytes(),
            at::OK,
            response,
            at::SHORT_TIMEOUT,
        )?;
        if !exchange.matched {
            warn!("Modem did not acknowledge ATE0");
        }

        let attention = self.command(&ATTENTION, &[])?;
        let exchange = self.send_with_mode(
            attention.as_bytes(),
            at::OK,
            response,
            at::MEDIUM_TIMEOUT,
            MatchMode::Exact,
        )?;
        classify(exchange, response).map(|_| ())
    }

    /// Sends an already terminated command and returns whatever came back.
    pub fn send_raw(&mut self, command: &str, timeout: Duration) -> Result<String> {
        let command = Command::raw(&self.alloc, command.as_bytes())?;
        let mut response = self.response_buffer(RAW_RESPONSE_SIZE)?;
        let exchange = self.send_with_response(
            command.as_bytes(),
            at::OK,
            &mut response,
            timeout,
        )?;
        if exchange.received == 0 {
            return Err(SaraError::NoResponse);
        }
        Ok(String::from_utf8_lossy(&response[..exchange.received]).into_owned())
    }
}
