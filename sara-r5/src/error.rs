use std::io;

use thiserror::Error;

/// Failure of the byte transport underneath the modem.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Outcome of a modem operation that did not succeed.
///
/// Every domain operation returns one of these as the `Err` side of its
/// result. Nothing in the engine panics on a modem-side failure.
#[derive(Error, Debug)]
pub enum SaraError {
    #[error("out of memory while allocating a command or response buffer")]
    OutOfMemory,

    /// Neither the expected token nor `ERROR` arrived before the timeout.
    #[error("no response from modem")]
    NoResponse,

    /// The modem answered with `ERROR`.
    #[error("modem returned ERROR")]
    Error,

    #[error("unexpected parameter: {0}")]
    UnexpectedParam(&'static str),

    #[error("unexpected response from modem")]
    UnexpectedResponse,

    #[error("invalid socket")]
    InvalidSocket,

    #[error("modem deregistered from the network")]
    Deregistered,

    #[error("zero read length")]
    ZeroReadLength,

    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
}

impl SaraError {
    /// Numeric result code as reported by the modem firmware library.
    ///
    /// Success is `0`. Transport failures have no code of their own and
    /// report `-1` (invalid / unknown).
    pub fn code(&self) -> i8 {
        match self {
            SaraError::OutOfMemory => 1,
            SaraError::UnexpectedParam(_) => 3,
            SaraError::UnexpectedResponse => 4,
            SaraError::NoResponse => 5,
            SaraError::Deregistered => 6,
            SaraError::ZeroReadLength => 7,
            SaraError::Error => 8,
            SaraError::InvalidSocket => 9,
            SaraError::Transport(_) => -1,
        }
    }
}

// Result type alias for functions in this crate
pub type Result<T> = std::result::Result<T, SaraError>;
