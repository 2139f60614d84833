//! Driver for the u-blox SARA-R5 LTE-M/NB-IoT modem over its AT command
//! interface.
//!
//! A [`Modem`] owns a [`Transport`] and runs one command at a time: format the
//! command, send it, block for the reply up to a per-command timeout, then
//! classify and parse what came back.

pub mod at;
pub mod buffer;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod flows;
mod ops;
pub mod parser;
pub mod transport;
pub mod types;

pub use buffer::{Allocator, Heap};
pub use engine::{Exchange, MatchMode, Modem};
pub use error::{Result, SaraError, TransportError};
pub use transport::{SerialTransport, Transport};
