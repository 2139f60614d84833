//! Formatting of AT commands into exactly sized buffers.

use std::fmt;
use std::io::Write;

use crate::buffer::Allocator;
use crate::error::{Result, SaraError};

/// Syntactic form of an extended AT command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    /// `AT+X=<params>`
    Set,
    /// `AT+X?`
    Read,
    /// `AT+X=?`
    Test,
    /// `AT<X>`, the keyword on its own.
    Action,
}

impl Form {
    pub const fn suffix(self) -> &'static str {
        match self {
            Form::Set => "=",
            Form::Read => "?",
            Form::Test => "=?",
            Form::Action => "",
        }
    }
}

/// Declared kind and bound of one command parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    /// Decimal integer of at most `digits` characters, sign included.
    Int { digits: usize },
    /// Double-quoted string of at most `max` bytes.
    Text { max: usize },
}

/// Static description of a command: what is sent and how large it can get.
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub keyword: &'static str,
    pub form: Form,
    pub params: &'static [Param],
}

impl CommandSpec {
    pub const fn new(
        keyword: &'static str,
        form: Form,
        params: &'static [Param],
    ) -> Self {
        Self {
            keyword,
            form,
            params,
        }
    }

    /// Bytes needed beyond the keyword and the dynamic text arguments.
    ///
    /// Covers the form suffix, parameter separators, the widest value of each
    /// integer, the quotes around each text and the `\r` terminator.
    pub const fn slack(&self) -> usize {
        let mut total = self.form.suffix().len() + 1;
        if !self.params.is_empty() {
            total += self.params.len() - 1;
        }
        let mut i = 0;
        while i < self.params.len() {
            total += match self.params[i] {
                Param::Int { digits } => digits,
                Param::Text { .. } => 2,
            };
            i += 1;
        }
        total
    }
}

/// A value for one declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arg<'a> {
    Int(i64),
    Text(&'a [u8]),
}

impl From<i64> for Arg<'_> {
    fn from(v: i64) -> Self {
        Arg::Int(v)
    }
}

impl From<u8> for Arg<'_> {
    fn from(v: u8) -> Self {
        Arg::Int(v.into())
    }
}

impl From<u16> for Arg<'_> {
    fn from(v: u16) -> Self {
        Arg::Int(v.into())
    }
}

impl From<usize> for Arg<'_> {
    fn from(v: usize) -> Self {
        Arg::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl<'a> From<&'a str> for Arg<'a> {
    fn from(v: &'a str) -> Self {
        Arg::Text(v.as_bytes())
    }
}

impl<'a> From<&'a [u8]> for Arg<'a> {
    fn from(v: &'a [u8]) -> Self {
        Arg::Text(v)
    }
}

fn decimal_width(v: i64) -> usize {
    let sign = usize::from(v < 0);
    let mut n = v.unsigned_abs();
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    sign + digits
}

/// One fully formatted command, `\r` terminator included.
#[derive(Clone, PartialEq, Eq)]
pub struct Command {
    bytes: Vec<u8>,
}

impl Command {
    /// Formats `args` against `spec` into a buffer obtained from `alloc`.
    ///
    /// Arguments are checked against their declared bounds before anything
    /// is allocated.
    pub fn format<A: Allocator + ?Sized>(
        alloc: &A,
        spec: &CommandSpec,
        args: &[Arg<'_>],
    ) -> Result<Self> {
        if args.len() != spec.params.len() {
            return Err(SaraError::UnexpectedParam("argument count"));
        }

        let mut dynamic = 0;
        for (param, arg) in spec.params.iter().zip(args) {
            match (param, arg) {
                (Param::Int { digits }, Arg::Int(v)) => {
                    if decimal_width(*v) > *digits {
                        return Err(SaraError::UnexpectedParam("integer too wide"));
                    }
                }
                (Param::Text { max }, Arg::Text(t)) => {
                    if t.len() > *max {
                        return Err(SaraError::UnexpectedParam("string too long"));
                    }
                    dynamic += t.len();
                }
                _ => return Err(SaraError::UnexpectedParam("argument kind")),
            }
        }

        let capacity = spec.keyword.len() + spec.slack() + dynamic;
        let mut bytes = alloc.allocate(capacity)?;
        bytes.extend_from_slice(spec.keyword.as_bytes());
        bytes.extend_from_slice(spec.form.suffix().as_bytes());
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                bytes.push(b',');
            }
            match arg {
                Arg::Int(v) => write!(bytes, "{v}")
                    .map_err(|_| SaraError::OutOfMemory)?,
                Arg::Text(t) => {
                    bytes.push(b'"');
                    bytes.extend_from_slice(t);
                    bytes.push(b'"');
                }
            }
        }
        bytes.push(b'\r');
        debug_assert!(bytes.len() <= capacity);

        Ok(Self { bytes })
    }

    /// Wraps an already terminated command, copied into an allocated buffer.
    pub fn raw<A: Allocator + ?Sized>(alloc: &A, text: &[u8]) -> Result<Self> {
        let mut bytes = alloc.allocate(text.len())?;
        bytes.extend_from_slice(text);
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = String::from_utf8_lossy(&self.bytes);
        f.write_str(text.trim_end_matches(['\r', '\n']))
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Command({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Heap;

    const CONNECT: CommandSpec = CommandSpec::new(
        "AT+USOCO",
        Form::Set,
        &[
            Param::Int { digits: 1 },
            Param::Text { max: 128 },
            Param::Int { digits: 5 },
        ],
    );

    #[test]
    fn connect_command_is_byte_exact() {
        let cmd = Command::format(
            &Heap,
            &CONNECT,
            &[3u8.into(), "35.180.39.173".into(), 55055u16.into()],
        )
        .unwrap();
        assert_eq!(cmd.as_bytes(), b"AT+USOCO=3,\"35.180.39.173\",55055\r");
    }

    #[test]
    fn capacity_covers_widest_arguments() {
        // "=" + 2 separators + 1 + 2 quotes + 5 + "\r"
        assert_eq!(CONNECT.slack(), 12);
        let host = "a".repeat(128);
        let cmd = Command::format(
            &Heap,
            &CONNECT,
            &[5u8.into(), host.as_str().into(), 65535u16.into()],
        )
        .unwrap();
        assert_eq!(cmd.as_bytes().len(), "AT+USOCO".len() + CONNECT.slack() + 128);
    }

    #[test]
    fn other_forms() {
        let read = CommandSpec::new("AT+CGDCONT", Form::Read, &[]);
        let test = CommandSpec::new("AT+COPS", Form::Test, &[]);
        let action = CommandSpec::new("ATE0", Form::Action, &[]);
        let fmt = |s: &CommandSpec| Command::format(&Heap, s, &[]).unwrap();
        assert_eq!(fmt(&read).as_bytes(), b"AT+CGDCONT?\r");
        assert_eq!(fmt(&test).as_bytes(), b"AT+COPS=?\r");
        assert_eq!(fmt(&action).as_bytes(), b"ATE0\r");
        assert_eq!(fmt(&test).to_string(), "AT+COPS=?");
    }

    #[test]
    fn rejects_out_of_bounds_arguments() {
        let wide = Command::format(
            &Heap,
            &CONNECT,
            &[10u8.into(), "host".into(), 1u16.into()],
        );
        assert!(matches!(wide, Err(SaraError::UnexpectedParam(_))));

        let host = "a".repeat(129);
        let long = Command::format(
            &Heap,
            &CONNECT,
            &[1u8.into(), host.as_str().into(), 1u16.into()],
        );
        assert!(matches!(long, Err(SaraError::UnexpectedParam(_))));

        let count = Command::format(&Heap, &CONNECT, &[1u8.into()]);
        assert!(matches!(count, Err(SaraError::UnexpectedParam(_))));

        let kind = Command::format(
            &Heap,
            &CONNECT,
            &["1".into(), "host".into(), 1u16.into()],
        );
        assert!(matches!(kind, Err(SaraError::UnexpectedParam(_))));
    }

    #[test]
    fn negative_width_counts_sign() {
        assert_eq!(decimal_width(0), 1);
        assert_eq!(decimal_width(-7), 2);
        assert_eq!(decimal_width(65535), 5);
        assert_eq!(decimal_width(i64::MIN), 20);
    }
}
