use std::io::Write;
use std::net::Ipv4Addr;
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::at;
use crate::buffer::Allocator;
use crate::command::{Arg, CommandSpec, Form, Param};
use crate::engine::{classify, Modem};
use crate::error::{Result, SaraError};
use crate::parser::parse_socket_handle;
use crate::transport::Transport;
use crate::types::{SocketHandle, SocketProtocol};

/// Pause between the data prompt and the payload.
const PROMPT_SETTLE: Duration = Duration::from_millis(50);

const HANDLE: Param = Param::Int { digits: 1 };
const PORT: Param = Param::Int { digits: 5 };
const LENGTH: Param = Param::Int { digits: 4 };
const ADDRESS: Param = Param::Text {
    max: at::ADDRESS_LEN,
};

const SOCKET_CREATE: CommandSpec =
    CommandSpec::new(at::SOCKET_CREATE, Form::Set, &[Param::Int { digits: 2 }]);
const SOCKET_CREATE_BOUND: CommandSpec = CommandSpec::new(
    at::SOCKET_CREATE,
    Form::Set,
    &[Param::Int { digits: 2 }, PORT],
);
const SOCKET_CONNECT: CommandSpec =
    CommandSpec::new(at::SOCKET_CONNECT, Form::Set, &[HANDLE, ADDRESS, PORT]);
const SOCKET_SEND_TO: CommandSpec = CommandSpec::new(
    at::SOCKET_SEND_TO,
    Form::Set,
    &[HANDLE, ADDRESS, PORT, LENGTH],
);
const SOCKET_WRITE: CommandSpec =
    CommandSpec::new(at::SOCKET_WRITE, Form::Set, &[HANDLE, LENGTH]);
const SOCKET_CLOSE: CommandSpec =
    CommandSpec::new(at::SOCKET_CLOSE, Form::Set, &[HANDLE]);
const SOCKET_CLOSE_ASYNC: CommandSpec = CommandSpec::new(
    at::SOCKET_CLOSE,
    Form::Set,
    &[HANDLE, Param::Int { digits: 1 }],
);

fn check_payload(data: &[u8]) -> Result<()> {
    if data.is_empty() {
        return Err(SaraError::UnexpectedParam("empty payload"));
    }
    if data.len() > at::SOCKET_WRITE_LEN {
        return Err(SaraError::UnexpectedParam("payload too large"));
    }
    Ok(())
}

impl<T: Transport, A: Allocator> Modem<T, A> {
    /// Creates a socket. A `local_port` of 0 lets the modem pick one.
    pub fn socket_open(
        &mut self,
        protocol: SocketProtocol,
        local_port: u16,
    ) -> Result<SocketHandle> {
        let command = if local_port == 0 {
            self.command(&SOCKET_CREATE, &[protocol.code().into()])?
        } else {
            self.command(
                &SOCKET_CREATE_BOUND,
                &[protocol.code().into(), local_port.into()],
            )?
        };
        let mut response = self.response_buffer(at::STANDARD_RESPONSE_SIZE)?;

        let exchange = self.send_with_response(
            command.as_bytes(),
            at::OK,
            &mut response,
            at::SHORT_TIMEOUT,
        )?;
        let received = classify(exchange, &response)?;

        let handle = parse_socket_handle(&response[..received])?;
        info!(%handle, ?protocol, local_port, "Socket opened");
        Ok(handle)
    }

    /// Connects `handle` to `address:port`.
    pub fn socket_connect(
        &mut self,
        handle: SocketHandle,
        address: Ipv4Addr,
        port: u16,
        response: &mut [u8],
    ) -> Result<()> {
        let mut text = self.allocator().allocate(at::IPV4_TEXT_LEN)?;
        write!(text, "{address}").map_err(|_| SaraError::OutOfMemory)?;
        self.connect(handle, &text, port, response)
    }

    /// Connects `handle` to a host given as text, IP literal or domain name.
    pub fn socket_connect_address(
        &mut self,
        handle: SocketHandle,
        address: &str,
        port: u16,
        response: &mut [u8],
    ) -> Result<()> {
        self.connect(handle, address.as_bytes(), port, response)
    }

    fn connect(
        &mut self,
        handle: SocketHandle,
        address: &[u8],
        port: u16,
        response: &mut [u8],
    ) -> Result<()> {
        self.execute(
            &SOCKET_CONNECT,
            &[handle.get().into(), Arg::Text(address), port.into()],
            at::OK,
            response,
            at::IP_CONNECT_TIMEOUT,
        )?;
        info!(
            %handle,
            address = %String::from_utf8_lossy(address),
            port,
            "Socket connected"
        );
        Ok(())
    }

    /// Sends one datagram from a UDP socket to `address:port`.
    pub fn socket_write_udp(
        &mut self,
        handle: SocketHandle,
        address: &str,
        port: u16,
        data: &[u8],
    ) -> Result<()> {
        check_payload(data)?;
        let command = self.command(
            &SOCKET_SEND_TO,
            &[
                handle.get().into(),
                address.into(),
                port.into(),
                data.len().into(),
            ],
        )?;
        self.write_payload(command.as_bytes(), data)?;
        debug!(%handle, address, port, len = data.len(), "Datagram sent");
        Ok(())
    }

    /// Writes `data` to a connected socket.
    pub fn socket_write(&mut self, handle: SocketHandle, data: &[u8]) -> Result<()> {
        check_payload(data)?;
        let command =
            self.command(&SOCKET_WRITE, &[handle.get().into(), data.len().into()])?;
        self.write_payload(command.as_bytes(), data)?;
        debug!(%handle, len = data.len(), "Socket data written");
        Ok(())
    }

    /// Sends `command`, waits for the data prompt, then sends `data`.
    fn write_payload(&mut self, command: &[u8], data: &[u8]) -> Result<()> {
        let mut response = self.response_buffer(at::SMALL_RESPONSE_SIZE)?;

        let exchange = self.send_with_response(
            command,
            at::DATA_PROMPT,
            &mut response,
            at::WRITE_TIMEOUT,
        )?;
        classify(exchange, &response)?;

        thread::sleep(PROMPT_SETTLE);

        let exchange =
            self.send_with_response(data, at::OK, &mut response, at::SHORT_TIMEOUT)?;
        classify(exchange, &response)?;
        Ok(())
    }

    /// Closes `handle`.
    ///
    /// Passing the short timeout selects the asynchronous close, which
    /// returns before the remote side acknowledges. The wait for the reply
    /// is the same either way.
    pub fn socket_close(
        &mut self,
        handle: SocketHandle,
        timeout: Duration,
        response: &mut [u8],
    ) -> Result<()> {
        if timeout == at::SHORT_TIMEOUT {
            self.execute(
                &SOCKET_CLOSE_ASYNC,
                &[handle.get().into(), 1u8.into()],
                at::OK,
                response,
                at::MEDIUM_TIMEOUT,
            )?;
        } else {
            self.execute(
                &SOCKET_CLOSE,
                &[handle.get().into()],
                at::OK,
                response,
                at::MEDIUM_TIMEOUT,
            )?;
        }
        info!(%handle, "Socket closed");
        Ok(())
    }
}
