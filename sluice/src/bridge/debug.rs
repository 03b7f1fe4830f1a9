//! AHB access through the BMC's hardware debug UART.
//!
//! The debug UART speaks a line-oriented ASCII protocol. This driver
//! reaches it through a network console server, logging in with the
//! supplied credentials first; it is the network-attached path of last
//! resort and carries the lowest negotiation priority.

use std::io::{Read, Write};
use std::net::TcpStream;

use crate::ahb::Ahb;
use crate::bridge::{Bridge, BridgeCreationError, BridgeError, BridgeFactory};
use crate::connection::{ConnectionArgs, ConnectionError};

#[derive(Debug)]
pub(crate) struct DebugUartFactory;

impl BridgeFactory for DebugUartFactory {
    fn name(&self) -> &'static str {
        "debug"
    }

    fn description(&self) -> &'static str {
        "Hardware debug UART via a network console server"
    }

    fn probe(&self) -> Result<Bridge, BridgeError> {
        // Availability cannot be inferred from the local environment; the
        // console server must be named explicitly.
        Err(BridgeCreationError::NotPresent.into())
    }

    fn open(&self, args: &ConnectionArgs) -> Result<Bridge, BridgeError> {
        match args {
            ConnectionArgs::Console {
                host,
                port,
                username,
                password,
                ..
            } => Ok(Bridge::new(DebugUart::connect(
                host, *port, username, password,
            )?)),
            ConnectionArgs::Local { .. } => Err(BridgeCreationError::MalformedConnection(
                ConnectionError::ConsoleArgsRequired(self.name()),
            )
            .into()),
        }
    }
}

/// AHB access through the debug UART's ASCII command protocol.
#[derive(Debug)]
pub struct DebugUart {
    stream: TcpStream,
}

impl DebugUart {
    /// Connect to the console server and log in.
    pub fn connect(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
    ) -> Result<Self, BridgeError> {
        let stream = TcpStream::connect((host, port)).map_err(BridgeError::Transport)?;
        tracing::debug!("connected to console server {}:{}", host, port);

        let mut uart = Self { stream };
        uart.expect_prompt("login:")?;
        uart.send_line(username)?;
        uart.expect_prompt("Password:")?;
        uart.send_line(password)?;
        // The debug UART idles quietly once the console is through.
        uart.send_line("")?;

        Ok(uart)
    }

    fn send_line(&mut self, line: &str) -> Result<(), BridgeError> {
        self.stream
            .write_all(line.as_bytes())
            .and_then(|()| self.stream.write_all(b"\r"))
            .map_err(BridgeError::Transport)
    }

    /// Consume console output until `prompt` appears.
    fn expect_prompt(&mut self, prompt: &str) -> Result<(), BridgeError> {
        let mut seen = Vec::new();
        let mut byte = [0u8];

        while !seen.ends_with(prompt.as_bytes()) {
            match self.stream.read(&mut byte) {
                Ok(0) => return Err(BridgeError::Protocol("console closed during login")),
                Ok(_) => seen.push(byte[0]),
                Err(e) => return Err(BridgeError::Transport(e)),
            }

            if seen.len() > 64 * 1024 {
                return Err(BridgeError::Protocol("login prompt never appeared"));
            }
        }

        Ok(())
    }

    /// Read one reply line, stripping the echo of our own command.
    fn read_reply(&mut self, sent: &str) -> Result<String, BridgeError> {
        let mut raw = Vec::new();
        let mut byte = [0u8];

        loop {
            match self.stream.read(&mut byte) {
                Ok(0) => return Err(BridgeError::Protocol("console closed mid-command")),
                Ok(_) => {
                    if byte[0] == b'\n' {
                        let line = String::from_utf8_lossy(&raw);
                        let line = line.trim();
                        if !line.is_empty() && line != sent {
                            return Ok(line.to_string());
                        }
                        raw.clear();
                    } else if byte[0] != b'\r' {
                        raw.push(byte[0]);
                    }
                }
                Err(e) => return Err(BridgeError::Transport(e)),
            }
        }
    }

    fn command(&mut self, cmd: &str) -> Result<String, BridgeError> {
        self.send_line(cmd)?;
        self.read_reply(cmd)
    }
}

impl Ahb for DebugUart {
    fn name(&self) -> &'static str {
        "debug"
    }

    fn read32(&mut self, addr: u32) -> Result<u32, BridgeError> {
        let reply = self.command(&format!("r {:08x}", addr))?;

        u32::from_str_radix(reply.trim_start_matches("0x"), 16)
            .map_err(|_| BridgeError::Protocol("debug UART returned a non-hexadecimal value"))
    }

    fn write32(&mut self, addr: u32, value: u32) -> Result<(), BridgeError> {
        let reply = self.command(&format!("w {:08x} {:08x}", addr, value))?;

        if reply.eq_ignore_ascii_case("ok") {
            Ok(())
        } else {
            Err(BridgeError::Protocol("debug UART rejected the write"))
        }
    }
}
