//! Discrete-command console.
//!
//! Finds a controller advertising [`SERVICE_COMMAND`], then turns each typed
//! digit into a one-byte [`OutputFrame::Command`] datagram.  `q` quits.
//! Unlike the capture variants the destination port is the advertised one.

use std::io::{self, BufRead, Write};
use std::sync::atomic::AtomicBool;

use crate::config::{DiscoveryConfig, SERVICE_COMMAND};
use crate::discovery::{
    discover, DeviceEndpoint, DiscoveryError, DiscoveryRequest, PortPolicy, ServiceBrowser,
};
use crate::net::Transmitter;
use crate::protocol::{CommandId, OutputFrame};

/// One interpreted line of console input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleInput {
    Command(CommandId),
    Quit,
    Invalid,
}

pub fn parse_line(line: &str) -> ConsoleInput {
    let line = line.trim();
    if line.eq_ignore_ascii_case("q") {
        return ConsoleInput::Quit;
    }
    CommandId::parse(line).map_or(ConsoleInput::Invalid, ConsoleInput::Command)
}

/// The command list printed before the first prompt.
pub fn menu() -> String {
    let mut out = String::from("Commands:\n");
    for (id, name) in CommandId::NAMES.iter().enumerate() {
        out.push_str(&format!("  {id}: {name}\n"));
    }
    out.push_str("  q: quit\n");
    out
}

/// Locate the command-console controller.
pub fn discover_controller(
    browser: &dyn ServiceBrowser,
    config: &DiscoveryConfig,
    cancel: &AtomicBool,
) -> Result<DeviceEndpoint, DiscoveryError> {
    let request = DiscoveryRequest {
        service_type: SERVICE_COMMAND.to_string(),
        port: PortPolicy::Advertised,
        poll_interval: config.poll_interval(),
        timeout: config.timeout(),
    };
    discover(browser, &request, cancel)
}

/// Read commands from `input` until `q` or end of input.
///
/// Returns the number of command frames handed to the socket.  A failed
/// send is reported and the console keeps going.
pub fn run<R: BufRead, W: Write>(
    input: R,
    mut output: W,
    transmitter: &dyn Transmitter,
    endpoint: &DeviceEndpoint,
) -> io::Result<usize> {
    write!(output, "{}", menu())?;
    output.flush()?;

    let mut sent = 0;
    for line in input.lines() {
        match parse_line(&line?) {
            ConsoleInput::Quit => break,
            ConsoleInput::Invalid => writeln!(output, "invalid command")?,
            ConsoleInput::Command(cmd) => {
                match transmitter.send(&OutputFrame::Command(cmd), endpoint) {
                    Ok(_) => {
                        sent += 1;
                        writeln!(output, "sent {} ({})", cmd.id(), cmd.name())?;
                    }
                    Err(e) => {
                        log::warn!("console: send to {} failed: {e}", endpoint.socket_addr());
                        writeln!(output, "send failed: {e}")?;
                    }
                }
            }
        }
        output.flush()?;
    }

    log::info!("console: exiting after {sent} commands");
    Ok(sent)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
