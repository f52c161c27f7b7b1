use std::io::{Read, Write};

use serde_json::Value;
use tracing::{error, info, warn};

use crate::protocol::{self, Response, END_MARKER};
use crate::session::Session;

const BUFFER_SIZE: usize = 4096;

const INITIALIZE_COMMAND: &str = "initialize";
const SHUTDOWN_COMMAND: &str = "shutdown";
const CHAT_COMMAND: &str = "chat";

/// Result of one blocking read from the host pipe.
#[derive(Debug, PartialEq)]
pub enum ReadOutcome {
    Message(Value),
    /// Bytes arrived but did not decode. The cycle is skipped.
    Invalid,
    /// The host closed the pipe before sending anything.
    Closed,
}

/// Read one request: keep reading fixed-size chunks until a short read.
pub fn read_command(reader: &mut impl Read) -> ReadOutcome {
    let mut bytes = Vec::new();
    let mut buf = [0u8; BUFFER_SIZE];

    loop {
        let n = match reader.read(&mut buf) {
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                error!("Error reading from command pipe: {e}");
                return if bytes.is_empty() { ReadOutcome::Closed } else { ReadOutcome::Invalid };
            }
        };
        if n == 0 && bytes.is_empty() {
            return ReadOutcome::Closed;
        }
        bytes.extend_from_slice(&buf[..n]);
        if n < BUFFER_SIZE {
            break;
        }
    }

    let raw = String::from_utf8_lossy(&bytes);
    info!("Raw Input: {raw}");
    let clean = sanitize(&raw);

    match serde_json::from_str(&clean) {
        Ok(value) => ReadOutcome::Message(value),
        Err(e) => {
            error!("Received invalid JSON ({e}): {clean}");
            ReadOutcome::Invalid
        }
    }
}

/// Drop control characters, keeping tabs and line breaks.
fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t' | '\r'))
        .collect()
}

/// Serialize `response`, append the end marker, and write it in one go.
/// Failures are logged and otherwise ignored.
pub fn write_response(writer: &mut dyn Write, response: &Response) {
    let json = match serde_json::to_string(response) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize response: {e}");
            return;
        }
    };
    let message = format!("{json}{END_MARKER}");
    if let Err(e) = writer.write_all(message.as_bytes()).and_then(|_| writer.flush()) {
        error!("Failed to write response: {e}");
    }
}

/// Serve requests until a `shutdown` command has been answered or the host
/// closes the pipe.
pub fn run(session: &mut Session, reader: &mut impl Read, writer: &mut impl Write) {
    info!("Aria plugin started");
    loop {
        let request = match read_command(reader) {
            ReadOutcome::Message(value) => value,
            ReadOutcome::Invalid => {
                error!("Error reading command");
                continue;
            }
            ReadOutcome::Closed => {
                warn!("Command pipe closed by host");
                break;
            }
        };
        info!("Received input: {request}");

        if handle_request(session, &request, writer) == Flow::Stop {
            info!("Shutdown command received, terminating plugin");
            break;
        }
    }
    info!("Aria plugin stopped");
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

fn handle_request(session: &mut Session, request: &Value, writer: &mut impl Write) -> Flow {
    let calls = match protocol::tool_calls(request) {
        Ok(calls) => calls,
        Err(malformed) => {
            warn!("Malformed input: missing tool_calls property");
            write_response(writer, &malformed.response());
            return Flow::Continue;
        }
    };

    for call in calls {
        let command = match call {
            Ok(command) => command,
            Err(malformed) => {
                warn!("Malformed input: missing function property");
                write_response(writer, &malformed.response());
                continue;
            }
        };

        info!("Processing command: {}", command.name);
        let response = match command.name.as_str() {
            INITIALIZE_COMMAND => session.initialize(),
            SHUTDOWN_COMMAND => session.shutdown(),
            CHAT_COMMAND => session.chat(
                command.params.as_ref(),
                &command.context,
                command.system_info.as_ref(),
                writer,
            ),
            other => {
                warn!("Unknown command: {other}");
                protocol::unknown_command(other)
            }
        };

        info!("Sending response: {response:?}");
        write_response(writer, &response);

        if command.name == SHUTDOWN_COMMAND {
            return Flow::Stop;
        }
    }
    Flow::Continue
}
