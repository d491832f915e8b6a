// protocol.rs — Line protocol between gateway and db-server.
//
// Each request is one line of text terminated by '\n'. `/getdata` asks for
// the caller's (redacted) records, answered by a single line holding a JSON
// array. Any other line is answered with a greeting that echoes the identity
// the server verified for the caller.

use crate::error::RecordError;
use crate::patient::Patient;

/// The command that requests records.
pub const GET_DATA: &str = "/getdata";

/// What the gateway sends on `/connect`.
pub const HELLO: &str = "Hello server";

/// A parsed request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    GetData,
    /// Anything else; carries the line without its terminator.
    Greeting(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.starts_with(GET_DATA) {
            Command::GetData
        } else {
            Command::Greeting(line.to_string())
        }
    }

    /// The line to put on the wire for this command.
    pub fn to_line(&self) -> String {
        match self {
            Command::GetData => format!("{}\n", GET_DATA),
            Command::Greeting(text) => format!("{}\n", text),
        }
    }
}

/// The server's answer to a non-`/getdata` line.
pub fn greeting(peer: &str) -> String {
    format!("Hello {}\n", peer)
}

/// Encode a record set as one newline-terminated JSON line.
pub fn encode_records(records: &[Patient]) -> Result<String, RecordError> {
    let mut line = serde_json::to_string(records)?;
    line.push('\n');
    Ok(line)
}

/// Decode a JSON-array line into records.
pub fn decode_records(line: &str) -> Result<Vec<Patient>, RecordError> {
    Ok(serde_json::from_str(line.trim_end())?)
}
