//! Marker framing for results sent over a single text stream.
//!
//! A host-side run prints free-form log lines, then one line starting with
//! [`RESULT_MARKER`] followed by the JSON-encoded [`RemoteResult`]. Local
//! targets skip this framing and hand the result back in-process.

use crate::error::ProtocolError;

use super::RemoteResult;

pub const RESULT_MARKER: &str = "RemoteResult";

/// Render `result` as the marker line.
pub fn encode(result: &RemoteResult) -> Result<String, ProtocolError> {
    Ok(format!("{RESULT_MARKER} {}", serde_json::to_string(result)?))
}

/// Parse text that begins at the marker line.
pub fn decode(payload: &str) -> Result<RemoteResult, ProtocolError> {
    let body = payload
        .strip_prefix(RESULT_MARKER)
        .ok_or(ProtocolError::MissingMarker)?;
    Ok(serde_json::from_str(body.trim())?)
}

/// Separates log lines from the payload as output arrives.
#[derive(Debug, Default)]
pub struct ResultStream {
    payload: Option<String>,
}

impl ResultStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept one line of output. Returns the line when it is log text.
    pub fn feed<'a>(&mut self, line: &'a str) -> Option<&'a str> {
        if let Some(buffer) = &mut self.payload {
            buffer.push('\n');
            buffer.push_str(line);
            return None;
        }
        if line.starts_with(RESULT_MARKER) {
            self.payload = Some(line.to_string());
            None
        } else {
            Some(line)
        }
    }

    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    pub fn finish(self) -> Result<RemoteResult, ProtocolError> {
        decode(&self.payload.ok_or(ProtocolError::MissingMarker)?)
    }
}

/// Split a complete capture into log lines and the decoded result.
pub fn split(output: &str) -> (Vec<&str>, Result<RemoteResult, ProtocolError>) {
    let mut stream = ResultStream::new();
    let logs = output.lines().filter_map(|line| stream.feed(line)).collect();
    (logs, stream.finish())
}
