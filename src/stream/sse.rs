//! Incremental parser for the server-push wire framing (SSE).
//!
//! The transport delivers `data: <payload>` lines terminated by a blank
//! line, one event per block. Chunk boundaries can fall anywhere, including
//! inside a multi-byte codepoint, so the parser buffers bytes until a full
//! line is available. Comment lines and non-`data` fields are ignored.

/// Stateful frame scanner. One instance per connection epoch.
#[derive(Debug, Default)]
pub struct SseParser {
    line_buf: Vec<u8>,
    data_lines: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport chunk; returns the payloads of every event
    /// completed by it, in arrival order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut events = Vec::new();

        for &byte in chunk {
            if byte != b'\n' {
                self.line_buf.push(byte);
                continue;
            }

            let raw = std::mem::take(&mut self.line_buf);
            let cow = String::from_utf8_lossy(&raw);
            let line = cow.strip_suffix('\r').unwrap_or(cow.as_ref());

            if line.is_empty() {
                // Blank line terminates the event.
                if !self.data_lines.is_empty() {
                    events.push(self.data_lines.join("\n"));
                    self.data_lines.clear();
                }
            } else if let Some(rest) = line.strip_prefix("data:") {
                self.data_lines
                    .push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
            }
        }

        events
    }
}
