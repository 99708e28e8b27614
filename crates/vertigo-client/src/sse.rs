//! Incremental parser for `text/event-stream` bodies.
//!
//! Only the fields the console uses are interpreted: `event` and `data`.
//! `id` and `retry` are ignored, lines starting with `:` are comments.
//! Multi-line `data` is joined with `\n`, and an event is dispatched on
//! the blank line ending it. Lines may end in `\n` or `\r\n`.

/// One dispatched event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Event name, `message` when the frame had none.
    pub event: String,
    /// Payload text.
    pub data: String,
}

/// Accumulates body chunks and yields complete events.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    /// A parser with nothing buffered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed `chunk` and return every event it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut out = Vec::new();
        while let Some(end) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=end).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches('\n').trim_end_matches('\r');
            if let Some(event) = self.line(line) {
                out.push(event);
            }
        }
        out
    }

    fn line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        let value = value.strip_prefix(' ').unwrap_or(value);
        match field {
            "event" => self.event = Some(value.to_owned()),
            "data" => self.data.push(value.to_owned()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent {
            event: event.unwrap_or_else(|| String::from("message")),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: &str, data: &str) -> SseEvent {
        SseEvent {
            event: name.to_owned(),
            data: data.to_owned(),
        }
    }

    #[test]
    fn parses_frames_across_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.push(b"event: catalogUpd").is_empty());
        assert!(parser.push(b"ate\ndata: {\"a\":").is_empty());
        let events = parser.push(b"null}\n\nevent: experimentUpdate\ndata: \"\"\n\n");
        assert_eq!(
            events,
            vec![
                event("catalogUpdate", "{\"a\":null}"),
                event("experimentUpdate", "\"\""),
            ]
        );
    }

    #[test]
    fn comments_crlf_and_multiline_data() {
        let mut parser = SseParser::new();
        let events = parser.push(b": keep-alive\r\n\r\nevent: x\r\ndata: 1\r\ndata:2\r\nid: 9\r\n\r\n");
        assert_eq!(events, vec![event("x", "1\n2")]);
    }

    #[test]
    fn frame_without_name_is_a_message() {
        let mut parser = SseParser::new();
        assert_eq!(parser.push(b"data: hi\n\n"), vec![event("message", "hi")]);
        assert!(parser.push(b"event: lonely\n\n").is_empty());
        assert_eq!(parser.push(b"data: next\n\n"), vec![event("message", "next")]);
    }
}
