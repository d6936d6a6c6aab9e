//! Destinations for alert events.

use std::convert::Infallible;
use std::io::Write;

use crate::analysis::AlertEvent;
use crate::error::SinkError;

/// Receives each event exactly once, in emission order.
pub trait AlertSink {
    type Error;

    fn emit(&mut self, event: AlertEvent) -> Result<(), Self::Error>;

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl AlertSink for Vec<AlertEvent> {
    type Error = Infallible;

    fn emit(&mut self, event: AlertEvent) -> Result<(), Self::Error> {
        self.push(event);
        Ok(())
    }
}

/// Writes one JSON object per line.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Number of events written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> AlertSink for JsonLinesSink<W> {
    type Error = SinkError;

    fn emit(&mut self, event: AlertEvent) -> Result<(), Self::Error> {
        serde_json::to_writer(&mut self.writer, &event)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AlertKind, FrameMeta};
    use serde_json::{Value, json};

    #[test]
    fn test_json_lines_one_object_per_event() {
        let frame = FrameMeta::new(3, 0.1);
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.emit(AlertEvent::new(AlertKind::Overcrowding, &frame, json!({"current_count": 12})))
            .unwrap();
        sink.emit(AlertEvent::new(AlertKind::Loitering, &frame, json!({"track_id": 1})))
            .unwrap();
        assert_eq!(sink.written(), 2);

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<Value> = out.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event_type"], "overcrowding");
        assert_eq!(lines[1]["details"]["track_id"], 1);
    }
}
