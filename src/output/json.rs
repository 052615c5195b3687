//! JSON lines frame output

use serde::Serialize;
use std::io::Write;

use super::{FrameSink, FrameSnapshot, Viewport};
use crate::error::{CompositorError, OutputError};

#[derive(Serialize)]
struct Line<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    viewport: Option<Viewport>,
    #[serde(flatten)]
    frame: &'a FrameSnapshot,
}

/// Writes one JSON object per frame
pub struct JsonLinesSink<W: Write> {
    writer: W,
    viewport: Option<Viewport>,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            viewport: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonLinesSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> FrameSink for JsonLinesSink<W> {
    fn present(&mut self, frame: &FrameSnapshot) -> Result<(), CompositorError> {
        let line = Line {
            viewport: self.viewport,
            frame,
        };
        serde_json::to_writer(&mut self.writer, &line)
            .map_err(|e| OutputError::Serialize(e.to_string()))?;
        self.writer
            .write_all(b"\n")
            .and_then(|_| self.writer.flush())
            .map_err(|e| OutputError::Write(e.to_string()))?;
        Ok(())
    }

    fn resize(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::tests::snapshot;

    #[test]
    fn test_writes_one_line_per_frame() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.present(&snapshot(1)).unwrap();
        sink.present(&snapshot(2)).unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);

        let v: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(v["frame"], 2);
        assert_eq!(v["avatar"], "Sample");
        assert_eq!(v["blink_mode"], "procedural");
        assert_eq!(v["blend_shapes"]["blink"], 0.5);
        assert!((v["bones"]["head"][2].as_f64().unwrap() - 0.3).abs() < 1e-6);
        assert!(v.get("viewport").is_none());
    }

    #[test]
    fn test_resize_is_reported() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.resize(Viewport::new(800, 600));
        sink.present(&snapshot(0)).unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let v: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(v["viewport"]["width"], 800);
        assert_eq!(v["viewport"]["height"], 600);
    }
}
