//! JSON-lines persistence of per-frame tracking output.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::SinkError;
use crate::integration::sink::{FrameOutput, FrameSink};
use crate::tracker::{Detection, TrackTarget};

/// File name used inside the output directory.
pub const TRACK_LOG_FILE: &str = "tracks.jsonl";

#[derive(Serialize)]
struct FrameRecord<'a> {
    frame_index: u64,
    detections: &'a [Detection],
    open_targets: Vec<&'a TrackTarget>,
}

/// Appends one JSON object per frame to a writer.
pub struct TrackLogWriter<W: Write = BufWriter<File>> {
    writer: W,
}

impl TrackLogWriter {
    /// Create `tracks.jsonl` in `output_dir`, truncating any previous log.
    pub fn create(output_dir: &Path) -> Result<Self, SinkError> {
        fs::create_dir_all(output_dir)?;
        let file = File::create(output_dir.join(TRACK_LOG_FILE))?;
        Ok(Self::from_writer(BufWriter::new(file)))
    }
}

impl<W: Write> TrackLogWriter<W> {
    pub fn from_writer(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> FrameSink for TrackLogWriter<W> {
    fn name(&self) -> &str {
        "track-log"
    }

    fn present(&mut self, output: &FrameOutput<'_>) -> Result<(), SinkError> {
        let record = FrameRecord {
            frame_index: output.frame_index,
            detections: output.detections,
            open_targets: output.open_targets.values().collect(),
        };
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
