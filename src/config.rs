//! Pipeline configuration: frame bound and per-sink toggles.

use std::path::PathBuf;

use tracing::info;

use crate::error::SinkError;
use crate::integration::{AnnotatedFrameWriter, SinkSet, SummarySink, TrackLogWriter};

pub const ENV_ENABLE_VISUALIZATION: &str = "TRACKRELAY_ENABLE_VISUALIZATION";
pub const ENV_SAVE_OUTPUT: &str = "TRACKRELAY_SAVE_OUTPUT";
pub const ENV_TRACK_LOG: &str = "TRACKRELAY_TRACK_LOG";

/// External toggles consumed by the pipeline. None of this is tracking state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Maximum number of frames to process; `None` for the whole source
    pub max_frames: Option<u64>,
    /// Log a per-frame summary of open targets
    pub visualize: bool,
    /// Write annotated frames to `output_dir`
    pub save_output: bool,
    /// Append per-frame JSON records to `output_dir/tracks.jsonl`
    pub track_log: bool,
    pub output_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_frames: None,
            visualize: false,
            save_output: true,
            track_log: false,
            output_dir: PathBuf::from("output").join("track_person_in_video"),
        }
    }
}

impl PipelineConfig {
    /// Read the `TRACKRELAY_*` sink toggles over the defaults.
    ///
    /// `max_frames` and `output_dir` are left at their defaults; the demo
    /// binary takes them from its command line.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    ///
    /// Visualization is off unless set to `"1"`; saving output is on unless
    /// set to `"0"`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &'static str| {
            let value = lookup(key);
            info!(key, value = value.as_deref().unwrap_or("<unset>"), "config variable");
            value
        };

        Self {
            visualize: read(ENV_ENABLE_VISUALIZATION).as_deref() == Some("1"),
            save_output: read(ENV_SAVE_OUTPUT).as_deref() != Some("0"),
            track_log: read(ENV_TRACK_LOG).as_deref() == Some("1"),
            ..Self::default()
        }
    }

    /// Build the sinks enabled by this configuration.
    pub fn build_sinks(&self) -> Result<SinkSet, SinkError> {
        let mut sinks = SinkSet::new();
        if self.visualize {
            sinks.push(Box::new(SummarySink));
        }
        if self.save_output {
            info!(dir = %self.output_dir.display(), "saving annotated frames");
            sinks.push(Box::new(AnnotatedFrameWriter::new(&self.output_dir)?));
        }
        if self.track_log {
            info!(dir = %self.output_dir.display(), "writing track log");
            sinks.push(Box::new(TrackLogWriter::create(&self.output_dir)?));
        }
        Ok(sinks)
    }
}
