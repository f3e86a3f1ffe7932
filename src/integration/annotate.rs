//! Annotated frame output: detections as ellipses, open targets as coloured boxes.

use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_ellipse_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect as PixelRect;
use tracing::debug;

use crate::error::SinkError;
use crate::integration::sink::{FrameOutput, FrameSink};
use crate::tracker::{Rect, TargetId};

const DETECTION_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Visually distinct colours, picked by `target_id % len`.
const PALETTE: [[u8; 3]; 16] = [
    [230, 25, 75],
    [60, 180, 75],
    [255, 225, 25],
    [0, 130, 200],
    [245, 130, 48],
    [145, 30, 180],
    [70, 240, 240],
    [240, 50, 230],
    [210, 245, 60],
    [250, 190, 212],
    [0, 128, 128],
    [220, 190, 255],
    [170, 110, 40],
    [255, 250, 200],
    [128, 0, 0],
    [170, 255, 195],
];

pub fn target_color(id: TargetId) -> Rgb<u8> {
    Rgb(PALETTE[(id.0 % PALETTE.len() as u64) as usize])
}

/// Render detections and open targets on a copy of the frame.
pub fn annotate(output: &FrameOutput<'_>) -> Result<RgbImage, SinkError> {
    let (width, height) = output.frame.size();
    let mut canvas = RgbImage::from_raw(width, height, output.frame.pixels().to_vec())
        .ok_or(SinkError::InvalidFrame { width, height })?;

    for detection in output.detections {
        let (cx, cy) = detection.bbox().center();
        let rx = (detection.bbox().width / 2.0).round() as i32;
        let ry = (detection.bbox().height / 2.0).round() as i32;
        if rx > 0 && ry > 0 {
            draw_hollow_ellipse_mut(
                &mut canvas,
                (cx.round() as i32, cy.round() as i32),
                rx,
                ry,
                DETECTION_COLOR,
            );
        }
    }

    for target in output.open_targets.values() {
        let color = target_color(target.id);
        // 2px outline
        for inset in 0..2 {
            if let Some(rect) = pixel_rect(&target.bbox, inset) {
                draw_hollow_rect_mut(&mut canvas, rect, color);
            }
        }
    }

    Ok(canvas)
}

fn pixel_rect(bbox: &Rect, inset: i32) -> Option<PixelRect> {
    let width = bbox.width.round() as i32 - 2 * inset;
    let height = bbox.height.round() as i32 - 2 * inset;
    if width <= 0 || height <= 0 {
        return None;
    }
    Some(
        PixelRect::at(bbox.x.round() as i32 + inset, bbox.y.round() as i32 + inset)
            .of_size(width as u32, height as u32),
    )
}

/// Writes `frame_annotated_%08d.jpg` for every frame into a directory.
pub struct AnnotatedFrameWriter {
    output_dir: PathBuf,
}

impl AnnotatedFrameWriter {
    /// Create the writer, creating `output_dir` if needed.
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn frame_path(&self, frame_index: u64) -> PathBuf {
        self.output_dir
            .join(format!("frame_annotated_{frame_index:08}.jpg"))
    }
}

impl FrameSink for AnnotatedFrameWriter {
    fn name(&self) -> &str {
        "annotated-frames"
    }

    fn present(&mut self, output: &FrameOutput<'_>) -> Result<(), SinkError> {
        let canvas = annotate(output)?;
        let path = self.frame_path(output.frame_index);
        debug!(path = %path.display(), "writing annotated frame");
        canvas.save(&path)?;
        Ok(())
    }
}
