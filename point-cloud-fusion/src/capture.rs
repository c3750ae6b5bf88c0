/// Recorded capture replay: `capture.json` plus raw depth, PNG confidence and NV12 image files.
use crate::buffer::PixelBuffer;
use crate::camera::{InterfaceOrientation, mat3_from_rows, mat4_from_rows};
use crate::frame::{DepthData, FrameSample};
use constants::export::CAPTURE_MANIFEST_FILE_NAME;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to read capture data: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse capture manifest: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to decode confidence image: {0}")]
    Image(#[from] image::ImageError),
    #[error("invalid frame record: {0}")]
    InvalidRecord(String),
}

/// Ordered list of recorded frames.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureManifest {
    pub frames: Vec<FrameRecord>,
}

/// Depth map (raw little-endian f32) and confidence map (8-bit PNG) file names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthRecord {
    pub depth: String,
    pub confidence: String,
    pub width: usize,
    pub height: usize,
}

/// Raw NV12 colour image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub file: String,
    pub width: usize,
    pub height: usize,
}

/// One recorded frame. File names are relative to the capture directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub timestamp: f64,
    #[serde(default)]
    pub orientation: InterfaceOrientation,
    /// Row-major 3x3 camera intrinsics.
    pub intrinsics: [[f32; 3]; 3],
    /// Row-major 4x4 world-to-camera transform.
    pub view_matrix: [[f32; 4]; 4],
    pub depth: DepthRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoothed_depth: Option<DepthRecord>,
    pub image: ImageRecord,
}

impl CaptureManifest {
    pub fn save(&self, dir: &Path) -> Result<PathBuf, CaptureError> {
        let path = dir.join(CAPTURE_MANIFEST_FILE_NAME);
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }
}

/// An opened capture directory.
#[derive(Debug, Clone)]
pub struct Capture {
    root: PathBuf,
    manifest: CaptureManifest,
}

impl Capture {
    pub fn open(dir: &Path) -> Result<Self, CaptureError> {
        let json = fs::read_to_string(dir.join(CAPTURE_MANIFEST_FILE_NAME))?;
        Ok(Self {
            root: dir.to_path_buf(),
            manifest: serde_json::from_str(&json)?,
        })
    }

    pub fn records(&self) -> &[FrameRecord] {
        &self.manifest.frames
    }

    pub fn len(&self) -> usize {
        self.manifest.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifest.frames.is_empty()
    }

    pub fn load_frame(&self, index: usize) -> Result<FrameSample, CaptureError> {
        let record = self.manifest.frames.get(index).ok_or_else(|| {
            CaptureError::InvalidRecord(format!(
                "frame {index} requested but capture holds {}",
                self.len()
            ))
        })?;
        self.load_record(record)
    }

    pub fn load_record(&self, record: &FrameRecord) -> Result<FrameSample, CaptureError> {
        let smoothed_depth = match &record.smoothed_depth {
            Some(smoothed) => Some(self.load_depth(smoothed)?),
            None => None,
        };

        Ok(FrameSample {
            timestamp: record.timestamp,
            scene_depth: self.load_depth(&record.depth)?,
            smoothed_depth,
            image: self.load_image(&record.image)?,
            intrinsics: mat3_from_rows(&record.intrinsics),
            view_matrix: mat4_from_rows(&record.view_matrix),
            orientation: record.orientation,
        })
    }

    fn load_depth(&self, record: &DepthRecord) -> Result<DepthData, CaptureError> {
        let (width, height) = (record.width, record.height);
        check_size(&record.depth, width, height)?;

        let bytes = fs::read(self.root.join(&record.depth))?;
        let expected = width * height * size_of::<f32>();
        if bytes.len() != expected {
            return Err(CaptureError::InvalidRecord(format!(
                "{} holds {} bytes, expected {expected} for {width}x{height} depth",
                record.depth,
                bytes.len()
            )));
        }
        let values: Vec<f32> = bytes
            .chunks_exact(size_of::<f32>())
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        let confidence = image::open(self.root.join(&record.confidence))?.into_luma8();
        if confidence.dimensions() != (width as u32, height as u32) {
            return Err(CaptureError::InvalidRecord(format!(
                "{} is {:?}, expected {width}x{height}",
                record.confidence,
                confidence.dimensions()
            )));
        }

        Ok(DepthData {
            depth: PixelBuffer::depth(width, height, &values),
            confidence: PixelBuffer::single_u8(width, height, confidence.as_raw()),
        })
    }

    fn load_image(&self, record: &ImageRecord) -> Result<PixelBuffer, CaptureError> {
        let (width, height) = (record.width, record.height);
        check_size(&record.file, width, height)?;

        let mut luma = fs::read(self.root.join(&record.file))?;
        let luma_len = width * height;
        let expected = luma_len + width.div_ceil(2) * height.div_ceil(2) * 2;
        if luma.len() != expected {
            return Err(CaptureError::InvalidRecord(format!(
                "{} holds {} bytes, expected {expected} for {width}x{height} NV12",
                record.file,
                luma.len()
            )));
        }
        let cbcr = luma.split_off(luma_len);

        Ok(PixelBuffer::nv12(width, height, luma, cbcr))
    }
}

fn check_size(file: &str, width: usize, height: usize) -> Result<(), CaptureError> {
    if width == 0 || height == 0 {
        return Err(CaptureError::InvalidRecord(format!(
            "{file} has empty size {width}x{height}"
        )));
    }
    Ok(())
}
