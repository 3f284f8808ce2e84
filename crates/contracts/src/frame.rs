//! Frame types - FrameSource output
//!
//! Decoded grey images and the stream abstraction that produces them.

use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Index of an image inside its stream
pub type FrameId = usize;

/// Decoded image with exposure
///
/// Owned by exactly one consumer. The pipeline drops it right after
/// handing it to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedFrame {
    /// Originating frame id
    pub id: FrameId,

    /// Source timestamp (seconds)
    pub timestamp: f64,

    /// Exposure time in milliseconds (0 when unknown)
    pub exposure: f32,

    /// Image width
    pub width: u32,

    /// Image height
    pub height: u32,

    /// Grey values, row-major, `width * height` entries
    pub pixels: Vec<f32>,
}

impl DecodedFrame {
    /// Build a frame, checking the buffer size against the dimensions
    pub fn new(
        id: FrameId,
        timestamp: f64,
        exposure: f32,
        width: u32,
        height: u32,
        pixels: Vec<f32>,
    ) -> Result<Self, ContractError> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(ContractError::Other(format!(
                "frame {id}: buffer holds {} pixels, expected {expected} ({width}x{height})",
                pixels.len()
            )));
        }
        Ok(Self {
            id,
            timestamp,
            exposure,
            width,
            height,
            pixels,
        })
    }

    /// Pixel value at (x, y)
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Mean grey value (0 for an empty image)
    pub fn mean_intensity(&self) -> f32 {
        if self.pixels.is_empty() {
            return 0.0;
        }
        self.pixels.iter().sum::<f32>() / self.pixels.len() as f32
    }
}

/// Caller-provided output buffer of the depth-estimation call
///
/// Three float channels per pixel, zero-initialised.
#[derive(Debug, Clone, PartialEq)]
pub struct InverseDepthMap {
    width: u32,
    height: u32,
    data: Vec<[f32; 3]>,
}

impl InverseDepthMap {
    /// All-zero map of the given size
    pub fn zeros(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![[0.0; 3]; width as usize * height as usize],
        }
    }

    /// All-zero map matching a frame's dimensions
    pub fn for_frame(frame: &DecodedFrame) -> Self {
        Self::zeros(frame.width, frame.height)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> Option<[f32; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    pub fn set(&mut self, x: u32, y: u32, value: [f32; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = y as usize * self.width as usize + x as usize;
        self.data[idx] = value;
    }

    pub fn as_slice(&self) -> &[[f32; 3]] {
        &self.data
    }

    /// Number of pixels with a non-zero first channel
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| v[0] != 0.0).count()
    }
}

/// Read-only image sequence
///
/// Implemented by the image-folder reader and by in-memory mock sources.
/// Frames are decoded on demand; the source keeps no per-frame state.
pub trait FrameSource: Send + Sync {
    /// Stream name (used for logging)
    fn name(&self) -> &str;

    /// Number of frames in the stream
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Timestamp of frame `id` in seconds
    ///
    /// Returns 0.0 for ids without timing information.
    fn timestamp(&self, id: FrameId) -> f64;

    /// Decode frame `id`
    ///
    /// # Errors
    /// Out-of-range ids and decode failures
    fn load(&self, id: FrameId) -> Result<DecodedFrame, ContractError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoded_frame_rejects_wrong_buffer_size() {
        let err = DecodedFrame::new(3, 0.0, 0.0, 4, 4, vec![0.0; 15]).unwrap_err();
        assert!(err.to_string().contains("expected 16"));
    }

    #[test]
    fn decoded_frame_pixel_access() {
        let pixels = (0..6).map(|v| v as f32).collect();
        let frame = DecodedFrame::new(0, 0.0, 0.0, 3, 2, pixels).unwrap();
        assert_eq!(frame.pixel(2, 1), Some(5.0));
        assert_eq!(frame.pixel(3, 0), None);
        assert!((frame.mean_intensity() - 2.5).abs() < 1e-6);
    }

    #[test]
    fn inverse_depth_map_set_get() {
        let mut map = InverseDepthMap::zeros(2, 2);
        map.set(1, 1, [0.5, 1.0, 2.0]);
        map.set(5, 5, [9.0, 9.0, 9.0]);
        assert_eq!(map.get(1, 1), Some([0.5, 1.0, 2.0]));
        assert_eq!(map.valid_count(), 1);
    }
}
