//! RGBA pixel buffer shared between the decode thread and the renderer
//!
//! A `FrameBuffer` is allocated once per loaded media at the native resolution
//! and is never resized afterwards. Rows are tightly packed: stride is always
//! `width * 4`.

use super::types::Resolution;

/// One full RGBA frame, row-major.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    /// Raw pixel data (4 bytes per pixel)
    data: Vec<u8>,
    /// Frame size in pixels
    resolution: Resolution,
}

impl FrameBuffer {
    /// Allocate a zeroed buffer for the given resolution.
    pub fn new(resolution: Resolution) -> Self {
        Self {
            data: vec![0u8; Self::expected_size(resolution.width, resolution.height)],
            resolution,
        }
    }

    /// Get the expected data size for RGBA frame dimensions (width * height * 4)
    pub fn expected_size(width: u32, height: u32) -> usize {
        (width as usize) * (height as usize) * 4
    }

    /// Bytes per row
    pub fn stride(&self) -> usize {
        self.resolution.stride()
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn width(&self) -> u32 {
        self.resolution.width
    }

    pub fn height(&self) -> u32 {
        self.resolution.height
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check the data still matches the allocation size
    pub fn is_valid(&self) -> bool {
        self.data.len() == Self::expected_size(self.resolution.width, self.resolution.height)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let frame = FrameBuffer::new(Resolution::new(1920, 1080));

        assert_eq!(frame.width(), 1920);
        assert_eq!(frame.height(), 1080);
        assert!(frame.is_valid());
        assert_eq!(frame.len(), 1920 * 1080 * 4);
        assert_eq!(frame.stride(), 1920 * 4);
        assert!(frame.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_expected_size() {
        assert_eq!(FrameBuffer::expected_size(1920, 1080), 1920 * 1080 * 4);
        assert_eq!(FrameBuffer::expected_size(1280, 720), 1280 * 720 * 4);
        assert_eq!(FrameBuffer::expected_size(0, 720), 0);
    }
}
