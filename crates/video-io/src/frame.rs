//! Video frame types and processing

use image::{imageops, RgbImage};

/// Decoded RGB video frame
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Decode-order frame number, starting at 1
    pub sequence: u64,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        Self {
            data,
            width,
            height,
            sequence,
        }
    }

    /// Solid-colour frame
    pub fn filled(width: u32, height: u32, rgb: [u8; 3], sequence: u64) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(Self::byte_len(width, height))
            .collect();
        Self::new(data, width, height, sequence)
    }

    /// Bytes needed for an RGB24 frame of this size
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 3
    }

    /// True when the buffer length matches the declared dimensions
    pub fn is_well_formed(&self) -> bool {
        self.data.len() == Self::byte_len(self.width, self.height)
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y as usize * self.width as usize) + x as usize) * 3;
        self.data
            .get(idx..idx + 3)
            .map(|p| [p[0], p[1], p[2]])
    }

    /// Borrow the frame as an `image` buffer
    pub fn to_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
    }

    /// Rebuild a frame from an `image` buffer, keeping the sequence number
    pub fn from_image(image: RgbImage, sequence: u64) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, sequence)
    }

    /// Resize frame using bilinear filtering.
    ///
    /// A frame already at the target size is returned as a plain copy.
    pub fn resize(&self, new_width: u32, new_height: u32) -> VideoFrame {
        if self.width == new_width && self.height == new_height {
            return self.clone();
        }

        match self.to_image() {
            Some(img) => {
                let resized = imageops::resize(&img, new_width, new_height, imageops::FilterType::Triangle);
                Self::from_image(resized, self.sequence)
            }
            // Malformed buffers come out black rather than failing the stream
            None => Self::filled(new_width, new_height, [0, 0, 0], self.sequence),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_filled_frame_layout() {
        let frame = VideoFrame::filled(4, 3, [10, 20, 30], 7);
        assert!(frame.is_well_formed());
        assert_eq!(frame.get_pixel(3, 2), Some([10, 20, 30]));
        assert_eq!(frame.get_pixel(4, 0), None);
        assert_eq!(frame.sequence, 7);
    }

    #[test]
    fn test_resize_keeps_sequence_and_colour() {
        let frame = VideoFrame::filled(8, 8, [200, 100, 50], 42);
        let resized = frame.resize(4, 2);

        assert_eq!((resized.width, resized.height), (4, 2));
        assert!(resized.is_well_formed());
        assert_eq!(resized.sequence, 42);
        assert_eq!(resized.get_pixel(1, 1), Some([200, 100, 50]));
    }

    proptest! {
        #[test]
        fn prop_resize_yields_well_formed_target(
            width in 1u32..48,
            height in 1u32..48,
            new_width in 1u32..48,
            new_height in 1u32..48,
            sequence in any::<u64>(),
        ) {
            let frame = VideoFrame::filled(width, height, [9, 18, 27], sequence);
            let resized = frame.resize(new_width, new_height);
            prop_assert_eq!((resized.width, resized.height), (new_width, new_height));
            prop_assert!(resized.is_well_formed());
            prop_assert_eq!(resized.sequence, sequence);
        }
    }

    #[test]
    fn test_resize_malformed_buffer_is_black() {
        let frame = VideoFrame::new(vec![1, 2, 3], 10, 10, 1);
        let resized = frame.resize(2, 2);
        assert_eq!(resized.get_pixel(0, 0), Some([0, 0, 0]));
    }
}
