//! Frame types and conversion from the camera's native pixel order to RGB24.

/// Pixel layout of a raw camera buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Packed 8-bit B, G, R (3 bytes/pixel). The usual webcam order.
    Bgr24,
    /// Packed 8-bit R, G, B (3 bytes/pixel).
    Rgb24,
    /// YUYV 4:2:2 packed (2 bytes/pixel).
    Yuyv,
    /// 8-bit grayscale (1 byte/pixel).
    Grey,
}

impl PixelFormat {
    /// Bytes needed for a `width` x `height` image in this format.
    pub fn buffer_len(self, width: u32, height: u32) -> usize {
        let pixels = width as usize * height as usize;
        match self {
            Self::Bgr24 | Self::Rgb24 => pixels * 3,
            Self::Yuyv => pixels * 2,
            Self::Grey => pixels,
        }
    }
}

/// A frame exactly as the camera delivered it.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

/// A captured frame in packed RGB24, ready for face encoding.
#[derive(Debug, Clone)]
pub struct Frame {
    /// RGB pixel data (width * height * 3 bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Convert a raw camera frame to RGB24.
    pub fn from_raw(raw: &RawFrame) -> Result<Self, FrameError> {
        let data = to_rgb(&raw.data, raw.width, raw.height, raw.format)?;
        Ok(Self {
            data,
            width: raw.width,
            height: raw.height,
        })
    }

    /// Average pixel brightness (0.0–255.0) over all channels.
    pub fn avg_brightness(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().map(|&b| b as f32).sum::<f32>() / self.data.len() as f32
    }
}

/// Convert a buffer in `format` to packed RGB24.
pub fn to_rgb(buf: &[u8], width: u32, height: u32, format: PixelFormat) -> Result<Vec<u8>, FrameError> {
    let expected = format.buffer_len(width, height);
    if buf.len() < expected {
        return Err(FrameError::InvalidLength {
            format,
            expected,
            actual: buf.len(),
        });
    }
    let buf = &buf[..expected];

    Ok(match format {
        PixelFormat::Rgb24 => buf.to_vec(),
        PixelFormat::Bgr24 => bgr_to_rgb(buf),
        PixelFormat::Grey => buf.iter().flat_map(|&y| [y, y, y]).collect(),
        PixelFormat::Yuyv => yuyv_to_rgb(buf),
    })
}

/// Swap the B and R channels of packed 24-bit pixels.
pub fn bgr_to_rgb(bgr: &[u8]) -> Vec<u8> {
    bgr.chunks_exact(3).flat_map(|p| [p[2], p[1], p[0]]).collect()
}

/// Convert packed YUYV (4:2:2) to RGB24 using BT.601 limited-range coefficients.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V]; both pixels share U/V.
/// An odd trailing pixel ([Y, U] with no V) is converted as grey.
pub fn yuyv_to_rgb(yuyv: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(yuyv.len() / 2 * 3);
    let chunks = yuyv.chunks_exact(4);
    let tail = chunks.remainder();
    for chunk in chunks {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        rgb.extend_from_slice(&yuv_pixel(y0, u, v));
        rgb.extend_from_slice(&yuv_pixel(y1, u, v));
    }
    if tail.len() >= 2 {
        rgb.extend_from_slice(&yuv_pixel(tail[0], 128, 128));
    }
    rgb
}

fn yuv_pixel(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = (y as f32 - 16.0) * 1.164;
    let d = u as f32 - 128.0;
    let e = v as f32 - 128.0;
    let clamp = |x: f32| x.round().clamp(0.0, 255.0) as u8;
    [
        clamp(c + 1.596 * e),
        clamp(c - 0.392 * d - 0.813 * e),
        clamp(c + 2.017 * d),
    ]
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid {format:?} length: expected {expected}, got {actual}")]
    InvalidLength {
        format: PixelFormat,
        expected: usize,
        actual: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bgr_to_rgb() {
        let bgr = vec![1, 2, 3, 10, 20, 30];
        assert_eq!(bgr_to_rgb(&bgr), vec![3, 2, 1, 30, 20, 10]);
    }

    #[test]
    fn test_rgb_passthrough_truncates_padding() {
        let buf = vec![1, 2, 3, 4, 5, 6, 99, 99];
        let rgb = to_rgb(&buf, 2, 1, PixelFormat::Rgb24).unwrap();
        assert_eq!(rgb, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_grey_to_rgb() {
        let rgb = to_rgb(&[7, 200], 2, 1, PixelFormat::Grey).unwrap();
        assert_eq!(rgb, vec![7, 7, 7, 200, 200, 200]);
    }

    #[test]
    fn test_yuyv_neutral_chroma_is_grey() {
        // Y=16 is black and Y=235 is white in limited range; U=V=128 carries no colour.
        let rgb = yuyv_to_rgb(&[16, 128, 235, 128]);
        assert_eq!(rgb, vec![0, 0, 0, 255, 255, 255]);
    }

    #[test]
    fn test_yuyv_odd_pixel_count_keeps_last_pixel() {
        // 3x1: one full [Y0, U, Y1, V] pair plus a trailing [Y2, U].
        let rgb = to_rgb(&[16, 128, 16, 128, 235, 128], 3, 1, PixelFormat::Yuyv).unwrap();
        assert_eq!(rgb.len(), 9);
        assert_eq!(&rgb[6..], &[255, 255, 255]);
    }

    #[test]
    fn test_yuyv_red_dominant() {
        let rgb = yuyv_to_rgb(&[81, 90, 81, 240]);
        let (r, g, b) = (rgb[0], rgb[1], rgb[2]);
        assert!(r > 200 && g < 60 && b < 60, "got ({r}, {g}, {b})");
    }

    #[test]
    fn test_invalid_length() {
        let err = to_rgb(&[0u8; 5], 1, 2, PixelFormat::Bgr24).unwrap_err();
        let FrameError::InvalidLength { expected, actual, .. } = err;
        assert_eq!((expected, actual), (6, 5));
    }

    #[test]
    fn test_frame_from_raw_bgr() {
        let raw = RawFrame {
            data: vec![0, 0, 255],
            width: 1,
            height: 1,
            format: PixelFormat::Bgr24,
        };
        let frame = Frame::from_raw(&raw).unwrap();
        assert_eq!(frame.data, vec![255, 0, 0]);
        assert!((frame.avg_brightness() - 85.0).abs() < 1e-3);
    }
}
