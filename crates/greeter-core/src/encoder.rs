//! Face detection and encoding collaborator.
//!
//! No model ships with this crate; hosts plug in whatever produces encodings.

use crate::types::{BoundingBox, Encoding};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
}

/// Detects faces in a packed RGB24 frame and encodes them.
pub trait FaceEncoder {
    /// Locate faces in the frame.
    fn detect_faces(
        &mut self,
        rgb: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<BoundingBox>, EncodeError>;

    /// Produce one encoding per supplied face box, in the same order.
    fn encode_faces(
        &mut self,
        rgb: &[u8],
        width: u32,
        height: u32,
        faces: &[BoundingBox],
    ) -> Result<Vec<Encoding>, EncodeError>;

    /// Detect then encode every face in the frame.
    fn encodings(&mut self, rgb: &[u8], width: u32, height: u32) -> Result<Vec<Encoding>, EncodeError> {
        let expected = width as usize * height as usize * 3;
        if rgb.len() < expected {
            return Err(EncodeError::InvalidFrame(format!(
                "RGB buffer too short: expected {expected}, got {}",
                rgb.len()
            )));
        }
        let faces = self.detect_faces(rgb, width, height)?;
        if faces.is_empty() {
            return Ok(Vec::new());
        }
        self.encode_faces(rgb, width, height, &faces)
    }
}
