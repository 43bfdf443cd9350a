use serde::{Deserialize, Serialize};

/// Bounding box for a detected face, in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Face encoding vector (typically 128-dimensional).
///
/// Serialized as a bare JSON array of numbers, which is the roster value format.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Encoding(Vec<f64>);

impl Encoding {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn into_values(self) -> Vec<f64> {
        self.0
    }

    /// Number of dimensions.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compute Euclidean distance between two encodings.
    ///
    /// Returns `None` when the dimensions differ.
    pub fn euclidean_distance(&self, other: &Encoding) -> Option<f64> {
        if self.len() != other.len() {
            return None;
        }
        Some(
            self.0
                .iter()
                .zip(other.0.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f64>()
                .sqrt(),
        )
    }

    /// Compute cosine similarity between two encodings.
    ///
    /// Returns a value in [-1, 1], or `None` when the dimensions differ.
    /// A zero vector has similarity 0 with everything.
    pub fn similarity(&self, other: &Encoding) -> Option<f64> {
        if self.len() != other.len() {
            return None;
        }

        let mut dot = 0.0f64;
        let mut norm_a = 0.0f64;
        let mut norm_b = 0.0f64;

        for (a, b) in self.0.iter().zip(other.0.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        Some(if denom > 0.0 { dot / denom } else { 0.0 })
    }
}

impl From<Vec<f64>> for Encoding {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// A known person as seen through the roster: a name and the face it was enrolled with.
///
/// Identity is the name alone; the registry keys on it.
#[derive(Debug, Clone, Copy)]
pub struct KnownPerson<'a> {
    pub name: &'a str,
    pub encoding: &'a Encoding,
}
