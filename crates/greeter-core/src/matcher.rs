//! Face comparison strategies.
//!
//! The registry never owns a threshold; it asks a [`FaceComparator`] for a
//! yes/no judgment per (candidate, known) pair.

use crate::types::Encoding;

/// Default Euclidean tolerance for 128-d dlib-style encodings.
pub const DEFAULT_DISTANCE_TOLERANCE: f64 = 0.6;

/// Default cosine similarity threshold.
pub const DEFAULT_COSINE_THRESHOLD: f64 = 0.4;

/// Boolean judgment that two encodings likely belong to the same person.
pub trait FaceComparator {
    fn is_match(&self, candidate: &Encoding, known: &Encoding) -> bool;
}

/// Matches when the Euclidean distance is within `tolerance`. Lower is stricter.
#[derive(Debug, Clone, Copy)]
pub struct DistanceTolerance {
    pub tolerance: f64,
}

impl Default for DistanceTolerance {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_DISTANCE_TOLERANCE,
        }
    }
}

impl FaceComparator for DistanceTolerance {
    fn is_match(&self, candidate: &Encoding, known: &Encoding) -> bool {
        candidate
            .euclidean_distance(known)
            .is_some_and(|d| d <= self.tolerance)
    }
}

/// Matches when cosine similarity reaches `threshold`. Higher is stricter.
#[derive(Debug, Clone, Copy)]
pub struct CosineThreshold {
    pub threshold: f64,
}

impl Default for CosineThreshold {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_COSINE_THRESHOLD,
        }
    }
}

impl FaceComparator for CosineThreshold {
    fn is_match(&self, candidate: &Encoding, known: &Encoding) -> bool {
        candidate
            .similarity(known)
            .is_some_and(|s| s >= self.threshold)
    }
}

impl<C: FaceComparator + ?Sized> FaceComparator for &C {
    fn is_match(&self, candidate: &Encoding, known: &Encoding) -> bool {
        (**self).is_match(candidate, known)
    }
}

impl<C: FaceComparator + ?Sized> FaceComparator for Box<C> {
    fn is_match(&self, candidate: &Encoding, known: &Encoding) -> bool {
        (**self).is_match(candidate, known)
    }
}
