//! greeter-core — Known-person roster and face matching.
//!
//! Face detection and encoding are supplied by the host through
//! [`FaceEncoder`]; this crate owns the roster and the match semantics.

pub mod encoder;
pub mod matcher;
pub mod registry;
pub mod types;

pub use encoder::{EncodeError, FaceEncoder};
pub use matcher::{CosineThreshold, DistanceTolerance, FaceComparator};
pub use registry::{PersonRegistry, RegistryError, KNOWN_PERSONS_FILENAME};
pub use types::{BoundingBox, Encoding, KnownPerson};
