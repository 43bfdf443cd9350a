//! greeter-hw — Camera capture for the greeter.
//!
//! Provides the camera collaborator traits, a V4L2 implementation, colour
//! conversion to RGB24, and a bounded-retry frame acquirer.

pub mod acquirer;
pub mod camera;
pub mod frame;

pub use acquirer::{Capture, FrameAcquirer, TransientFailure};
pub use camera::{CameraError, CameraHandle, CameraSource, V4lCamera};
pub use frame::{Frame, PixelFormat, RawFrame};
