//! Camera collaborator traits and the V4L2 implementation via the `v4l` crate.

use crate::frame::{PixelFormat, RawFrame};
use std::path::Path;
use thiserror::Error;
use v4l::buffer::Type as BufType;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::capture::Parameters;
use v4l::video::Capture;
use v4l::FourCC;

const REQUESTED_WIDTH: u32 = 640;
const REQUESTED_HEIGHT: u32 = 480;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("capture failed: {0}")]
    CaptureFailed(String),
    #[error("device busy")]
    DeviceBusy,
    #[error("format negotiation failed: {0}")]
    FormatNegotiationFailed(String),
    #[error("streaming not supported")]
    StreamingNotSupported,
}

/// Something that can be opened to yield a camera handle.
///
/// Each call to [`open`](Self::open) starts from a fresh device state.
pub trait CameraSource {
    type Handle: CameraHandle;

    fn open(&self) -> Result<Self::Handle, CameraError>;
}

/// An open camera. Dropping the handle releases the device.
pub trait CameraHandle {
    /// Read one frame. `Ok(None)` means the device answered but produced no frame.
    fn read_frame(&mut self) -> Result<Option<RawFrame>, CameraError>;
}

/// Info about a discovered V4L2 device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
    pub driver: String,
    pub bus: String,
}

/// V4L2 camera configuration; opened anew for every capture attempt.
#[derive(Debug, Clone)]
pub struct V4lCamera {
    pub device_path: String,
    /// Requested frame rate; `0` leaves the driver default.
    pub fps: u32,
}

impl V4lCamera {
    pub fn new(device_path: impl Into<String>, fps: u32) -> Self {
        Self {
            device_path: device_path.into(),
            fps,
        }
    }

    /// List available V4L2 video capture devices.
    pub fn list_devices() -> Vec<DeviceInfo> {
        let mut devices = Vec::new();

        for i in 0..16 {
            let path = format!("/dev/video{i}");
            if !Path::new(&path).exists() {
                continue;
            }
            let Ok(dev) = Device::with_path(&path) else {
                continue;
            };
            let Ok(caps) = dev.query_caps() else {
                continue;
            };
            if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
                continue;
            }
            devices.push(DeviceInfo {
                path,
                name: caps.card.clone(),
                driver: caps.driver.clone(),
                bus: caps.bus.clone(),
            });
        }

        devices
    }
}

impl CameraSource for V4lCamera {
    type Handle = V4lHandle;

    fn open(&self) -> Result<V4lHandle, CameraError> {
        let device_path = self.device_path.as_str();
        if !Path::new(device_path).exists() {
            return Err(CameraError::DeviceNotFound(device_path.to_string()));
        }

        let device = Device::with_path(device_path).map_err(|e| {
            if e.to_string().contains("busy") || e.to_string().contains("EBUSY") {
                CameraError::DeviceBusy
            } else {
                CameraError::DeviceNotFound(format!("{device_path}: {e}"))
            }
        })?;

        let caps = device.query_caps().map_err(|e| {
            CameraError::CaptureFailed(format!("failed to query capabilities: {e}"))
        })?;
        if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
            return Err(CameraError::StreamingNotSupported);
        }

        // Ask for YUYV; accept whatever common format the driver settles on.
        let mut fmt = device.format().map_err(|e| {
            CameraError::FormatNegotiationFailed(format!("failed to get format: {e}"))
        })?;
        fmt.fourcc = FourCC::new(b"YUYV");
        fmt.width = REQUESTED_WIDTH;
        fmt.height = REQUESTED_HEIGHT;

        let negotiated = device.set_format(&fmt).map_err(|e| {
            CameraError::FormatNegotiationFailed(format!("failed to set format: {e}"))
        })?;

        let fourcc = negotiated.fourcc;
        let pixel_format = pixel_format_for(fourcc).ok_or_else(|| {
            CameraError::FormatNegotiationFailed(format!(
                "unsupported pixel format: {fourcc:?} (need YUYV, BGR3, RGB3, or GREY)"
            ))
        })?;

        if self.fps > 0 {
            if let Err(e) = device.set_params(&Parameters::with_fps(self.fps)) {
                tracing::debug!(fps = self.fps, error = %e, "driver rejected frame rate");
            }
        }

        tracing::debug!(
            device = device_path,
            driver = %caps.driver,
            width = negotiated.width,
            height = negotiated.height,
            fourcc = ?fourcc,
            "opened camera"
        );

        Ok(V4lHandle {
            device,
            width: negotiated.width,
            height: negotiated.height,
            pixel_format,
        })
    }
}

fn pixel_format_for(fourcc: FourCC) -> Option<PixelFormat> {
    match &fourcc.repr {
        b"YUYV" => Some(PixelFormat::Yuyv),
        b"BGR3" => Some(PixelFormat::Bgr24),
        b"RGB3" => Some(PixelFormat::Rgb24),
        b"GREY" => Some(PixelFormat::Grey),
        _ => None,
    }
}

/// An open V4L2 device.
pub struct V4lHandle {
    device: Device,
    width: u32,
    height: u32,
    pixel_format: PixelFormat,
}

impl CameraHandle for V4lHandle {
    fn read_frame(&mut self) -> Result<Option<RawFrame>, CameraError> {
        let mut stream =
            MmapStream::with_buffers(&self.device, BufType::VideoCapture, 4).map_err(|e| {
                CameraError::CaptureFailed(format!("failed to create mmap stream: {e}"))
            })?;

        let (buf, meta) = stream
            .next()
            .map_err(|e| CameraError::CaptureFailed(format!("failed to dequeue buffer: {e}")))?;

        if buf.is_empty() || meta.bytesused == 0 {
            return Ok(None);
        }

        let used = (meta.bytesused as usize).min(buf.len());
        Ok(Some(RawFrame {
            data: buf[..used].to_vec(),
            width: self.width,
            height: self.height,
            format: self.pixel_format,
        }))
    }
}
