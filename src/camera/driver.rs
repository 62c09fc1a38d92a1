use thiserror::Error;

use super::config::{CameraPins, FrameSize, PixelFormat};

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("sensor not responding")]
    NoSensor,

    #[error("driver call failed: {0}")]
    Call(String),

    #[error("frame buffer timeout")]
    Timeout,
}

/// One configuration field handed to the driver before power-on
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Setting {
    Pins(CameraPins),
    XclkMhz(u8),
    PixelFormat(PixelFormat),
    FrameSize(FrameSize),
    JpegQuality(u8),
    FbCount(u8),
}

/// Contract of the camera hardware. Calls are blocking and bounded by the
/// driver's own frame-buffer timeout.
pub trait CameraDriver {
    fn configure(&mut self, setting: Setting) -> Result<(), DriverError>;

    /// Power on the sensor with the configuration applied so far
    fn init(&mut self) -> bool;

    /// `Ok(None)` when the driver produced no frame
    fn capture(&mut self) -> Result<Option<Vec<u8>>, DriverError>;

    fn deinit(&mut self);

    fn set_frame_size(&mut self, size: FrameSize) -> Result<(), DriverError>;
    fn set_quality(&mut self, quality: u8) -> Result<(), DriverError>;
    fn set_contrast(&mut self, value: i8) -> Result<(), DriverError>;
    fn set_brightness(&mut self, value: i8) -> Result<(), DriverError>;
    fn set_saturation(&mut self, value: i8) -> Result<(), DriverError>;
}
