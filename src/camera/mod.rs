pub mod config;
pub mod driver;
#[cfg(target_os = "espidf")]
pub mod esp;
pub mod sim;

pub use config::{CameraConfig, CameraPins, FrameSize, PixelFormat};
pub use driver::{CameraDriver, DriverError, Setting};

use serde::Serialize;
use std::time::Instant;
use thiserror::Error;

use config::{clamp_adjust, clamp_quality};

/// Capture summary cadence
const SUMMARY_EVERY: u32 = 100;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera not initialized")]
    NotInitialized,

    #[error("camera already initialized")]
    AlreadyInitialized,

    #[error("camera hardware init failed")]
    HardwareInit,

    #[error("capture failed: {0}")]
    Capture(#[from] DriverError),

    #[error("driver returned no frame")]
    EmptyFrame,

    #[error("failed to apply {field}: {source}")]
    Apply {
        field: &'static str,
        source: DriverError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraState {
    Uninitialized,
    Initialized,
}

#[derive(Debug, Clone, Serialize)]
pub struct CameraStatus {
    pub initialized: bool,
    pub framesize: &'static str,
    pub framesize_code: u8,
    pub quality: u8,
    pub contrast: i8,
    pub brightness: i8,
    pub saturation: i8,
    pub format: &'static str,
    pub fb_count: u8,
    pub frame_count: u32,
    pub error_count: u32,
}

/// Sole owner of the camera hardware.
pub struct CameraSource {
    driver: Box<dyn CameraDriver>,
    config: CameraConfig,
    state: CameraState,
    frame_count: u32,
    error_count: u32,
}

impl CameraSource {
    pub fn new(driver: Box<dyn CameraDriver>) -> Self {
        Self {
            driver,
            config: CameraConfig::default(),
            state: CameraState::Uninitialized,
            frame_count: 0,
            error_count: 0,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.state == CameraState::Initialized
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    /// Push every field of `config` to the driver, then power on.
    ///
    /// Individual field failures are logged and skipped; only the power-on
    /// result decides whether the camera becomes usable.
    pub fn init(&mut self, mut config: CameraConfig) -> Result<(), CameraError> {
        if self.is_initialized() {
            return Err(CameraError::AlreadyInitialized);
        }
        config.quality = clamp_quality(config.quality as i32);

        log::info!(
            "[CAM] Initializing: {} q={} xclk={}MHz fb={}",
            config.frame_size.name(),
            config.quality,
            config.xclk_mhz,
            config.fb_count
        );

        let settings = [
            Setting::Pins(config.pins),
            Setting::XclkMhz(config.xclk_mhz),
            Setting::PixelFormat(config.pixel_format),
            Setting::FrameSize(config.frame_size),
            Setting::JpegQuality(config.quality),
            Setting::FbCount(config.fb_count),
        ];
        for setting in settings {
            if let Err(e) = self.driver.configure(setting) {
                log::warn!("[CAM] Setting {:?} failed: {}", setting, e);
            }
        }

        if !self.driver.init() {
            log::error!("[CAM] Sensor power-on failed");
            return Err(CameraError::HardwareInit);
        }

        self.config = config;
        self.state = CameraState::Initialized;

        // Image tuning from the board profile; failures are not fatal
        let (contrast, brightness, saturation) = (
            self.config.contrast,
            self.config.brightness,
            self.config.saturation,
        );
        if let Err(e) = self.set_contrast(contrast as i32) {
            log::warn!("[CAM] {}", e);
        }
        if let Err(e) = self.set_brightness(brightness as i32) {
            log::warn!("[CAM] {}", e);
        }
        if let Err(e) = self.set_saturation(saturation as i32) {
            log::warn!("[CAM] {}", e);
        }

        log::info!("[CAM] Camera ready");
        Ok(())
    }

    pub fn capture_frame(&mut self) -> Result<Vec<u8>, CameraError> {
        if !self.is_initialized() {
            return Err(CameraError::NotInitialized);
        }

        let started = Instant::now();
        let result = match self.driver.capture() {
            Ok(Some(frame)) if !frame.is_empty() => Ok(frame),
            Ok(_) => Err(CameraError::EmptyFrame),
            Err(e) => Err(CameraError::Capture(e)),
        };

        match result {
            Ok(frame) => {
                self.frame_count = self.frame_count.wrapping_add(1);
                if self.frame_count % SUMMARY_EVERY == 0 {
                    log::info!(
                        "[CAM] Frame #{}: {} bytes in {} ms, {} errors so far",
                        self.frame_count,
                        frame.len(),
                        started.elapsed().as_millis(),
                        self.error_count
                    );
                }
                Ok(frame)
            }
            Err(e) => {
                self.error_count = self.error_count.wrapping_add(1);
                log::warn!("[CAM] Capture error #{}: {}", self.error_count, e);
                Err(e)
            }
        }
    }

    pub fn set_quality(&mut self, quality: i32) -> Result<u8, CameraError> {
        self.ensure_initialized()?;
        let q = clamp_quality(quality);
        self.driver
            .set_quality(q)
            .map_err(|source| CameraError::Apply {
                field: "quality",
                source,
            })?;
        self.config.quality = q;
        Ok(q)
    }

    pub fn set_framesize(&mut self, size: FrameSize) -> Result<(), CameraError> {
        self.ensure_initialized()?;
        self.driver
            .set_frame_size(size)
            .map_err(|source| CameraError::Apply {
                field: "framesize",
                source,
            })?;
        self.config.frame_size = size;
        Ok(())
    }

    pub fn set_contrast(&mut self, value: i32) -> Result<i8, CameraError> {
        self.ensure_initialized()?;
        let v = clamp_adjust(value);
        self.driver
            .set_contrast(v)
            .map_err(|source| CameraError::Apply {
                field: "contrast",
                source,
            })?;
        self.config.contrast = v;
        Ok(v)
    }

    pub fn set_brightness(&mut self, value: i32) -> Result<i8, CameraError> {
        self.ensure_initialized()?;
        let v = clamp_adjust(value);
        self.driver
            .set_brightness(v)
            .map_err(|source| CameraError::Apply {
                field: "brightness",
                source,
            })?;
        self.config.brightness = v;
        Ok(v)
    }

    pub fn set_saturation(&mut self, value: i32) -> Result<i8, CameraError> {
        self.ensure_initialized()?;
        let v = clamp_adjust(value);
        self.driver
            .set_saturation(v)
            .map_err(|source| CameraError::Apply {
                field: "saturation",
                source,
            })?;
        self.config.saturation = v;
        Ok(v)
    }

    pub fn status(&self) -> CameraStatus {
        CameraStatus {
            initialized: self.is_initialized(),
            framesize: self.config.frame_size.name(),
            framesize_code: self.config.frame_size.code(),
            quality: self.config.quality,
            contrast: self.config.contrast,
            brightness: self.config.brightness,
            saturation: self.config.saturation,
            format: self.config.pixel_format.name(),
            fb_count: self.config.fb_count,
            frame_count: self.frame_count,
            error_count: self.error_count,
        }
    }

    /// Release the hardware. Safe before `init` and when called repeatedly.
    pub fn deinit(&mut self) {
        if self.state == CameraState::Uninitialized {
            return;
        }
        self.driver.deinit();
        self.state = CameraState::Uninitialized;
        log::info!(
            "[CAM] Released after {} frames ({} errors)",
            self.frame_count,
            self.error_count
        );
    }

    fn ensure_initialized(&self) -> Result<(), CameraError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(CameraError::NotInitialized)
        }
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.deinit();
    }
}
