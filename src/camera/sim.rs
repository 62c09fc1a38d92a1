//! Simulated OV2640 for the host build.
//!
//! Produces JPEG-framed synthetic data whose size follows the configured
//! resolution and quality, so the HTTP side sees realistic payloads.
use super::config::{CameraPins, FrameSize};
use super::driver::{CameraDriver, DriverError, Setting};

#[derive(Debug)]
pub struct SimulatedOv2640 {
    pins: Option<CameraPins>,
    powered: bool,
    frame_size: FrameSize,
    quality: u8,
    sequence: u32,
}

impl SimulatedOv2640 {
    pub fn new() -> Self {
        Self {
            pins: None,
            powered: false,
            frame_size: FrameSize::Vga,
            quality: 12,
            sequence: 0,
        }
    }

    fn estimated_size(&self) -> usize {
        let (w, h) = self.frame_size.dimensions();
        // Roughly 10:1 at quality 0, shrinking as the quality number grows
        let raw = w as usize * h as usize * 3 / 10;
        (raw * 8 / (8 + self.quality as usize)).max(64)
    }
}

impl Default for SimulatedOv2640 {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraDriver for SimulatedOv2640 {
    fn configure(&mut self, setting: Setting) -> Result<(), DriverError> {
        match setting {
            Setting::Pins(pins) => self.pins = Some(pins),
            Setting::FrameSize(size) => self.frame_size = size,
            Setting::JpegQuality(q) => self.quality = q,
            Setting::XclkMhz(_) | Setting::PixelFormat(_) | Setting::FbCount(_) => {}
        }
        Ok(())
    }

    fn init(&mut self) -> bool {
        if self.pins.is_none() {
            log::error!("[SIM] No pin map configured");
            return false;
        }
        self.powered = true;
        log::info!("[SIM] OV2640 simulator powered on");
        true
    }

    fn capture(&mut self) -> Result<Option<Vec<u8>>, DriverError> {
        if !self.powered {
            return Err(DriverError::NoSensor);
        }
        self.sequence = self.sequence.wrapping_add(1);

        let size = self.estimated_size();
        let seed = self.sequence as usize;
        let mut frame = Vec::with_capacity(size);
        frame.extend_from_slice(&[0xFF, 0xD8]);
        frame.extend((0..size - 4).map(|i| ((i * 17 + 73 + seed) % 256) as u8));
        frame.extend_from_slice(&[0xFF, 0xD9]);
        Ok(Some(frame))
    }

    fn deinit(&mut self) {
        self.powered = false;
    }

    fn set_frame_size(&mut self, size: FrameSize) -> Result<(), DriverError> {
        self.frame_size = size;
        Ok(())
    }

    fn set_quality(&mut self, quality: u8) -> Result<(), DriverError> {
        self.quality = quality;
        Ok(())
    }

    fn set_contrast(&mut self, _value: i8) -> Result<(), DriverError> {
        Ok(())
    }

    fn set_brightness(&mut self, _value: i8) -> Result<(), DriverError> {
        Ok(())
    }

    fn set_saturation(&mut self, _value: i8) -> Result<(), DriverError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_jpeg_framed_and_follow_size() {
        let mut cam = SimulatedOv2640::new();
        cam.configure(Setting::Pins(CameraPins::XIAO_ESP32S3)).unwrap();
        assert!(cam.init());

        let vga = cam.capture().unwrap().unwrap();
        assert_eq!(&vga[..2], &[0xFF, 0xD8]);
        assert_eq!(&vga[vga.len() - 2..], &[0xFF, 0xD9]);

        cam.set_frame_size(FrameSize::Qqvga).unwrap();
        let small = cam.capture().unwrap().unwrap();
        assert!(small.len() < vga.len());
    }

    #[test]
    fn capture_before_power_on_fails() {
        let mut cam = SimulatedOv2640::new();
        assert!(cam.capture().is_err());
        assert!(!cam.init());
    }
}
