use esp_idf_sys::camera::{
    camera_config_t, camera_fb_location_t_CAMERA_FB_IN_PSRAM,
    camera_grab_mode_t_CAMERA_GRAB_LATEST, esp_camera_deinit, esp_camera_fb_get,
    esp_camera_fb_return, esp_camera_init, esp_camera_sensor_get, framesize_t,
    ledc_channel_t_LEDC_CHANNEL_0, ledc_timer_t_LEDC_TIMER_0, pixformat_t_PIXFORMAT_JPEG,
    sensor_t,
};
use esp_idf_sys::ESP_OK;

use super::config::{FrameSize, PixelFormat};
use super::driver::{CameraDriver, DriverError, Setting};

/// esp32-camera component driver
pub struct EspCamera {
    config: camera_config_t,
    running: bool,
}

impl EspCamera {
    pub fn new() -> Self {
        let mut config = camera_config_t::default();
        config.ledc_timer = ledc_timer_t_LEDC_TIMER_0;
        config.ledc_channel = ledc_channel_t_LEDC_CHANNEL_0;
        config.fb_location = camera_fb_location_t_CAMERA_FB_IN_PSRAM;
        config.grab_mode = camera_grab_mode_t_CAMERA_GRAB_LATEST;
        Self {
            config,
            running: false,
        }
    }

    fn sensor(&self) -> Result<*mut sensor_t, DriverError> {
        if !self.running {
            return Err(DriverError::NoSensor);
        }
        let sensor = unsafe { esp_camera_sensor_get() };
        if sensor.is_null() {
            Err(DriverError::NoSensor)
        } else {
            Ok(sensor)
        }
    }

    /// Call one of the sensor's function-pointer setters
    fn sensor_call(
        &self,
        name: &str,
        pick: impl FnOnce(&sensor_t) -> Option<unsafe extern "C" fn(*mut sensor_t, i32) -> i32>,
        value: i32,
    ) -> Result<(), DriverError> {
        let sensor = self.sensor()?;
        let setter = unsafe { pick(&*sensor) }
            .ok_or_else(|| DriverError::Call(format!("{} unsupported", name)))?;
        let rc = unsafe { setter(sensor, value) };
        if rc == 0 {
            Ok(())
        } else {
            Err(DriverError::Call(format!("{} returned {}", name, rc)))
        }
    }
}

impl Default for EspCamera {
    fn default() -> Self {
        Self::new()
    }
}

// esp32-camera numbers sizes from 0 (FRAMESIZE_96X96)
fn to_framesize_t(size: FrameSize) -> framesize_t {
    (size.code() - 1) as framesize_t
}

impl CameraDriver for EspCamera {
    fn configure(&mut self, setting: Setting) -> Result<(), DriverError> {
        let c = &mut self.config;
        match setting {
            Setting::Pins(p) => {
                c.pin_pwdn = p.pwdn;
                c.pin_reset = p.reset;
                c.pin_xclk = p.xclk;
                c.__bindgen_anon_1.pin_sccb_sda = p.siod;
                c.__bindgen_anon_2.pin_sccb_scl = p.sioc;
                c.pin_d7 = p.d7;
                c.pin_d6 = p.d6;
                c.pin_d5 = p.d5;
                c.pin_d4 = p.d4;
                c.pin_d3 = p.d3;
                c.pin_d2 = p.d2;
                c.pin_d1 = p.d1;
                c.pin_d0 = p.d0;
                c.pin_vsync = p.vsync;
                c.pin_href = p.href;
                c.pin_pclk = p.pclk;
            }
            Setting::XclkMhz(mhz) => c.xclk_freq_hz = mhz as i32 * 1_000_000,
            Setting::PixelFormat(PixelFormat::Jpeg) => c.pixel_format = pixformat_t_PIXFORMAT_JPEG,
            Setting::FrameSize(size) => c.frame_size = to_framesize_t(size),
            Setting::JpegQuality(q) => c.jpeg_quality = q as i32,
            Setting::FbCount(n) => {
                if n == 0 {
                    return Err(DriverError::Call("fb_count must be at least 1".into()));
                }
                c.fb_count = n as _;
            }
        }
        Ok(())
    }

    fn init(&mut self) -> bool {
        let err = unsafe { esp_camera_init(&self.config) };
        if err != ESP_OK {
            log::error!("[CAM] esp_camera_init failed: 0x{:x}", err);
            return false;
        }
        self.running = true;
        true
    }

    fn capture(&mut self) -> Result<Option<Vec<u8>>, DriverError> {
        if !self.running {
            return Err(DriverError::NoSensor);
        }

        // Blocks up to the driver's frame-buffer timeout
        let fb = unsafe { esp_camera_fb_get() };
        if fb.is_null() {
            return Ok(None);
        }

        // Unaligned reads: the struct carries a packed timestamp
        let frame = unsafe {
            let buf = std::ptr::addr_of!((*fb).buf).read_unaligned();
            let len = std::ptr::addr_of!((*fb).len).read_unaligned();
            let data = std::slice::from_raw_parts(buf, len as usize).to_vec();
            esp_camera_fb_return(fb);
            data
        };
        Ok(Some(frame))
    }

    fn deinit(&mut self) {
        if !self.running {
            return;
        }
        let err = unsafe { esp_camera_deinit() };
        if err != ESP_OK {
            log::warn!("[CAM] esp_camera_deinit returned 0x{:x}", err);
        }
        self.running = false;
    }

    fn set_frame_size(&mut self, size: FrameSize) -> Result<(), DriverError> {
        let sensor = self.sensor()?;
        let setter = unsafe { (*sensor).set_framesize }
            .ok_or_else(|| DriverError::Call("set_framesize unsupported".into()))?;
        let rc = unsafe { setter(sensor, to_framesize_t(size)) };
        if rc != 0 {
            return Err(DriverError::Call(format!("set_framesize returned {}", rc)));
        }
        self.config.frame_size = to_framesize_t(size);
        Ok(())
    }

    fn set_quality(&mut self, quality: u8) -> Result<(), DriverError> {
        self.sensor_call("set_quality", |s| s.set_quality, quality as i32)?;
        self.config.jpeg_quality = quality as i32;
        Ok(())
    }

    fn set_contrast(&mut self, value: i8) -> Result<(), DriverError> {
        self.sensor_call("set_contrast", |s| s.set_contrast, value as i32)
    }

    fn set_brightness(&mut self, value: i8) -> Result<(), DriverError> {
        self.sensor_call("set_brightness", |s| s.set_brightness, value as i32)
    }

    fn set_saturation(&mut self, value: i8) -> Result<(), DriverError> {
        self.sensor_call("set_saturation", |s| s.set_saturation, value as i32)
    }
}

impl Drop for EspCamera {
    fn drop(&mut self) {
        self.deinit();
    }
}
