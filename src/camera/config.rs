use serde::{Deserialize, Serialize};

pub const QUALITY_MIN: u8 = 1;
pub const QUALITY_MAX: u8 = 31;
pub const ADJUST_MIN: i8 = -2;
pub const ADJUST_MAX: i8 = 2;

/// Sensor output sizes, numbered the way the board firmware exposes them (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameSize {
    R96x96 = 1,
    Qqvga = 2,
    Qcif = 3,
    Hqvga = 4,
    R240x240 = 5,
    Qvga = 6,
    Cif = 7,
    Hvga = 8,
    Vga = 9,
    Svga = 10,
    Xga = 11,
    Hd = 12,
    Sxga = 13,
    Uxga = 14,
    Fhd = 15,
    PHd = 16,
    P3mp = 17,
    Qxga = 18,
}

impl FrameSize {
    pub const ALL: [FrameSize; 18] = [
        FrameSize::R96x96,
        FrameSize::Qqvga,
        FrameSize::Qcif,
        FrameSize::Hqvga,
        FrameSize::R240x240,
        FrameSize::Qvga,
        FrameSize::Cif,
        FrameSize::Hvga,
        FrameSize::Vga,
        FrameSize::Svga,
        FrameSize::Xga,
        FrameSize::Hd,
        FrameSize::Sxga,
        FrameSize::Uxga,
        FrameSize::Fhd,
        FrameSize::PHd,
        FrameSize::P3mp,
        FrameSize::Qxga,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.code() == code)
    }

    pub fn dimensions(self) -> (u16, u16) {
        match self {
            FrameSize::R96x96 => (96, 96),
            FrameSize::Qqvga => (160, 120),
            FrameSize::Qcif => (176, 144),
            FrameSize::Hqvga => (240, 176),
            FrameSize::R240x240 => (240, 240),
            FrameSize::Qvga => (320, 240),
            FrameSize::Cif => (400, 296),
            FrameSize::Hvga => (480, 320),
            FrameSize::Vga => (640, 480),
            FrameSize::Svga => (800, 600),
            FrameSize::Xga => (1024, 768),
            FrameSize::Hd => (1280, 720),
            FrameSize::Sxga => (1280, 1024),
            FrameSize::Uxga => (1600, 1200),
            FrameSize::Fhd => (1920, 1080),
            FrameSize::PHd => (720, 1280),
            FrameSize::P3mp => (864, 1536),
            FrameSize::Qxga => (2048, 1536),
        }
    }

    /// Human readable name, e.g. "640x480 (VGA)"
    pub fn name(self) -> &'static str {
        match self {
            FrameSize::R96x96 => "96x96",
            FrameSize::Qqvga => "160x120 (QQVGA)",
            FrameSize::Qcif => "176x144 (QCIF)",
            FrameSize::Hqvga => "240x176 (HQVGA)",
            FrameSize::R240x240 => "240x240",
            FrameSize::Qvga => "320x240 (QVGA)",
            FrameSize::Cif => "400x296 (CIF)",
            FrameSize::Hvga => "480x320 (HVGA)",
            FrameSize::Vga => "640x480 (VGA)",
            FrameSize::Svga => "800x600 (SVGA)",
            FrameSize::Xga => "1024x768 (XGA)",
            FrameSize::Hd => "1280x720 (HD)",
            FrameSize::Sxga => "1280x1024 (SXGA)",
            FrameSize::Uxga => "1600x1200 (UXGA)",
            FrameSize::Fhd => "1920x1080 (FHD)",
            FrameSize::PHd => "720x1280 (P_HD)",
            FrameSize::P3mp => "864x1536 (P_3MP)",
            FrameSize::Qxga => "2048x1536 (QXGA)",
        }
    }

    /// Parse a `WxH` string such as `640x480`; only sizes the sensor knows are accepted
    pub fn parse_dims(value: &str) -> Option<Self> {
        let (w, h) = value.trim().split_once(['x', 'X'])?;
        let w: u16 = w.trim().parse().ok()?;
        let h: u16 = h.trim().parse().ok()?;
        Self::ALL.iter().copied().find(|s| s.dimensions() == (w, h))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Jpeg,
}

impl PixelFormat {
    pub fn name(self) -> &'static str {
        match self {
            PixelFormat::Jpeg => "JPEG",
        }
    }
}

/// GPIO assignment for the DVP camera bus; -1 means not connected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraPins {
    pub pwdn: i32,
    pub reset: i32,
    pub xclk: i32,
    pub siod: i32,
    pub sioc: i32,
    pub d7: i32,
    pub d6: i32,
    pub d5: i32,
    pub d4: i32,
    pub d3: i32,
    pub d2: i32,
    pub d1: i32,
    pub d0: i32,
    pub vsync: i32,
    pub href: i32,
    pub pclk: i32,
}

impl CameraPins {
    /// Seeed XIAO ESP32-S3 Sense with the OV2640 module
    pub const XIAO_ESP32S3: CameraPins = CameraPins {
        pwdn: -1,
        reset: -1,
        xclk: 10,
        siod: 40,
        sioc: 39,
        d7: 48,
        d6: 11,
        d5: 12,
        d4: 14,
        d3: 16,
        d2: 18,
        d1: 17,
        d0: 15,
        vsync: 38,
        href: 47,
        pclk: 13,
    };
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraConfig {
    pub pins: CameraPins,
    pub xclk_mhz: u8,
    pub pixel_format: PixelFormat,
    pub frame_size: FrameSize,
    pub quality: u8,
    pub fb_count: u8,
    pub contrast: i8,
    pub brightness: i8,
    pub saturation: i8,
}

impl CameraConfig {
    pub fn xiao_esp32s3() -> Self {
        Self {
            pins: CameraPins::XIAO_ESP32S3,
            xclk_mhz: 14,
            pixel_format: PixelFormat::Jpeg,
            frame_size: FrameSize::Vga,
            quality: 12,
            fb_count: 2,
            contrast: 2,
            brightness: 0,
            saturation: 0,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self::xiao_esp32s3()
    }
}

pub fn clamp_quality(quality: i32) -> u8 {
    quality.clamp(QUALITY_MIN as i32, QUALITY_MAX as i32) as u8
}

pub fn clamp_adjust(value: i32) -> i8 {
    value.clamp(ADJUST_MIN as i32, ADJUST_MAX as i32) as i8
}
