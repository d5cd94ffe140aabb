use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::FourCC;

/// Largest pool size a session may request from the driver.
pub const MAX_BUFFERS: u32 = 128;

/// Default pool depth, enough headroom for a consumer that occasionally
/// takes longer than one frame interval to process.
const DEFAULT_BUFFERS: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Everything needed to bring up a capture session.
///
/// The driver must grant the format and resolution exactly as configured;
/// a session never silently runs at a rounded-down resolution.
pub struct Config {
    /// Path to the device node, e.g. /dev/video0
    pub device: PathBuf,
    /// Requested pixelformat
    pub format: FourCC,
    /// Requested frame width in pixels
    pub width: u32,
    /// Requested frame height in pixels
    pub height: u32,
    /// Number of capture buffers to allocate, 1 ..= [`MAX_BUFFERS`]
    pub buffers: u32,
}

impl Config {
    /// Returns a configuration with the default buffer count
    ///
    /// # Example
    ///
    /// ```
    /// use usbcam::{Config, FourCC};
    ///
    /// let config = Config::new("/dev/video0", FourCC::new(b"MJPG"), 1280, 720)
    ///     .with_buffers(8);
    /// ```
    pub fn new<P: AsRef<Path>>(device: P, format: FourCC, width: u32, height: u32) -> Self {
        Config {
            device: device.as_ref().to_path_buf(),
            format,
            width,
            height,
            buffers: DEFAULT_BUFFERS,
        }
    }

    /// Overrides the buffer count.
    ///
    /// More buffers tolerate a slower consumer: the driver never overwrites
    /// a filled buffer in place, so a deep pool keeps frames flowing while
    /// one is being processed. The bound is checked at session start, not
    /// here.
    pub fn with_buffers(mut self, buffers: u32) -> Self {
        self.buffers = buffers;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.buffers < 1 || self.buffers > MAX_BUFFERS {
            return Err(Error::Misuse("buffer count out of range (1..=128)"));
        }
        Ok(())
    }
}
