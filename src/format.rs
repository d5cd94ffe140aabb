use std::{fmt, mem};

use crate::v4l2::videodev::v4l2_pix_format;
use crate::FourCC;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
/// Streaming format (single-planar)
pub struct Format {
    /// width in pixels
    pub width: u32,
    /// height in pixels
    pub height: u32,
    /// pixelformat code
    pub fourcc: FourCC,
    /// bytes per line, filled in by the driver
    pub stride: u32,
    /// maximum number of bytes required to store an image, filled in by the driver
    pub size: u32,
}

impl Format {
    /// Returns a capture format
    ///
    /// The driver-owned fields (stride, size) start out as zero and carry
    /// real values only on formats read back from the device.
    ///
    /// # Arguments
    ///
    /// * `width` - Width in pixels
    /// * `height` - Height in pixels
    /// * `fourcc` - Four character code (pixelformat)
    ///
    /// # Example
    ///
    /// ```
    /// use usbcam::{Format, FourCC};
    /// let fmt = Format::new(640, 480, FourCC::new(b"YUYV"));
    /// ```
    pub fn new(width: u32, height: u32, fourcc: FourCC) -> Self {
        Format {
            width,
            height,
            fourcc,
            stride: 0,
            size: 0,
        }
    }

    /// Whether the driver negotiated exactly what `requested` asked for.
    ///
    /// Only the caller-controlled fields take part in the comparison; the
    /// driver-owned ones are its to choose.
    pub fn matches(&self, requested: &Format) -> bool {
        self.width == requested.width
            && self.height == requested.height
            && self.fourcc == requested.fourcc
    }

    pub(crate) fn from_pix(pix: &v4l2_pix_format) -> Self {
        Format {
            width: pix.width,
            height: pix.height,
            fourcc: FourCC::from(pix.pixelformat),
            stride: pix.bytesperline,
            size: pix.sizeimage,
        }
    }

    pub(crate) fn to_pix(self) -> v4l2_pix_format {
        let mut pix: v4l2_pix_format = unsafe { mem::zeroed() };
        pix.width = self.width;
        pix.height = self.height;
        pix.pixelformat = self.fourcc.into();
        pix.bytesperline = self.stride;
        pix.sizeimage = self.size;
        pix
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} {} (stride: {}, size: {})",
            self.width, self.height, self.fourcc, self.stride, self.size
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pix_format_round_trip() {
        let fmt = Format::new(1280, 720, FourCC::new(b"MJPG"));
        let pix = fmt.to_pix();
        assert_eq!(pix.width, 1280);
        assert_eq!(pix.pixelformat, u32::from(FourCC::new(b"MJPG")));
        assert_eq!(Format::from_pix(&pix), fmt);
    }

    #[test]
    fn match_ignores_driver_fields() {
        let requested = Format::new(640, 480, FourCC::new(b"YUYV"));
        let mut granted = requested;
        granted.stride = 1280;
        granted.size = 614_400;
        assert!(granted.matches(&requested));

        granted.width = 320;
        assert!(!granted.matches(&requested));
    }

    #[test]
    fn rounded_resolution_mismatch() {
        let requested = Format::new(641, 480, FourCC::new(b"YUYV"));
        let granted = Format::new(640, 480, FourCC::new(b"YUYV"));
        assert!(!granted.matches(&requested));
    }
}
