use std::{fmt, str};

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
/// Four character code identifying a pixelformat
pub struct FourCC {
    pub repr: [u8; 4],
}

impl FourCC {
    /// Returns a pixelformat as four character code
    ///
    /// # Arguments
    ///
    /// * `repr` - Four characters as raw bytes
    ///
    /// # Example
    ///
    /// ```
    /// use usbcam::FourCC;
    /// let fourcc = FourCC::new(b"MJPG");
    /// ```
    pub fn new(repr: &[u8; 4]) -> FourCC {
        FourCC { repr: *repr }
    }

    /// Returns the string representation, if the code is valid UTF-8
    pub fn str(&self) -> Result<&str, str::Utf8Error> {
        str::from_utf8(&self.repr)
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Ok(string) = self.str() {
            write!(f, "{}", string)?;
        }
        Ok(())
    }
}

impl From<u32> for FourCC {
    fn from(code: u32) -> Self {
        FourCC::new(&code.to_le_bytes())
    }
}

impl From<FourCC> for u32 {
    fn from(fourcc: FourCC) -> Self {
        u32::from_le_bytes(fourcc.repr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_round_trip() {
        let fourcc = FourCC::new(b"MJPG");
        let code: u32 = fourcc.into();
        assert_eq!(FourCC::from(code), fourcc);
    }

    #[test]
    fn little_endian_packing() {
        // 'Y' 'U' 'Y' 'V' in increasing byte significance
        let code: u32 = FourCC::new(b"YUYV").into();
        assert_eq!(code, 0x5659_5559);
    }

    #[test]
    fn display() {
        assert_eq!(FourCC::new(b"YUYV").to_string(), "YUYV");
    }
}
