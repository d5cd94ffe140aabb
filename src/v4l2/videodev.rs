//! Kernel ABI definitions from linux/videodev2.h.
//!
//! Only the types and constants this crate actually uses are defined here,
//! hand-written rather than generated. Field order, union sizes and
//! implicit padding must match the kernel exactly: the ioctl request codes
//! encode the struct size, so a layout mismatch turns every call into
//! ENOTTY.

#![allow(non_camel_case_types)]

// These layouts hold on 64 bit targets only: 32 bit kernels align the
// v4l2_format union to 4 bytes and use a narrower timeval, which shifts
// every request code.
#[cfg(not(target_pointer_width = "64"))]
compile_error!("the V4L2 ABI definitions require a 64-bit target");

use std::os::raw::{c_ulong, c_void};

pub const V4L2_BUF_TYPE_VIDEO_CAPTURE: u32 = 1;
pub const V4L2_MEMORY_MMAP: u32 = 1;

#[repr(C)]
#[derive(Clone, Copy)]
pub struct v4l2_capability {
    pub driver: [u8; 16],
    pub card: [u8; 32],
    pub bus_info: [u8; 32],
    pub version: u32,
    pub capabilities: u32,
    pub device_caps: u32,
    pub reserved: [u32; 3],
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct v4l2_pix_format {
    pub width: u32,
    pub height: u32,
    pub pixelformat: u32,
    pub field: u32,
    pub bytesperline: u32,
    pub sizeimage: u32,
    pub colorspace: u32,
    pub priv_: u32,
    pub flags: u32,
    // anonymous union of ycbcr_enc / hsv_enc in the kernel
    pub ycbcr_enc: u32,
    pub quantization: u32,
    pub xfer_func: u32,
}

// The kernel union also holds the mplane, window, vbi and sdr variants.
// `raw` covers their common 200 byte footprint; the u64 representation
// keeps the 8 byte alignment the pointer-bearing variants impose on 64 bit
// targets.
#[repr(C)]
#[derive(Clone, Copy)]
pub union v4l2_format_fmt {
    pub pix: v4l2_pix_format,
    pub raw: [u64; 25],
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct v4l2_format {
    pub type_: u32,
    pub fmt: v4l2_format_fmt,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct v4l2_requestbuffers {
    pub count: u32,
    pub type_: u32,
    pub memory: u32,
    pub capabilities: u32,
    pub flags: u8,
    pub reserved: [u8; 3],
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct v4l2_timecode {
    pub type_: u32,
    pub flags: u32,
    pub frames: u8,
    pub seconds: u8,
    pub minutes: u8,
    pub hours: u8,
    pub userbits: [u8; 4],
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union v4l2_buffer_m {
    pub offset: u32,
    pub userptr: c_ulong,
    pub planes: *mut c_void,
    pub fd: i32,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct v4l2_buffer {
    pub index: u32,
    pub type_: u32,
    pub bytesused: u32,
    pub flags: u32,
    pub field: u32,
    pub timestamp: libc::timeval,
    pub timecode: v4l2_timecode,
    pub sequence: u32,
    pub memory: u32,
    pub m: v4l2_buffer_m,
    pub length: u32,
    pub reserved2: u32,
    // anonymous union of request_fd / reserved in the kernel
    pub request_fd: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    // The sizes below are what the kernel headers produce on 64 bit
    // targets; they feed straight into the request codes in vidioc.
    #[test]
    fn abi_sizes() {
        assert_eq!(mem::size_of::<v4l2_capability>(), 104);
        assert_eq!(mem::size_of::<v4l2_pix_format>(), 48);
        assert_eq!(mem::size_of::<v4l2_format>(), 208);
        assert_eq!(mem::size_of::<v4l2_requestbuffers>(), 20);
        assert_eq!(mem::size_of::<v4l2_timecode>(), 16);
        assert_eq!(mem::size_of::<v4l2_buffer>(), 88);
    }

    #[test]
    fn buffer_field_offsets() {
        assert_eq!(mem::offset_of!(v4l2_buffer, timestamp), 24);
        assert_eq!(mem::offset_of!(v4l2_buffer, timecode), 40);
        assert_eq!(mem::offset_of!(v4l2_buffer, m), 64);
        assert_eq!(mem::offset_of!(v4l2_buffer, length), 72);
    }
}
