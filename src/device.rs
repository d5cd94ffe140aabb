use std::os::raw::{c_int, c_short, c_void};
use std::path::Path;
use std::sync::Arc;
use std::{fmt, io, mem, str};

use bitflags::bitflags;
use tracing::{debug, warn};

use crate::arena::Arena;
use crate::buffer::Metadata;
use crate::capture::{CaptureDevice, Dequeued};
use crate::error::{Error, Result};
use crate::format::Format;
use crate::v4l2;
use crate::v4l2::videodev::*;

/// Owned device file descriptor, closed on drop.
///
/// Shared between the device and its buffer pool, which needs the
/// descriptor for mapping.
#[derive(Debug)]
pub(crate) struct Handle {
    fd: c_int,
}

impl Handle {
    fn new(fd: c_int) -> Self {
        Handle { fd }
    }

    pub(crate) fn fd(&self) -> c_int {
        self.fd
    }

    /// Polls the descriptor for `events`; zero `timeout` probes without
    /// blocking. Returns the number of ready descriptors.
    pub(crate) fn poll(&self, events: c_short, timeout: c_int) -> io::Result<i32> {
        v4l2::poll(self.fd, events, timeout)
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if let Err(err) = v4l2::close(self.fd) {
            warn!(%err, "failed to close device descriptor");
        }
    }
}

bitflags! {
    /// Capability bits reported by VIDIOC_QUERYCAP
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CapabilityFlags: u32 {
        const VIDEO_CAPTURE         = 0x00000001;
        const VIDEO_OUTPUT          = 0x00000002;
        const VIDEO_OVERLAY         = 0x00000004;
        const VIDEO_CAPTURE_MPLANE  = 0x00001000;
        const VIDEO_OUTPUT_MPLANE   = 0x00002000;
        const READ_WRITE            = 0x01000000;
        const ASYNC_IO              = 0x02000000;
        const STREAMING             = 0x04000000;
        const DEVICE_CAPS           = 0x80000000;
    }
}

impl fmt::Display for CapabilityFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone)]
/// Device identity and capabilities
pub struct Capabilities {
    /// Driver name, e.g. uvcvideo for usb video class devices
    pub driver: String,
    /// Card name
    pub card: String,
    /// Bus name, e.g. USB or PCI
    pub bus: String,
    /// Version number MAJOR.MINOR.PATCH
    pub version: (u8, u8, u8),
    /// Capability flags
    pub capabilities: CapabilityFlags,
}

impl Capabilities {
    pub(crate) fn from_caps(caps: &v4l2_capability) -> Self {
        // device_caps is only valid when the driver advertises it
        let flags = CapabilityFlags::from_bits_truncate(caps.capabilities);
        let flags = if flags.contains(CapabilityFlags::DEVICE_CAPS) {
            CapabilityFlags::from_bits_truncate(caps.device_caps)
        } else {
            flags
        };

        Capabilities {
            driver: cstr(&caps.driver),
            card: cstr(&caps.card),
            bus: cstr(&caps.bus_info),
            version: (
                ((caps.version >> 16) & 0xff) as u8,
                ((caps.version >> 8) & 0xff) as u8,
                (caps.version & 0xff) as u8,
            ),
            capabilities: flags,
        }
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Driver      : {}", self.driver)?;
        writeln!(f, "Card        : {}", self.card)?;
        writeln!(f, "Bus         : {}", self.bus)?;
        writeln!(
            f,
            "Version     : {}.{}.{}",
            self.version.0, self.version.1, self.version.2
        )?;
        writeln!(f, "Capabilities: {}", self.capabilities)?;
        Ok(())
    }
}

fn cstr(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    str::from_utf8(&buf[..end]).unwrap_or_default().to_string()
}

/// V4L2 capture device, the real [`CaptureDevice`] implementation.
///
/// Owns the descriptor and the mapped buffer pool. Most users go through
/// [`Camera`](crate::Camera) instead of driving this directly.
#[derive(Debug)]
pub struct Device {
    handle: Arc<Handle>,
    arena: Arena,
    caps: Capabilities,
}

impl Device {
    /// Opens the device node at `path` for capture.
    ///
    /// The device must advertise video capture with streaming I/O;
    /// anything else (an output device, a metadata node) is rejected here
    /// rather than failing later inside buffer negotiation.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use usbcam::Device;
    ///
    /// if let Ok(dev) = Device::open("/dev/video0") {
    ///     print!("{}", dev.capabilities());
    /// }
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let fd = v4l2::open(&path, libc::O_RDWR).map_err(Error::device("open"))?;
        let handle = Arc::new(Handle::new(fd));

        let caps = Self::query_caps(&handle)?;
        for (bit, what) in [
            (CapabilityFlags::VIDEO_CAPTURE, "video capture"),
            (CapabilityFlags::STREAMING, "streaming i/o"),
        ] {
            if !caps.capabilities.contains(bit) {
                return Err(Error::Device {
                    op: "VIDIOC_QUERYCAP",
                    source: io::Error::new(
                        io::ErrorKind::Unsupported,
                        format!("device does not support {}", what),
                    ),
                });
            }
        }
        debug!(driver = %caps.driver, card = %caps.card, "opened capture device");

        Ok(Device {
            arena: Arena::new(handle.clone()),
            handle,
            caps,
        })
    }

    fn query_caps(handle: &Handle) -> Result<Capabilities> {
        let mut v4l2_caps: v4l2_capability = unsafe { mem::zeroed() };
        unsafe {
            v4l2::ioctl(
                handle.fd(),
                v4l2::vidioc::VIDIOC_QUERYCAP,
                &mut v4l2_caps as *mut _ as *mut c_void,
            )
            .map_err(Error::device("VIDIOC_QUERYCAP"))?;
        }
        Ok(Capabilities::from_caps(&v4l2_caps))
    }

    /// Identity and capabilities reported by the driver on open
    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    /// Returns the raw fd of the device
    pub fn fd(&self) -> c_int {
        self.handle.fd()
    }

    fn get_format(&self) -> Result<Format> {
        let mut v4l2_fmt: v4l2_format = unsafe { mem::zeroed() };
        v4l2_fmt.type_ = V4L2_BUF_TYPE_VIDEO_CAPTURE;
        unsafe {
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_G_FMT,
                &mut v4l2_fmt as *mut _ as *mut c_void,
            )
            .map_err(Error::device("VIDIOC_G_FMT"))?;
        }

        Ok(Format::from_pix(unsafe { &v4l2_fmt.fmt.pix }))
    }
}

impl CaptureDevice for Device {
    fn set_format(&mut self, format: &Format) -> Result<Format> {
        let mut v4l2_fmt: v4l2_format = unsafe { mem::zeroed() };
        v4l2_fmt.type_ = V4L2_BUF_TYPE_VIDEO_CAPTURE;
        v4l2_fmt.fmt.pix = format.to_pix();
        unsafe {
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_S_FMT,
                &mut v4l2_fmt as *mut _ as *mut c_void,
            )
            .map_err(Error::device("VIDIOC_S_FMT"))?;
        }

        // S_FMT reports the adjusted format back, but the read-back shows
        // what actually stuck
        self.get_format()
    }

    fn map_buffers(&mut self, count: u32) -> Result<u32> {
        self.arena.allocate(count)
    }

    fn unmap_buffers(&mut self) {
        self.arena.release();
    }

    fn buffer(&self, index: usize) -> Option<&[u8]> {
        self.arena.get(index)
    }

    fn stream_on(&mut self) -> Result<()> {
        let mut typ = V4L2_BUF_TYPE_VIDEO_CAPTURE as c_int;
        unsafe {
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_STREAMON,
                &mut typ as *mut _ as *mut c_void,
            )
            .map_err(Error::device("VIDIOC_STREAMON"))
        }
    }

    fn stream_off(&mut self) -> Result<()> {
        let mut typ = V4L2_BUF_TYPE_VIDEO_CAPTURE as c_int;
        unsafe {
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_STREAMOFF,
                &mut typ as *mut _ as *mut c_void,
            )
            .map_err(Error::device("VIDIOC_STREAMOFF"))
        }
    }

    fn enqueue(&mut self, index: usize) -> Result<()> {
        let mut v4l2_buf: v4l2_buffer = unsafe { mem::zeroed() };
        v4l2_buf.type_ = V4L2_BUF_TYPE_VIDEO_CAPTURE;
        v4l2_buf.memory = V4L2_MEMORY_MMAP;
        v4l2_buf.index = index as u32;
        unsafe {
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_QBUF,
                &mut v4l2_buf as *mut _ as *mut c_void,
            )
            .map_err(Error::device("VIDIOC_QBUF"))
        }
    }

    fn dequeue(&mut self) -> Result<Dequeued> {
        let mut v4l2_buf: v4l2_buffer = unsafe { mem::zeroed() };
        v4l2_buf.type_ = V4L2_BUF_TYPE_VIDEO_CAPTURE;
        v4l2_buf.memory = V4L2_MEMORY_MMAP;
        unsafe {
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_DQBUF,
                &mut v4l2_buf as *mut _ as *mut c_void,
            )
            .map_err(Error::device("VIDIOC_DQBUF"))?;
        }

        Ok(Dequeued {
            index: v4l2_buf.index as usize,
            bytesused: v4l2_buf.bytesused as usize,
            meta: Metadata::new(
                v4l2_buf.sequence,
                v4l2_buf.timestamp.into(),
                v4l2_buf.flags.into(),
            ),
        })
    }

    fn ready(&self) -> Result<bool> {
        let ready = self
            .handle
            .poll(libc::POLLIN, 0)
            .map_err(Error::device("poll"))?;
        Ok(ready > 0)
    }
}
