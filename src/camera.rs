use std::fmt;
use std::io;
use std::ops::Deref;

use tracing::{debug, trace, warn};

use crate::buffer::Metadata;
use crate::capture::{CaptureDevice, Dequeued};
use crate::config::Config;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::format::Format;
use crate::timestamp::Timestamp;

/// One streaming capture session.
///
/// A session walks the lifecycle `closed -> opened -> mapped -> streaming`
/// on [`open`](Camera::open) and unwinds it in reverse on
/// [`close`](Camera::close) or drop, from whatever point it got to. Once
/// streaming, [`lock`](Camera::lock) hands out the newest completed frame
/// and [`unlock`](Camera::unlock) returns it to the driver.
///
/// Sessions are single-threaded: all operations take `&mut self` and
/// `lock` blocks until a frame arrives. Wrap the session in a mutex if
/// multiple threads need it.
///
/// # Example
///
/// ```no_run
/// use usbcam::{Camera, Config, FourCC};
///
/// fn main() -> usbcam::Result<()> {
///     let config = Config::new("/dev/video0", FourCC::new(b"MJPG"), 1280, 720);
///     let mut camera = Camera::open(&config)?;
///
///     let frame = camera.lock()?;
///     println!("captured {} bytes at {}", frame.len(), frame.timestamp());
///     drop(frame);
///     camera.unlock()?;
///     Ok(())
/// }
/// ```
pub struct Camera<D: CaptureDevice = Device> {
    dev: Option<D>,
    format: Option<Format>,
    buffers: u32,
    mapped: bool,
    streaming: bool,
    locked: Option<Dequeued>,
}

impl Camera<Device> {
    /// Opens a session on the configured V4L2 device.
    ///
    /// Runs the full bring-up: open and check the device, negotiate the
    /// format, map the buffer pool, start streaming, queue every buffer.
    /// If any step fails the partial session is torn down before the
    /// error returns.
    ///
    /// The driver must accept the configured format, resolution and
    /// buffer count exactly; a device that silently rounds any of them is
    /// reported as a device error rather than captured at the wrong
    /// geometry.
    pub fn open(config: &Config) -> Result<Self> {
        config.validate()?;
        let dev = Device::open(&config.device)?;
        Self::with_device(dev, config)
    }

    /// Tears the session down and brings it back up with a new
    /// configuration, possibly on a different device node.
    pub fn reconfigure(&mut self, config: &Config) -> Result<()> {
        // release the current node before reopening it
        self.close();
        config.validate()?;
        let dev = Device::open(&config.device)?;
        self.reconfigure_with(dev, config)
    }
}

impl<D: CaptureDevice> Camera<D> {
    /// Builds a session over an already opened capture device.
    ///
    /// This is the seam for alternative [`CaptureDevice`] implementations
    /// (virtual sources, test doubles). [`Camera::open`] is the same
    /// thing with the V4L2 device opened for you.
    pub fn with_device(dev: D, config: &Config) -> Result<Self> {
        let mut camera = Camera {
            dev: None,
            format: None,
            buffers: 0,
            mapped: false,
            streaming: false,
            locked: None,
        };
        camera.init(dev, config)?;
        Ok(camera)
    }

    /// Tears the session down and brings it back up over `dev`.
    ///
    /// Counterpart of [`Camera::reconfigure`] for sessions built through
    /// [`with_device`](Camera::with_device). Whatever the session held
    /// before, locked frame included, is shed through the full teardown
    /// before the replacement bring-up starts; on failure the session is
    /// left closed.
    pub fn reconfigure_with(&mut self, dev: D, config: &Config) -> Result<()> {
        self.init(dev, config)
    }

    fn init(&mut self, dev: D, config: &Config) -> Result<()> {
        // a session being re-initialized sheds its previous state first
        self.close();
        config.validate()?;
        self.dev = Some(dev);
        match self.bring_up(config) {
            Ok(()) => Ok(()),
            Err(err) => {
                // unwind whatever partial state bring-up left behind
                self.close();
                Err(err)
            }
        }
    }

    fn bring_up(&mut self, config: &Config) -> Result<()> {
        let requested = Format::new(config.width, config.height, config.format);
        let negotiated = self.dev_mut()?.set_format(&requested)?;
        if !negotiated.matches(&requested) {
            return Err(format_mismatch(&requested, &negotiated));
        }

        let granted = self.dev_mut()?.map_buffers(config.buffers)?;
        self.mapped = true;
        if granted != config.buffers {
            return Err(count_mismatch(config.buffers, granted));
        }
        self.buffers = granted;

        self.dev_mut()?.stream_on()?;
        self.streaming = true;

        // hand the whole pool to the driver so it can start filling
        for index in 0..granted as usize {
            self.dev_mut()?.enqueue(index)?;
        }

        debug!(format = %negotiated, buffers = granted, "capture session streaming");
        self.format = Some(negotiated);
        Ok(())
    }

    fn dev_mut(&mut self) -> Result<&mut D> {
        self.dev.as_mut().ok_or(Error::Misuse("session is closed"))
    }

    /// Acquires exclusive access to the newest completed frame.
    ///
    /// Blocks until the driver has at least one filled buffer, then keeps
    /// trading up as long as a fresher one is already waiting, requeueing
    /// each stale buffer as it goes. The returned [`Frame`] borrows the
    /// session, so the mapped bytes cannot outlive it.
    ///
    /// The frame stays locked until [`unlock`](Camera::unlock): dropping
    /// the `Frame` value only ends the borrow, it does not return the
    /// buffer to the driver. Locking twice without an unlock in between
    /// is misuse and fails without touching the device.
    pub fn lock(&mut self) -> Result<Frame<'_>> {
        if self.locked.is_some() {
            return Err(Error::Misuse("frame already locked"));
        }
        let Some(dev) = self.dev.as_mut() else {
            return Err(Error::Misuse("session is closed"));
        };
        if !self.mapped {
            return Err(Error::Misuse("buffer pool not mapped"));
        }
        if !self.streaming {
            return Err(Error::Misuse("stream not started"));
        }

        // Drain to the latest frame: as long as the driver has another
        // completed buffer waiting, the one in hand is already stale.
        let mut claim = dev.dequeue()?;
        trace!(index = claim.index, seq = claim.meta.seq, "dequeued buffer");
        loop {
            match dev.ready() {
                Ok(true) => {
                    dev.enqueue(claim.index)?;
                    claim = dev.dequeue()?;
                    trace!(
                        index = claim.index,
                        seq = claim.meta.seq,
                        "drained to fresher buffer"
                    );
                }
                Ok(false) => break,
                Err(err) => {
                    // Hand the held buffer back before bailing out. If
                    // that fails as well the device is gone and teardown
                    // recovers the rest.
                    if let Err(requeue_err) = dev.enqueue(claim.index) {
                        warn!(%requeue_err, "failed to requeue buffer after poll error");
                    }
                    return Err(err);
                }
            }
        }

        let Some(slot) = dev.buffer(claim.index) else {
            return Err(Error::Device {
                op: "VIDIOC_DQBUF",
                source: io::Error::new(
                    io::ErrorKind::InvalidData,
                    "driver returned a buffer index outside the mapped pool",
                ),
            });
        };

        self.locked = Some(claim);

        // The driver may use less than the mapped region; never hand out
        // more than the slot actually holds.
        let length = claim.bytesused.min(slot.len());
        Ok(Frame {
            data: &slot[..length],
            meta: claim.meta,
        })
    }

    /// Returns the locked frame's buffer to the driver.
    ///
    /// No-op when nothing is locked, so it is always safe to call.
    pub fn unlock(&mut self) -> Result<()> {
        let Some(claim) = self.locked.take() else {
            return Ok(());
        };
        let Some(dev) = self.dev.as_mut() else {
            return Ok(());
        };

        dev.enqueue(claim.index)?;
        trace!(index = claim.index, "requeued buffer");
        Ok(())
    }

    /// Tears the session down.
    ///
    /// Unwinds in strict reverse bring-up order, each step guarded by its
    /// own flag: requeue an outstanding locked buffer, unmap the pool,
    /// stop streaming, close the device. Safe to call in any state and
    /// any number of times; failures along the way are logged, never
    /// returned. Also runs on drop.
    pub fn close(&mut self) {
        if let Some(claim) = self.locked.take() {
            if self.streaming {
                if let Some(dev) = self.dev.as_mut() {
                    if let Err(err) = dev.enqueue(claim.index) {
                        warn!(%err, index = claim.index, "failed to requeue locked buffer");
                    }
                }
            }
        }

        if self.mapped {
            if let Some(dev) = self.dev.as_mut() {
                dev.unmap_buffers();
            }
            self.mapped = false;
            self.buffers = 0;
        }

        if self.streaming {
            if let Some(dev) = self.dev.as_mut() {
                if let Err(err) = dev.stream_off() {
                    warn!(%err, "failed to stop stream");
                }
            }
            self.streaming = false;
        }

        if self.dev.take().is_some() {
            debug!("capture session closed");
        }
        self.format = None;
    }

    /// The negotiated format, while the session is open
    pub fn format(&self) -> Option<Format> {
        self.format
    }

    /// Number of buffers in the mapped pool, 0 when unmapped
    pub fn buffers(&self) -> u32 {
        self.buffers
    }

    /// Whether the capture stream is running
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Whether a frame is currently locked
    pub fn is_locked(&self) -> bool {
        self.locked.is_some()
    }

    /// Borrows the underlying capture device, while the session is open
    pub fn device(&self) -> Option<&D> {
        self.dev.as_ref()
    }
}

impl<D: CaptureDevice> Drop for Camera<D> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<D: CaptureDevice> fmt::Debug for Camera<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Camera")
            .field("open", &self.dev.is_some())
            .field("format", &self.format)
            .field("buffers", &self.buffers)
            .field("streaming", &self.streaming)
            .field("locked", &self.locked.is_some())
            .finish()
    }
}

fn format_mismatch(requested: &Format, negotiated: &Format) -> Error {
    Error::Device {
        op: "VIDIOC_S_FMT",
        source: io::Error::new(
            io::ErrorKind::Unsupported,
            format!("driver negotiated {negotiated}, requested {requested}"),
        ),
    }
}

fn count_mismatch(requested: u32, granted: u32) -> Error {
    Error::Device {
        op: "VIDIOC_REQBUFS",
        source: io::Error::new(
            io::ErrorKind::InvalidData,
            format!("driver granted {granted} buffers, requested {requested}"),
        ),
    }
}

/// One captured frame, borrowed out of the session's mapped pool.
///
/// The payload is the slice the driver filled for this capture, clamped
/// to the mapped region. Read access only; copy the bytes out to keep
/// them past the borrow.
pub struct Frame<'a> {
    data: &'a [u8],
    meta: Metadata,
}

impl Frame<'_> {
    /// Payload bytes of this capture
    pub fn data(&self) -> &[u8] {
        self.data
    }

    /// Number of payload bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the driver filled any bytes at all
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Driver metadata: sequence number, timestamp, flags
    pub fn meta(&self) -> &Metadata {
        &self.meta
    }

    /// Capture time reported by the driver
    pub fn timestamp(&self) -> Timestamp {
        self.meta.timestamp
    }
}

impl Deref for Frame<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.data
    }
}

impl fmt::Debug for Frame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("len", &self.data.len())
            .field("meta", &self.meta)
            .finish()
    }
}
