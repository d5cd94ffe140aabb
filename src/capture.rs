use crate::buffer::Metadata;
use crate::error::Result;
use crate::format::Format;

/// One dequeued buffer: the token for a kernel buffer currently owned by
/// the consumer side.
#[derive(Debug, Clone, Copy)]
pub struct Dequeued {
    /// Pool slot index
    pub index: usize,
    /// Bytes the driver filled for this capture
    pub bytesused: usize,
    /// Driver metadata (sequence number, timestamp, flags)
    pub meta: Metadata,
}

/// Low-level capture protocol a [`Camera`](crate::Camera) session runs on.
///
/// [`Device`](crate::Device) is the V4L2 implementation. The trait exists
/// so other sources can slot in underneath a session; the crate's own test
/// suite drives the lifecycle against a scripted implementation.
///
/// Implementations are stateful: `map_buffers` establishes the pool that
/// `buffer`, `enqueue` and `dequeue` index into.
pub trait CaptureDevice {
    /// Negotiates `format` with the driver and returns what it actually
    /// chose, which may differ from the request.
    fn set_format(&mut self, format: &Format) -> Result<Format>;

    /// Requests and memory-maps `count` capture buffers, returning the
    /// granted count, which may also differ from the request.
    fn map_buffers(&mut self, count: u32) -> Result<u32>;

    /// Unmaps the buffer pool. Infallible and tolerant of partial state.
    fn unmap_buffers(&mut self);

    /// Borrows the mapped bytes of pool slot `index`.
    fn buffer(&self, index: usize) -> Option<&[u8]>;

    /// Starts the capture stream.
    fn stream_on(&mut self) -> Result<()>;

    /// Stops the capture stream; in-flight buffers fall back to the driver.
    fn stream_off(&mut self) -> Result<()>;

    /// Hands pool slot `index` to the driver for filling.
    fn enqueue(&mut self, index: usize) -> Result<()>;

    /// Takes the oldest filled buffer back from the driver, blocking until
    /// one is available.
    fn dequeue(&mut self) -> Result<Dequeued>;

    /// Whether a filled buffer is available right now. Never blocks.
    fn ready(&self) -> Result<bool>;
}
