use std::os::raw::c_void;
use std::sync::Arc;
use std::{mem, ptr, slice};

use tracing::{debug, warn};

use crate::device::Handle;
use crate::error::{Error, Result};
use crate::v4l2;
use crate::v4l2::videodev::*;

/// Memory-mapped capture buffer pool.
///
/// Each slot is one kernel-allocated capture buffer mapped into this
/// process. Slot addresses are stable from [`allocate`](Arena::allocate)
/// until [`release`](Arena::release); remaining mappings are released on
/// drop.
#[derive(Debug)]
pub(crate) struct Arena {
    handle: Arc<Handle>,
    bufs: Vec<(*mut c_void, usize)>,
}

impl Arena {
    pub(crate) fn new(handle: Arc<Handle>) -> Self {
        Arena {
            handle,
            bufs: Vec::new(),
        }
    }

    /// Requests `count` buffers from the driver and maps each one.
    ///
    /// Returns the granted count, which the driver may choose differently
    /// from the request. If any step fails, the slots mapped so far are
    /// unmapped before the error returns.
    pub(crate) fn allocate(&mut self, count: u32) -> Result<u32> {
        let mut v4l2_reqbufs: v4l2_requestbuffers = unsafe { mem::zeroed() };
        v4l2_reqbufs.type_ = V4L2_BUF_TYPE_VIDEO_CAPTURE;
        v4l2_reqbufs.count = count;
        v4l2_reqbufs.memory = V4L2_MEMORY_MMAP;
        unsafe {
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_REQBUFS,
                &mut v4l2_reqbufs as *mut _ as *mut std::os::raw::c_void,
            )
            .map_err(Error::device("VIDIOC_REQBUFS"))?;
        }

        for index in 0..v4l2_reqbufs.count {
            let mut v4l2_buf: v4l2_buffer = unsafe { mem::zeroed() };
            v4l2_buf.type_ = V4L2_BUF_TYPE_VIDEO_CAPTURE;
            v4l2_buf.memory = V4L2_MEMORY_MMAP;
            v4l2_buf.index = index;
            let queried = unsafe {
                v4l2::ioctl(
                    self.handle.fd(),
                    v4l2::vidioc::VIDIOC_QUERYBUF,
                    &mut v4l2_buf as *mut _ as *mut std::os::raw::c_void,
                )
                .map_err(Error::device("VIDIOC_QUERYBUF"))
            };
            if let Err(err) = queried {
                self.release();
                return Err(err);
            }

            let length = v4l2_buf.length as usize;
            let offset = unsafe { v4l2_buf.m.offset };
            let mapped = unsafe {
                v4l2::mmap(
                    ptr::null_mut(),
                    length,
                    libc::PROT_READ | libc::PROT_WRITE,
                    libc::MAP_SHARED,
                    self.handle.fd(),
                    offset as libc::off_t,
                )
            };
            match mapped {
                Ok(ptr) => self.bufs.push((ptr, length)),
                Err(err) => {
                    self.release();
                    return Err(Error::device("mmap")(err));
                }
            }
        }

        debug!(granted = v4l2_reqbufs.count, "capture buffer pool mapped");
        Ok(v4l2_reqbufs.count)
    }

    /// Unmaps every slot. No-op on an empty pool.
    ///
    /// munmap failures are logged and skipped so that teardown always runs
    /// to completion; the kernel reclaims the buffers themselves when the
    /// descriptor closes.
    pub(crate) fn release(&mut self) {
        for (ptr, length) in self.bufs.drain(..) {
            if let Err(err) = unsafe { v4l2::munmap(ptr, length) } {
                warn!(%err, "munmap failed during pool release");
            }
        }
    }

    /// Borrows the mapped bytes of slot `index`.
    ///
    /// The caller must only read slots it currently owns (dequeued); the
    /// driver writes into queued slots.
    pub(crate) fn get(&self, index: usize) -> Option<&[u8]> {
        self.bufs
            .get(index)
            .map(|&(ptr, length)| unsafe { slice::from_raw_parts(ptr as *const u8, length) })
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        self.release();
    }
}
