use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::{io, path::Path};

use crate::v4l2::vidioc;

fn transient(err: &io::Error) -> bool {
    matches!(err.raw_os_error(), Some(libc::EINTR) | Some(libc::EAGAIN))
}

/// Opens the device node at `path`.
///
/// Returns the file descriptor on success. Interrupted attempts are
/// retried; any other failure reports the OS error, aka errno on Linux.
pub fn open<P: AsRef<Path>>(path: P, flags: i32) -> io::Result<std::os::raw::c_int> {
    let c_path = CString::new(path.as_ref().as_os_str().as_bytes())?;

    loop {
        let fd = unsafe { libc::open(c_path.as_ptr(), flags) };
        if fd != -1 {
            return Ok(fd);
        }

        let err = io::Error::last_os_error();
        if !transient(&err) {
            return Err(err);
        }
    }
}

/// Closes a previously opened file descriptor.
///
/// Never retried: on Linux the descriptor is gone even when close(2)
/// reports an error.
pub fn close(fd: std::os::raw::c_int) -> io::Result<()> {
    let ret = unsafe { libc::close(fd) };

    if ret == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Issues an ioctl request on `fd`.
///
/// EINTR and EAGAIN are retried transparently, so callers only ever see
/// real device errors.
///
/// # Safety
///
/// `argp` must point to a live instance of the argument type the request
/// code was built over.
pub unsafe fn ioctl(
    fd: std::os::raw::c_int,
    request: vidioc::_IOC_TYPE,
    argp: *mut std::os::raw::c_void,
) -> io::Result<()> {
    loop {
        /*
         * The libc crate (and libc itself!) defines ioctl() with different,
         * incompatible argument types across platforms. Going through
         * syscall() sidesteps that without conditional compilation.
         * Details: https://github.com/rust-lang/libc/issues/1036
         */
        let ret = libc::syscall(libc::SYS_ioctl, fd, request, argp) as std::os::raw::c_int;
        if ret != -1 {
            return Ok(());
        }

        let err = io::Error::last_os_error();
        if !transient(&err) {
            return Err(err);
        }
    }
}

/// Polls `fd` for `events`, waiting at most `timeout` milliseconds.
///
/// A zero timeout makes this a pure readiness probe. Returns the number
/// of ready descriptors (0 or 1). EINTR is retried.
pub fn poll(
    fd: std::os::raw::c_int,
    events: std::os::raw::c_short,
    timeout: std::os::raw::c_int,
) -> io::Result<i32> {
    let mut fds = [libc::pollfd {
        fd,
        events,
        revents: 0,
    }];

    loop {
        let ret = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout) };
        if ret != -1 {
            return Ok(ret);
        }

        let err = io::Error::last_os_error();
        if !transient(&err) {
            return Err(err);
        }
    }
}

/// Maps `length` bytes of the device memory behind `fd` at `offset`.
///
/// # Safety
///
/// The returned pointer is only valid until munmap; the caller owns the
/// mapping lifetime.
pub unsafe fn mmap(
    start: *mut std::os::raw::c_void,
    length: usize,
    prot: std::os::raw::c_int,
    flags: std::os::raw::c_int,
    fd: std::os::raw::c_int,
    offset: libc::off_t,
) -> io::Result<*mut std::os::raw::c_void> {
    let ret = libc::mmap(start, length, prot, flags, fd, offset);
    if ret == libc::MAP_FAILED {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret)
    }
}

/// Unmaps a region previously obtained through [`mmap`].
///
/// # Safety
///
/// `start` and `length` must describe exactly one live mapping.
pub unsafe fn munmap(start: *mut std::os::raw::c_void, length: usize) -> io::Result<()> {
    let ret = libc::munmap(start, length);
    if ret == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}
