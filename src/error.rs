use std::io;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Capture errors, split by who has to act on them.
///
/// [`Error::Misuse`] means the caller drove the session out of order and
/// will keep failing until the calling code is fixed. [`Error::Device`]
/// means the kernel or the hardware refused an operation; those can be
/// transient (a camera unplugged and replugged) and a long-running caller
/// may reasonably tear the session down and retry.
#[derive(Debug, Error)]
pub enum Error {
    /// A lifecycle precondition did not hold, e.g. acquiring a second
    /// frame while one is still locked.
    #[error("precondition violated: {0}")]
    Misuse(&'static str),

    /// A device primitive failed. `op` names the failing call, the source
    /// carries the OS error description.
    #[error("{op}: {source}")]
    Device {
        op: &'static str,
        source: io::Error,
    },
}

impl Error {
    /// Adapter for `map_err` on `io::Result` values: tags the OS error
    /// with the operation that produced it.
    pub(crate) fn device(op: &'static str) -> impl FnOnce(io::Error) -> Error {
        move |source| Error::Device { op, source }
    }

    pub fn is_misuse(&self) -> bool {
        matches!(self, Error::Misuse(_))
    }

    pub fn is_device(&self) -> bool {
        matches!(self, Error::Device { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let misuse = Error::Misuse("frame already locked");
        assert!(misuse.is_misuse());
        assert!(!misuse.is_device());

        let device = Error::device("VIDIOC_DQBUF")(io::Error::from_raw_os_error(libc::ENODEV));
        assert!(device.is_device());
        assert!(!device.is_misuse());
    }

    #[test]
    fn device_error_names_operation() {
        let err = Error::device("VIDIOC_STREAMON")(io::Error::from_raw_os_error(libc::EIO));
        let msg = err.to_string();
        assert!(msg.contains("VIDIOC_STREAMON"), "unexpected message: {msg}");
    }

    #[test]
    fn source_is_preserved() {
        use std::error::Error as _;

        let err = Error::device("mmap")(io::Error::from_raw_os_error(libc::EINVAL));
        let source = err.source().expect("device errors carry a source");
        let io_err = source.downcast_ref::<io::Error>().unwrap();
        assert_eq!(io_err.raw_os_error(), Some(libc::EINVAL));
    }
}
