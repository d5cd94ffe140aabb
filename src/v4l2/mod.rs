//! Raw V4L2 access: syscall wrappers, request codes and kernel ABI types.

pub mod api;
pub mod vidioc;
pub(crate) mod videodev;

pub use api::*;
