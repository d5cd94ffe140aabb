mod v4l2;

mod arena;

pub mod buffer;

mod camera;
pub use camera::{Camera, Frame};

mod capture;
pub use capture::{CaptureDevice, Dequeued};

mod config;
pub use config::{Config, MAX_BUFFERS};

mod device;
pub use device::{Capabilities, CapabilityFlags, Device};

mod error;
pub use error::{Error, Result};

mod format;
pub use format::Format;

mod fourcc;
pub use fourcc::FourCC;

mod timestamp;
pub use timestamp::Timestamp;
