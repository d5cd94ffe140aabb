use std::{fmt, time};

use libc::{suseconds_t, time_t, timeval};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
/// Capture timestamp with a seconds and a microseconds component.
///
/// Ordering is chronological, so freshness comparisons between frames
/// work directly on the timestamps.
pub struct Timestamp {
    pub sec: time_t,
    pub usec: time_t,
}

impl Timestamp {
    /// Returns a timestamp representation
    ///
    /// # Arguments
    ///
    /// * `sec` - Seconds
    /// * `usec` - Microseconds
    ///
    /// # Example
    ///
    /// ```
    /// use usbcam::Timestamp;
    /// let ts = Timestamp::new(5, 5);
    /// ```
    pub fn new(sec: time_t, usec: time_t) -> Self {
        Timestamp { sec, usec }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let floating: f64 = self.sec as f64 + self.usec as f64 / 1_000_000.0;
        write!(f, "{} [s]", floating)
    }
}

impl From<timeval> for Timestamp {
    fn from(tv: timeval) -> Self {
        Timestamp {
            sec: tv.tv_sec,
            usec: tv.tv_usec as time_t,
        }
    }
}

impl From<Timestamp> for timeval {
    fn from(ts: Timestamp) -> Self {
        timeval {
            tv_sec: ts.sec,
            tv_usec: ts.usec as suseconds_t,
        }
    }
}

impl From<time::Duration> for Timestamp {
    fn from(duration: time::Duration) -> Self {
        Timestamp::new(
            duration.as_secs() as time_t,
            duration.subsec_micros() as time_t,
        )
    }
}

impl From<Timestamp> for time::Duration {
    fn from(ts: Timestamp) -> Self {
        time::Duration::new(ts.sec as u64, ts.usec as u32 * 1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chronological_ordering() {
        let early = Timestamp::new(1, 999_999);
        let later = Timestamp::new(2, 0);
        assert!(early < later);
        assert!(Timestamp::new(2, 1) > later);
        assert_eq!(later, Timestamp::new(2, 0));
    }

    #[test]
    fn duration_round_trip() {
        let ts = Timestamp::new(3, 250_000);
        let duration = time::Duration::from(ts);
        assert_eq!(duration, time::Duration::from_micros(3_250_000));
        assert_eq!(Timestamp::from(duration), ts);
    }
}
