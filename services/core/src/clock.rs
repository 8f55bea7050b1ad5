//! Wall-clock source for generation timestamps.

use chrono::{Local, NaiveDateTime};

/// Format of the `data` element and of archive names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    /// Current instant as `YYYYMMDDHHMMSS`.
    fn timestamp(&self) -> String {
        self.now().format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Local time of the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
