use chrono::{DateTime, FixedOffset, Local};

/// Source of "now" for every scan and lifecycle action.
///
/// Engine functions take `now` as an argument; only the host asks a clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

// Local -> FixedOffset, using the system offset at call time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        let local = Local::now();
        local.with_timezone(local.offset())
    }
}

#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_returns_same_instant() {
        let t = DateTime::parse_from_rfc3339("2024-01-01T10:00:00+02:00").unwrap();
        let clock = FixedClock(t);
        assert_eq!(clock.now(), t);
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn system_clock_keeps_local_offset() {
        let now = SystemClock.now();
        assert_eq!(*now.offset(), *Local::now().offset());
    }
}
