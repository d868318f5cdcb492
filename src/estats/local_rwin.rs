//! `TcpConnectionEstatsRec`: the receive-window counters this host reports
//! to its peer. All three metrics are instantaneous; an untouched field
//! renders as `(bad)` rather than `0` so it can't be mistaken for a real
//! zero-size window.

use crate::error::Result;
use crate::history::{Kind, MetricHistory, Width};
use crate::os::{EstatsSource, RawRow};

use super::{Family, Tracker};

/// `TCP_ESTATS_REC_RW_v0`.
#[repr(C)]
#[allow(non_snake_case)]
struct RecRw {
    EnableCollection: u8,
}

/// `TCP_ESTATS_REC_ROD_v0`, truncated to the three fields read.
#[repr(C)]
#[allow(non_snake_case, dead_code)]
struct RecRod {
    CurRwinSent: u32,
    MaxRwinSent: u32,
    MinRwinSent: u32,
}

#[derive(Debug)]
pub struct LocalRwinTracker {
    cur: MetricHistory,
    min: MetricHistory,
    max: MetricHistory,
}

impl LocalRwinTracker {
    pub fn new() -> Self {
        Self {
            cur: MetricHistory::new(Kind::Instantaneous, Width::U32),
            min: MetricHistory::new(Kind::Instantaneous, Width::U32),
            max: MetricHistory::new(Kind::Instantaneous, Width::U32),
        }
    }
}

impl Tracker for LocalRwinTracker {
    fn family(&self) -> Family {
        Family::LocalRwin
    }

    fn start(&mut self, source: &dyn EstatsSource, row: &RawRow) -> Result<()> {
        let rw = RecRw { EnableCollection: 1 };
        let rw_buf =
            unsafe { std::slice::from_raw_parts(&rw as *const RecRw as *const u8, std::mem::size_of::<RecRw>()) };
        let status = source.set_estats(row, Family::LocalRwin, rw_buf);
        super::classify_status(status, row, Family::LocalRwin)
    }

    fn update(&mut self, source: &dyn EstatsSource, row: &RawRow, max_history: usize) -> Result<()> {
        let mut rod = RecRod {
            CurRwinSent: 0xFFFF_FFFF,
            MaxRwinSent: 0xFFFF_FFFF,
            MinRwinSent: 0xFFFF_FFFF,
        };
        let rod_buf = unsafe {
            std::slice::from_raw_parts_mut(&mut rod as *mut RecRod as *mut u8, std::mem::size_of::<RecRod>())
        };
        let status = source.get_estats(row, Family::LocalRwin, None, None, Some(rod_buf));
        super::classify_status(status, row, Family::LocalRwin)?;

        self.cur.push_raw(rod.CurRwinSent as u64, max_history);
        self.min.push_raw(rod.MinRwinSent as u64, max_history);
        self.max.push_raw(rod.MaxRwinSent as u64, max_history);
        Ok(())
    }

    fn format_row(&self) -> String {
        format!(
            "{},{},{}",
            self.cur.format_last_or_bad(),
            self.min.format_last_or_bad(),
            self.max.format_last_or_bad(),
        )
    }

    fn metrics(&self) -> Vec<(&'static str, &MetricHistory)> {
        vec![("CurRwinSent", &self.cur), ("MinRwinSent", &self.min), ("MaxRwinSent", &self.max)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::os::mock::{MockReading, MockSource};
    use crate::os::test_support::{struct_bytes, v4_row};

    #[test]
    fn untouched_metric_renders_as_bad() {
        let tracker = LocalRwinTracker::new();
        assert_eq!(tracker.format_row(), "(bad),(bad),(bad)");
    }

    #[test]
    fn valid_reading_overrides_bad_placeholder() {
        let r = v4_row(3333, 80);
        let identity = r.identity();
        let raw_row = RawRow::V4(r);
        let source = MockSource::new();

        let rod = RecRod { CurRwinSent: 65_536, MaxRwinSent: 131_072, MinRwinSent: 8_192 };
        source.queue_reading(
            identity,
            Family::LocalRwin,
            MockReading { status: 0, rw: None, ros: None, rod: Some(unsafe { struct_bytes(&rod) }) },
        );

        let mut tracker = LocalRwinTracker::new();
        tracker.update(&source, &raw_row, 10).unwrap();
        assert_eq!(tracker.format_row(), "65536,8192,131072");
    }
}
