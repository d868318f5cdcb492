//! `TcpConnectionEstatsSynOpts`: two instantaneous metrics, no enable flag,
//! read via the static (ROS) accessor instead of the dynamic (ROD) one.

use crate::error::Result;
use crate::history::{Kind, MetricHistory, Width};
use crate::os::{EstatsSource, RawRow};

use super::{Family, Tracker};

/// `TCP_ESTATS_SYN_OPTS_ROS_v0`. `ActiveOpen` is read back but unused, same
/// as the original — kept here purely so the struct matches the OS layout.
#[repr(C)]
#[allow(non_snake_case, dead_code)]
struct SynOptsRos {
    ActiveOpen: u32,
    MssRcvd: u32,
    MssSent: u32,
}

#[derive(Debug)]
pub struct SynOptsTracker {
    mss_rcvd: MetricHistory,
    mss_sent: MetricHistory,
}

impl SynOptsTracker {
    pub fn new() -> Self {
        Self {
            mss_rcvd: MetricHistory::new(Kind::Instantaneous, Width::U32),
            mss_sent: MetricHistory::new(Kind::Instantaneous, Width::U32),
        }
    }

    /// SYN-option MSS never changes over a connection's life — query once.
    fn already_latched(&self) -> bool {
        self.mss_rcvd.last().unwrap_or(0) != 0
    }
}

impl Tracker for SynOptsTracker {
    fn family(&self) -> Family {
        Family::SynOpts
    }

    fn start(&mut self, _source: &dyn EstatsSource, _row: &RawRow) -> Result<()> {
        // Always on; there is no RW block to enable.
        Ok(())
    }

    fn update(&mut self, source: &dyn EstatsSource, row: &RawRow, max_history: usize) -> Result<()> {
        if self.already_latched() {
            return Ok(());
        }

        let mut ros = SynOptsRos {
            ActiveOpen: 0xFFFF_FFFF,
            MssRcvd: 0xFFFF_FFFF,
            MssSent: 0xFFFF_FFFF,
        };
        let ros_buf = unsafe {
            std::slice::from_raw_parts_mut(
                &mut ros as *mut SynOptsRos as *mut u8,
                std::mem::size_of::<SynOptsRos>(),
            )
        };
        let status = source.get_estats(row, Family::SynOpts, None, Some(ros_buf), None);
        super::classify_status(status, row, Family::SynOpts)?;

        self.mss_rcvd.push_raw(ros.MssRcvd as u64, max_history);
        self.mss_sent.push_raw(ros.MssSent as u64, max_history);
        Ok(())
    }

    fn format_row(&self) -> String {
        format!(
            "{},{}",
            self.mss_rcvd.last().unwrap_or(0),
            self.mss_sent.last().unwrap_or(0)
        )
    }

    fn metrics(&self) -> Vec<(&'static str, &MetricHistory)> {
        vec![("MssRcvd", &self.mss_rcvd), ("MssSent", &self.mss_sent)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::os::mock::{MockReading, MockSource};
    use crate::os::test_support::{struct_bytes, v4_row};

    #[test]
    fn latches_after_first_successful_read() {
        let r = v4_row(12345, 80);
        let identity = r.identity();
        let raw_row = RawRow::V4(r);
        let source = MockSource::new();

        let ros = SynOptsRos {
            ActiveOpen: 1,
            MssRcvd: 1460,
            MssSent: 1400,
        };
        let ros_bytes = unsafe { struct_bytes(&ros) };
        source.queue_reading(
            identity,
            Family::SynOpts,
            MockReading {
                status: 0,
                rw: None,
                ros: Some(ros_bytes),
                rod: None,
            },
        );

        let mut tracker = SynOptsTracker::new();
        tracker.update(&source, &raw_row, 10).unwrap();
        assert_eq!(tracker.mss_rcvd.last(), Some(1460));
        assert_eq!(tracker.mss_sent.last(), Some(1400));

        // Second update: no canned reading queued, but it shouldn't matter —
        // the tracker must not even attempt another query.
        tracker.update(&source, &raw_row, 10).unwrap();
        assert_eq!(tracker.mss_rcvd.last(), Some(1460));
    }
}
