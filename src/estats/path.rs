//! `TcpConnectionEstatsPath`: round-trip and retransmission counters.
//! `CurRto`, `SmoothedRtt`, and `CurMss` are instantaneous; the rest are
//! cumulative.

use crate::error::Result;
use crate::history::{Kind, MetricHistory, Width};
use crate::os::{EstatsSource, RawRow};

use super::{Family, Tracker};

/// `TCP_ESTATS_PATH_RW_v0`.
#[repr(C)]
#[allow(non_snake_case)]
struct PathRw {
    EnableCollection: u8,
}

/// `TCP_ESTATS_PATH_ROD_v0`, truncated to the leading fields this crate
/// reads — `CurMss` is the last field consumed, everything past it in the
/// real struct (send-limited transition counters, RTT variance) is unused.
#[repr(C)]
#[allow(non_snake_case, dead_code)]
struct PathRod {
    FastRetran: u32,
    Timeouts: u32,
    SubsequentTimeouts: u32,
    CurTimeoutCount: u32,
    AbruptTimeouts: u32,
    PktsRetrans: u32,
    BytesRetrans: u32,
    DupAcksIn: u32,
    SacksRcvd: u32,
    SackShiftedBlocks: u32,
    PktsOut: u32,
    CurRto: u32,
    MaxRto: u32,
    MinRto: u32,
    CurMss: u32,
    MaxMss: u32,
    MinMss: u32,
    CongSignals: u32,
    SmoothedRtt: u32,
}

#[derive(Debug)]
pub struct PathTracker {
    cur_rto: MetricHistory,
    smoothed_rtt: MetricHistory,
    bytes_retrans: MetricHistory,
    dup_acks_in: MetricHistory,
    sacks_rcvd: MetricHistory,
    cong_signals: MetricHistory,
    cur_mss: MetricHistory,
}

impl PathTracker {
    pub fn new() -> Self {
        Self {
            cur_rto: MetricHistory::new(Kind::Instantaneous, Width::U32),
            smoothed_rtt: MetricHistory::new(Kind::Instantaneous, Width::U32),
            bytes_retrans: MetricHistory::new(Kind::Cumulative, Width::U32),
            dup_acks_in: MetricHistory::new(Kind::Cumulative, Width::U32),
            sacks_rcvd: MetricHistory::new(Kind::Cumulative, Width::U32),
            cong_signals: MetricHistory::new(Kind::Cumulative, Width::U32),
            cur_mss: MetricHistory::new(Kind::Instantaneous, Width::U32),
        }
    }
}

impl Tracker for PathTracker {
    fn family(&self) -> Family {
        Family::Path
    }

    fn start(&mut self, source: &dyn EstatsSource, row: &RawRow) -> Result<()> {
        let rw = PathRw { EnableCollection: 1 };
        let rw_buf = unsafe {
            std::slice::from_raw_parts(&rw as *const PathRw as *const u8, std::mem::size_of::<PathRw>())
        };
        let status = source.set_estats(row, Family::Path, rw_buf);
        super::classify_status(status, row, Family::Path)
    }

    fn update(&mut self, source: &dyn EstatsSource, row: &RawRow, max_history: usize) -> Result<()> {
        let mut rod: PathRod = unsafe { std::mem::zeroed() };
        unsafe { std::ptr::write_bytes(&mut rod as *mut PathRod, 0xFF, 1) };
        let rod_buf = unsafe {
            std::slice::from_raw_parts_mut(&mut rod as *mut PathRod as *mut u8, std::mem::size_of::<PathRod>())
        };
        let status = source.get_estats(row, Family::Path, None, None, Some(rod_buf));
        super::classify_status(status, row, Family::Path)?;

        self.cur_rto.push_raw(rod.CurRto as u64, max_history);
        self.smoothed_rtt.push_raw(rod.SmoothedRtt as u64, max_history);
        self.bytes_retrans.push_raw(rod.BytesRetrans as u64, max_history);
        self.dup_acks_in.push_raw(rod.DupAcksIn as u64, max_history);
        self.sacks_rcvd.push_raw(rod.SacksRcvd as u64, max_history);
        self.cong_signals.push_raw(rod.CongSignals as u64, max_history);
        self.cur_mss.push_raw(rod.CurMss as u64, max_history);
        Ok(())
    }

    fn format_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{}",
            self.bytes_retrans.last().unwrap_or(0),
            self.dup_acks_in.last().unwrap_or(0),
            self.sacks_rcvd.last().unwrap_or(0),
            self.cong_signals.last().unwrap_or(0),
            self.cur_mss.last().unwrap_or(0),
            self.cur_rto.last().unwrap_or(0),
            self.smoothed_rtt.last().unwrap_or(0),
        )
    }

    fn metrics(&self) -> Vec<(&'static str, &MetricHistory)> {
        vec![
            ("CurRto", &self.cur_rto),
            ("SmoothedRtt", &self.smoothed_rtt),
            ("BytesRetrans", &self.bytes_retrans),
            ("DupAcksIn", &self.dup_acks_in),
            ("SacksRcvd", &self.sacks_rcvd),
            ("CongSignals", &self.cong_signals),
            ("CurMss", &self.cur_mss),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::os::mock::{MockReading, MockSource};
    use crate::os::test_support::v4_row;

    fn rod_bytes(cur_rto: u32, bytes_retrans: u32, cur_mss: u32) -> Vec<u8> {
        let mut rod: PathRod = unsafe { std::mem::zeroed() };
        unsafe { std::ptr::write_bytes(&mut rod as *mut PathRod, 0xFF, 1) };
        rod.CurRto = cur_rto;
        rod.BytesRetrans = bytes_retrans;
        rod.CurMss = cur_mss;
        unsafe {
            std::slice::from_raw_parts(&rod as *const PathRod as *const u8, std::mem::size_of::<PathRod>()).to_vec()
        }
    }

    #[test]
    fn mixed_instantaneous_and_cumulative_metrics() {
        let r = v4_row(2222, 443);
        let identity = r.identity();
        let raw_row = RawRow::V4(r);
        let source = MockSource::new();

        source.queue_reading(
            identity,
            Family::Path,
            MockReading { status: 0, rw: None, ros: None, rod: Some(rod_bytes(200, 1000, 1460)) },
        );
        source.queue_reading(
            identity,
            Family::Path,
            MockReading { status: 0, rw: None, ros: None, rod: Some(rod_bytes(180, 1500, 1460)) },
        );

        let mut tracker = PathTracker::new();
        tracker.update(&source, &raw_row, 10).unwrap();
        tracker.update(&source, &raw_row, 10).unwrap();

        assert_eq!(tracker.cur_rto.last(), Some(180)); // instantaneous
        assert_eq!(tracker.bytes_retrans.last(), Some(500)); // cumulative delta
        assert_eq!(tracker.cur_mss.last(), Some(1460));
    }
}
