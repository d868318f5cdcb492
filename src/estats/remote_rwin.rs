//! `TcpConnectionEstatsObsRec`: the receive-window counters the *peer*
//! reports back to this host — structurally the mirror of [`super::local_rwin`]
//! but over `CurRwinRcvd`/`MinRwinRcvd`/`MaxRwinRcvd`, not inverted or
//! otherwise transformed.

use crate::error::Result;
use crate::history::{Kind, MetricHistory, Width};
use crate::os::{EstatsSource, RawRow};

use super::{Family, Tracker};

/// `TCP_ESTATS_OBS_REC_RW_v0`.
#[repr(C)]
#[allow(non_snake_case)]
struct ObsRecRw {
    EnableCollection: u8,
}

/// `TCP_ESTATS_OBS_REC_ROD_v0`, truncated to the three fields read.
#[repr(C)]
#[allow(non_snake_case, dead_code)]
struct ObsRecRod {
    CurRwinRcvd: u32,
    MaxRwinRcvd: u32,
    MinRwinRcvd: u32,
}

#[derive(Debug)]
pub struct RemoteRwinTracker {
    cur: MetricHistory,
    min: MetricHistory,
    max: MetricHistory,
}

impl RemoteRwinTracker {
    pub fn new() -> Self {
        Self {
            cur: MetricHistory::new(Kind::Instantaneous, Width::U32),
            min: MetricHistory::new(Kind::Instantaneous, Width::U32),
            max: MetricHistory::new(Kind::Instantaneous, Width::U32),
        }
    }
}

impl Tracker for RemoteRwinTracker {
    fn family(&self) -> Family {
        Family::RemoteRwin
    }

    fn start(&mut self, source: &dyn EstatsSource, row: &RawRow) -> Result<()> {
        let rw = ObsRecRw { EnableCollection: 1 };
        let rw_buf = unsafe {
            std::slice::from_raw_parts(&rw as *const ObsRecRw as *const u8, std::mem::size_of::<ObsRecRw>())
        };
        let status = source.set_estats(row, Family::RemoteRwin, rw_buf);
        super::classify_status(status, row, Family::RemoteRwin)
    }

    fn update(&mut self, source: &dyn EstatsSource, row: &RawRow, max_history: usize) -> Result<()> {
        let mut rod = ObsRecRod {
            CurRwinRcvd: 0xFFFF_FFFF,
            MaxRwinRcvd: 0xFFFF_FFFF,
            MinRwinRcvd: 0xFFFF_FFFF,
        };
        let rod_buf = unsafe {
            std::slice::from_raw_parts_mut(&mut rod as *mut ObsRecRod as *mut u8, std::mem::size_of::<ObsRecRod>())
        };
        let status = source.get_estats(row, Family::RemoteRwin, None, None, Some(rod_buf));
        super::classify_status(status, row, Family::RemoteRwin)?;

        self.cur.push_raw(rod.CurRwinRcvd as u64, max_history);
        self.min.push_raw(rod.MinRwinRcvd as u64, max_history);
        self.max.push_raw(rod.MaxRwinRcvd as u64, max_history);
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
        vec![("CurRwinRcvd", &self.cur), ("MinRwinRcvd", &self.min), ("MaxRwinRcvd", &self.max)]
    }
}
