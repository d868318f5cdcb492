//! `TcpConnectionEstatsSndCong`: the sender congestion-control counters.
//! `CurCwnd` is instantaneous; the six `SndLim*` counters are cumulative.

use crate::error::Result;
use crate::history::{Kind, MetricHistory, Width};
use crate::os::{EstatsSource, RawRow};

use super::{Family, Tracker};

/// `TCP_ESTATS_SND_CONG_RW_v0`.
#[repr(C)]
#[allow(non_snake_case)]
struct SndCongRw {
    EnableCollection: u8,
}

/// `TCP_ESTATS_SND_CONG_ROD_v0`, in declaration order — the `SndLimBytes*`
/// fields are `SIZE_T` (8 bytes on the 64-bit targets this crate ships for).
#[repr(C)]
#[allow(non_snake_case, dead_code)]
struct SndCongRod {
    SndLimTransRwin: u32,
    SndLimTimeRwin: u32,
    SndLimBytesRwin: u64,
    SndLimTransCwnd: u32,
    SndLimTimeCwnd: u32,
    SndLimBytesCwnd: u64,
    SndLimTransSnd: u32,
    SndLimTimeSnd: u32,
    SndLimBytesSnd: u64,
    SlowStart: u32,
    CongAvoid: u32,
    OtherReductions: u32,
    CurCwnd: u32,
    MaxSsCwnd: u32,
    MaxCaCwnd: u32,
    CurSsthresh: u32,
    MaxSsthresh: u32,
    MinSsthresh: u32,
}

#[derive(Debug)]
pub struct SendCongestionTracker {
    cur_cwnd: MetricHistory,
    snd_lim_bytes_rwin: MetricHistory,
    snd_lim_bytes_snd: MetricHistory,
    snd_lim_bytes_cwnd: MetricHistory,
    snd_lim_trans_rwin: MetricHistory,
    snd_lim_trans_snd: MetricHistory,
    snd_lim_trans_cwnd: MetricHistory,
}

impl SendCongestionTracker {
    pub fn new() -> Self {
        Self {
            cur_cwnd: MetricHistory::new(Kind::Instantaneous, Width::U32),
            snd_lim_bytes_rwin: MetricHistory::new(Kind::Cumulative, Width::U64),
            snd_lim_bytes_snd: MetricHistory::new(Kind::Cumulative, Width::U64),
            snd_lim_bytes_cwnd: MetricHistory::new(Kind::Cumulative, Width::U64),
            snd_lim_trans_rwin: MetricHistory::new(Kind::Cumulative, Width::U32),
            snd_lim_trans_snd: MetricHistory::new(Kind::Cumulative, Width::U32),
            snd_lim_trans_cwnd: MetricHistory::new(Kind::Cumulative, Width::U32),
        }
    }
}

impl Tracker for SendCongestionTracker {
    fn family(&self) -> Family {
        Family::SendCongestion
    }

    fn start(&mut self, source: &dyn EstatsSource, row: &RawRow) -> Result<()> {
        let rw = SndCongRw { EnableCollection: 1 };
        let rw_buf = unsafe {
            std::slice::from_raw_parts(&rw as *const SndCongRw as *const u8, std::mem::size_of::<SndCongRw>())
        };
        let status = source.set_estats(row, Family::SendCongestion, rw_buf);
        super::classify_status(status, row, Family::SendCongestion)
    }

    fn update(&mut self, source: &dyn EstatsSource, row: &RawRow, max_history: usize) -> Result<()> {
        let mut rod: SndCongRod = unsafe { std::mem::zeroed() };
        fill_invalid(&mut rod);
        let rod_buf = unsafe {
            std::slice::from_raw_parts_mut(
                &mut rod as *mut SndCongRod as *mut u8,
                std::mem::size_of::<SndCongRod>(),
            )
        };
        let status = source.get_estats(row, Family::SendCongestion, None, None, Some(rod_buf));
        super::classify_status(status, row, Family::SendCongestion)?;

        self.cur_cwnd.push_raw(rod.CurCwnd as u64, max_history);
        self.snd_lim_bytes_rwin.push_raw(rod.SndLimBytesRwin, max_history);
        self.snd_lim_bytes_snd.push_raw(rod.SndLimBytesSnd, max_history);
        self.snd_lim_bytes_cwnd.push_raw(rod.SndLimBytesCwnd, max_history);
        self.snd_lim_trans_rwin.push_raw(rod.SndLimTransRwin as u64, max_history);
        self.snd_lim_trans_snd.push_raw(rod.SndLimTransSnd as u64, max_history);
        self.snd_lim_trans_cwnd.push_raw(rod.SndLimTransCwnd as u64, max_history);
        Ok(())
    }

    fn format_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{}",
            self.cur_cwnd.last().unwrap_or(0),
            self.snd_lim_trans_rwin.last().unwrap_or(0),
            self.snd_lim_trans_snd.last().unwrap_or(0),
            self.snd_lim_trans_cwnd.last().unwrap_or(0),
            self.snd_lim_bytes_rwin.last().unwrap_or(0),
            self.snd_lim_bytes_snd.last().unwrap_or(0),
            self.snd_lim_bytes_cwnd.last().unwrap_or(0),
        )
    }

    fn metrics(&self) -> Vec<(&'static str, &MetricHistory)> {
        vec![
            ("CurCwnd", &self.cur_cwnd),
            ("SndLimBytesRwin", &self.snd_lim_bytes_rwin),
            ("SndLimBytesSnd", &self.snd_lim_bytes_snd),
            ("SndLimBytesCwnd", &self.snd_lim_bytes_cwnd),
            ("SndLimTransRwin", &self.snd_lim_trans_rwin),
            ("SndLimTransSnd", &self.snd_lim_trans_snd),
            ("SndLimTransCwnd", &self.snd_lim_trans_cwnd),
        ]
    }
}

/// `FillMemory(&Rod, sizeof Rod, -1)` in the original — set every byte to
/// `0xFF` so an untouched field reads as the all-ones invalid sentinel.
fn fill_invalid(rod: &mut SndCongRod) {
    unsafe {
        std::ptr::write_bytes(rod as *mut SndCongRod, 0xFF, 1);
    }
}
