//! `TcpConnectionEstatsData`: raw byte counters. Both metrics are cumulative
//! — the OS reports lifetime totals, we store per-tick deltas.

use crate::error::Result;
use crate::history::{Kind, MetricHistory, Width};
use crate::os::{EstatsSource, RawRow};

use super::{Family, Tracker};

/// `TCP_ESTATS_DATA_RW_v0`.
#[repr(C)]
#[allow(non_snake_case)]
struct DataRw {
    EnableCollection: u8,
}

/// `TCP_ESTATS_DATA_ROD_v0`. Only the leading two fields are read; the rest
/// of the real struct (segment counts, sequence numbers) goes unused.
#[repr(C)]
#[allow(non_snake_case, dead_code)]
struct DataRod {
    DataBytesOut: u64,
    DataBytesIn: u64,
}

#[derive(Debug)]
pub struct DataTracker {
    bytes_in: MetricHistory,
    bytes_out: MetricHistory,
}

impl DataTracker {
    pub fn new() -> Self {
        Self {
            bytes_in: MetricHistory::new(Kind::Cumulative, Width::U64),
            bytes_out: MetricHistory::new(Kind::Cumulative, Width::U64),
        }
    }
}

impl Tracker for DataTracker {
    fn family(&self) -> Family {
        Family::Data
    }

    fn start(&mut self, source: &dyn EstatsSource, row: &RawRow) -> Result<()> {
        let rw = DataRw { EnableCollection: 1 };
        let rw_buf = unsafe {
            std::slice::from_raw_parts(&rw as *const DataRw as *const u8, std::mem::size_of::<DataRw>())
        };
        let status = source.set_estats(row, Family::Data, rw_buf);
        super::classify_status(status, row, Family::Data)
    }

    fn update(&mut self, source: &dyn EstatsSource, row: &RawRow, max_history: usize) -> Result<()> {
        let mut rod = DataRod {
            DataBytesOut: 0xFFFF_FFFF_FFFF_FFFF,
            DataBytesIn: 0xFFFF_FFFF_FFFF_FFFF,
        };
        let rod_buf = unsafe {
            std::slice::from_raw_parts_mut(&mut rod as *mut DataRod as *mut u8, std::mem::size_of::<DataRod>())
        };
        let status = source.get_estats(row, Family::Data, None, None, Some(rod_buf));
        super::classify_status(status, row, Family::Data)?;

        self.bytes_in.push_raw(rod.DataBytesIn, max_history);
        self.bytes_out.push_raw(rod.DataBytesOut, max_history);
        Ok(())
    }

    fn format_row(&self) -> String {
        format!("{},{}", self.bytes_in.last().unwrap_or(0), self.bytes_out.last().unwrap_or(0))
    }

    fn metrics(&self) -> Vec<(&'static str, &MetricHistory)> {
        vec![("DataBytesIn", &self.bytes_in), ("DataBytesOut", &self.bytes_out)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::os::mock::{MockReading, MockSource};
    use crate::os::test_support::{struct_bytes, v4_row};

    #[test]
    fn cumulative_delta_across_two_ticks() {
        let r = v4_row(1234, 80);
        let identity = r.identity();
        let raw_row = RawRow::V4(r);
        let source = MockSource::new();

        for (bytes_in, bytes_out) in [(1_000u64, 2_000u64), (1_500, 2_750)] {
            let rod = DataRod {
                DataBytesOut: bytes_out,
                DataBytesIn: bytes_in,
            };
            source.queue_reading(
                identity,
                Family::Data,
                MockReading {
                    status: 0,
                    rw: None,
                    ros: None,
                    rod: Some(unsafe { struct_bytes(&rod) }),
                },
            );
        }

        let mut tracker = DataTracker::new();
        tracker.update(&source, &raw_row, 10).unwrap();
        assert_eq!(tracker.bytes_in.last(), Some(1_000));
        assert_eq!(tracker.bytes_out.last(), Some(2_000));

        tracker.update(&source, &raw_row, 10).unwrap();
        assert_eq!(tracker.bytes_in.last(), Some(500));
        assert_eq!(tracker.bytes_out.last(), Some(750));
    }
}
