//! `TcpConnectionEstatsBandwidth`: the one family with two independent
//! enable flags (inbound/outbound) instead of one, and the one family
//! whose original implementation never got past `// TODO: Implement` —
//! that TODO is resolved here.
//!
//! A reading only counts if the query succeeds *and* the RW block read
//! back alongside it shows at least one direction still enabled; the OS
//! is free to silently disable collection mid-connection, and a ROD block
//! read after that happens is stale garbage, not a real zero.

use crate::error::Result;
use crate::history::{Kind, MetricHistory, Width};
use crate::os::{EstatsSource, RawRow};

use super::{Family, Tracker};

const TCP_BOOL_OPT_ENABLED: u32 = 1;

/// `TCP_ESTATS_BANDWIDTH_RW_v0`.
#[repr(C)]
#[allow(non_snake_case)]
struct BandwidthRw {
    EnableCollectionOutbound: u32,
    EnableCollectionInbound: u32,
}

/// `TCP_ESTATS_BANDWIDTH_ROD_v0`.
#[repr(C)]
#[allow(non_snake_case)]
struct BandwidthRod {
    OutboundBandwidth: u64,
    InboundBandwidth: u64,
    OutboundInstability: u64,
    InboundInstability: u64,
    OutboundBandwidthPeaked: u8,
    InboundBandwidthPeaked: u8,
}

#[derive(Debug)]
pub struct BandwidthTracker {
    outbound_bandwidth: MetricHistory,
    inbound_bandwidth: MetricHistory,
    outbound_instability: MetricHistory,
    inbound_instability: MetricHistory,
    outbound_peaked: bool,
    inbound_peaked: bool,
}

impl BandwidthTracker {
    pub fn new() -> Self {
        Self {
            outbound_bandwidth: MetricHistory::new(Kind::Instantaneous, Width::U64),
            inbound_bandwidth: MetricHistory::new(Kind::Instantaneous, Width::U64),
            outbound_instability: MetricHistory::new(Kind::Instantaneous, Width::U64),
            inbound_instability: MetricHistory::new(Kind::Instantaneous, Width::U64),
            outbound_peaked: false,
            inbound_peaked: false,
        }
    }
}

impl Tracker for BandwidthTracker {
    fn family(&self) -> Family {
        Family::Bandwidth
    }

    fn start(&mut self, source: &dyn EstatsSource, row: &RawRow) -> Result<()> {
        let rw = BandwidthRw {
            EnableCollectionOutbound: TCP_BOOL_OPT_ENABLED,
            EnableCollectionInbound: TCP_BOOL_OPT_ENABLED,
        };
        let rw_buf = unsafe {
            std::slice::from_raw_parts(&rw as *const BandwidthRw as *const u8, std::mem::size_of::<BandwidthRw>())
        };
        let status = source.set_estats(row, Family::Bandwidth, rw_buf);
        super::classify_status(status, row, Family::Bandwidth)
    }

    fn update(&mut self, source: &dyn EstatsSource, row: &RawRow, max_history: usize) -> Result<()> {
        let mut rw = BandwidthRw { EnableCollectionOutbound: 0, EnableCollectionInbound: 0 };
        let mut rod = BandwidthRod {
            OutboundBandwidth: 0xFFFF_FFFF_FFFF_FFFF,
            InboundBandwidth: 0xFFFF_FFFF_FFFF_FFFF,
            OutboundInstability: 0xFFFF_FFFF_FFFF_FFFF,
            InboundInstability: 0xFFFF_FFFF_FFFF_FFFF,
            OutboundBandwidthPeaked: 0,
            InboundBandwidthPeaked: 0,
        };
        let rw_buf = unsafe {
            std::slice::from_raw_parts_mut(&mut rw as *mut BandwidthRw as *mut u8, std::mem::size_of::<BandwidthRw>())
        };
        let rod_buf = unsafe {
            std::slice::from_raw_parts_mut(
                &mut rod as *mut BandwidthRod as *mut u8,
                std::mem::size_of::<BandwidthRod>(),
            )
        };
        let status = source.get_estats(row, Family::Bandwidth, Some(rw_buf), None, Some(rod_buf));
        super::classify_status(status, row, Family::Bandwidth)?;
        let still_enabled =
            rw.EnableCollectionOutbound == TCP_BOOL_OPT_ENABLED || rw.EnableCollectionInbound == TCP_BOOL_OPT_ENABLED;
        if !still_enabled {
            return Ok(());
        }

        self.outbound_bandwidth.push_raw(rod.OutboundBandwidth, max_history);
        self.inbound_bandwidth.push_raw(rod.InboundBandwidth, max_history);
        self.outbound_instability.push_raw(rod.OutboundInstability, max_history);
        self.inbound_instability.push_raw(rod.InboundInstability, max_history);
        self.outbound_peaked = rod.OutboundBandwidthPeaked != 0;
        self.inbound_peaked = rod.InboundBandwidthPeaked != 0;
        Ok(())
    }

    fn format_row(&self) -> String {
        format!(
            "{},{},{},{},{},{}",
            self.outbound_bandwidth.last().unwrap_or(0),
            self.inbound_bandwidth.last().unwrap_or(0),
            self.outbound_instability.last().unwrap_or(0),
            self.inbound_instability.last().unwrap_or(0),
            self.outbound_peaked,
            self.inbound_peaked,
        )
    }

    fn metrics(&self) -> Vec<(&'static str, &MetricHistory)> {
        vec![
            ("OutboundBandwidth", &self.outbound_bandwidth),
            ("InboundBandwidth", &self.inbound_bandwidth),
            ("OutboundInstability", &self.outbound_instability),
            ("InboundInstability", &self.inbound_instability),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::os::mock::{MockReading, MockSource};
    use crate::os::test_support::v4_row;

    fn reading(outbound_enabled: bool, inbound_enabled: bool, outbound_bw: u64) -> MockReading {
        let rw = BandwidthRw {
            EnableCollectionOutbound: if outbound_enabled { TCP_BOOL_OPT_ENABLED } else { 0 },
            EnableCollectionInbound: if inbound_enabled { TCP_BOOL_OPT_ENABLED } else { 0 },
        };
        let rod = BandwidthRod {
            OutboundBandwidth: outbound_bw,
            InboundBandwidth: 2_000_000,
            OutboundInstability: 10,
            InboundInstability: 20,
            OutboundBandwidthPeaked: 1,
            InboundBandwidthPeaked: 0,
        };
        MockReading {
            status: 0,
            rw: Some(unsafe {
                std::slice::from_raw_parts(&rw as *const BandwidthRw as *const u8, std::mem::size_of::<BandwidthRw>())
                    .to_vec()
            }),
            ros: None,
            rod: Some(unsafe {
                std::slice::from_raw_parts(
                    &rod as *const BandwidthRod as *const u8,
                    std::mem::size_of::<BandwidthRod>(),
                )
                .to_vec()
            }),
        }
    }

    #[test]
    fn reading_accepted_when_at_least_one_direction_enabled() {
        let r = v4_row(5555, 80);
        let identity = r.identity();
        let raw_row = RawRow::V4(r);
        let source = MockSource::new();
        source.queue_reading(identity, Family::Bandwidth, reading(true, false, 1_000_000));

        let mut tracker = BandwidthTracker::new();
        tracker.update(&source, &raw_row, 10).unwrap();
        assert_eq!(tracker.outbound_bandwidth.last(), Some(1_000_000));
        assert!(tracker.outbound_peaked);
        assert!(!tracker.inbound_peaked);
    }

    #[test]
    fn reading_dropped_when_both_directions_disabled() {
        let r = v4_row(6666, 80);
        let identity = r.identity();
        let raw_row = RawRow::V4(r);
        let source = MockSource::new();
        source.queue_reading(identity, Family::Bandwidth, reading(false, false, 1_000_000));

        let mut tracker = BandwidthTracker::new();
        tracker.update(&source, &raw_row, 10).unwrap();
        assert!(tracker.outbound_bandwidth.is_empty());
    }
}
