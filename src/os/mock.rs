//! In-memory fake [`EstatsSource`] for tests — lets the scenarios in the
//! design notes run without a live Windows host.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use super::{EstatsSource, RawRow};
use crate::estats::Family;
use crate::identity::Identity;

/// One canned response to a `get_estats` call.
#[derive(Debug, Clone, Default)]
pub struct MockReading {
    pub status: u32,
    pub rw: Option<Vec<u8>>,
    pub ros: Option<Vec<u8>>,
    pub rod: Option<Vec<u8>>,
}

#[derive(Default)]
struct MockState {
    v4_rows: Vec<super::ffi::MibTcpRow>,
    v6_rows: Vec<super::ffi::MibTcp6Row>,
    readings: HashMap<(Identity, Family), VecDeque<MockReading>>,
    set_status: HashMap<Family, u32>,
}

#[derive(Default)]
pub struct MockSource {
    state: RefCell<MockState>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_v4_row(&self, row: super::ffi::MibTcpRow) {
        self.state.borrow_mut().v4_rows.push(row);
    }

    pub fn push_v6_row(&self, row: super::ffi::MibTcp6Row) {
        self.state.borrow_mut().v6_rows.push(row);
    }

    pub fn clear_rows(&self) {
        let mut s = self.state.borrow_mut();
        s.v4_rows.clear();
        s.v6_rows.clear();
    }

    pub fn queue_reading(&self, identity: Identity, family: Family, reading: MockReading) {
        self.state
            .borrow_mut()
            .readings
            .entry((identity, family))
            .or_default()
            .push_back(reading);
    }

    pub fn set_set_status(&self, family: Family, status: u32) {
        self.state.borrow_mut().set_status.insert(family, status);
    }
}

fn copy_into(src: &Option<Vec<u8>>, dst: &mut Option<&mut [u8]>) {
    if let (Some(src), Some(dst)) = (src, dst) {
        let n = src.len().min(dst.len());
        dst[..n].copy_from_slice(&src[..n]);
    }
}

impl EstatsSource for MockSource {
    fn tcp_table_v4(&self) -> std::io::Result<Vec<RawRow>> {
        Ok(self.state.borrow().v4_rows.iter().copied().map(RawRow::V4).collect())
    }

    fn tcp_table_v6(&self) -> std::io::Result<Vec<RawRow>> {
        Ok(self.state.borrow().v6_rows.iter().copied().map(RawRow::V6).collect())
    }

    fn set_estats(&self, _row: &RawRow, family: Family, _rw: &[u8]) -> u32 {
        self.state.borrow().set_status.get(&family).copied().unwrap_or(0)
    }

    fn get_estats(
        &self,
        row: &RawRow,
        family: Family,
        mut rw: Option<&mut [u8]>,
        mut ros: Option<&mut [u8]>,
        mut rod: Option<&mut [u8]>,
    ) -> u32 {
        let identity = row.identity();
        let mut state = self.state.borrow_mut();
        let queue = state.readings.entry((identity, family)).or_default();
        let Some(reading) = queue.pop_front() else {
            return 2; // ERROR_FILE_NOT_FOUND-ish "no more canned data"
        };
        copy_into(&reading.rw, &mut rw);
        copy_into(&reading.ros, &mut ros);
        copy_into(&reading.rod, &mut rod);
        reading.status
    }
}
