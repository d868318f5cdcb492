//! Real Windows implementation of [`EstatsSource`], wired straight to the
//! `iphlpapi` bindings in [`super::ffi`].

use super::{ffi, EstatsSource, RawRow};
use crate::estats::Family;

#[derive(Debug, Default)]
pub struct WindowsSource;

impl WindowsSource {
    pub fn new() -> Self {
        Self
    }
}

impl EstatsSource for WindowsSource {
    fn tcp_table_v4(&self) -> std::io::Result<Vec<RawRow>> {
        Ok(ffi::enum_tcp_v4()?.into_iter().map(RawRow::v4).collect())
    }

    fn tcp_table_v6(&self) -> std::io::Result<Vec<RawRow>> {
        Ok(ffi::enum_tcp_v6()?.into_iter().map(RawRow::v6).collect())
    }

    fn set_estats(&self, row: &RawRow, family: Family, rw: &[u8]) -> u32 {
        match row {
            RawRow::V4(row) => ffi::set_estats_v4(row, family, rw),
            RawRow::V6(row) => ffi::set_estats_v6(row, family, rw),
        }
    }

    fn get_estats(
        &self,
        row: &RawRow,
        family: Family,
        rw: Option<&mut [u8]>,
        ros: Option<&mut [u8]>,
        rod: Option<&mut [u8]>,
    ) -> u32 {
        match row {
            RawRow::V4(row) => ffi::get_estats_v4(row, family, rw, ros, rod),
            RawRow::V6(row) => ffi::get_estats_v6(row, family, rw, ros, rod),
        }
    }
}
