//! The two external OS interfaces this crate consumes (§6): connection-table
//! enumeration and the per-connection ESTATS surface. Both are modeled as
//! one trait, [`EstatsSource`], so family trackers and the polling engine
//! never call into Win32 directly — the real implementation lives in
//! [`windows_source`], and tests substitute [`mock::MockSource`].

pub mod ffi;
#[cfg(test)]
pub mod mock;
#[cfg(test)]
pub mod test_support;
pub mod windows_source;

use crate::estats::Family;
use crate::identity::Identity;

/// TCP connection states from the enumeration's closed state enumeration
/// (only the three the polling engine filters on are named; everything
/// else passes through as `Other`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpState {
    Listen,
    TimeWait,
    DeleteTcb,
    Other(u32),
}

impl TcpState {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            2 => TcpState::Listen,
            11 => TcpState::TimeWait,
            12 => TcpState::DeleteTcb,
            other => TcpState::Other(other),
        }
    }

    /// The three states the polling engine skips when upserting connections.
    pub fn is_excluded(&self) -> bool {
        matches!(self, TcpState::Listen | TcpState::TimeWait | TcpState::DeleteTcb)
    }
}

/// One row from the TCP connection table enumeration, carrying enough of
/// the OS's native row representation to pass straight back into the
/// ESTATS Set/Get calls.
#[derive(Debug, Clone)]
pub enum RawRow {
    V4(ffi::MibTcpRow),
    V6(ffi::MibTcp6Row),
}

impl RawRow {
    pub fn identity(&self) -> Identity {
        match self {
            RawRow::V4(row) => row.identity(),
            RawRow::V6(row) => row.identity(),
        }
    }

    pub fn state(&self) -> TcpState {
        match self {
            RawRow::V4(row) => TcpState::from_raw(row.dwState),
            RawRow::V6(row) => TcpState::from_raw(row.State),
        }
    }
}

/// The per-connection ESTATS surface plus the connection-table enumeration,
/// abstracted so the core never touches a raw FFI call directly.
pub trait EstatsSource {
    /// `GetExtendedTcpTable` filtered to IPv4, with the insufficient-buffer
    /// retry already handled.
    fn tcp_table_v4(&self) -> std::io::Result<Vec<RawRow>>;

    /// `GetExtendedTcpTable` filtered to IPv6.
    fn tcp_table_v6(&self) -> std::io::Result<Vec<RawRow>>;

    /// `Set[Per6]TcpConnectionEStats` — enable collection for `family` on
    /// this connection. `rw` is the read-write struct's raw bytes.
    /// Returns the OS status code (0 == success).
    fn set_estats(&self, row: &RawRow, family: Family, rw: &[u8]) -> u32;

    /// `Get[Per6]TcpConnectionEStats` — read back any combination of the
    /// RW/ROS/ROD blocks for `family`. Each buffer is pre-sized by the
    /// caller to the block's struct size and is filled byte-for-byte by
    /// the OS on success. Returns the OS status code (0 == success).
    fn get_estats(
        &self,
        row: &RawRow,
        family: Family,
        rw: Option<&mut [u8]>,
        ros: Option<&mut [u8]>,
        rod: Option<&mut [u8]>,
    ) -> u32;
}
