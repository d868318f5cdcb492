//! Error classification (design component H).
//!
//! Two kinds bubble out of the OS ESTATS surface: fatal (the process lacks
//! privilege to enable collection — polling must stop) and transient (a
//! per-reading failure — log and move on). [`CollectorError::is_fatal`] is
//! the single place that decision is made, so the polling engine never has
//! to pattern-match error internals itself.

use crate::estats::Family;
use crate::identity::Identity;

pub type Result<T> = std::result::Result<T, CollectorError>;

#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    /// "Access denied" from any Set/Get-statistics call. The caller lacks
    /// privilege; the polling loop must stop rearming itself.
    #[error("access denied enabling or reading ESTATS for {identity} ({family:?})")]
    AccessDenied { identity: Identity, family: Family },

    /// Any other non-success status from the ESTATS surface for a single
    /// connection/family. Logged and dropped; polling continues.
    #[error("transient ESTATS failure for {identity} ({family:?}): status {code}")]
    Transient {
        identity: Identity,
        family: Family,
        code: u32,
    },

    /// An unknown metric name appeared in `globalMetrics` or `detailMetrics`.
    #[error("unknown metric name in configuration: {0}")]
    UnknownMetric(String),

    /// The connection-table enumeration failed with something other than
    /// "insufficient buffer" (which is recovered internally with one retry).
    #[error("connection table enumeration failed: {0}")]
    Enumeration(#[source] std::io::Error),

    /// A CSV sink's underlying file could not be created, opened, or
    /// flushed.
    #[error("CSV sink I/O error: {0}")]
    Io(#[source] std::io::Error),

    /// The `csv` crate rejected a header or data record (should not happen
    /// given this crate's own comma-joined input, but the writer can still
    /// fail on the underlying file).
    #[error("CSV encoding error: {0}")]
    Csv(#[source] csv::Error),
}

impl CollectorError {
    /// Fatal errors must stop the polling loop from rescheduling itself;
    /// everything else is per-reading and non-fatal.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CollectorError::AccessDenied { .. })
    }
}

/// Windows status code for `ERROR_ACCESS_DENIED`, returned by
/// `Set/GetPerTcpConnectionEStats` when the caller lacks the privilege to
/// enable collection on a connection.
pub const ERROR_ACCESS_DENIED: u32 = 5;

/// Windows status code for `ERROR_INSUFFICIENT_BUFFER`, returned by the
/// connection-table enumeration when the supplied buffer is too small;
/// recovered internally with one resize-and-retry.
pub const ERROR_INSUFFICIENT_BUFFER: u32 = 122;

/// Windows status code for success, shared by every OS call this crate makes.
pub const ERROR_SUCCESS: u32 = 0;
