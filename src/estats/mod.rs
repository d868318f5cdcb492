//! Counter-family trackers (design component A).
//!
//! Seven families, one module each, all implementing the same four-operation
//! [`Tracker`] contract: `start`, `update`, `format_row`, `metrics`. `header`
//! is a free function keyed on [`Family`] rather than a trait method, since
//! it is needed before any tracker instance exists (CSV files are created
//! once at startup) and a `dyn Tracker` can't carry an associated static.

pub mod bandwidth;
pub mod data;
pub mod local_rwin;
pub mod path;
pub mod remote_rwin;
pub mod send_congestion;
pub mod syn_opts;

use std::fmt;

use crate::error::{CollectorError, Result, ERROR_ACCESS_DENIED, ERROR_SUCCESS};
use crate::history::MetricHistory;
use crate::os::{EstatsSource, RawRow};

/// The closed set of ESTATS families this collector tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Family {
    SynOpts,
    Data,
    SendCongestion,
    Path,
    LocalRwin,
    RemoteRwin,
    Bandwidth,
}

impl Family {
    pub fn all() -> [Family; 7] {
        [
            Family::SynOpts,
            Family::Data,
            Family::SendCongestion,
            Family::Path,
            Family::LocalRwin,
            Family::RemoteRwin,
            Family::Bandwidth,
        ]
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Compile-time metric-name → owning-family table, consulted by the
/// aggregator to resolve a configured metric name before computing its
/// summary. `*Peaked` Bandwidth flags are deliberately absent — §9 resolves
/// them as non-summarized, emitted only in the long-form CSV.
const NAME_TABLE: &[(&str, Family)] = &[
    ("MssRcvd", Family::SynOpts),
    ("MssSent", Family::SynOpts),
    ("DataBytesIn", Family::Data),
    ("DataBytesOut", Family::Data),
    ("CurCwnd", Family::SendCongestion),
    ("SndLimBytesRwin", Family::SendCongestion),
    ("SndLimBytesSnd", Family::SendCongestion),
    ("SndLimBytesCwnd", Family::SendCongestion),
    ("SndLimTransRwin", Family::SendCongestion),
    ("SndLimTransSnd", Family::SendCongestion),
    ("SndLimTransCwnd", Family::SendCongestion),
    ("CurRto", Family::Path),
    ("SmoothedRtt", Family::Path),
    ("BytesRetrans", Family::Path),
    ("DupAcksIn", Family::Path),
    ("SacksRcvd", Family::Path),
    ("CongSignals", Family::Path),
    ("CurMss", Family::Path),
    ("CurRwinSent", Family::LocalRwin),
    ("MinRwinSent", Family::LocalRwin),
    ("MaxRwinSent", Family::LocalRwin),
    ("CurRwinRcvd", Family::RemoteRwin),
    ("MinRwinRcvd", Family::RemoteRwin),
    ("MaxRwinRcvd", Family::RemoteRwin),
    ("OutboundBandwidth", Family::Bandwidth),
    ("InboundBandwidth", Family::Bandwidth),
    ("OutboundInstability", Family::Bandwidth),
    ("InboundInstability", Family::Bandwidth),
];

/// Resolve a configured metric name to its owning family. `None` means the
/// name is unknown — the caller should raise a configuration error.
pub fn resolve_family(metric: &str) -> Option<Family> {
    NAME_TABLE
        .iter()
        .find(|(name, _)| *name == metric)
        .map(|(_, family)| *family)
}

pub fn known_metric_names() -> impl Iterator<Item = &'static str> {
    NAME_TABLE.iter().map(|(name, _)| *name)
}

/// The static CSV header fragment each family contributes to the long-form
/// CSVs, as a comma-separated list of column names (no leading comma).
pub fn header(family: Family) -> &'static str {
    match family {
        Family::SynOpts => "Mss-Received,Mss-Sent",
        Family::Data => "Bytes-In,Bytes-Out",
        Family::SendCongestion => {
            "CongWin,XIntoReceiverLimited,XIntoSenderLimited,XIntoCongestionLimited,\
             BytesSentRecvLimited,BytesSentSenderLimited,BytesSentCongLimited"
        }
        Family::Path => {
            "BytesRetrans,DupeAcks,SelectiveAcks,CongSignals,MaxSegSize,RetransTimer,RTT"
        }
        Family::LocalRwin => "LocalRecvWin(cur),LocalRecvWin(min),LocalRecvWin(max)",
        Family::RemoteRwin => "RemoteRecvWin(cur),RemoteRecvWin(min),RemoteRecvWin(max)",
        Family::Bandwidth => {
            "OutboundBandwidth,InboundBandwidth,OutboundInstability,InboundInstability,\
             OutboundBandwidthPeaked,InboundBandwidthPeaked"
        }
    }
}

/// The number of comma-separated cells a family's `format_row` produces —
/// used to build a correctly-sized placeholder when a cross-family join
/// partner is missing on flush (§4.F).
pub fn column_count(family: Family) -> usize {
    header(family).split(',').count()
}

/// A fixed-width, all-empty placeholder row fragment for a missing partner
/// family on flush, matching `column_count(family)` cells.
pub fn empty_row(family: Family) -> String {
    vec![""; column_count(family)].join(",")
}

/// The common per-family tracker contract (design component A).
pub trait Tracker: fmt::Debug {
    fn family(&self) -> Family;

    /// Enable collection for this family on a newly-observed connection.
    /// Called exactly once per connection per family.
    fn start(&mut self, source: &dyn EstatsSource, row: &RawRow) -> Result<()>;

    /// Sample current values, push deltas/raw readings into history.
    fn update(&mut self, source: &dyn EstatsSource, row: &RawRow, max_history: usize) -> Result<()>;

    /// Most-recent-or-derived value per column, comma-separated, no leading
    /// comma, for the long-form CSV.
    fn format_row(&self) -> String;

    /// Histories by metric name, for the aggregator.
    fn metrics(&self) -> Vec<(&'static str, &MetricHistory)>;
}

/// Classify a status code from a set/get-statistics call against `row`'s
/// identity (§4.H): success is `Ok`, "access denied" is fatal, anything
/// else is per-reading transient. Shared by every family's `start`/`update`
/// so the fatal/transient split lives in one place, not seven.
pub fn classify_status(status: u32, row: &RawRow, family: Family) -> Result<()> {
    if status == ERROR_SUCCESS {
        return Ok(());
    }
    if status == ERROR_ACCESS_DENIED {
        return Err(CollectorError::AccessDenied { identity: row.identity(), family });
    }
    Err(CollectorError::Transient { identity: row.identity(), family, code: status })
}

/// Construct a fresh tracker for `family`.
pub fn new_tracker(family: Family) -> Box<dyn Tracker + Send> {
    match family {
        Family::SynOpts => Box::new(syn_opts::SynOptsTracker::new()),
        Family::Data => Box::new(data::DataTracker::new()),
        Family::SendCongestion => Box::new(send_congestion::SendCongestionTracker::new()),
        Family::Path => Box::new(path::PathTracker::new()),
        Family::LocalRwin => Box::new(local_rwin::LocalRwinTracker::new()),
        Family::RemoteRwin => Box::new(remote_rwin::RemoteRwinTracker::new()),
        Family::Bandwidth => Box::new(bandwidth::BandwidthTracker::new()),
    }
}
