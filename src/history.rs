//! Bounded per-metric sample history, with the cumulative/instantaneous
//! push semantics and validity-sentinel screening described in the data
//! model.

use std::collections::VecDeque;

/// Width of the raw OS field a [`MetricHistory`] is fed from. Needed
/// because the "not populated" sentinel is all-ones *in the field's own
/// width*, not a fixed 64-bit pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    U32,
    U64,
}

/// Whether a metric's raw OS reading is monotonically non-decreasing
/// (cumulative — the collector stores successive deltas) or is the
/// instantaneous value at the moment of read (stored as-is).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Cumulative,
    Instantaneous,
}

/// 0xC0C0C0C0-pattern heap-verifier poison, in both field widths.
const INVALID_U32_DEBUG: u64 = 0xC0C0_C0C0;
const INVALID_U64_DEBUG: u64 = 0xC0C0_C0C0_C0C0_C0C0;

/// A raw reading is valid unless it equals the all-ones sentinel for its
/// width, or the debug-only heap-verifier poison pattern.
pub fn is_valid(raw: u64, width: Width) -> bool {
    match width {
        Width::U32 => raw != u32::MAX as u64 && raw != INVALID_U32_DEBUG,
        Width::U64 => raw != u64::MAX && raw != INVALID_U64_DEBUG,
    }
}

/// One metric's bounded, FIFO-evicting sample history.
///
/// For cumulative metrics, `previous` is the last raw reading the delta
/// was computed against; it only advances on a valid reading, so a
/// sentinel tick contributes neither a sample nor a `previous` update.
#[derive(Debug, Clone)]
pub struct MetricHistory {
    kind: Kind,
    width: Width,
    samples: VecDeque<u64>,
    previous: u64,
}

impl MetricHistory {
    pub fn new(kind: Kind, width: Width) -> Self {
        Self {
            kind,
            width,
            samples: VecDeque::new(),
            previous: 0,
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Feed one raw OS reading. Returns `true` if a sample was pushed.
    ///
    /// Sentinel readings are dropped with no history mutation and no
    /// `previous` advance (§3 Validity Sentinels, §8 invariant).
    pub fn push_raw(&mut self, raw: u64, max_history: usize) -> bool {
        if !is_valid(raw, self.width) {
            return false;
        }

        let sample = match self.kind {
            Kind::Instantaneous => raw,
            Kind::Cumulative => {
                let delta = raw.saturating_sub(self.previous);
                self.previous = raw;
                delta
            }
        };

        self.samples.push_back(sample);
        while self.samples.len() > max_history {
            self.samples.pop_front();
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn last(&self) -> Option<u64> {
        self.samples.back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.samples.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<u64> {
        self.samples.iter().copied().collect()
    }

    /// Render the most recent sample, or `(bad)` if nothing has ever been
    /// pushed — the long-form CSV's placeholder for a metric that has
    /// never once returned a valid reading.
    pub fn format_last_or_bad(&self) -> String {
        match self.last() {
            Some(v) => v.to_string(),
            None => "(bad)".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cumulative_delta_scenario() {
        // End-to-end scenario 1: DataBytesOut raw {1000,1500,1500,2500,3000}
        let mut h = MetricHistory::new(Kind::Cumulative, Width::U64);
        for raw in [1000u64, 1500, 1500, 2500, 3000] {
            h.push_raw(raw, 10);
        }
        assert_eq!(h.to_vec(), vec![1000, 500, 0, 1000, 500]);
    }

    #[test]
    fn history_eviction_keeps_most_recent() {
        // End-to-end scenario 2: H=3, instantaneous readings {10,20,30,40,50}
        let mut h = MetricHistory::new(Kind::Instantaneous, Width::U32);
        for raw in [10u64, 20, 30, 40, 50] {
            h.push_raw(raw, 3);
        }
        assert_eq!(h.to_vec(), vec![30, 40, 50]);
        assert!(h.len() <= 3);
    }

    #[test]
    fn sentinel_skip_instantaneous() {
        // End-to-end scenario 3 (instantaneous half)
        let mut h = MetricHistory::new(Kind::Instantaneous, Width::U32);
        h.push_raw(100, 10);
        h.push_raw(0xFFFF_FFFF, 10);
        h.push_raw(200, 10);
        assert_eq!(h.to_vec(), vec![100, 200]);
    }

    #[test]
    fn sentinel_skip_cumulative_does_not_advance_previous() {
        // End-to-end scenario 3 (cumulative half): sentinel-tick pushes
        // nothing and does not advance previous; next raw 200 yields delta
        // 100 (computed against the untouched previous=0... but since the
        // first reading 100 already advanced previous to 100, the final
        // delta is 200-100=100).
        let mut h = MetricHistory::new(Kind::Cumulative, Width::U32);
        h.push_raw(100, 10);
        h.push_raw(0xFFFF_FFFF, 10);
        h.push_raw(200, 10);
        assert_eq!(h.to_vec(), vec![100, 100]);
    }

    #[test]
    fn max_history_length_one() {
        let mut h = MetricHistory::new(Kind::Cumulative, Width::U64);
        for raw in [10u64, 30, 70] {
            h.push_raw(raw, 1);
        }
        assert_eq!(h.len(), 1);
        assert_eq!(h.to_vec(), vec![40]); // 70 - 30
    }

    #[test]
    fn sentinel_values_rejected() {
        assert!(!is_valid(u32::MAX as u64, Width::U32));
        assert!(!is_valid(INVALID_U32_DEBUG, Width::U32));
        assert!(!is_valid(u64::MAX, Width::U64));
        assert!(!is_valid(INVALID_U64_DEBUG, Width::U64));
        assert!(is_valid(12345, Width::U32));
    }
}
