//! Summary Aggregator (design component E): per-metric global and
//! per-connection summaries, plus the percent-change bookkeeping against
//! the immediately prior tick.

use std::collections::HashMap;

use crate::error::{CollectorError, Result};
use crate::estats::resolve_family;
use crate::identity::Identity;
use crate::index::ConnectionIndex;
use crate::stats::{interquartile_range, sampled_stddev};

/// `{samples, min, max, mean, stddev, median, IQR}` — the zero summary has
/// every field at zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub samples: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub stddev: f64,
    pub median: f64,
    pub iqr: f64,
}

impl Summary {
    pub const ZERO: Summary =
        Summary { samples: 0, min: 0.0, max: 0.0, mean: 0.0, stddev: 0.0, median: 0.0, iqr: 0.0 };

    fn from_sorted_history(sorted: &[u64]) -> Summary {
        if sorted.is_empty() {
            return Summary::ZERO;
        }
        let (mean, stddev) = sampled_stddev(sorted);
        let (q1, median, q3) = interquartile_range(sorted);
        Summary {
            samples: sorted.len(),
            min: sorted[0] as f64,
            max: *sorted.last().unwrap() as f64,
            mean,
            stddev,
            median,
            iqr: q3 - q1,
        }
    }
}

/// Fractional change per field versus the prior tick's summary for the
/// same key (§3 rules: equal → 0; old=0,new>0 → +1.0; new=0,old>0 → −1.0;
/// otherwise signed `(new-old)/old`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentChange {
    pub samples: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub stddev: f64,
    pub median: f64,
    pub iqr: f64,
}

impl PercentChange {
    pub const ZERO: PercentChange =
        PercentChange { samples: 0.0, min: 0.0, max: 0.0, mean: 0.0, stddev: 0.0, median: 0.0, iqr: 0.0 };

    fn between(old: &Summary, new: &Summary) -> PercentChange {
        PercentChange {
            samples: field_change(old.samples as f64, new.samples as f64),
            min: field_change(old.min, new.min),
            max: field_change(old.max, new.max),
            mean: field_change(old.mean, new.mean),
            stddev: field_change(old.stddev, new.stddev),
            median: field_change(old.median, new.median),
            iqr: field_change(old.iqr, new.iqr),
        }
    }
}

fn field_change(old: f64, new: f64) -> f64 {
    if old == new {
        0.0
    } else if old == 0.0 && new > 0.0 {
        1.0
    } else if new == 0.0 && old > 0.0 {
        -1.0
    } else {
        (new - old) / old
    }
}

/// Owns the "last tick's summary" memory the Percent-Change Record needs,
/// pruned as connections are evicted so it doesn't grow unbounded (§9).
#[derive(Debug, Default)]
pub struct Aggregator {
    global_prior: HashMap<String, Summary>,
    detail_prior: HashMap<(String, Identity), Summary>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Global summary for `metric`: mean-of-means / stddev-of-means /
    /// median-of-medians / IQR-of-medians over every connection's
    /// non-empty history in the metric's owning family.
    pub fn global_summary(&mut self, index: &ConnectionIndex, metric: &str) -> Result<(Summary, PercentChange)> {
        let family = resolve_family(metric).ok_or_else(|| CollectorError::UnknownMetric(metric.to_string()))?;

        let mut mins = Vec::new();
        let mut maxs = Vec::new();
        let mut means = Vec::new();
        let mut medians = Vec::new();

        for record in index.iter(family) {
            let tracker = record.tracker();
            let Some((_, history)) = tracker.metrics().into_iter().find(|(name, _)| *name == metric) else {
                continue;
            };
            if history.is_empty() {
                continue;
            }
            let mut sorted = history.to_vec();
            sorted.sort_unstable();
            let per_conn = Summary::from_sorted_history(&sorted);
            mins.push(per_conn.min);
            maxs.push(per_conn.max);
            means.push(per_conn.mean);
            medians.push(per_conn.median);
        }

        let summary = if mins.is_empty() {
            Summary::ZERO
        } else {
            let mut sorted_means = means.clone();
            sorted_means.sort_by(|a, b| a.partial_cmp(b).unwrap());
            let mean_of_means = sorted_means.iter().sum::<f64>() / sorted_means.len() as f64;
            let stddev_of_means = sample_stddev_f64(&sorted_means, mean_of_means);

            let mut sorted_medians = medians.clone();
            sorted_medians.sort_by(|a, b| a.partial_cmp(b).unwrap());
            let (median_of_medians, iqr_of_medians) = median_and_iqr_f64(&sorted_medians);

            Summary {
                samples: mins.len(),
                min: mins.iter().cloned().fold(f64::INFINITY, f64::min),
                max: maxs.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
                mean: mean_of_means,
                stddev: stddev_of_means,
                median: median_of_medians,
                iqr: iqr_of_medians,
            }
        };

        let change = match self.global_prior.get(metric) {
            Some(prior) => PercentChange::between(prior, &summary),
            None => PercentChange::ZERO,
        };
        self.global_prior.insert(metric.to_string(), summary);
        Ok((summary, change))
    }

    /// Per-connection summaries for `metric`, in index iteration order.
    pub fn detail_summaries(
        &mut self,
        index: &ConnectionIndex,
        metric: &str,
    ) -> Result<Vec<(Identity, Summary, PercentChange)>> {
        let family = resolve_family(metric).ok_or_else(|| CollectorError::UnknownMetric(metric.to_string()))?;

        let mut out = Vec::new();
        for record in index.iter(family) {
            let tracker = record.tracker();
            let Some((_, history)) = tracker.metrics().into_iter().find(|(name, _)| *name == metric) else {
                continue;
            };
            if history.is_empty() {
                continue;
            }
            let mut sorted = history.to_vec();
            sorted.sort_unstable();
            let summary = Summary::from_sorted_history(&sorted);

            let key = (metric.to_string(), record.identity());
            let change = match self.detail_prior.get(&key) {
                Some(prior) => PercentChange::between(prior, &summary),
                None => PercentChange::ZERO,
            };
            self.detail_prior.insert(key, summary);
            out.push((record.identity(), summary, change));
        }
        Ok(out)
    }

    /// Drop any retained prior-summary entries for an evicted connection.
    pub fn prune(&mut self, identity: &Identity) {
        self.detail_prior.retain(|(_, id), _| id != identity);
    }
}

fn sample_stddev_f64(sorted: &[f64], mean: f64) -> f64 {
    if sorted.len() < 2 {
        return 0.0;
    }
    let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (sorted.len() - 1) as f64;
    variance.sqrt()
}

fn median_and_iqr_f64(sorted: &[f64]) -> (f64, f64) {
    if sorted.is_empty() {
        return (0.0, 0.0);
    }
    let percentile = |p: f64| -> f64 {
        if sorted.len() == 1 {
            return sorted[0];
        }
        let rank = p * (sorted.len() - 1) as f64;
        let lo = rank.floor() as usize;
        let hi = rank.ceil() as usize;
        if lo == hi {
            sorted[lo]
        } else {
            let frac = rank - lo as f64;
            sorted[lo] + frac * (sorted[hi] - sorted[lo])
        }
    };
    (percentile(0.5), percentile(0.75) - percentile(0.25))
}
