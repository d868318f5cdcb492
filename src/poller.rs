//! Polling Engine (design component D): the tick-driven loop that
//! enumerates OS TCP tables, upserts and updates per-family trackers,
//! evicts stale connections, and drives the Aggregator/Renderer each
//! tick. Realized as a blocking loop on a dedicated OS thread per
//! SPEC_FULL.md §5's implementation note, mirroring the sibling daemon's
//! `running: Arc<AtomicBool>` + chunked-sleep shutdown pattern rather than
//! pulling in an async runtime.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::aggregator::{Aggregator, PercentChange, Summary};
use crate::config::Config;
use crate::error::{CollectorError, Result};
use crate::estats::Family;
use crate::identity::Identity;
use crate::index::ConnectionIndex;
use crate::os::EstatsSource;
use crate::renderer::Renderer;

/// How often the shutdown flag is rechecked while sleeping out the
/// remainder of a tick's `pollRateMS` interval.
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct Poller<S: EstatsSource> {
    source: S,
    config: Config,
    index: ConnectionIndex,
    aggregator: Aggregator,
    renderer: Renderer,
    tick: u64,
}

impl<S: EstatsSource> Poller<S> {
    pub fn new(source: S, config: Config) -> Result<Self> {
        config.validate()?;
        let renderer = Renderer::new(&config.output_dir, config.print_global_to_console, config.print_detail_to_console)?;
        Ok(Self { source, config, index: ConnectionIndex::new(), aggregator: Aggregator::new(), renderer, tick: 0 })
    }

    /// Run ticks until `running` goes false or a fatal error is raised.
    /// `Ok(())` on clean shutdown; `Err` carries the fatal classification
    /// that stopped the loop (the caller maps this to a process exit code).
    pub fn run(&mut self, running: Arc<AtomicBool>) -> Result<()> {
        while running.load(Ordering::SeqCst) {
            match self.tick() {
                Ok(()) => {}
                Err(e) if e.is_fatal() => {
                    error!(error = %e, "fatal error classification, stopping polling loop");
                    self.renderer.flush_all(&self.index)?;
                    return Err(e);
                }
                Err(e) => {
                    warn!(error = %e, "tick failed, rescheduling anyway");
                }
            }
            sleep_with_shutdown_check(Duration::from_millis(self.config.poll_rate_ms), &running);
        }
        debug!("shutdown requested, flushing remaining connections");
        self.renderer.flush_all(&self.index)?;
        Ok(())
    }

    fn tick(&mut self) -> Result<()> {
        self.tick += 1;
        debug!(tick = self.tick, "tick start");

        self.enumerate_phase(true)?;
        self.enumerate_phase(false)?;
        self.stale_eviction_phase()?;
        self.render_phase()?;

        debug!(tick = self.tick, "tick end");
        Ok(())
    }

    fn enumerate_phase(&mut self, v4: bool) -> Result<()> {
        let rows = if v4 { self.source.tcp_table_v4() } else { self.source.tcp_table_v6() };
        let rows = rows.map_err(CollectorError::Enumeration)?;

        for row in rows {
            if row.state().is_excluded() {
                continue;
            }
            let identity = row.identity();

            for family in Family::all() {
                let (record, inserted) = self.index.upsert(family, identity, self.tick);
                if inserted {
                    let mut tracker = record.tracker_mut();
                    if let Err(e) = tracker.start(&self.source, &row) {
                        if e.is_fatal() {
                            return Err(e);
                        }
                        warn!(identity = %identity, family = ?family, error = %e, "start failed");
                    }
                }
                record.mark_seen(self.tick);

                let mut tracker = record.tracker_mut();
                if let Err(e) = tracker.update(&self.source, &row, self.config.max_history_length) {
                    if e.is_fatal() {
                        return Err(e);
                    }
                    warn!(identity = %identity, family = ?family, error = %e, "update failed");
                }
            }
        }
        Ok(())
    }

    /// Walk the SynOpts index (every connection has one); any record
    /// whose `last-seen-tick` didn't advance this tick has disappeared
    /// from the OS tables. Flush before erasing so the renderer can still
    /// read every family's last values.
    fn stale_eviction_phase(&mut self) -> Result<()> {
        let stale: Vec<Identity> = self
            .index
            .iter(Family::SynOpts)
            .filter(|record| record.last_seen_tick() != self.tick)
            .map(|record| record.identity())
            .collect();

        for identity in &stale {
            self.renderer.flush_identity(&self.index, identity)?;
            for family in Family::all() {
                self.index.erase(family, identity);
            }
            self.aggregator.prune(identity);
        }

        if !stale.is_empty() {
            debug!(count = stale.len(), tick = self.tick, "evicted stale connections");
        }
        Ok(())
    }

    fn render_phase(&mut self) -> Result<()> {
        let global: Vec<(String, Summary, PercentChange)> = self
            .config
            .global_metrics
            .iter()
            .map(|name| {
                let (summary, change) = self.aggregator.global_summary(&self.index, name)?;
                Ok((name.clone(), summary, change))
            })
            .collect::<Result<_>>()?;

        let detail: Vec<(String, Vec<(Identity, Summary, PercentChange)>)> = self
            .config
            .detail_metrics
            .iter()
            .map(|name| {
                let rows = self.aggregator.detail_summaries(&self.index, name)?;
                Ok((name.clone(), rows))
            })
            .collect::<Result<_>>()?;

        self.renderer.render_tick(&global, &detail)
    }
}

fn sleep_with_shutdown_check(total: Duration, running: &Arc<AtomicBool>) {
    let mut remaining = total;
    while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
        let chunk = remaining.min(SHUTDOWN_POLL_INTERVAL);
        std::thread::sleep(chunk);
        remaining = remaining.saturating_sub(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::os::mock::{MockReading, MockSource};
    use crate::os::test_support::v4_row;

    fn config() -> Config {
        Config {
            poll_rate_ms: 1,
            max_history_length: 10,
            global_metrics: vec!["DataBytesOut".to_string()],
            detail_metrics: vec!["DataBytesOut".to_string()],
            print_global_to_console: false,
            print_detail_to_console: false,
            output_dir: std::env::temp_dir().join(format!("estats-poller-test-{}", std::process::id())),
        }
    }

    #[test]
    fn one_tick_with_one_connection_populates_every_family_index() {
        let cfg = config();
        std::fs::create_dir_all(&cfg.output_dir).ok();
        let source = MockSource::new();
        let row = v4_row(1234, 80);
        source.push_v4_row(row);

        let mut poller = Poller::new(source, cfg.clone()).unwrap();
        poller.tick().unwrap();

        for family in Family::all() {
            assert_eq!(poller.index.len(family), 1, "{family:?} should have one record");
        }

        std::fs::remove_dir_all(&cfg.output_dir).ok();
    }

    #[test]
    fn disappearing_connection_is_evicted_on_the_following_tick() {
        let cfg = config();
        std::fs::create_dir_all(&cfg.output_dir).ok();
        let source = MockSource::new();
        let row = v4_row(1234, 80);
        source.push_v4_row(row);

        let mut poller = Poller::new(source, cfg.clone()).unwrap();
        poller.tick().unwrap();
        poller.source.clear_rows();
        poller.tick().unwrap();

        for family in Family::all() {
            assert_eq!(poller.index.len(family), 0, "{family:?} should be evicted");
        }

        std::fs::remove_dir_all(&cfg.output_dir).ok();
    }

    #[test]
    fn listen_state_connections_are_never_tracked() {
        let cfg = config();
        std::fs::create_dir_all(&cfg.output_dir).ok();
        let source = MockSource::new();
        let mut row = v4_row(1234, 80);
        row.dwState = 2; // LISTEN
        source.push_v4_row(row);

        let mut poller = Poller::new(source, cfg.clone()).unwrap();
        poller.tick().unwrap();

        assert_eq!(poller.index.len(Family::SynOpts), 0);

        std::fs::remove_dir_all(&cfg.output_dir).ok();
    }

    #[test]
    fn time_wait_connections_are_never_tracked() {
        let cfg = config();
        std::fs::create_dir_all(&cfg.output_dir).ok();
        let source = MockSource::new();
        let mut row = v4_row(1234, 80);
        row.dwState = 11; // TIME_WAIT
        source.push_v4_row(row);

        let mut poller = Poller::new(source, cfg.clone()).unwrap();
        poller.tick().unwrap();

        assert_eq!(poller.index.len(Family::SynOpts), 0);

        std::fs::remove_dir_all(&cfg.output_dir).ok();
    }

    #[test]
    fn fin_wait1_connections_are_still_tracked() {
        let cfg = config();
        std::fs::create_dir_all(&cfg.output_dir).ok();
        let source = MockSource::new();
        let mut row = v4_row(1234, 80);
        row.dwState = 6; // FIN_WAIT1
        source.push_v4_row(row);

        let mut poller = Poller::new(source, cfg.clone()).unwrap();
        poller.tick().unwrap();

        assert_eq!(poller.index.len(Family::SynOpts), 1);

        std::fs::remove_dir_all(&cfg.output_dir).ok();
    }

    #[test]
    fn access_denied_on_start_is_fatal_and_stops_the_loop() {
        let cfg = config();
        std::fs::create_dir_all(&cfg.output_dir).ok();
        let source = MockSource::new();
        let row = v4_row(1234, 80);
        source.push_v4_row(row);
        source.set_set_status(Family::Data, crate::error::ERROR_ACCESS_DENIED);

        let mut poller = Poller::new(source, cfg.clone()).unwrap();
        let result = poller.tick();
        assert!(matches!(result, Err(CollectorError::AccessDenied { family: Family::Data, .. })));

        std::fs::remove_dir_all(&cfg.output_dir).ok();
    }

    #[test]
    fn unknown_global_metric_surfaces_as_configuration_error_at_construction() {
        let mut cfg = config();
        cfg.global_metrics = vec!["NotAMetric".to_string()];
        std::fs::create_dir_all(&cfg.output_dir).ok();
        let source = MockSource::new();
        source.push_v4_row(v4_row(1234, 80));

        let result = Poller::new(source, cfg.clone());
        assert!(matches!(result, Err(CollectorError::UnknownMetric(_))));

        std::fs::remove_dir_all(&cfg.output_dir).ok();
    }

    #[test]
    fn mock_reading_helper_is_reachable_for_future_fatal_path_tests() {
        let _ = MockReading::default();
    }
}
