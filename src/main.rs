//! estatsd — per-connection TCP ESTATS telemetry collector daemon.
//!
//! Wires CLI parsing, logging, and Ctrl+C handling around
//! [`tcp_estats_collector::Poller`]; the polling/aggregation/rendering core
//! lives entirely in the library crate.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tcp_estats_collector::os::windows_source::WindowsSource;
use tcp_estats_collector::{CollectorError, Config, Poller};

/// Per-connection TCP ESTATS telemetry collector.
#[derive(Parser)]
#[command(name = "estatsd", about = "Per-connection TCP ESTATS telemetry collector", version)]
struct Args {
    /// Milliseconds between ticks.
    #[arg(long, default_value_t = 1000)]
    poll_rate_ms: u64,

    /// Samples retained per metric history before the oldest is evicted.
    #[arg(long, default_value_t = 10)]
    max_history: usize,

    /// Metric name summarized across all connections each tick. Repeatable.
    #[arg(long = "global-metric")]
    global_metric: Vec<String>,

    /// Metric name summarized per connection each tick. Repeatable.
    #[arg(long = "detail-metric")]
    detail_metric: Vec<String>,

    /// Render the global summary table to the terminal each tick.
    #[arg(long, default_value_t = false)]
    print_global: bool,

    /// Render the per-connection detail tables to the terminal each tick.
    #[arg(long, default_value_t = false)]
    print_detail: bool,

    /// Base directory for the long-form CSVs and LiveData/.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn main() {
    let args = Args::parse();
    init_logging();

    let config = Config {
        poll_rate_ms: args.poll_rate_ms,
        max_history_length: args.max_history,
        global_metrics: args.global_metric,
        detail_metrics: args.detail_metric,
        print_global_to_console: args.print_global,
        print_detail_to_console: args.print_detail,
        output_dir: args.output_dir,
    };

    info!("estatsd {} starting", env!("CARGO_PKG_VERSION"));

    let mut poller = match Poller::new(WindowsSource::new(), config) {
        Ok(poller) => poller,
        Err(e @ CollectorError::UnknownMetric(_)) => {
            error!(error = %e, "configuration error");
            std::process::exit(2);
        }
        Err(e) => {
            error!(error = %e, "failed to start collector");
            std::process::exit(1);
        }
    };

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!(error = %e, "failed to set Ctrl-C handler");
    }

    match poller.run(running) {
        Ok(()) => {
            info!("shutdown complete");
        }
        Err(e) => {
            error!(error = %e, "polling loop stopped on fatal error");
            std::process::exit(1);
        }
    }
}
