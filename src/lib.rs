//! Per-connection TCP ESTATS telemetry collector.
//!
//! Polls `GetPerTcpConnectionEStats` / `GetPerTcp6ConnectionEStats` across
//! every active TCP connection on the host, turns cumulative OS counters
//! into per-tick deltas, keeps a bounded rolling history per metric per
//! connection, and emits rotating summary CSVs plus long-form
//! per-connection CSVs on connection teardown and shutdown.
//!
//! The binary crate (`src/main.rs`) wires CLI parsing, logging setup, and
//! Ctrl+C handling around [`poller::Poller`]; everything in this library
//! is the core described in the project's design notes.

pub mod aggregator;
pub mod color;
pub mod config;
pub mod connection;
pub mod csv_sink;
pub mod error;
pub mod estats;
pub mod history;
pub mod identity;
pub mod index;
pub mod os;
pub mod poller;
pub mod renderer;
pub mod stats;

pub use config::Config;
pub use error::{CollectorError, Result};
pub use poller::Poller;
