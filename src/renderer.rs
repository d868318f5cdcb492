//! Output Renderer (design component F): long-form CSVs joined by
//! identity on flush, rotating live-summary CSVs per tick, and an
//! optional crossterm-colored terminal table.

use std::io::Write;
use std::path::{Path, PathBuf};

use crossterm::style::{ResetColor, SetForegroundColor};
use crossterm::{cursor, execute, queue, terminal};

use crate::aggregator::{PercentChange, Summary};
use crate::color::{color_for_percent_change, color_for_sample_count};
use crate::csv_sink::CsvSink;
use crate::error::{CollectorError, Result};
use crate::estats::{self, Family};
use crate::identity::Identity;
use crate::index::ConnectionIndex;

const SUMMARY_HEADER: &str =
    "Samples,Min,Max,Mean,StdDev,Median,IQR,Samples%,Min%,Max%,Mean%,StdDev%,Median%,IQR%";

fn summary_row(summary: &Summary, change: &PercentChange) -> String {
    format!(
        "{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
        summary.samples,
        summary.min,
        summary.max,
        summary.mean,
        summary.stddev,
        summary.median,
        summary.iqr,
        change.samples * 100.0,
        change.min * 100.0,
        change.max * 100.0,
        change.mean * 100.0,
        change.stddev * 100.0,
        change.median * 100.0,
        change.iqr * 100.0,
    )
}

pub struct Renderer {
    path_csv: CsvSink,
    rwin_csv: CsvSink,
    congestion_csv: CsvSink,
    live_dir: PathBuf,
    rotation: u64,
    print_global: bool,
    print_detail: bool,
}

impl Renderer {
    pub fn new(output_dir: &Path, print_global: bool, print_detail: bool) -> Result<Self> {
        let mut path_csv = CsvSink::new();
        path_csv.set_filename(output_dir.join("EstatsPathInfo.csv"));
        path_csv.create_file(&format!("LocalAddress,RemoteAddress,{}", estats::header(Family::Path)))?;

        let mut rwin_csv = CsvSink::new();
        rwin_csv.set_filename(output_dir.join("EstatsReceiveWindow.csv"));
        rwin_csv.create_file(&format!(
            "LocalAddress,RemoteAddress,{},{}",
            estats::header(Family::LocalRwin),
            estats::header(Family::RemoteRwin)
        ))?;

        let mut congestion_csv = CsvSink::new();
        congestion_csv.set_filename(output_dir.join("EstatsSenderCongestion.csv"));
        congestion_csv.create_file(&format!(
            "LocalAddress,RemoteAddress,{},{},{}",
            estats::header(Family::SendCongestion),
            estats::header(Family::Data),
            estats::header(Family::Bandwidth)
        ))?;

        let live_dir = output_dir.join("LiveData");
        std::fs::create_dir_all(&live_dir).map_err(CollectorError::Io)?;

        Ok(Self { path_csv, rwin_csv, congestion_csv, live_dir, rotation: 0, print_global, print_detail })
    }

    fn row_for(index: &ConnectionIndex, family: Family, identity: &Identity) -> String {
        index
            .find(family, identity)
            .map(|record| record.tracker().format_row())
            .unwrap_or_else(|| estats::empty_row(family))
    }

    /// Emit one row per long-form CSV for `identity`, substituting a
    /// fixed-width empty placeholder for any missing family partner.
    /// Must be called before the identity is erased from every index.
    pub fn flush_identity(&mut self, index: &ConnectionIndex, identity: &Identity) -> Result<()> {
        let addresses = format!("{},{}", identity.local, identity.remote);

        let path_row = Self::row_for(index, Family::Path, identity);
        self.path_csv.write_row(&format!("{addresses},{path_row}"))?;

        let local_row = Self::row_for(index, Family::LocalRwin, identity);
        let remote_row = Self::row_for(index, Family::RemoteRwin, identity);
        self.rwin_csv.write_row(&format!("{addresses},{local_row},{remote_row}"))?;

        let congestion_row = Self::row_for(index, Family::SendCongestion, identity);
        let data_row = Self::row_for(index, Family::Data, identity);
        let bandwidth_row = Self::row_for(index, Family::Bandwidth, identity);
        self.congestion_csv
            .write_row(&format!("{addresses},{congestion_row},{data_row},{bandwidth_row}"))?;

        Ok(())
    }

    /// Flush every identity still tracked (by the SynOpts index, since
    /// every connection has a SynOpts record) at shutdown.
    pub fn flush_all(&mut self, index: &ConnectionIndex) -> Result<()> {
        let identities: Vec<Identity> = index.iter(Family::SynOpts).map(|record| record.identity()).collect();
        for identity in identities {
            self.flush_identity(index, &identity)?;
        }
        Ok(())
    }

    /// Rotate the two live-summary CSVs and write this tick's global and
    /// detail summaries; optionally render the terminal table(s).
    pub fn render_tick(
        &mut self,
        global: &[(String, Summary, PercentChange)],
        detail: &[(String, Vec<(Identity, Summary, PercentChange)>)],
    ) -> Result<()> {
        let n = self.rotation;
        self.rotation += 1;

        let mut global_sink = CsvSink::new();
        global_sink.set_filename(self.live_dir.join(format!("GlobalSummary_{n}.csv")));
        global_sink.create_file(&format!("Metric,{SUMMARY_HEADER}"))?;
        for (name, summary, change) in global {
            global_sink.write_row(&format!("{name},{}", summary_row(summary, change)))?;
        }

        let mut detail_sink = CsvSink::new();
        detail_sink.set_filename(self.live_dir.join(format!("DetailSummary_{n}.csv")));
        let detail_header = format!("Metric,Local,Remote,{SUMMARY_HEADER}");
        if detail.is_empty() {
            detail_sink.create_file(&detail_header)?;
        } else {
            for (i, (name, rows)) in detail.iter().enumerate() {
                if i == 0 {
                    detail_sink.create_file(&detail_header)?;
                } else {
                    detail_sink.write_row(&detail_header)?;
                }
                for (identity, summary, change) in rows {
                    detail_sink.write_row(&format!(
                        "{name},{},{},{}",
                        identity.local,
                        identity.remote,
                        summary_row(summary, change)
                    ))?;
                }
            }
        }

        if self.print_global {
            render_terminal_global(global)?;
        }
        if self.print_detail {
            render_terminal_detail(detail)?;
        }

        Ok(())
    }
}

fn render_terminal_global(global: &[(String, Summary, PercentChange)]) -> Result<()> {
    let mut out = std::io::stdout();
    execute!(out, terminal::Clear(terminal::ClearType::All), cursor::MoveTo(0, 0)).map_err(CollectorError::Io)?;
    writeln!(out, "{:<24}{:>10}{:>10}{:>10}{:>10}", "Metric", "Samples", "Min", "Max", "Mean").map_err(CollectorError::Io)?;
    for (name, summary, change) in global {
        write!(out, "{name:<24}").map_err(CollectorError::Io)?;
        render_cell(&mut out, summary.samples as f64, change.samples)?;
        render_cell(&mut out, summary.min, change.min)?;
        render_cell(&mut out, summary.max, change.max)?;
        render_cell(&mut out, summary.mean, change.mean)?;
        writeln!(out).map_err(CollectorError::Io)?;
    }
    out.flush().map_err(CollectorError::Io)?;
    Ok(())
}

fn render_terminal_detail(detail: &[(String, Vec<(Identity, Summary, PercentChange)>)]) -> Result<()> {
    let mut out = std::io::stdout();
    writeln!(out, "--- detail ---").map_err(CollectorError::Io)?;
    for (name, rows) in detail {
        writeln!(out, "{name}").map_err(CollectorError::Io)?;
        for (identity, summary, change) in rows {
            write!(out, "  {} -> {}  ", identity.local, identity.remote).map_err(CollectorError::Io)?;
            if let Some(color) = color_for_sample_count(change.samples) {
                queue!(out, SetForegroundColor(color)).map_err(CollectorError::Io)?;
                write!(out, "{}", summary.samples).map_err(CollectorError::Io)?;
                queue!(out, ResetColor).map_err(CollectorError::Io)?;
            } else {
                write!(out, "{}", summary.samples).map_err(CollectorError::Io)?;
            }
            write!(out, "  ").map_err(CollectorError::Io)?;
            render_cell(&mut out, summary.mean, change.mean)?;
            writeln!(out).map_err(CollectorError::Io)?;
        }
    }
    out.flush().map_err(CollectorError::Io)?;
    Ok(())
}

fn render_cell(out: &mut impl Write, value: f64, change: f64) -> Result<()> {
    let cell = color_for_percent_change(change);
    queue!(out, SetForegroundColor(cell.foreground)).map_err(CollectorError::Io)?;
    if let Some(bg) = cell.background {
        queue!(out, crossterm::style::SetBackgroundColor(bg)).map_err(CollectorError::Io)?;
    }
    write!(out, "{value:>10.2}").map_err(CollectorError::Io)?;
    queue!(out, ResetColor).map_err(CollectorError::Io)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estats::Family;
    use crate::identity::Endpoint;

    fn id(port: u16) -> Identity {
        Identity::new(Endpoint::v4([10, 0, 0, 1], port), Endpoint::v4([10, 0, 0, 2], 80))
    }

    #[test]
    fn flush_identity_substitutes_empty_row_for_missing_partner() {
        let dir = std::env::temp_dir().join(format!("estats-renderer-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).ok();

        let mut renderer = Renderer::new(&dir, false, false).unwrap();
        let mut index = ConnectionIndex::new();
        let identity = id(1234);
        index.upsert(Family::Path, identity, 1);
        // Deliberately don't upsert LocalRwin/RemoteRwin/SendCongestion/Data/Bandwidth.

        renderer.flush_identity(&index, &identity).unwrap();

        let contents = std::fs::read_to_string(dir.join("EstatsReceiveWindow.csv")).unwrap();
        let data_line = contents.lines().nth(1).unwrap();
        // addresses (2 cells) + LocalRwin (3 empty) + RemoteRwin (3 empty) = 8 cells, 7 commas.
        assert_eq!(data_line.matches(',').count(), 7);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn render_tick_emits_one_header_block_per_detail_metric() {
        let dir = std::env::temp_dir().join(format!("estats-renderer-detail-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).ok();

        let mut renderer = Renderer::new(&dir, false, false).unwrap();
        let summary = Summary::ZERO;
        let change = PercentChange::ZERO;
        let detail = vec![
            ("DataBytesOut".to_string(), vec![(id(1234), summary, change)]),
            ("CurRwinRcvd".to_string(), vec![(id(1234), summary, change)]),
        ];
        renderer.render_tick(&[], &detail).unwrap();

        let contents = std::fs::read_to_string(dir.join("LiveData").join("DetailSummary_0.csv")).unwrap();
        let header_lines = contents.lines().filter(|l| l.starts_with("Metric,Local,Remote")).count();
        assert_eq!(header_lines, 2, "expected one header block per configured detail metric");
        assert_eq!(contents.lines().count(), 4, "two header blocks, one data row each");

        std::fs::remove_dir_all(&dir).ok();
    }
}
