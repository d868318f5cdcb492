//! CSV writer collaborator (§6 External Interfaces): `create_file(header)`,
//! `set_filename(path)`, `write_row(line)`, `write_empty_row()`. spec.md
//! calls this out-of-scope and "assumed to exist"; this crate still needs
//! a runnable implementation, grounded on the `csv::Writer` usage in the
//! pack's portstat logger (`lucashc-retina`'s `core/src/lcore/monitor.rs`):
//! one `csv::Writer<File>` per log file, `write_record` per row, explicit
//! `flush()` after each write since there's no back-pressure to rely on.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::{CollectorError, Result};

/// One CSV destination: a path plus the writer for whatever file currently
/// lives at that path. `set_filename` swaps the path (used by the Live
/// CSV rotation); `create_file` opens it and writes the header.
#[derive(Debug, Default)]
pub struct CsvSink {
    path: Option<PathBuf>,
    writer: Option<csv::Writer<File>>,
    column_count: usize,
}

impl CsvSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point this sink at a new path. Does not open the file — call
    /// [`CsvSink::create_file`] next.
    pub fn set_filename(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
        self.writer = None;
    }

    /// Create (truncate-or-new) the file at the current path and write
    /// `header` as the first record.
    pub fn create_file(&mut self, header: &str) -> Result<()> {
        let path = self
            .path
            .clone()
            .expect("set_filename must be called before create_file");
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(CollectorError::Io)?;
            }
        }
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .map_err(CollectorError::Csv)?;
        self.column_count = header.split(',').count();
        writer.write_record(header.split(',')).map_err(CollectorError::Csv)?;
        writer.flush().map_err(CollectorError::Io)?;
        self.writer = Some(writer);
        Ok(())
    }

    /// Append one already-comma-joined data line as a CSV record.
    pub fn write_row(&mut self, line: &str) -> Result<()> {
        let writer = self.writer.as_mut().expect("create_file must precede write_row");
        writer.write_record(line.split(',')).map_err(CollectorError::Csv)?;
        writer.flush().map_err(CollectorError::Io)?;
        Ok(())
    }

    /// Append a record of blank cells matching the header's column count.
    pub fn write_empty_row(&mut self) -> Result<()> {
        let blanks = vec![""; self.column_count].join(",");
        self.write_row(&blanks)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_file_then_write_row_round_trips_through_csv_crate() {
        let dir = std::env::temp_dir().join(format!("estats-csv-sink-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sample.csv");

        let mut sink = CsvSink::new();
        sink.set_filename(&path);
        sink.create_file("A,B,C").unwrap();
        sink.write_row("1,2,3").unwrap();
        sink.write_empty_row().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "A,B,C\n1,2,3\n,,\n");

        std::fs::remove_dir_all(&dir).ok();
    }
}
