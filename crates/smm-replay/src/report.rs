//! JSON-lines report output: one line per processed tick.

use std::io::Write;

use serde::Serialize;
use smm_core::{ChainReport, StageReport};

use crate::error::ReplayError;

/// One output line.
#[derive(Debug, Serialize)]
struct ReportLine<'a> {
    tick: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    layout: Option<&'a str>,
    stages: &'a [StageReport],
}

/// Writes chain reports as JSON lines.
pub struct ReportWriter<W: Write> {
    out: W,
    destination: String,
    layout: Option<String>,
    written: usize,
}

impl<W: Write> ReportWriter<W> {
    /// Write to `out`; `destination` names it in errors.
    pub fn new(out: W, destination: impl Into<String>, layout: Option<String>) -> Self {
        Self {
            out,
            destination: destination.into(),
            layout,
            written: 0,
        }
    }

    /// Append one report.
    pub fn write(&mut self, report: &ChainReport) -> Result<(), ReplayError> {
        let line = ReportLine {
            tick: report.tick,
            layout: self.layout.as_deref(),
            stages: &report.stages,
        };
        serde_json::to_writer(&mut self.out, &line)?;
        self.out.write_all(b"\n").map_err(|source| self.io_error(source))?;
        self.written = self.written.saturating_add(1);
        Ok(())
    }

    /// Flush buffered output and return the number of reports written.
    pub fn finish(&mut self) -> Result<usize, ReplayError> {
        self.out.flush().map_err(|source| self.io_error(source))?;
        Ok(self.written)
    }

    fn io_error(&self, source: std::io::Error) -> ReplayError {
        ReplayError::Io {
            path: self.destination.clone(),
            source,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn one_line_per_report() {
        let mut buffer = Vec::new();
        let mut writer = ReportWriter::new(&mut buffer, "memory", Some("RSMM3".to_owned()));
        for tick in [3, 4] {
            writer
                .write(&ChainReport {
                    tick,
                    stages: Vec::new(),
                })
                .unwrap();
        }
        assert_eq!(writer.finish().unwrap(), 2);

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines.first().and_then(|l| l.get("tick")).and_then(serde_json::Value::as_u64), Some(3));
        assert_eq!(
            lines.get(1).and_then(|l| l.get("layout")).and_then(serde_json::Value::as_str),
            Some("RSMM3")
        );
    }
}
