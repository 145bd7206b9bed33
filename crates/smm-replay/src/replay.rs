//! Streams a game log through a belief chain.
//!
//! Entries that are not game ticks, or that belong to another round, are
//! counted and skipped. In batch mode every tick runs through the chain in
//! order. In live mode ticks are published to a [`BeliefWorker`] as fast as
//! they are read, and only the reports the worker actually produced are
//! written.

use std::io::{BufRead, Write};

use smm_core::{BeliefChain, BeliefWorker};
use smm_core::adapter::LogEntry;
use smm_core::worker::WorkerError;
use smm_types::WorldSnapshot;
use tracing::{debug, info};

use crate::error::ReplayError;
use crate::report::ReportWriter;

/// Counters for one replay run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Log lines read.
    pub lines: usize,
    /// Game ticks handed to the chain.
    pub ticks: usize,
    /// Entries that were not game ticks.
    pub skipped_markers: usize,
    /// Tick entries from other rounds.
    pub skipped_rounds: usize,
    /// Reports written.
    pub reports: usize,
}

/// Reads tick snapshots out of a log.
struct TickSource<R> {
    lines: std::io::Lines<R>,
    path: String,
    layout_filter: Option<String>,
    line: usize,
    summary: ReplaySummary,
}

impl<R: BufRead> TickSource<R> {
    fn new(reader: R, path: String, layout_filter: Option<String>) -> Self {
        Self {
            lines: reader.lines(),
            path,
            layout_filter,
            line: 0,
            summary: ReplaySummary::default(),
        }
    }

    /// The next tick snapshot, or `None` at the end of the log.
    fn next_tick(&mut self) -> Result<Option<WorldSnapshot>, ReplayError> {
        for text in self.lines.by_ref() {
            let text = text.map_err(|source| ReplayError::Io {
                path: self.path.clone(),
                source,
            })?;
            self.line = self.line.saturating_add(1);
            self.summary.lines = self.line;
            if text.trim().is_empty() {
                continue;
            }
            let line = self.line;
            let adapter_error = |source| ReplayError::Adapter { line, source };
            let entry = LogEntry::parse(&text).map_err(adapter_error)?;
            if !entry.is_tick() {
                self.summary.skipped_markers = self.summary.skipped_markers.saturating_add(1);
                continue;
            }
            if !entry.matches_layout(self.layout_filter.as_deref()) {
                self.summary.skipped_rounds = self.summary.skipped_rounds.saturating_add(1);
                continue;
            }
            let fallback = u64::try_from(self.summary.ticks).unwrap_or(u64::MAX);
            let snapshot = entry.to_snapshot(fallback).map_err(adapter_error)?;
            self.summary.ticks = self.summary.ticks.saturating_add(1);
            return Ok(Some(snapshot));
        }
        Ok(None)
    }
}

/// Run every tick of `log` through `chain` in order.
pub fn run_batch<R: BufRead, W: Write>(
    chain: &mut BeliefChain,
    log: R,
    log_path: String,
    layout_filter: Option<String>,
    out: &mut ReportWriter<W>,
) -> Result<ReplaySummary, ReplayError> {
    let mut source = TickSource::new(log, log_path, layout_filter);
    while let Some(snapshot) = source.next_tick()? {
        let report = chain.run(&snapshot)?;
        out.write(&report)?;
        if source.summary.ticks.is_multiple_of(100) {
            info!(ticks = source.summary.ticks, tick = report.tick, "replay progress");
        }
    }
    let mut summary = source.summary;
    summary.reports = out.finish()?;
    Ok(summary)
}

/// Publish every tick of `log` to a worker running `chain`, writing the
/// reports it produces. Ticks the worker had no time for are skipped.
pub async fn run_live<R: BufRead, W: Write>(
    chain: BeliefChain,
    log: R,
    log_path: String,
    layout_filter: Option<String>,
    out: &mut ReportWriter<W>,
) -> Result<ReplaySummary, ReplayError> {
    let mut source = TickSource::new(log, log_path, layout_filter);
    let mut worker = BeliefWorker::spawn(chain);
    let mut last_published = None;
    let mut last_written = None;

    while let Some(snapshot) = source.next_tick()? {
        last_published = Some(snapshot.tick);
        if worker.publish(snapshot).is_err() {
            break;
        }
        tokio::task::yield_now().await;
        if let Some(report) = worker.latest()
            && last_written != Some(report.tick)
        {
            last_written = Some(report.tick);
            out.write(&report)?;
        }
    }

    while last_published.is_some() && last_written != last_published {
        match worker.next_report().await {
            Ok(report) => {
                if last_written != Some(report.tick) {
                    last_written = Some(report.tick);
                    out.write(&report)?;
                }
            }
            Err(WorkerError::Closed) => break,
            Err(error) => return Err(error.into()),
        }
    }

    worker.shutdown().await?;
    let mut summary = source.summary;
    summary.reports = out.finish()?;
    debug!(
        published = summary.ticks,
        written = summary.reports,
        "live replay dropped stale ticks"
    );
    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use smm_core::Layout;
    use smm_core::config::PipelineConfig;

    use super::*;

    const LOG: &str = r#"{"stage": "consent"}
{"layout": "RSMM2", "state": {"players": [{"position": [1, 1], "orientation": [1, 0]}, {"position": [3, 1], "orientation": [-1, 0]}], "objects": []}}
{"layout": "RSMM3", "state": {"timestep": 1, "players": [{"position": [1, 1], "orientation": [1, 0]}, {"position": [3, 1], "orientation": [-1, 0]}], "objects": [{"name": "onion", "position": [2, 1]}]}}

{"layout": "RSMM3", "state": {"timestep": 2, "players": [{"position": [1, 1], "orientation": [1, 0], "held_object": {"name": "onion", "position": [1, 1]}}, {"position": [3, 1], "orientation": [-1, 0]}], "objects": []}}
"#;

    fn chain() -> BeliefChain {
        let mut chain = BeliefChain::from_config(&PipelineConfig::default()).unwrap();
        chain.seed(&Layout::from_grid("XXPXX\nX   X\nXXSXX").unwrap()).unwrap();
        chain
    }

    #[test]
    fn batch_skips_markers_and_other_rounds() {
        let mut buffer = Vec::new();
        let mut out = ReportWriter::new(&mut buffer, "memory", None);
        let summary = run_batch(
            &mut chain(),
            LOG.as_bytes(),
            "memory".to_owned(),
            Some("RSMM3".to_owned()),
            &mut out,
        )
        .unwrap();
        assert_eq!(summary.lines, 5);
        assert_eq!(summary.skipped_markers, 1);
        assert_eq!(summary.skipped_rounds, 1);
        assert_eq!(summary.ticks, 2);
        assert_eq!(summary.reports, 2);
    }

    #[test]
    fn bad_line_reports_its_number() {
        let log = "{\"stage\": 1}\nnot json\n";
        let mut buffer = Vec::new();
        let mut out = ReportWriter::new(&mut buffer, "memory", None);
        let result = run_batch(&mut chain(), log.as_bytes(), "memory".to_owned(), None, &mut out);
        assert!(matches!(result, Err(ReplayError::Adapter { line: 2, .. })));
    }

    #[tokio::test]
    async fn live_always_writes_the_final_tick() {
        let mut buffer = Vec::new();
        let mut out = ReportWriter::new(&mut buffer, "memory", None);
        let summary = run_live(
            chain(),
            LOG.as_bytes(),
            "memory".to_owned(),
            Some("RSMM3".to_owned()),
            &mut out,
        )
        .await
        .unwrap();
        assert_eq!(summary.ticks, 2);
        assert!(summary.reports >= 1);

        let text = String::from_utf8(buffer).unwrap();
        let last: serde_json::Value = serde_json::from_str(text.lines().last().unwrap()).unwrap();
        assert_eq!(last.get("tick").and_then(serde_json::Value::as_u64), Some(2));
    }
}
