//! Operator-facing alert lines for classified windows, with an optional
//! SQLite journal behind them.

use super::AlertStore;
use crate::config::AlertFormat;
use crate::error::Result;
use crate::logging::StructuredLogger;
use crate::model::ClassificationResult;
use chrono::{DateTime, SecondsFormat, Utc};
use colored::Colorize;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct AlertLine {
    timestamp: DateTime<Utc>,
    verdict: &'static str,
    ratio_ce: f64,
    cwr_count: u64,
    throughput_mbps: f64,
}

impl AlertLine {
    fn from_result(result: &ClassificationResult) -> Self {
        let f = &result.features;
        Self {
            timestamp: f.timestamp,
            verdict: if result.label.is_attack() { "attack" } else { "normal" },
            ratio_ce: f.ratio_ce,
            cwr_count: f.cwr_count,
            throughput_mbps: f.throughput_bps / 1e6,
        }
    }
}

pub struct AlertSink {
    format: AlertFormat,
    out: Box<dyn Write + Send>,
    journal: Option<AlertStore>,
    emitted: u64,
}

impl AlertSink {
    pub fn new(format: AlertFormat, out: Box<dyn Write + Send>) -> Self {
        Self {
            format,
            out,
            journal: None,
            emitted: 0,
        }
    }

    pub fn stdout(format: AlertFormat) -> Self {
        Self::new(format, Box::new(std::io::stdout()))
    }

    pub fn with_journal(mut self, journal: AlertStore) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn journal(&self) -> Option<&AlertStore> {
        self.journal.as_ref()
    }

    /// Write one alert line, then journal it when a journal is attached.
    pub fn emit(&mut self, result: &ClassificationResult) -> Result<()> {
        let line = AlertLine::from_result(result);
        match self.format {
            AlertFormat::Json => StructuredLogger::emit_json(&line, &mut self.out)?,
            AlertFormat::Text => writeln!(self.out, "{}", render_text(&line))?,
        }
        self.out.flush()?;
        if let Some(journal) = &self.journal {
            journal.record(result)?;
        }
        self.emitted += 1;
        Ok(())
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}

fn render_text(line: &AlertLine) -> String {
    let verdict = if line.verdict == "attack" {
        "ATTACK".red().bold()
    } else {
        "NORMAL".green()
    };
    format!(
        "[{}] {} | CE ratio {:.3} | CWR {} | {:.2} Mbps",
        line.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        verdict,
        line.ratio_ce,
        line.cwr_count,
        line.throughput_mbps
    )
}
