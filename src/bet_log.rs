//! Flat CSV record of evaluated and placed bets.
//!
//! The file is the only durable state the dashboard has. It is meant to be
//! edited by hand (typically to flip `result` from `Pending` to `Win`/`Loss`),
//! so nothing written here is validated, and an append never drops what the
//! user put there: extra columns and rows that no longer parse are kept.
//!
//! There is no locking. Every append rewrites the whole table, so two
//! processes appending at once will race and one of the rows can be lost.
//! Keep a single dashboard per log file.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use csv::ByteRecord;
use serde::Deserialize;
use tracing::{info, warn};

use crate::model::{Evaluation, Position, position_label};
use crate::state::{MatchContext, OddsQuote};

pub const DEFAULT_LOG_FILE: &str = "bets_log.csv";
pub const BET_TYPE_ANYTIME_TRY: &str = "Anytime Try";
pub const RESULT_PENDING: &str = "Pending";
pub const RESULT_WIN: &str = "Win";
pub const RESULT_LOSS: &str = "Loss";

/// Column order of the persisted table.
pub const COLUMNS: [&str; 15] = [
    "date",
    "round",
    "match",
    "player",
    "odds",
    "book",
    "my_prob",
    "edge",
    "stake",
    "type",
    "result",
    "position",
    "team_total",
    "status",
    "confidence",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BetStatus {
    Evaluated,
    Placed,
}

impl BetStatus {
    pub fn label(self) -> &'static str {
        match self {
            BetStatus::Evaluated => "Evaluated",
            BetStatus::Placed => "Placed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Win,
    Loss,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BetRecord {
    pub date: String,
    pub round: String,
    #[serde(rename = "match")]
    pub match_name: String,
    pub player: String,
    pub odds: f64,
    pub book: String,
    pub my_prob: f64,
    pub edge: f64,
    pub stake: Option<f64>,
    #[serde(rename = "type")]
    pub bet_type: String,
    pub result: String,
    pub position: String,
    pub team_total: Option<f64>,
    pub status: String,
    pub confidence: f64,
}

impl BetRecord {
    pub fn from_evaluation(
        quote: &OddsQuote,
        position: Option<Position>,
        eval: &Evaluation,
        ctx: &MatchContext,
        round: &str,
        status: BetStatus,
        stake: Option<f64>,
    ) -> Self {
        Self {
            date: Local::now().format("%Y-%m-%d").to_string(),
            round: round.trim().to_string(),
            match_name: quote.match_name.clone(),
            player: quote.player.clone(),
            odds: quote.odds,
            book: quote.book.clone(),
            my_prob: eval.my_prob,
            edge: eval.edge,
            stake,
            bet_type: BET_TYPE_ANYTIME_TRY.to_string(),
            result: RESULT_PENDING.to_string(),
            position: position_label(position).to_string(),
            team_total: ctx.total_points_line,
            status: status.label().to_string(),
            confidence: eval.confidence.clamp(0.0, 100.0),
        }
    }

    /// Cell text keyed by column name, in `COLUMNS` order.
    fn cells(&self) -> [(&'static str, String); 15] {
        [
            ("date", self.date.clone()),
            ("round", self.round.clone()),
            ("match", self.match_name.clone()),
            ("player", self.player.clone()),
            ("odds", self.odds.to_string()),
            ("book", self.book.clone()),
            ("my_prob", self.my_prob.to_string()),
            ("edge", self.edge.to_string()),
            ("stake", opt_cell(self.stake)),
            ("type", self.bet_type.clone()),
            ("result", self.result.clone()),
            ("position", self.position.clone()),
            ("team_total", opt_cell(self.team_total)),
            ("status", self.status.clone()),
            ("confidence", self.confidence.to_string()),
        ]
    }

    /// Only the exact labels `Win` and `Loss` count as settled.
    pub fn settlement(&self) -> Option<Settlement> {
        match self.result.as_str() {
            RESULT_WIN => Some(Settlement::Win),
            RESULT_LOSS => Some(Settlement::Loss),
            _ => None,
        }
    }
}

/// Rows that deserialized, plus the 1-based data rows that did not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedLog {
    pub records: Vec<BetRecord>,
    pub skipped: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct BetLog {
    path: PathBuf,
}

impl BetLog {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env() -> Self {
        let path = env::var("BET_LOG_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILE.to_string());
        Self::open(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Readable rows in file order, or nothing if the file does not exist yet.
    pub fn load(&self) -> Result<Vec<BetRecord>> {
        Ok(self.load_report()?.records)
    }

    /// Like [`BetLog::load`], but also reports which rows were skipped.
    ///
    /// Headers are trimmed, cells are not: ` Win ` is not a settled row. A row
    /// whose cells do not fit the record (a typo in `odds`, a missing column)
    /// is skipped with a warning and left untouched on disk.
    pub fn load_report(&self) -> Result<LoadedLog> {
        if !self.path.exists() {
            return Ok(LoadedLog::default());
        }
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .flexible(true)
            .from_path(&self.path)
            .with_context(|| format!("open bet log {}", self.path.display()))?;
        let headers = reader
            .headers()
            .with_context(|| format!("read bet log header {}", self.path.display()))?
            .clone();

        let mut out = LoadedLog::default();
        for (idx, row) in reader.records().enumerate() {
            let line = idx + 1;
            let parsed = row
                .map_err(anyhow::Error::from)
                .and_then(|r| Ok(r.deserialize::<BetRecord>(Some(&headers))?));
            match parsed {
                Ok(record) => out.records.push(record),
                Err(err) => {
                    warn!(row = line, path = %self.path.display(), "skipping bet log row: {err}");
                    out.skipped.push(line);
                }
            }
        }
        Ok(out)
    }

    /// Adds one row and rewrites the whole table.
    ///
    /// Existing rows are copied byte for byte under the file's own header, so
    /// hand-added columns and rows that no longer parse survive. Standard
    /// columns the header lacks are added at the end.
    pub fn append(&self, record: &BetRecord) -> Result<()> {
        let (mut header, mut rows) = self.read_raw()?;
        if header.is_empty() {
            header = ByteRecord::from(COLUMNS.to_vec());
        }

        for column in COLUMNS {
            if !header.iter().any(|h| h.trim_ascii() == column.as_bytes()) {
                header.push_field(column.as_bytes());
            }
        }
        for row in &mut rows {
            while row.len() < header.len() {
                row.push_field(b"");
            }
        }

        let cells = record.cells();
        let mut new_row = ByteRecord::new();
        for name in header.iter() {
            let value = cells
                .iter()
                .find(|(column, _)| column.as_bytes() == name.trim_ascii())
                .map(|(_, value)| value.as_str())
                .unwrap_or("");
            new_row.push_field(value.as_bytes());
        }
        rows.push(new_row);

        self.write_raw(&header, &rows)?;
        info!(
            path = %self.path.display(),
            player = %record.player,
            status = %record.status,
            rows = rows.len(),
            "bet log appended"
        );
        Ok(())
    }

    fn read_raw(&self) -> Result<(ByteRecord, Vec<ByteRecord>)> {
        if !self.path.exists() {
            return Ok((ByteRecord::new(), Vec::new()));
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)
            .with_context(|| format!("open bet log {}", self.path.display()))?;
        let header = reader
            .byte_headers()
            .with_context(|| format!("read bet log header {}", self.path.display()))?
            .clone();
        let mut rows = Vec::new();
        for row in reader.byte_records() {
            rows.push(row.with_context(|| format!("read bet log {}", self.path.display()))?);
        }
        Ok((header, rows))
    }

    fn write_raw(&self, header: &ByteRecord, rows: &[ByteRecord]) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("create bet log dir {}", dir.display()))?;
        }
        let tmp = self.path.with_extension("csv.tmp");
        {
            let mut writer = csv::WriterBuilder::new()
                .flexible(true)
                .from_path(&tmp)
                .with_context(|| format!("create {}", tmp.display()))?;
            writer
                .write_byte_record(header)
                .context("write bet log header")?;
            for row in rows {
                writer.write_byte_record(row).context("write bet log row")?;
            }
            writer.flush().context("flush bet log")?;
        }
        fs::rename(&tmp, &self.path).context("swap bet log")?;
        Ok(())
    }
}

fn opt_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote() -> OddsQuote {
        OddsQuote {
            match_name: "Penrith Panthers v Melbourne Storm".to_string(),
            player: "Brian To'o".to_string(),
            odds: 3.0,
            book: "SportsBet".to_string(),
        }
    }

    #[test]
    fn new_records_start_pending_with_clamped_confidence() {
        let eval = Evaluation {
            my_prob: 90.0,
            implied: 10.0,
            edge: 80.0,
            confidence: 480.0,
        };
        let ctx = MatchContext {
            total_points_line: Some(46.5),
            rain_mm: 0.0,
        };
        let rec = BetRecord::from_evaluation(
            &quote(),
            Some(Position::Winger),
            &eval,
            &ctx,
            " Round 7 ",
            BetStatus::Placed,
            Some(10.0),
        );
        assert_eq!(rec.result, RESULT_PENDING);
        assert_eq!(rec.confidence, 100.0);
        assert_eq!(rec.round, "Round 7");
        assert_eq!(rec.position, "Winger");
        assert_eq!(rec.status, "Placed");
        assert_eq!(rec.team_total, Some(46.5));
        assert_eq!(rec.settlement(), None);
    }

    #[test]
    fn settlement_requires_exact_labels() {
        let ctx = MatchContext::default();
        let eval = Evaluation {
            my_prob: 20.0,
            implied: 10.0,
            edge: 10.0,
            confidence: 60.0,
        };
        let mut rec = BetRecord::from_evaluation(
            &quote(),
            None,
            &eval,
            &ctx,
            "",
            BetStatus::Evaluated,
            None,
        );
        rec.result = "Win".to_string();
        assert_eq!(rec.settlement(), Some(Settlement::Win));
        rec.result = "win".to_string();
        assert_eq!(rec.settlement(), None);
        rec.result = "Loss".to_string();
        assert_eq!(rec.settlement(), Some(Settlement::Loss));
        rec.result = "Void".to_string();
        assert_eq!(rec.settlement(), None);
    }
}
