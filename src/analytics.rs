use std::collections::HashMap;
use std::env;

use crate::bet_log::{BetRecord, RESULT_PENDING, Settlement};

pub const DEFAULT_STAKE_UNIT: f64 = 10.0;

/// Which stake profit is measured against.
///
/// `FixedUnit` ignores the stake stored on each row; `RecordStake` uses it and
/// falls back to the unit when a row has none.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProfitBasis {
    FixedUnit(f64),
    RecordStake { fallback: f64 },
}

impl Default for ProfitBasis {
    fn default() -> Self {
        ProfitBasis::FixedUnit(DEFAULT_STAKE_UNIT)
    }
}

impl ProfitBasis {
    pub fn from_env() -> Self {
        let unit = env::var("PROFIT_STAKE_UNIT")
            .ok()
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v > 0.0)
            .unwrap_or(DEFAULT_STAKE_UNIT);
        let basis = env::var("PROFIT_BASIS")
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match basis.as_str() {
            "record" | "stake" => ProfitBasis::RecordStake { fallback: unit },
            _ => ProfitBasis::FixedUnit(unit),
        }
    }

    pub fn stake_for(&self, record: &BetRecord) -> f64 {
        match *self {
            ProfitBasis::FixedUnit(unit) => unit,
            ProfitBasis::RecordStake { fallback } => record
                .stake
                .filter(|s| s.is_finite() && *s > 0.0)
                .unwrap_or(fallback),
        }
    }

    pub fn label(&self) -> String {
        match self {
            ProfitBasis::FixedUnit(unit) => format!("unit {unit}"),
            ProfitBasis::RecordStake { fallback } => format!("row stake (fallback {fallback})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceBucket {
    pub confidence: f64,
    pub mean_profit: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogSummary {
    pub total: usize,
    pub pending: usize,
    pub settled: usize,
    pub wins: usize,
    pub losses: usize,
    pub total_profit: f64,
    pub total_staked: f64,
}

impl LogSummary {
    pub fn roi_pct(&self) -> Option<f64> {
        if self.total_staked <= 0.0 {
            return None;
        }
        Some(self.total_profit / self.total_staked * 100.0)
    }

    pub fn win_rate_pct(&self) -> Option<f64> {
        if self.settled == 0 {
            return None;
        }
        Some(self.wins as f64 / self.settled as f64 * 100.0)
    }
}

/// Profit of one settled row; `None` for anything not exactly Win/Loss.
pub fn compute_profit(record: &BetRecord, basis: &ProfitBasis) -> Option<f64> {
    let stake = basis.stake_for(record);
    match record.settlement()? {
        Settlement::Win => Some((record.odds - 1.0) * stake),
        Settlement::Loss => Some(-stake),
    }
}

/// Mean profit per distinct stored confidence value, ascending.
pub fn aggregate_by_confidence(records: &[BetRecord], basis: &ProfitBasis) -> Vec<ConfidenceBucket> {
    // Keyed on the exact bit pattern so 41.9 and 41.90000001 stay separate.
    let mut groups: HashMap<u64, (f64, f64, usize)> = HashMap::new();
    for record in records {
        let Some(profit) = compute_profit(record, basis) else {
            continue;
        };
        if record.confidence.is_nan() {
            continue;
        }
        let key = normalize_zero(record.confidence).to_bits();
        let entry = groups
            .entry(key)
            .or_insert((normalize_zero(record.confidence), 0.0, 0));
        entry.1 += profit;
        entry.2 += 1;
    }

    let mut out: Vec<ConfidenceBucket> = groups
        .into_values()
        .map(|(confidence, sum, n)| ConfidenceBucket {
            confidence,
            mean_profit: sum / n as f64,
            samples: n,
        })
        .collect();
    out.sort_by(|a, b| a.confidence.total_cmp(&b.confidence));
    out
}

pub fn summarize(records: &[BetRecord], basis: &ProfitBasis) -> LogSummary {
    let mut summary = LogSummary {
        total: records.len(),
        ..LogSummary::default()
    };
    for record in records {
        if record.result == RESULT_PENDING {
            summary.pending += 1;
        }
        let Some(profit) = compute_profit(record, basis) else {
            continue;
        };
        summary.settled += 1;
        summary.total_profit += profit;
        summary.total_staked += basis.stake_for(record);
        match record.settlement() {
            Some(Settlement::Win) => summary.wins += 1,
            Some(Settlement::Loss) => summary.losses += 1,
            None => {}
        }
    }
    summary
}

// -0.0 and 0.0 have different bits but are the same confidence.
fn normalize_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(result: &str, odds: f64, confidence: f64, stake: Option<f64>) -> BetRecord {
        BetRecord {
            date: "2026-03-07".to_string(),
            round: "1".to_string(),
            match_name: "A v B".to_string(),
            player: "P".to_string(),
            odds,
            book: "SportsBet".to_string(),
            my_prob: 30.0,
            edge: 5.0,
            stake,
            bet_type: "Anytime Try".to_string(),
            result: result.to_string(),
            position: "Winger".to_string(),
            team_total: Some(44.5),
            status: "Placed".to_string(),
            confidence,
        }
    }

    #[test]
    fn fixed_unit_ignores_row_stake() {
        let basis = ProfitBasis::default();
        assert_eq!(compute_profit(&row("Win", 3.0, 40.0, Some(50.0)), &basis), Some(20.0));
        assert_eq!(compute_profit(&row("Loss", 3.0, 40.0, Some(50.0)), &basis), Some(-10.0));
        assert_eq!(compute_profit(&row("Pending", 3.0, 40.0, None), &basis), None);
    }

    #[test]
    fn record_stake_basis_uses_row_stake() {
        let basis = ProfitBasis::RecordStake { fallback: 10.0 };
        assert_eq!(compute_profit(&row("Win", 3.0, 40.0, Some(50.0)), &basis), Some(100.0));
        assert_eq!(compute_profit(&row("Loss", 3.0, 40.0, None), &basis), Some(-10.0));
    }

    #[test]
    fn groups_by_exact_confidence() {
        let basis = ProfitBasis::default();
        let rows = vec![
            row("Win", 3.0, 41.9, None),
            row("Loss", 3.0, 41.9, None),
            row("Win", 2.0, 12.0, None),
            row("Pending", 2.0, 12.0, None),
            row("win", 2.0, 12.0, None),
            row("Loss", 2.0, 0.0, None),
        ];
        let buckets = aggregate_by_confidence(&rows, &basis);
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0].confidence, 0.0);
        assert_eq!(buckets[0].mean_profit, -10.0);
        assert_eq!(buckets[1].confidence, 12.0);
        assert_eq!(buckets[1].samples, 1);
        assert_eq!(buckets[1].mean_profit, 10.0);
        assert_eq!(buckets[2].confidence, 41.9);
        assert_eq!(buckets[2].samples, 2);
        assert_eq!(buckets[2].mean_profit, 5.0);
    }

    #[test]
    fn summary_counts_and_roi() {
        let basis = ProfitBasis::default();
        let rows = vec![
            row("Win", 3.0, 41.9, None),
            row("Loss", 3.0, 41.9, None),
            row("Loss", 3.0, 20.0, None),
            row("Pending", 3.0, 20.0, None),
        ];
        let s = summarize(&rows, &basis);
        assert_eq!(s.total, 4);
        assert_eq!(s.pending, 1);
        assert_eq!(s.settled, 3);
        assert_eq!(s.wins, 1);
        assert_eq!(s.losses, 2);
        assert_eq!(s.total_profit, 0.0);
        assert_eq!(s.total_staked, 30.0);
        assert_eq!(s.roi_pct(), Some(0.0));
        assert!(summarize(&[], &basis).roi_pct().is_none());
    }
}
