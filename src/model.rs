use std::env;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::state::MatchContext;

const DEFAULT_CONFIDENCE_MULTIPLIER: f64 = 6.0;
const UNKNOWN_POSITION_BASE_RATE: f64 = 0.16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    Winger,
    Centre,
    BackRow,
    Half,
    Hooker,
    Fullback,
    Bench,
}

impl Position {
    pub const ALL: [Position; 7] = [
        Position::Winger,
        Position::Centre,
        Position::BackRow,
        Position::Half,
        Position::Hooker,
        Position::Fullback,
        Position::Bench,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Position::Winger => "Winger",
            Position::Centre => "Centre",
            Position::BackRow => "Back Row",
            Position::Half => "Half",
            Position::Hooker => "Hooker",
            Position::Fullback => "Fullback",
            Position::Bench => "Bench",
        }
    }

    /// Lenient label parsing; anything unrecognised is the unknown position.
    pub fn parse(raw: &str) -> Option<Position> {
        let key: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "winger" | "wing" => Some(Position::Winger),
            "centre" | "center" => Some(Position::Centre),
            "backrow" | "secondrow" | "lock" => Some(Position::BackRow),
            "half" | "halfback" | "fiveeighth" => Some(Position::Half),
            "hooker" => Some(Position::Hooker),
            "fullback" => Some(Position::Fullback),
            "bench" | "interchange" => Some(Position::Bench),
            _ => None,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn position_label(position: Option<Position>) -> &'static str {
    position.map(Position::label).unwrap_or("Unknown")
}

/// Cycles Unknown -> Winger -> ... -> Bench -> Unknown.
pub fn next_position(current: Option<Position>) -> Option<Position> {
    match current {
        None => Some(Position::ALL[0]),
        Some(p) => {
            let idx = Position::ALL.iter().position(|x| *x == p).unwrap_or(0);
            Position::ALL.get(idx + 1).copied()
        }
    }
}

pub fn prev_position(current: Option<Position>) -> Option<Position> {
    match current {
        None => Position::ALL.last().copied(),
        Some(p) => {
            let idx = Position::ALL.iter().position(|x| *x == p).unwrap_or(0);
            idx.checked_sub(1).map(|i| Position::ALL[i])
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ModelConfig {
    pub confidence_multiplier: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            confidence_multiplier: DEFAULT_CONFIDENCE_MULTIPLIER,
        }
    }
}

impl ModelConfig {
    pub fn from_env() -> Self {
        let confidence_multiplier = env::var("CONFIDENCE_MULTIPLIER")
            .ok()
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v > 0.0)
            .unwrap_or(DEFAULT_CONFIDENCE_MULTIPLIER);
        Self {
            confidence_multiplier,
        }
    }
}

/// Everything shown for one priced outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub my_prob: f64,
    pub implied: f64,
    pub edge: f64,
    pub confidence: f64,
}

pub fn implied_probability(odds: f64) -> Option<f64> {
    if !odds.is_finite() || odds <= 0.0 {
        return None;
    }
    Some(round_to(100.0 / odds, 2))
}

pub fn weather_factor(rain_mm: f64) -> f64 {
    if rain_mm > 5.0 {
        0.90
    } else if rain_mm > 1.0 {
        0.96
    } else {
        1.00
    }
}

pub fn team_total_factor(total_points: Option<f64>) -> f64 {
    let Some(total) = total_points.filter(|t| *t != 0.0) else {
        return 1.00;
    };
    if total >= 48.0 {
        1.12
    } else if total >= 44.0 {
        1.06
    } else if total >= 40.0 {
        1.00
    } else if total >= 36.0 {
        0.94
    } else {
        0.88
    }
}

pub fn base_rate_by_position(position: Option<Position>) -> f64 {
    match position {
        Some(Position::Winger) => 0.36,
        Some(Position::Centre) => 0.27,
        Some(Position::BackRow) => 0.19,
        Some(Position::Half) => 0.12,
        Some(Position::Hooker) => 0.15,
        Some(Position::Fullback) => 0.23,
        Some(Position::Bench) => 0.10,
        None => UNKNOWN_POSITION_BASE_RATE,
    }
}

// Factors multiply independently; nothing caps the product below 100.
pub fn estimated_probability(
    position: Option<Position>,
    total_points: Option<f64>,
    rain_mm: f64,
) -> f64 {
    let p = base_rate_by_position(position)
        * team_total_factor(total_points)
        * weather_factor(rain_mm)
        * 100.0;
    round_to(p, 2)
}

pub fn edge(estimated: f64, implied: f64) -> f64 {
    round_to(estimated - implied, 2)
}

pub fn confidence_score(edge: f64, cfg: &ModelConfig) -> f64 {
    if !edge.is_finite() {
        return 0.0;
    }
    round_to((edge * cfg.confidence_multiplier).clamp(0.0, 100.0), 1)
}

pub fn evaluate(
    position: Option<Position>,
    ctx: &MatchContext,
    odds: f64,
    cfg: &ModelConfig,
) -> Option<Evaluation> {
    let implied = implied_probability(odds)?;
    let my_prob = estimated_probability(position, ctx.total_points_line, ctx.rain_mm);
    let edge = edge(my_prob, implied);
    Some(Evaluation {
        my_prob,
        implied,
        edge,
        confidence: confidence_score(edge, cfg),
    })
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn implied_probability_from_decimal_odds() {
        assert_eq!(implied_probability(2.0), Some(50.0));
        assert_eq!(implied_probability(4.0), Some(25.0));
        assert_eq!(implied_probability(3.0), Some(33.33));
    }

    #[test]
    fn implied_probability_guards_non_positive_odds() {
        assert_eq!(implied_probability(0.0), None);
        assert_eq!(implied_probability(-1.5), None);
        assert_eq!(implied_probability(f64::NAN), None);
    }

    #[test]
    fn weather_factor_steps_are_strict() {
        assert_eq!(weather_factor(6.0), 0.90);
        assert_eq!(weather_factor(3.0), 0.96);
        assert_eq!(weather_factor(0.0), 1.00);
        assert_eq!(weather_factor(5.0), 0.96);
        assert_eq!(weather_factor(1.0), 1.00);
    }

    #[test]
    fn team_total_factor_thresholds() {
        assert_eq!(team_total_factor(Some(50.0)), 1.12);
        assert_eq!(team_total_factor(Some(48.0)), 1.12);
        assert_eq!(team_total_factor(Some(44.0)), 1.06);
        assert_eq!(team_total_factor(Some(40.5)), 1.00);
        assert_eq!(team_total_factor(Some(36.0)), 0.94);
        assert_eq!(team_total_factor(Some(30.0)), 0.88);
        assert_eq!(team_total_factor(None), 1.00);
        assert_eq!(team_total_factor(Some(0.0)), 1.00);
    }

    #[test]
    fn base_rates_and_unknown_default() {
        assert_eq!(base_rate_by_position(Position::parse("Winger")), 0.36);
        assert_eq!(base_rate_by_position(Position::parse("Unknown")), 0.16);
        assert_eq!(base_rate_by_position(Position::parse("back row")), 0.19);
        assert_eq!(base_rate_by_position(None), 0.16);
    }

    #[test]
    fn position_parse_is_lenient() {
        assert_eq!(Position::parse("BACK-ROW"), Some(Position::BackRow));
        assert_eq!(Position::parse(" fullback "), Some(Position::Fullback));
        assert_eq!(Position::parse(""), None);
        for p in Position::ALL {
            assert_eq!(Position::parse(p.label()), Some(p));
        }
    }

    #[test]
    fn position_cycle_visits_every_value_and_unknown() {
        let mut seen = Vec::new();
        let mut cur = None;
        for _ in 0..8 {
            cur = next_position(cur);
            seen.push(cur);
        }
        assert_eq!(seen.last(), Some(&None));
        assert_eq!(prev_position(None), Some(Position::Bench));
        assert_eq!(prev_position(Some(Position::Winger)), None);
    }

    #[test]
    fn winger_in_high_scoring_dry_match() {
        let cfg = ModelConfig::default();
        let ctx = MatchContext {
            total_points_line: Some(48.0),
            rain_mm: 0.0,
        };
        let eval = evaluate(Some(Position::Winger), &ctx, 3.0, &cfg).unwrap();
        assert!(close(eval.my_prob, 40.32));
        assert!(close(eval.implied, 33.33));
        assert!(close(eval.edge, 6.99));
        assert!(close(eval.confidence, 41.9));
    }

    #[test]
    fn rain_and_low_total_compound() {
        let p = estimated_probability(Some(Position::Centre), Some(34.0), 7.5);
        // 0.27 * 0.88 * 0.90 * 100
        assert!(close(p, 21.38));
    }

    #[test]
    fn confidence_is_bounded_and_monotonic() {
        let cfg = ModelConfig::default();
        let mut last = 0.0;
        let mut edge = -50.0;
        while edge <= 50.0 {
            let c = confidence_score(edge, &cfg);
            assert!((0.0..=100.0).contains(&c));
            assert!(c >= last);
            if edge <= 0.0 {
                assert_eq!(c, 0.0);
            }
            last = c;
            edge += 0.25;
        }
        assert_eq!(confidence_score(1000.0, &cfg), 100.0);
        assert_eq!(confidence_score(f64::NAN, &cfg), 0.0);
    }

    #[test]
    fn confidence_multiplier_is_tunable() {
        let cfg = ModelConfig {
            confidence_multiplier: 10.0,
        };
        assert_eq!(confidence_score(2.5, &cfg), 25.0);
    }
}
