use std::env;

use crate::analytics::ProfitBasis;
use crate::model::ModelConfig;
use crate::odds_fetch::OddsFetchConfig;
use crate::weather_fetch::WeatherFetchConfig;

const DEFAULT_STAKE: f64 = 10.0;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub odds: OddsFetchConfig,
    pub weather: WeatherFetchConfig,
    pub model: ModelConfig,
    pub profit_basis: ProfitBasis,
    /// Stake written on rows logged as placed bets.
    pub default_stake: f64,
    pub round_label: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let default_stake = env::var("DEFAULT_STAKE")
            .ok()
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v > 0.0)
            .unwrap_or(DEFAULT_STAKE);
        let round_label = env::var("ROUND_LABEL")
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        Self {
            odds: OddsFetchConfig::from_env(),
            weather: WeatherFetchConfig::from_env(),
            model: ModelConfig::from_env(),
            profit_basis: ProfitBasis::from_env(),
            default_stake,
            round_label,
        }
    }
}
