use anyhow::{Context, Result};
use tracing::{error, info};

use crate::bet_log::{BetLog, BetStatus};
use crate::config::AppConfig;
use crate::odds_fetch;
use crate::state::{AppState, Delta};
use crate::weather_fetch::{self, FixedVenue, VenueResolver};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCommand {
    LoadOdds { keyword: String },
    ReloadHistory,
    LogSelected { status: BetStatus },
}

/// Runs commands on the calling thread and answers with state deltas.
pub struct Provider {
    cfg: AppConfig,
    venues: Box<dyn VenueResolver>,
    log: BetLog,
}

impl Provider {
    pub fn new(cfg: AppConfig, log: BetLog) -> Self {
        Self::with_venues(cfg, log, Box::new(FixedVenue::default()))
    }

    pub fn with_venues(cfg: AppConfig, log: BetLog, venues: Box<dyn VenueResolver>) -> Self {
        Self { cfg, venues, log }
    }

    pub fn bet_log(&self) -> &BetLog {
        &self.log
    }

    /// Fetch failures come back inside the delta; only log writes return `Err`.
    pub fn handle(&self, state: &AppState, cmd: ProviderCommand) -> Result<Vec<Delta>> {
        match cmd {
            ProviderCommand::LoadOdds { keyword } => {
                let odds = odds_fetch::fetch_odds_board(&keyword, &self.cfg.odds);
                let rain =
                    weather_fetch::fetch_rain_mm(&keyword, self.venues.as_ref(), &self.cfg.weather);
                Ok(vec![Delta::OddsLoaded {
                    keyword,
                    odds,
                    rain,
                }])
            }
            ProviderCommand::ReloadHistory => Ok(self.load_history()),
            ProviderCommand::LogSelected { status } => {
                let Some(record) = state.record_for_selected(status) else {
                    return Ok(vec![Delta::Log(
                        "[INFO] Nothing priced is selected".to_string(),
                    )]);
                };
                self.log
                    .append(&record)
                    .with_context(|| format!("append to {}", self.log.path().display()))
                    .inspect_err(|err| error!("bet log write failed: {err:#}"))?;
                Ok(vec![Delta::BetLogged(record)])
            }
        }
    }

    pub fn load_history(&self) -> Vec<Delta> {
        match self.log.load_report() {
            Ok(loaded) => {
                info!(
                    rows = loaded.records.len(),
                    skipped = loaded.skipped.len(),
                    path = %self.log.path().display(),
                    "bet log loaded"
                );
                let mut deltas = vec![Delta::HistoryLoaded(loaded.records)];
                if !loaded.skipped.is_empty() {
                    deltas.push(Delta::HistorySkipped(loaded.skipped));
                }
                deltas
            }
            Err(err) => {
                error!("bet log read failed: {err:#}");
                vec![Delta::HistoryFailed(format!("{err:#}"))]
            }
        }
    }
}
