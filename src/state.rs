use std::collections::{HashMap, VecDeque};

use crate::analytics::{self, ConfidenceBucket, LogSummary, ProfitBasis};
use crate::bet_log::{BetRecord, BetStatus};
use crate::error::{FetchError, FetchResult};
use crate::model::{self, Evaluation, ModelConfig, Position};
use crate::odds_fetch::OddsBoard;

const MAX_LOGS: usize = 200;

/// One bookmaker's anytime-try price for one player.
#[derive(Debug, Clone, PartialEq)]
pub struct OddsQuote {
    pub match_name: String,
    pub player: String,
    pub odds: f64,
    pub book: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MatchContext {
    pub total_points_line: Option<f64>,
    pub rain_mm: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Live,
    Analytics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
    Round,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    Feed,
    Edge,
    Odds,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    Idle,
    Loading,
    Ready,
    NoMarkets,
    Failed(FetchError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeRow {
    pub feed_index: usize,
    pub quote: OddsQuote,
    pub position: Option<Position>,
    pub eval: Option<Evaluation>,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub tab: Tab,
    pub input_mode: InputMode,
    pub sort: SortMode,
    pub search: String,
    pub round_label: String,
    pub last_keyword: Option<String>,
    pub rows: Vec<OutcomeRow>,
    pub selected: usize,
    pub context: MatchContext,
    pub odds_status: FetchStatus,
    pub weather_status: FetchStatus,
    pub model: ModelConfig,
    pub profit_basis: ProfitBasis,
    pub default_stake: f64,
    // Positions picked per player survive a reload of the same slate.
    pub position_memory: HashMap<String, Position>,
    pub history: Vec<BetRecord>,
    pub history_error: Option<String>,
    pub history_skipped: usize,
    pub buckets: Vec<ConfidenceBucket>,
    pub summary: LogSummary,
    pub history_scroll: usize,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ModelConfig::default(), ProfitBasis::default())
    }
}

#[derive(Debug, Clone)]
pub enum Delta {
    OddsLoaded {
        keyword: String,
        odds: FetchResult<OddsBoard>,
        rain: FetchResult<f64>,
    },
    SetPosition {
        index: usize,
        position: Option<Position>,
    },
    HistoryLoaded(Vec<BetRecord>),
    /// 1-based data rows of the log that could not be read.
    HistorySkipped(Vec<usize>),
    HistoryFailed(String),
    BetLogged(BetRecord),
    Log(String),
}

impl AppState {
    pub fn new(model: ModelConfig, profit_basis: ProfitBasis) -> Self {
        Self {
            tab: Tab::Live,
            input_mode: InputMode::Normal,
            sort: SortMode::Feed,
            search: String::new(),
            round_label: String::new(),
            last_keyword: None,
            rows: Vec::with_capacity(64),
            selected: 0,
            context: MatchContext::default(),
            odds_status: FetchStatus::Idle,
            weather_status: FetchStatus::Idle,
            model,
            profit_basis,
            default_stake: analytics::DEFAULT_STAKE_UNIT,
            position_memory: HashMap::new(),
            history: Vec::new(),
            history_error: None,
            history_skipped: 0,
            buckets: Vec::new(),
            summary: LogSummary::default(),
            history_scroll: 0,
            logs: VecDeque::with_capacity(MAX_LOGS),
            help_overlay: false,
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn toggle_tab(&mut self) {
        self.tab = match self.tab {
            Tab::Live => Tab::Analytics,
            Tab::Analytics => Tab::Live,
        };
    }

    pub fn begin_loading(&mut self) {
        self.odds_status = FetchStatus::Loading;
        self.weather_status = FetchStatus::Loading;
    }

    pub fn selected_row(&self) -> Option<&OutcomeRow> {
        self.rows.get(self.selected)
    }

    pub fn select_next(&mut self) {
        match self.tab {
            Tab::Live => {
                if !self.rows.is_empty() {
                    self.selected = (self.selected + 1).min(self.rows.len() - 1);
                }
            }
            Tab::Analytics => {
                let max = self.buckets.len().saturating_sub(1);
                self.history_scroll = (self.history_scroll + 1).min(max);
            }
        }
    }

    pub fn select_prev(&mut self) {
        match self.tab {
            Tab::Live => self.selected = self.selected.saturating_sub(1),
            Tab::Analytics => self.history_scroll = self.history_scroll.saturating_sub(1),
        }
    }

    pub fn clamp_selection(&mut self) {
        if self.rows.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.rows.len() {
            self.selected = self.rows.len() - 1;
        }
    }

    pub fn cycle_position_next(&mut self) {
        if let Some(row) = self.selected_row() {
            let position = model::next_position(row.position);
            apply_delta(
                self,
                Delta::SetPosition {
                    index: self.selected,
                    position,
                },
            );
        }
    }

    pub fn cycle_position_prev(&mut self) {
        if let Some(row) = self.selected_row() {
            let position = model::prev_position(row.position);
            apply_delta(
                self,
                Delta::SetPosition {
                    index: self.selected,
                    position,
                },
            );
        }
    }

    pub fn cycle_sort(&mut self) {
        self.sort = match self.sort {
            SortMode::Feed => SortMode::Edge,
            SortMode::Edge => SortMode::Odds,
            SortMode::Odds => SortMode::Feed,
        };
        self.sort_rows();
    }

    pub fn sort_rows(&mut self) {
        let selected_key = self
            .selected_row()
            .map(|r| (r.quote.player.clone(), r.quote.book.clone()));
        match self.sort {
            SortMode::Feed => self.rows.sort_by_key(|r| r.feed_index),
            SortMode::Edge => self.rows.sort_by(|a, b| {
                let ea = a.eval.map(|e| e.edge).unwrap_or(f64::MIN);
                let eb = b.eval.map(|e| e.edge).unwrap_or(f64::MIN);
                eb.total_cmp(&ea)
            }),
            SortMode::Odds => self
                .rows
                .sort_by(|a, b| a.quote.odds.total_cmp(&b.quote.odds)),
        }
        if let Some((player, book)) = selected_key
            && let Some(pos) = self
                .rows
                .iter()
                .position(|r| r.quote.player == player && r.quote.book == book)
        {
            self.selected = pos;
        }
        self.clamp_selection();
    }

    /// Builds the row that would be written for the selected outcome.
    pub fn record_for_selected(&self, status: BetStatus) -> Option<BetRecord> {
        let row = self.selected_row()?;
        let eval = row.eval.as_ref()?;
        let stake = match status {
            BetStatus::Placed => Some(self.default_stake),
            BetStatus::Evaluated => None,
        };
        Some(BetRecord::from_evaluation(
            &row.quote,
            row.position,
            eval,
            &self.context,
            &self.round_label,
            status,
            stake,
        ))
    }

    pub fn refresh_analytics(&mut self) {
        self.buckets = analytics::aggregate_by_confidence(&self.history, &self.profit_basis);
        self.summary = analytics::summarize(&self.history, &self.profit_basis);
        self.history_scroll = self
            .history_scroll
            .min(self.buckets.len().saturating_sub(1));
    }

    fn evaluate_row(&self, row: &mut OutcomeRow) {
        row.eval = model::evaluate(row.position, &self.context, row.quote.odds, &self.model);
    }
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::OddsLoaded {
            keyword,
            odds,
            rain,
        } => {
            // Any failure degrades to the empty fallback; the status keeps the reason.
            let (board, odds_status) = match odds {
                Ok(board) if board.quotes.is_empty() => (board, FetchStatus::NoMarkets),
                Ok(board) => (board, FetchStatus::Ready),
                Err(err) => {
                    state.push_log(format!("[WARN] Odds fetch failed: {err}"));
                    (OddsBoard::default(), FetchStatus::Failed(err))
                }
            };
            let (rain_mm, weather_status) = match rain {
                Ok(mm) => (mm, FetchStatus::Ready),
                Err(err) => {
                    state.push_log(format!("[WARN] Weather fetch failed: {err}"));
                    (0.0, FetchStatus::Failed(err))
                }
            };

            state.context = MatchContext {
                total_points_line: board.total_points_line,
                rain_mm,
            };
            state.odds_status = odds_status;
            state.weather_status = weather_status;

            let mut rows = Vec::with_capacity(board.quotes.len());
            for (feed_index, quote) in board.quotes.into_iter().enumerate() {
                let position = state.position_memory.get(&quote.player).copied();
                let mut row = OutcomeRow {
                    feed_index,
                    quote,
                    position,
                    eval: None,
                };
                state.evaluate_row(&mut row);
                rows.push(row);
            }
            if state.odds_status == FetchStatus::NoMarkets {
                state.push_log(format!("[INFO] No markets found for '{keyword}'"));
            } else if state.odds_status == FetchStatus::Ready {
                state.push_log(format!(
                    "[INFO] Loaded {} prices for '{keyword}'",
                    rows.len()
                ));
            }
            state.rows = rows;
            state.last_keyword = Some(keyword);
            state.sort_rows();
            state.selected = 0;
        }
        Delta::SetPosition { index, position } => {
            let Some(mut row) = state.rows.get(index).cloned() else {
                return;
            };
            row.position = position;
            state.evaluate_row(&mut row);
            match position {
                Some(p) => {
                    state.position_memory.insert(row.quote.player.clone(), p);
                }
                None => {
                    state.position_memory.remove(&row.quote.player);
                }
            }
            // Other books' prices for the same player follow the choice.
            let player = row.quote.player.clone();
            state.rows[index] = row;
            let context = state.context;
            let cfg = state.model;
            for other in state.rows.iter_mut().filter(|r| r.quote.player == player) {
                other.position = position;
                other.eval = model::evaluate(position, &context, other.quote.odds, &cfg);
            }
        }
        Delta::HistoryLoaded(records) => {
            state.history = records;
            state.history_error = None;
            state.history_skipped = 0;
            state.refresh_analytics();
        }
        Delta::HistorySkipped(rows) => {
            let list = rows
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            state.push_log(format!(
                "[WARN] Skipped {} unreadable bet log row(s): {list}",
                rows.len()
            ));
            state.history_skipped = rows.len();
        }
        Delta::HistoryFailed(err) => {
            state.push_log(format!("[WARN] Bet log unreadable: {err}"));
            state.history_error = Some(err);
        }
        Delta::BetLogged(record) => {
            state.push_log(format!(
                "[INFO] Logged {} {} @ {:.2} ({})",
                record.status, record.player, record.odds, record.book
            ));
            state.history.push(record);
            state.refresh_analytics();
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}

pub fn tab_label(tab: Tab) -> &'static str {
    match tab {
        Tab::Live => "LIVE",
        Tab::Analytics => "ANALYTICS",
    }
}

pub fn sort_label(sort: SortMode) -> &'static str {
    match sort {
        SortMode::Feed => "FEED",
        SortMode::Edge => "EDGE",
        SortMode::Odds => "ODDS",
    }
}

pub fn fetch_status_label(status: &FetchStatus) -> String {
    match status {
        FetchStatus::Idle => "idle".to_string(),
        FetchStatus::Loading => "loading...".to_string(),
        FetchStatus::Ready => "ok".to_string(),
        FetchStatus::NoMarkets => "no markets".to_string(),
        FetchStatus::Failed(err) => format!("{} ({err})", err.short_label()),
    }
}
