use std::env;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{FetchError, FetchResult};
use crate::http_client::{http_client, send_for_body};
use crate::state::OddsQuote;

pub const SPORT_KEY: &str = "rugbyleague_nrl";
pub const BOOKMAKERS: &str = "sportsbet,bet365";
pub const REGIONS: &str = "au";
pub const MARKETS: &str = "player_anytime_try,totals";

const DEFAULT_API_BASE: &str = "https://api.the-odds-api.com";
const ODDS_TIMEOUT_SECS: u64 = 12;

const MARKET_TOTALS: &str = "totals";
const MARKET_ANYTIME_TRY: &str = "player_anytime_try";

#[derive(Debug, Clone)]
pub struct OddsFetchConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub timeout: Duration,
}

impl OddsFetchConfig {
    pub fn from_env() -> Self {
        let api_key = env::var("ODDS_API_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let api_base = env::var("ODDS_API_BASE")
            .ok()
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        Self {
            api_key,
            api_base,
            timeout: Duration::from_secs(ODDS_TIMEOUT_SECS),
        }
    }

    pub fn odds_url(&self) -> String {
        format!("{}/v4/sports/{SPORT_KEY}/odds", self.api_base)
    }
}

/// Anytime-try prices for the matched games, plus the totals line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OddsBoard {
    pub quotes: Vec<OddsQuote>,
    pub total_points_line: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OddsEvent {
    home_team: String,
    away_team: String,
    #[serde(default)]
    bookmakers: Vec<OddsBookmaker>,
}

#[derive(Debug, Deserialize)]
struct OddsBookmaker {
    #[serde(default)]
    key: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    markets: Vec<OddsMarket>,
}

#[derive(Debug, Deserialize)]
struct OddsMarket {
    key: String,
    #[serde(default)]
    outcomes: Vec<OddsOutcome>,
}

#[derive(Debug, Deserialize)]
struct OddsOutcome {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    point: Option<f64>,
}

pub fn fetch_odds_board(keyword: &str, cfg: &OddsFetchConfig) -> FetchResult<OddsBoard> {
    let Some(api_key) = cfg.api_key.as_deref() else {
        warn!("odds fetch skipped: no api key");
        return Err(FetchError::MissingApiKey);
    };

    let client = http_client().map_err(|e| FetchError::Network(format!("{e:#}")))?;
    let req = client.get(cfg.odds_url()).query(&[
        ("apiKey", api_key),
        ("regions", REGIONS),
        ("markets", MARKETS),
        ("bookmakers", BOOKMAKERS),
        ("oddsFormat", "decimal"),
    ]);

    debug!(keyword, url = %cfg.odds_url(), "requesting odds");
    let body = send_for_body(req, cfg.timeout)?;
    let board = parse_odds_json(&body, keyword)?;
    info!(
        keyword,
        quotes = board.quotes.len(),
        total = ?board.total_points_line,
        "odds loaded"
    );
    Ok(board)
}

pub fn parse_odds_json(raw: &str, keyword: &str) -> FetchResult<OddsBoard> {
    let events: Vec<OddsEvent> = serde_json::from_str(raw)?;
    Ok(build_board(&events, keyword))
}

fn build_board(events: &[OddsEvent], keyword: &str) -> OddsBoard {
    let needle = keyword.trim();
    let mut board = OddsBoard::default();

    for event in events {
        let match_name = format!("{} v {}", event.home_team, event.away_team);
        if !contains_ci(&match_name, needle) {
            continue;
        }

        for book in &event.bookmakers {
            let book_name = if book.title.trim().is_empty() {
                book.key.clone()
            } else {
                book.title.clone()
            };

            for market in &book.markets {
                if market.key.eq_ignore_ascii_case(MARKET_TOTALS) {
                    // Later books overwrite earlier ones.
                    if let Some(point) = market
                        .outcomes
                        .iter()
                        .rev()
                        .filter(|o| o.name.eq_ignore_ascii_case("over"))
                        .find_map(|o| o.point)
                    {
                        board.total_points_line = Some(point);
                    }
                } else if market.key.eq_ignore_ascii_case(MARKET_ANYTIME_TRY) {
                    for outcome in &market.outcomes {
                        let Some(price) = outcome.price.filter(|p| p.is_finite() && *p >= 1.0)
                        else {
                            continue;
                        };
                        board.quotes.push(OddsQuote {
                            match_name: match_name.clone(),
                            player: outcome_player(outcome),
                            odds: price,
                            book: book_name.clone(),
                        });
                    }
                }
            }
        }
    }

    board
}

// Player markets put the player in `description` and "Yes" in `name`; older
// payloads carry the player in `name`.
fn outcome_player(outcome: &OddsOutcome) -> String {
    outcome
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| outcome.name.trim())
        .to_string()
}

/// Case-insensitive substring search using full Unicode lowercasing.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
      {
        "home_team": "Penrith Panthers",
        "away_team": "Melbourne Storm",
        "bookmakers": [
          {
            "key": "sportsbet",
            "title": "SportsBet",
            "markets": [
              {"key": "totals", "outcomes": [
                {"name": "Over", "price": 1.9, "point": 42.5},
                {"name": "Under", "price": 1.9, "point": 42.5}
              ]},
              {"key": "player_anytime_try", "outcomes": [
                {"name": "Yes", "description": "Brian To'o", "price": 2.1},
                {"name": "Sunia Turuva", "price": 2.4},
                {"name": "Broken Price", "price": 0.5}
              ]}
            ]
          }
        ]
      },
      {
        "home_team": "Brisbane Broncos",
        "away_team": "Parramatta Eels",
        "bookmakers": []
      }
    ]"#;

    #[test]
    fn keyword_filters_case_insensitively() {
        let board = parse_odds_json(SAMPLE, "panthers").unwrap();
        assert_eq!(board.quotes.len(), 2);
        assert_eq!(board.quotes[0].match_name, "Penrith Panthers v Melbourne Storm");
        assert_eq!(board.total_points_line, Some(42.5));

        let none = parse_odds_json(SAMPLE, "Dragons").unwrap();
        assert!(none.quotes.is_empty());
        assert_eq!(none.total_points_line, None);
    }

    #[test]
    fn player_name_prefers_description() {
        let board = parse_odds_json(SAMPLE, "").unwrap();
        let players: Vec<&str> = board.quotes.iter().map(|q| q.player.as_str()).collect();
        assert_eq!(players, vec!["Brian To'o", "Sunia Turuva"]);
        assert_eq!(board.quotes[0].book, "SportsBet");
    }

    #[test]
    fn prices_below_one_are_dropped() {
        let board = parse_odds_json(SAMPLE, "storm").unwrap();
        assert!(board.quotes.iter().all(|q| q.odds >= 1.0));
    }

    #[test]
    fn error_object_is_a_parse_failure() {
        let err = parse_odds_json(r#"{"message":"Invalid api key"}"#, "x").unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn missing_key_short_circuits() {
        let cfg = OddsFetchConfig {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(
            fetch_odds_board("storm", &cfg).unwrap_err(),
            FetchError::MissingApiKey
        );
    }

    #[test]
    fn contains_ci_basics() {
        assert!(contains_ci("Penrith Panthers", "PANTH"));
        assert!(contains_ci("abc", ""));
        assert!(!contains_ci("ab", "abc"));
        assert!(contains_ci("Māori All Stars v Indigenous All Stars", "MĀORI"));
        assert!(contains_ci("Ōtautahi Club v Storm", "ōtautahi"));
    }
}
