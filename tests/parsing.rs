use std::fs;
use std::path::PathBuf;

use try_finder::error::FetchError;
use try_finder::odds_fetch::parse_odds_json;
use try_finder::weather_fetch::parse_rain_json;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_odds_fixture_for_matching_event() {
    let raw = read_fixture("odds_nrl.json");
    let board = parse_odds_json(&raw, "storm").expect("fixture should parse");
    assert_eq!(board.quotes.len(), 3);
    assert_eq!(board.quotes[0].player, "Ryan Papenhuyzen");
    assert_eq!(board.quotes[0].book, "SportsBet");
    assert_eq!(board.quotes[0].odds, 2.5);
    assert_eq!(board.quotes[0].match_name, "Melbourne Storm v Parramatta Eels");
    // Empty title falls back to the bookmaker key.
    assert_eq!(board.quotes[2].book, "bet365");
    assert!(board.quotes.iter().all(|q| q.player != "Bad Price"));
    assert_eq!(board.total_points_line, Some(46.5));
}

#[test]
fn odds_keyword_filters_other_events() {
    let raw = read_fixture("odds_nrl.json");
    let board = parse_odds_json(&raw, "Panthers v Bri").expect("fixture should parse");
    assert_eq!(board.quotes.len(), 1);
    assert_eq!(board.quotes[0].player, "Brian To'o");
    assert_eq!(board.total_points_line, None);

    let none = parse_odds_json(&raw, "Roosters").expect("fixture should parse");
    assert!(none.quotes.is_empty());
    assert!(none.total_points_line.is_none());
}

#[test]
fn keyword_ignores_case_beyond_ascii() {
    let raw = r#"[{"home_team":"Māori All Stars","away_team":"Indigenous All Stars","bookmakers":[
        {"key":"sportsbet","title":"SportsBet","markets":[
            {"key":"player_anytime_try","outcomes":[{"name":"Yes","description":"Joseph Manu","price":2.4}]}
        ]}
    ]}]"#;
    let board = parse_odds_json(raw, "MĀORI").expect("inline json should parse");
    assert_eq!(board.quotes.len(), 1);
    assert_eq!(board.quotes[0].player, "Joseph Manu");
}

#[test]
fn empty_keyword_matches_every_event() {
    let raw = read_fixture("odds_nrl.json");
    let board = parse_odds_json(&raw, "").expect("fixture should parse");
    assert_eq!(board.quotes.len(), 4);
}

#[test]
fn empty_odds_array_is_empty_board() {
    let board = parse_odds_json("[]", "Storm").expect("empty array should parse");
    assert!(board.quotes.is_empty());
    assert!(board.total_points_line.is_none());
}

#[test]
fn odds_error_object_is_parse_error() {
    let raw = r#"{"message":"Invalid API key"}"#;
    let err = parse_odds_json(raw, "Storm").unwrap_err();
    assert!(matches!(err, FetchError::Parse(_)));
}

#[test]
fn parses_weather_fixture() {
    let raw = read_fixture("weather.json");
    assert_eq!(parse_rain_json(&raw).expect("fixture should parse"), 2.6);
}

#[test]
fn weather_without_current_block_is_parse_error() {
    let err = parse_rain_json(r#"{"latitude":-33.8}"#).unwrap_err();
    assert!(matches!(err, FetchError::Parse(_)));
}
