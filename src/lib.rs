pub mod analytics;
pub mod bet_log;
pub mod config;
pub mod error;
pub mod http_client;
pub mod logging;
pub mod model;
pub mod odds_fetch;
pub mod provider;
pub mod state;
pub mod weather_fetch;
