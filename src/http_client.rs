use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::USER_AGENT;

use crate::error::{FetchError, FetchResult};

const CONNECT_TIMEOUT_SECS: u64 = 5;
const APP_USER_AGENT: &str = "try-finder/0.1";

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

/// Sends `req` with its own deadline and returns the body of a 2xx response.
pub fn send_for_body(req: RequestBuilder, timeout: Duration) -> FetchResult<String> {
    let resp = req
        .timeout(timeout)
        .header(USER_AGENT, APP_USER_AGENT)
        .send()?;
    let status = resp.status();
    let body = resp.text()?;
    check_status(status, body)
}

pub fn check_status(status: StatusCode, body: String) -> FetchResult<String> {
    if status.is_success() {
        return Ok(body);
    }
    Err(FetchError::Http {
        status: status.as_u16(),
        snippet: snippet(&body),
    })
}

fn snippet(body: &str) -> String {
    body.trim()
        .replace(['\n', '\r'], " ")
        .chars()
        .take(220)
        .collect()
}
