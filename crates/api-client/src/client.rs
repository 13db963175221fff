use std::time::Duration;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use tracing::debug;

use timegrid_api::{
    CreateTimeLogRequest, DaySnapshot, LogId, TimeLogRecord, UpdateTimeLogRequest,
};

/// Typed HTTP client for the timegrid persistence API.
///
/// Mutation failures are returned to the caller unretried: the board stays at
/// its last known-good state and recovery happens through the next snapshot
/// poll or push event, not through blind resubmission.
pub struct TimelineClient {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl TimelineClient {
    /// Create a new client with the given base URL and timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: None,
        })
    }

    /// Create from an existing `reqwest::Client` (e.g. shared in tests).
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: None,
        }
    }

    pub fn set_auth(&mut self, token: String) {
        self.auth_token = Some(token);
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn token_or_bail(&self) -> Result<&str> {
        self.auth_token
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("auth token not set"))
    }

    /// The push-channel endpoint for this server, with the auth token as a
    /// query parameter (the channel cannot carry headers from a browser).
    pub fn push_url(&self) -> Result<String> {
        let token = self.token_or_bail()?;
        let ws_base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            bail!("base URL has no http(s) scheme: {}", self.base_url);
        };
        Ok(format!("{ws_base}/api/ws?token={token}"))
    }

    // ── Time logs ─────────────────────────────────────────────────────────

    pub async fn create_time_log(&self, req: &CreateTimeLogRequest) -> Result<TimeLogRecord> {
        let token = self.token_or_bail()?;
        debug!(user_id = req.user_id, "creating time log");
        let resp = self
            .client
            .post(self.url("/time-logs"))
            .bearer_auth(token)
            .json(req)
            .send()
            .await?;
        parse_response(resp).await
    }

    pub async fn update_time_log(
        &self,
        id: LogId,
        req: &UpdateTimeLogRequest,
    ) -> Result<TimeLogRecord> {
        let token = self.token_or_bail()?;
        debug!(id, "updating time log");
        let resp = self
            .client
            .patch(self.url(&format!("/time-logs/{id}")))
            .bearer_auth(token)
            .json(req)
            .send()
            .await?;
        parse_response(resp).await
    }

    pub async fn delete_time_log(&self, id: LogId) -> Result<()> {
        let token = self.token_or_bail()?;
        debug!(id, "deleting time log");
        let resp = self
            .client
            .delete(self.url(&format!("/time-logs/{id}")))
            .bearer_auth(token)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("{status}: {body}");
        }
        Ok(())
    }

    // ── Day snapshot ──────────────────────────────────────────────────────

    /// Fetch every member's time logs for one calendar date (canonical
    /// timezone).
    pub async fn fetch_day(&self, date: NaiveDate) -> Result<DaySnapshot> {
        let token = self.token_or_bail()?;
        let resp = self
            .client
            .get(self.url("/users"))
            .bearer_auth(token)
            .query(&[("date", date.to_string())])
            .send()
            .await?;
        parse_response(resp).await
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("{status}: {body}");
    }
    Ok(resp.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> TimelineClient {
        TimelineClient::with_client(reqwest::Client::new(), base)
    }

    #[test]
    fn base_url_is_trimmed() {
        let c = client("http://localhost:3000/");
        assert_eq!(c.base_url(), "http://localhost:3000");
        assert_eq!(c.url("/time-logs"), "http://localhost:3000/api/time-logs");
    }

    #[test]
    fn push_url_swaps_scheme_and_carries_token() {
        let mut c = client("https://grid.example.com");
        c.set_auth("sekrit".into());
        assert_eq!(
            c.push_url().unwrap(),
            "wss://grid.example.com/api/ws?token=sekrit"
        );

        let mut c = client("http://localhost:3000");
        c.set_auth("t".into());
        assert_eq!(c.push_url().unwrap(), "ws://localhost:3000/api/ws?token=t");
    }

    #[test]
    fn push_url_requires_token() {
        assert!(client("http://localhost:3000").push_url().is_err());
    }

    #[test]
    fn push_url_rejects_unknown_scheme() {
        let mut c = client("ftp://grid.example.com");
        c.set_auth("t".into());
        assert!(c.push_url().is_err());
    }
}
