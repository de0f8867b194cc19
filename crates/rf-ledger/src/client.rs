//! HTTP client for the bot service

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use rf_spin_engine::{
    BalanceUpdate, CurrencyService, JackpotAmount, JackpotService, JackpotUpdate,
    LeaderboardService, ProgressionService, ServiceError, ServiceResult, XpUpdate,
};

use crate::error::{LedgerError, Result};

/// Default per-request timeout (ms)
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

// ═══════════════════════════════════════════════════════════════════════════
// REQUEST BODIES
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlayerAmount<'a> {
    player_id: &'a str,
    amount: u64,
}

#[derive(Debug, Serialize)]
struct JackpotIncrease {
    amount: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JackpotReset<'a> {
    winner_id: &'a str,
    win_amount: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LeaderboardWin<'a> {
    username: &'a str,
    amount: u64,
    is_jackpot: bool,
}

// ═══════════════════════════════════════════════════════════════════════════
// CLIENT
// ═══════════════════════════════════════════════════════════════════════════

/// Bot service client
///
/// Every endpoint is resolved relative to the base URL.
#[derive(Debug, Clone)]
pub struct BotServiceClient {
    http: reqwest::Client,
    base: Url,
}

impl BotServiceClient {
    /// Client with default settings and no API key
    pub fn new(base_url: &str) -> Result<Self> {
        BotServiceClientBuilder::new(base_url).build()
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolve an endpoint path against the base URL
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        log::debug!("[BotServiceClient] GET {}", url);
        let response = Self::check(self.http.get(url).send().await?).await?;
        Ok(response.json().await?)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let response = self.post(path, body).await?;
        Ok(response.json().await?)
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<reqwest::Response> {
        let url = self.endpoint(path)?;
        log::debug!("[BotServiceClient] POST {}", url);
        Self::check(self.http.post(url).json(body).send().await?).await
    }

    /// Turn a non-2xx response into [`LedgerError::FailedWithBody`]
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        log::warn!("[BotServiceClient] Request failed with {}: {}", status, body);
        Err(LedgerError::FailedWithBody { status, body })
    }
}

/// Builder for [`BotServiceClient`]
#[derive(Debug, Clone)]
pub struct BotServiceClientBuilder {
    base_url: String,
    api_key: Option<String>,
    timeout_ms: u64,
}

impl BotServiceClientBuilder {
    /// Create builder with base URL
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Set bearer API key
    pub fn api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    /// Set per-request timeout
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    /// Validate the base URL and build the client
    pub fn build(self) -> Result<BotServiceClient> {
        let mut base = Url::parse(&self.base_url)?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(LedgerError::InvalidScheme(base.scheme().to_string()));
        }
        // Without a trailing slash `join` would replace the last segment
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        if let Some(key) = &self.api_key {
            let mut value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|_| LedgerError::InvalidApiKey)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(self.timeout_ms))
            .default_headers(headers)
            .build()?;

        log::info!("[BotServiceClient] Using bot service at {}", base);
        Ok(BotServiceClient { http, base })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// COLLABORATOR CONTRACTS
// ═══════════════════════════════════════════════════════════════════════════

#[async_trait]
impl CurrencyService for BotServiceClient {
    async fn debit(&self, player_id: &str, amount: u64) -> ServiceResult<BalanceUpdate> {
        self.post_json("currency/debit", &PlayerAmount { player_id, amount })
            .await
            .map_err(ServiceError::from)
    }

    async fn credit(&self, player_id: &str, amount: u64) -> ServiceResult<BalanceUpdate> {
        self.post_json("currency/credit", &PlayerAmount { player_id, amount })
            .await
            .map_err(ServiceError::from)
    }
}

#[async_trait]
impl JackpotService for BotServiceClient {
    async fn read(&self) -> ServiceResult<JackpotAmount> {
        self.get_json("jackpot").await.map_err(ServiceError::from)
    }

    async fn increase(&self, amount: u64) -> ServiceResult<JackpotUpdate> {
        self.post_json("jackpot/increase", &JackpotIncrease { amount })
            .await
            .map_err(ServiceError::from)
    }

    async fn reset(&self, winner_id: &str, win_amount: u64) -> ServiceResult<JackpotUpdate> {
        self.post_json(
            "jackpot/reset",
            &JackpotReset {
                winner_id,
                win_amount,
            },
        )
        .await
        .map_err(ServiceError::from)
    }
}

#[async_trait]
impl ProgressionService for BotServiceClient {
    async fn add_xp(&self, player_id: &str, amount: u64) -> ServiceResult<XpUpdate> {
        self.post_json("xp/add", &PlayerAmount { player_id, amount })
            .await
            .map_err(ServiceError::from)
    }
}

#[async_trait]
impl LeaderboardService for BotServiceClient {
    async fn record_win(&self, username: &str, amount: u64, is_jackpot: bool) -> ServiceResult<()> {
        self.post(
            "leaderboard/wins",
            &LeaderboardWin {
                username,
                amount,
                is_jackpot,
            },
        )
        .await
        .map(|_| ())
        .map_err(ServiceError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_appends_trailing_slash() {
        let client = BotServiceClientBuilder::new("http://localhost:8080/api")
            .build()
            .unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:8080/api/");
        assert_eq!(
            client.endpoint("currency/debit").unwrap().as_str(),
            "http://localhost:8080/api/currency/debit"
        );
    }

    #[test]
    fn test_builder_rejects_bad_urls() {
        assert!(matches!(
            BotServiceClient::new("ftp://localhost/"),
            Err(LedgerError::InvalidScheme(_))
        ));
        assert!(matches!(
            BotServiceClient::new("not a url"),
            Err(LedgerError::Url(_))
        ));
    }

    #[test]
    fn test_builder_rejects_bad_api_key() {
        let result = BotServiceClientBuilder::new("http://localhost/")
            .api_key("bad\nkey")
            .build();
        assert!(matches!(result, Err(LedgerError::InvalidApiKey)));
    }

    #[test]
    fn test_request_bodies_are_camel_case() {
        let json = serde_json::to_value(JackpotReset {
            winner_id: "p1",
            win_amount: 50_000,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"winnerId": "p1", "winAmount": 50_000}));

        let json = serde_json::to_value(LeaderboardWin {
            username: "alice",
            amount: 9500,
            is_jackpot: false,
        })
        .unwrap();
        assert_eq!(json["isJackpot"], false);
    }
}
