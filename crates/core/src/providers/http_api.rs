use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;
use tracing::{debug, warn};

use crate::errors::CoreError;
use crate::models::candle::Candle;
use crate::models::settings::{Settings, SUPPORTED_TIMEFRAMES};
use crate::models::trade::{Direction, Trade, TradeKind};
use super::traits::{CandleProvider, TradeStore};

const PROVIDER: &str = "Journal API";

/// Client for the journal backend's REST API.
///
/// - `POST /intraday/`: candles for ticker/timeframe/session
/// - `GET /trades/{ticker}/{date}?type=`: stored trades for a session
/// - `POST /trades/`: store a trade
/// - `DELETE /trades/{id}`: delete a stored trade
/// - `POST /auth/login`: exchange credentials for a bearer token
/// - `POST /auth/register`: create an account
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct HttpApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl std::fmt::Debug for HttpApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApiClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

impl HttpApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, 30)
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let mut client = Self::with_timeout(settings.api_url.clone(), settings.request_timeout_secs);
        client.token = settings.auth_token.clone();
        client
    }

    #[cfg_attr(target_arch = "wasm32", allow(unused_variables))]
    fn with_timeout(base_url: impl Into<String>, timeout_secs: u64) -> Self {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(Duration::from_secs(timeout_secs));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Attach a bearer token to every subsequent request.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Log in with username/password (OAuth2 password form) and return
    /// the access token. The client itself is not modified.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, CoreError> {
        let url = format!("{}/auth/login", self.base_url);
        let resp = self
            .client
            .post(&url)
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;
        let resp = ensure_success(resp, "Failed to login").await.map_err(|reason| {
            CoreError::Api {
                provider: PROVIDER.into(),
                message: reason,
            }
        })?;

        let body: LoginResponse = resp.json().await.map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to parse login response: {e}"),
        })?;
        debug!(user = username, "logged in to journal API");
        Ok(body.access_token)
    }

    /// Create an account. Log in afterwards to obtain a token.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<RegisteredUser, CoreError> {
        let url = format!("{}/auth/register", self.base_url);
        let body = RegisterRequest {
            username,
            email,
            password,
        };
        let resp = self.client.post(&url).json(&body).send().await?;
        let resp = ensure_success(resp, "Registration failed").await.map_err(|reason| {
            CoreError::Api {
                provider: PROVIDER.into(),
                message: reason,
            }
        })?;

        let user: RegisteredUser = resp.json().await.map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to parse registration response: {e}"),
        })?;
        debug!(user = %user.username, "registered with journal API");
        Ok(user)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

/// Account returned by `POST /auth/register`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisteredUser {
    #[serde(default)]
    pub id: Option<i64>,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Deserialize)]
struct LoginResponse {
    access_token: String,
}

#[derive(Serialize)]
struct IntradayRequest<'a> {
    ticker: &'a str,
    timeframe: &'a str,
    trading_date: String,
}

#[derive(Deserialize)]
struct WireCandle {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    trading_date: Option<NaiveDate>,
    #[serde(default)]
    ema20: Option<f64>,
    #[serde(default)]
    prev_day_high: Option<f64>,
    #[serde(default)]
    prev_day_low: Option<f64>,
}

impl WireCandle {
    fn into_candle(self) -> Result<Candle, CoreError> {
        Ok(Candle {
            timestamp: parse_timestamp(&self.timestamp)?,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            trading_date: self.trading_date,
            ema20: self.ema20,
            prev_day_high: self.prev_day_high,
            prev_day_low: self.prev_day_low,
        })
    }
}

#[derive(Deserialize)]
struct WireTrade {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    ticker: String,
    #[serde(rename = "type", default)]
    kind: TradeKind,
    direction: Direction,
    size: f64,
    entry_price: f64,
    entry_time: Option<String>,
    #[serde(default)]
    exit_price: Option<f64>,
    #[serde(default)]
    exit_time: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

impl WireTrade {
    fn into_trade(self) -> Result<Trade, CoreError> {
        let entry_time = self
            .entry_time
            .as_deref()
            .ok_or_else(|| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Trade {:?} has no entry_time", self.id),
            })
            .and_then(parse_timestamp)?;
        let exit_time = self.exit_time.as_deref().map(parse_timestamp).transpose()?;

        let mut trade = Trade::open(self.ticker, self.direction, self.size, self.entry_price, entry_time)
            .with_kind(self.kind);
        trade.id = self.id;
        trade.exit_price = self.exit_price;
        trade.exit_time = exit_time;
        trade.notes = self.notes;
        Ok(trade)
    }
}

/// Body of `POST /trades/`: times as UTC RFC 3339, ticker lower-cased.
#[derive(Serialize)]
struct NewTradeRequest<'a> {
    ticker: String,
    #[serde(rename = "type")]
    kind: TradeKind,
    direction: Direction,
    size: f64,
    entry_price: f64,
    entry_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    exit_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exit_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<&'a str>,
}

impl<'a> From<&'a Trade> for NewTradeRequest<'a> {
    fn from(t: &'a Trade) -> Self {
        Self {
            ticker: t.ticker.to_lowercase(),
            kind: t.kind,
            direction: t.direction,
            size: t.size,
            entry_price: t.entry_price,
            entry_time: t.entry_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            exit_price: t.exit_price,
            exit_time: t
                .exit_time
                .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true)),
            notes: t.notes.as_deref(),
        }
    }
}

/// Parse a backend timestamp: RFC 3339, or a naive date-time taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, CoreError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Unrecognized timestamp '{raw}'"),
        })
}

/// Pass successful responses through; turn failures into a readable reason.
///
/// The reason is the JSON `detail` field when present (FastAPI style),
/// else the raw body, else `fallback` with the status code.
async fn ensure_success(resp: Response, fallback: &str) -> Result<Response, String> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    Err(failure_reason(status.as_u16(), &text, fallback))
}

/// Human-readable reason for a failed response body.
pub fn failure_reason(status: u16, body: &str, fallback: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string));
    match detail {
        Some(detail) if !detail.trim().is_empty() => detail,
        _ if !body.trim().is_empty() => body.trim().to_string(),
        _ => format!("{fallback} (HTTP {status})"),
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl CandleProvider for HttpApiClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn supported_timeframes(&self) -> Vec<String> {
        SUPPORTED_TIMEFRAMES.iter().map(|s| s.to_string()).collect()
    }

    async fn get_candles(
        &self,
        ticker: &str,
        timeframe: &str,
        trading_date: NaiveDate,
    ) -> Result<Vec<Candle>, CoreError> {
        let url = format!("{}/intraday/", self.base_url);
        let body = IntradayRequest {
            ticker,
            timeframe,
            trading_date: trading_date.format("%Y-%m-%d").to_string(),
        };

        let resp = self.authorized(self.client.post(&url)).json(&body).send().await?;
        let resp = ensure_success(resp, "Failed to fetch candles")
            .await
            .map_err(|reason| CoreError::Api {
                provider: PROVIDER.into(),
                message: reason,
            })?;

        let wire: Vec<WireCandle> = resp.json().await.map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to parse candles for {ticker} ({timeframe}) on {trading_date}: {e}"),
        })?;

        let mut candles = wire
            .into_iter()
            .map(WireCandle::into_candle)
            .collect::<Result<Vec<_>, _>>()?;
        candles.sort_by_key(|c| c.timestamp);
        debug!(ticker, timeframe, %trading_date, count = candles.len(), "candles fetched");
        Ok(candles)
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl TradeStore for HttpApiClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn save_trade(&self, trade: &Trade) -> Result<Trade, CoreError> {
        let url = format!("{}/trades/", self.base_url);
        let body = NewTradeRequest::from(trade);

        let resp = self
            .authorized(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::Persistence(CoreError::from(e).to_string()))?;
        let resp = ensure_success(resp, "Failed to save trade")
            .await
            .map_err(|reason| {
                warn!(%reason, "journal API rejected trade");
                CoreError::Persistence(reason)
            })?;

        let wire: WireTrade = resp
            .json()
            .await
            .map_err(|e| CoreError::Persistence(format!("Unreadable response: {e}")))?;
        wire.into_trade()
            .map_err(|e| CoreError::Persistence(e.to_string()))
    }

    async fn delete_trade(&self, id: i64) -> Result<(), CoreError> {
        let url = format!("{}/trades/{id}", self.base_url);
        let resp = self.authorized(self.client.delete(&url)).send().await?;
        ensure_success(resp, "Failed to delete trade")
            .await
            .map_err(|reason| {
                warn!(id, %reason, "journal API refused trade deletion");
                CoreError::Api {
                    provider: PROVIDER.into(),
                    message: reason,
                }
            })?;
        debug!(id, "trade deleted on server");
        Ok(())
    }

    async fn get_trades(
        &self,
        ticker: &str,
        trading_date: NaiveDate,
        kind: TradeKind,
    ) -> Result<Vec<Trade>, CoreError> {
        let date_str = trading_date.format("%Y-%m-%d");
        let url = format!("{}/trades/{}/{date_str}", self.base_url, ticker.to_lowercase());

        let resp = self
            .authorized(self.client.get(&url))
            .query(&[("type", kind.to_string())])
            .send()
            .await?;
        let resp = ensure_success(resp, "Failed to fetch trades")
            .await
            .map_err(|reason| CoreError::Api {
                provider: PROVIDER.into(),
                message: reason,
            })?;

        let wire: Vec<WireTrade> = resp.json().await.map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to parse {kind} trades for {ticker} ({date_str}): {e}"),
        })?;
        wire.into_iter().map(WireTrade::into_trade).collect()
    }
}
