use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use time::OffsetDateTime;
use tracing::debug;

use crate::errors::CoreError;
use crate::models::candle::Candle;
use super::traits::CandleProvider;

const PROVIDER: &str = "Yahoo Finance";

/// Journal timeframe → Yahoo chart interval.
const INTERVALS: &[(&str, &str)] = &[
    ("1min", "1m"),
    ("5min", "5m"),
    ("15min", "15m"),
    ("30min", "30m"),
    ("1h", "1h"),
    ("1d", "1d"),
];

/// Journal tickers whose Yahoo symbol is not just the upper-cased ticker.
const SYMBOL_ALIASES: &[(&str, &str)] = &[("xauusd", "GC=F"), ("xagusd", "SI=F")];

/// Yahoo Finance fallback for intraday candles.
///
/// - **Free**: No API key required.
/// - **Coverage**: equities, futures, FX (`EURUSD=X` style symbols).
/// - **Limits**: 1-minute bars only for the last ~30 days; no 4h bars.
///
/// Yahoo does not publish the backend's EMA / previous-day fields, so
/// those stay `None`.
///
/// **Note**: Not WASM-compatible (uses native reqwest/tokio).
pub struct YahooCandleProvider {
    connector: yahoo_finance_api::YahooConnector,
}

impl YahooCandleProvider {
    pub fn new() -> Result<Self, CoreError> {
        let connector = yahoo_finance_api::YahooConnector::new().map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to create connector: {e}"),
        })?;
        Ok(Self { connector })
    }

    /// Yahoo symbol for a journal ticker.
    #[must_use]
    pub fn yahoo_symbol(ticker: &str) -> String {
        let lower = ticker.to_lowercase();
        SYMBOL_ALIASES
            .iter()
            .find(|(t, _)| *t == lower)
            .map(|(_, s)| s.to_string())
            .unwrap_or_else(|| ticker.to_uppercase())
    }

    /// Yahoo interval for a journal timeframe, if Yahoo serves it.
    #[must_use]
    pub fn yahoo_interval(timeframe: &str) -> Option<&'static str> {
        let tf = timeframe.to_lowercase();
        INTERVALS.iter().find(|(t, _)| *t == tf).map(|(_, i)| *i)
    }

    /// Midnight UTC of `date` as a `time` instant.
    fn session_start(date: NaiveDate) -> Result<OffsetDateTime, CoreError> {
        let secs = date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        OffsetDateTime::from_unix_timestamp(secs).map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Invalid session date {date}: {e}"),
        })
    }
}

#[async_trait]
impl CandleProvider for YahooCandleProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn supported_timeframes(&self) -> Vec<String> {
        INTERVALS.iter().map(|(tf, _)| tf.to_string()).collect()
    }

    async fn get_candles(
        &self,
        ticker: &str,
        timeframe: &str,
        trading_date: NaiveDate,
    ) -> Result<Vec<Candle>, CoreError> {
        let interval = Self::yahoo_interval(timeframe)
            .ok_or_else(|| CoreError::NoProvider(timeframe.to_string()))?;
        let symbol = Self::yahoo_symbol(ticker);
        let start = Self::session_start(trading_date)?;
        let end = start + time::Duration::days(1);

        let resp = self
            .connector
            .get_quote_history_interval(&symbol, start, end, interval)
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to fetch {interval} bars for {symbol} on {trading_date}: {e}"),
            })?;

        let quotes = resp.quotes().map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to parse quotes for {symbol}: {e}"),
        })?;

        let candles: Vec<Candle> = quotes
            .iter()
            .filter_map(|q| {
                let timestamp = DateTime::from_timestamp(q.timestamp as i64, 0)?;
                let mut candle = Candle::new(timestamp, q.open, q.high, q.low, q.close);
                candle.trading_date = Some(trading_date);
                Some(candle)
            })
            .collect();

        debug!(%symbol, interval, count = candles.len(), "yahoo candles fetched");
        Ok(candles)
    }
}
