use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::candle::Candle;
use crate::models::trade::{Trade, TradeKind};

/// Source of OHLC candles for one instrument, timeframe and session.
///
/// Implementations return the session's bars; ordering and validation
/// are enforced by `CandleService`, so a provider may return them as the
/// upstream API delivers them.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait CandleProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Timeframes this provider can serve (e.g. "5min").
    fn supported_timeframes(&self) -> Vec<String>;

    /// All candles of `ticker` at `timeframe` for the session on `trading_date`.
    async fn get_candles(
        &self,
        ticker: &str,
        timeframe: &str,
        trading_date: NaiveDate,
    ) -> Result<Vec<Candle>, CoreError>;
}

/// Remote persistence for trade records.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait TradeStore: Send + Sync {
    fn name(&self) -> &str;

    /// Store a trade. Returns the canonical record (server id, normalized
    /// timestamps) or `CoreError::Persistence` with the server's reason.
    async fn save_trade(&self, trade: &Trade) -> Result<Trade, CoreError>;

    /// Delete a stored trade by its server id.
    async fn delete_trade(&self, id: i64) -> Result<(), CoreError>;

    /// Existing trades for a ticker and session, used to seed the journal.
    async fn get_trades(
        &self,
        ticker: &str,
        trading_date: NaiveDate,
        kind: TradeKind,
    ) -> Result<Vec<Trade>, CoreError>;
}
