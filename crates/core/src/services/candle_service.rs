use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::errors::CoreError;
use crate::models::candle::Candle;
use crate::providers::registry::CandleProviderRegistry;

/// (ticker, timeframe, session date)
type SessionKey = (String, String, NaiveDate);

/// Fetches candle series from providers with fallback and caching.
///
/// Cache strategy:
/// - **Past sessions**: fetched once, kept for the life of the service.
/// - **Today's session**: always re-fetched, bars are still being added.
///
/// Every series handed out is validated: prices finite, timestamps sorted
/// and unique (later duplicates are dropped).
pub struct CandleService {
    registry: CandleProviderRegistry,
    cache: HashMap<SessionKey, Vec<Candle>>,
}

impl CandleService {
    pub fn new(registry: CandleProviderRegistry) -> Self {
        Self {
            registry,
            cache: HashMap::new(),
        }
    }

    /// Check if at least one provider serves the timeframe.
    pub fn has_provider_for(&self, timeframe: &str) -> bool {
        self.registry.get_provider_for(timeframe).is_some()
    }

    /// Names of the providers serving the timeframe, in fallback order.
    pub fn get_provider_names(&self, timeframe: &str) -> Vec<String> {
        self.registry
            .get_providers_for(timeframe)
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    /// Number of sessions held in the cache.
    pub fn cached_sessions(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Candles for a session.
    ///
    /// 1. Past session cached → return it.
    /// 2. Otherwise try providers in order; the first non-empty, valid
    ///    series wins and is cached.
    /// 3. All providers empty → `CoreError::NoCandles`; all failed → the
    ///    last provider error.
    pub async fn get_candles(
        &mut self,
        ticker: &str,
        timeframe: &str,
        trading_date: NaiveDate,
    ) -> Result<Vec<Candle>, CoreError> {
        let key: SessionKey = (ticker.to_lowercase(), timeframe.to_lowercase(), trading_date);
        let today = chrono::Utc::now().date_naive();

        if trading_date < today {
            if let Some(candles) = self.cache.get(&key) {
                debug!(ticker, timeframe, %trading_date, "candle cache hit");
                return Ok(candles.clone());
            }
        }

        let providers = self.registry.get_providers_for(timeframe);
        if providers.is_empty() {
            return Err(CoreError::NoProvider(timeframe.to_string()));
        }

        let mut last_error = None;
        for provider in &providers {
            match provider.get_candles(&key.0, &key.1, trading_date).await {
                Ok(raw) => match normalize_series(raw) {
                    Ok(candles) if candles.is_empty() => {
                        debug!(provider = provider.name(), "provider returned no candles");
                    }
                    Ok(candles) => {
                        self.cache.insert(key, candles.clone());
                        return Ok(candles);
                    }
                    Err(e) => {
                        warn!(provider = provider.name(), error = %e, "provider returned invalid candles");
                        last_error = Some(e);
                    }
                },
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "candle provider failed, trying next");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| CoreError::NoCandles {
            ticker: ticker.to_string(),
            timeframe: timeframe.to_string(),
            date: trading_date.to_string(),
        }))
    }
}

/// Sort by timestamp, drop repeated timestamps, reject non-finite prices.
pub fn normalize_series(mut candles: Vec<Candle>) -> Result<Vec<Candle>, CoreError> {
    if let Some(bad) = candles
        .iter()
        .find(|c| ![c.open, c.high, c.low, c.close].iter().all(|p| p.is_finite()))
    {
        return Err(CoreError::Validation(format!(
            "Candle at {} has a non-finite price",
            bad.timestamp
        )));
    }
    // Stable sort keeps the first occurrence of each timestamp in front.
    candles.sort_by_key(|c| c.timestamp);
    candles.dedup_by_key(|c| c.timestamp);
    Ok(candles)
}
