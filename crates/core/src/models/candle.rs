use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One OHLC bar for a fixed interval.
///
/// Candles for a given (ticker, timeframe, session) form a strictly
/// time-ordered series with unique timestamps. They are never mutated
/// after they have been fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bar open instant; the ordering key of the series
    pub timestamp: DateTime<Utc>,

    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,

    /// Session the bar belongs to, when the backend reports it
    #[serde(default)]
    pub trading_date: Option<NaiveDate>,

    /// 20-period EMA of the close, absent during warm-up
    #[serde(default)]
    pub ema20: Option<f64>,

    /// Previous session's high
    #[serde(default)]
    pub prev_day_high: Option<f64>,

    /// Previous session's low
    #[serde(default)]
    pub prev_day_low: Option<f64>,
}

impl Candle {
    pub fn new(timestamp: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            trading_date: None,
            ema20: None,
            prev_day_high: None,
            prev_day_low: None,
        }
    }

    /// Resolve one of the two prices a user may pick when marking a trade.
    #[must_use]
    pub fn price(&self, field: PriceField) -> f64 {
        match field {
            PriceField::Open => self.open,
            PriceField::Close => self.close,
        }
    }

    /// `true` if the bar closed above its open.
    #[must_use]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }
}

/// Which price of a candle is used as an entry or exit fill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceField {
    Open,
    #[default]
    Close,
}

impl std::fmt::Display for PriceField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceField::Open => write!(f, "open"),
            PriceField::Close => write!(f, "close"),
        }
    }
}

/// Check that a candle series is strictly ordered by timestamp.
///
/// Returns the index of the first candle that is not later than its
/// predecessor, or `None` if the series is well-formed.
#[must_use]
pub fn first_out_of_order(candles: &[Candle]) -> Option<usize> {
    candles
        .windows(2)
        .position(|pair| pair[1].timestamp <= pair[0].timestamp)
        .map(|idx| idx + 1)
}
