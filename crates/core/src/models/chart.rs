use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::trade::{Direction, TradeOutcome};

/// One point of the cumulative P&L line, aligned to a revealed candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnlPoint {
    pub timestamp: DateTime<Utc>,
    pub cumulative_pnl: f64,
}

/// Entry annotation on the price chart.
///
/// The core computes placement and labels; the renderer just draws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMarker {
    pub time: DateTime<Utc>,
    pub price: f64,
    pub direction: Direction,
    /// e.g. "LONG x 0.01"
    pub label: String,
}

/// Exit annotation on the price chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitMarker {
    pub time: DateTime<Utc>,
    pub price: f64,
    pub outcome: TradeOutcome,
}

/// All trade annotations for one chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeMarkers {
    pub entries: Vec<EntryMarker>,
    pub exits: Vec<ExitMarker>,
}
