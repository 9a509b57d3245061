use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Aggregate performance of a set of trades.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeStats {
    /// All trades, open and closed
    pub total_trades: usize,

    pub closed_trades: usize,
    pub open_trades: usize,

    pub wins: usize,
    pub losses: usize,
    pub breakeven: usize,

    /// wins / closed_trades × 100, 0 when nothing is closed
    pub win_rate_pct: f64,

    /// Sum of realized P&L over closed trades
    pub total_pnl: f64,

    /// Mean P&L of winning trades (positive), 0 without wins
    pub avg_win: f64,

    /// Mean P&L of losing trades (negative), 0 without losses
    pub avg_loss: f64,

    /// avg_win / |avg_loss|; `None` when either side is empty
    pub payoff_ratio: Option<f64>,

    /// gross profit / gross loss; `None` when there is no losing trade
    pub profit_factor: Option<f64>,

    pub largest_win: f64,
    pub largest_loss: f64,

    /// Largest peak-to-trough drop of the closed-trade equity curve (≥ 0)
    pub max_drawdown: f64,
}

/// Performance of one ticker on one trading date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPerformance {
    pub date: NaiveDate,
    pub ticker: String,
    pub trade_count: usize,
    pub pnl: f64,
    pub win_rate_pct: f64,
}

/// Optional filters for the daily breakdown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailyFilter {
    pub ticker: Option<String>,
    pub date: Option<NaiveDate>,
}
