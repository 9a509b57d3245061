use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::analytics::{DailyFilter, DailyPerformance, TradeStats};
use crate::models::trade::{Trade, TradeOutcome};

/// Computes journal analytics: win rate, payoff, drawdown, daily breakdown.
///
/// Only closed trades contribute P&L; open trades are counted but
/// otherwise ignored.
pub struct AnalyticsService;

impl AnalyticsService {
    pub fn new() -> Self {
        Self
    }

    /// Aggregate statistics over `trades`.
    #[must_use]
    pub fn trade_stats(&self, trades: &[Trade]) -> TradeStats {
        let mut stats = TradeStats {
            total_trades: trades.len(),
            ..TradeStats::default()
        };

        // Closed trades in exit order, for the equity curve
        let mut closed: Vec<&Trade> = trades.iter().filter(|t| t.is_closed()).collect();
        closed.sort_by_key(|t| t.exit_time);

        let mut gross_profit = 0.0;
        let mut gross_loss = 0.0;
        let mut equity = 0.0_f64;
        let mut peak = 0.0_f64;

        for trade in &closed {
            let Some(pnl) = trade.realized_pnl() else {
                continue;
            };
            match trade.outcome() {
                TradeOutcome::Win => {
                    stats.wins += 1;
                    gross_profit += pnl;
                    stats.largest_win = stats.largest_win.max(pnl);
                }
                TradeOutcome::Loss => {
                    stats.losses += 1;
                    gross_loss += pnl;
                    stats.largest_loss = stats.largest_loss.min(pnl);
                }
                TradeOutcome::Breakeven => stats.breakeven += 1,
                TradeOutcome::Open => {}
            }

            equity += pnl;
            peak = peak.max(equity);
            stats.max_drawdown = stats.max_drawdown.max(peak - equity);
        }

        stats.closed_trades = closed.len();
        stats.open_trades = stats.total_trades - stats.closed_trades;
        stats.total_pnl = gross_profit + gross_loss;

        if stats.closed_trades > 0 {
            stats.win_rate_pct = stats.wins as f64 / stats.closed_trades as f64 * 100.0;
        }
        if stats.wins > 0 {
            stats.avg_win = gross_profit / stats.wins as f64;
        }
        if stats.losses > 0 {
            stats.avg_loss = gross_loss / stats.losses as f64;
            stats.profit_factor = Some(gross_profit / gross_loss.abs());
        }
        if stats.wins > 0 && stats.losses > 0 {
            stats.payoff_ratio = Some(stats.avg_win / stats.avg_loss.abs());
        }

        stats
    }

    /// Per (date, ticker) performance, oldest date first.
    ///
    /// A trade belongs to the date it was entered on (UTC). Open trades are
    /// counted but add nothing to P&L or wins.
    #[must_use]
    pub fn daily_performance(&self, trades: &[Trade], filter: &DailyFilter) -> Vec<DailyPerformance> {
        let ticker = filter.ticker.as_ref().map(|t| t.to_lowercase());

        // (date, ticker) -> (count, closed, wins, pnl)
        let mut buckets: BTreeMap<(NaiveDate, String), (usize, usize, usize, f64)> = BTreeMap::new();

        for trade in trades {
            let date = trade.entry_time.date_naive();
            if filter.date.is_some_and(|d| d != date) {
                continue;
            }
            if ticker.as_ref().is_some_and(|t| *t != trade.ticker) {
                continue;
            }

            let bucket = buckets.entry((date, trade.ticker.clone())).or_default();
            bucket.0 += 1;
            if let Some(pnl) = trade.realized_pnl() {
                bucket.1 += 1;
                bucket.3 += pnl;
                if pnl > 0.0 {
                    bucket.2 += 1;
                }
            }
        }

        buckets
            .into_iter()
            .map(|((date, ticker), (count, closed, wins, pnl))| DailyPerformance {
                date,
                ticker,
                trade_count: count,
                pnl,
                win_rate_pct: if closed > 0 {
                    wins as f64 / closed as f64 * 100.0
                } else {
                    0.0
                },
            })
            .collect()
    }
}

impl Default for AnalyticsService {
    fn default() -> Self {
        Self::new()
    }
}
