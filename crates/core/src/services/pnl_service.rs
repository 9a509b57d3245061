use crate::models::candle::Candle;
use crate::models::chart::PnlPoint;
use crate::models::trade::Trade;

/// Derives the cumulative realized P&L line of a replay.
///
/// Pure business logic, no state: the series is rebuilt from scratch on
/// every call, so a deleted or rolled-back trade can never leave a stale
/// partial sum behind.
pub struct PnlService;

impl PnlService {
    pub fn new() -> Self {
        Self
    }

    /// One value per revealed candle: the sum of realized P&L of every
    /// closed trade whose exit time is at or before that candle.
    ///
    /// Element 0 is always exactly `0.0`, even when a trade exits at or
    /// before the first candle. Open trades contribute nothing.
    ///
    /// Closed trades are sorted by exit time once and merged against the
    /// candles in a single forward pass: O(candles + trades log trades).
    #[must_use]
    pub fn compute_cumulative_pnl(&self, revealed: &[Candle], trades: &[Trade]) -> Vec<f64> {
        let mut exits: Vec<(chrono::DateTime<chrono::Utc>, f64)> = trades
            .iter()
            .filter_map(|t| {
                let (_, exit_time) = t.exit()?;
                Some((exit_time, t.realized_pnl()?))
            })
            .collect();
        exits.sort_by_key(|(exit_time, _)| *exit_time);

        let mut series = Vec::with_capacity(revealed.len());
        let mut cumulative = 0.0;
        let mut next = 0;

        for candle in revealed {
            // Each closed trade is admitted exactly once, the first time a
            // candle at or after its exit is reached.
            while let Some((exit_time, pnl)) = exits.get(next) {
                if *exit_time > candle.timestamp {
                    break;
                }
                cumulative += pnl;
                next += 1;
            }
            series.push(cumulative);
        }

        if let Some(first) = series.first_mut() {
            *first = 0.0;
        }
        series
    }

    /// The cumulative series paired with candle timestamps, for plotting.
    #[must_use]
    pub fn cumulative_pnl_points(&self, revealed: &[Candle], trades: &[Trade]) -> Vec<PnlPoint> {
        self.compute_cumulative_pnl(revealed, trades)
            .into_iter()
            .zip(revealed)
            .map(|(cumulative_pnl, candle)| PnlPoint {
                timestamp: candle.timestamp,
                cumulative_pnl,
            })
            .collect()
    }

    /// Sum of realized P&L over all closed trades.
    #[must_use]
    pub fn total_realized(&self, trades: &[Trade]) -> f64 {
        trades.iter().filter_map(Trade::realized_pnl).sum()
    }
}

impl Default for PnlService {
    fn default() -> Self {
        Self::new()
    }
}

/// Free-function form of [`PnlService::compute_cumulative_pnl`].
#[must_use]
pub fn compute_cumulative_pnl(revealed: &[Candle], trades: &[Trade]) -> Vec<f64> {
    PnlService::new().compute_cumulative_pnl(revealed, trades)
}
