use crate::models::chart::{EntryMarker, ExitMarker, TradeMarkers};
use crate::models::trade::Trade;

/// Generates chart annotations from the trade set.
///
/// The core computes all placements and labels; the frontend only renders.
pub struct ChartService;

impl ChartService {
    pub fn new() -> Self {
        Self
    }

    /// Entry markers for every trade, exit markers for closed ones.
    #[must_use]
    pub fn trade_markers(&self, trades: &[Trade]) -> TradeMarkers {
        let entries = trades
            .iter()
            .map(|t| EntryMarker {
                time: t.entry_time,
                price: t.entry_price,
                direction: t.direction,
                label: format!("{} x {}", t.direction.to_string().to_uppercase(), t.size),
            })
            .collect();

        let exits = trades
            .iter()
            .filter_map(|t| {
                let (price, time) = t.exit()?;
                Some(ExitMarker {
                    time,
                    price,
                    outcome: t.outcome(),
                })
            })
            .collect();

        TradeMarkers { entries, exits }
    }
}

impl Default for ChartService {
    fn default() -> Self {
        Self::new()
    }
}
