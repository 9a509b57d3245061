use serde::{Deserialize, Serialize};

use super::trade::Trade;

/// The trade set of a session, in insertion order.
///
/// Owned by the session and passed explicitly to the accumulator and
/// analytics; there is no shared global list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeJournal {
    pub trades: Vec<Trade>,
}

impl TradeJournal {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.trades.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Trade] {
        &self.trades
    }

    /// Server ids in order; unsaved trades show up as `None`.
    #[must_use]
    pub fn server_ids(&self) -> Vec<Option<i64>> {
        self.trades.iter().map(|t| t.id).collect()
    }
}

/// A trade appended optimistically whose persistence has not resolved yet.
///
/// Returned by `ReplaySession::begin_save`; hand it back to
/// `ReplaySession::complete_save` with the store's answer.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct PendingSave {
    pub local_id: uuid::Uuid,
    pub trade: Trade,
}
