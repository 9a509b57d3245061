use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::journal::TradeJournal;
use crate::models::trade::Trade;

/// Manages the in-memory trade set of a session.
///
/// Pure business logic, no I/O. Persistence is driven by the caller:
/// `append_optimistic` before the request, then `confirm` or `rollback`
/// once the backend answers.
pub struct JournalService;

impl JournalService {
    pub fn new() -> Self {
        Self
    }

    /// Replace the server-backed part of the journal with trades fetched
    /// from the backend.
    ///
    /// Nothing changes when the fetched id sequence matches the server ids
    /// already held, so re-fetching the same set keeps local identities.
    /// Trades without a server id (saves still in flight) are kept after
    /// the fetched ones. Returns `true` if the journal changed.
    pub fn seed(&self, journal: &mut TradeJournal, trades: Vec<Trade>) -> bool {
        let incoming: Vec<Option<i64>> = trades.iter().map(|t| t.id).collect();
        let held: Vec<Option<i64>> = journal.server_ids().into_iter().filter(Option::is_some).collect();
        if incoming == held {
            return false;
        }

        let unsaved: Vec<Trade> = std::mem::take(&mut journal.trades)
            .into_iter()
            .filter(|t| t.id.is_none() && !trades.iter().any(|n| n.local_id == t.local_id))
            .collect();
        debug!(count = trades.len(), kept_unsaved = unsaved.len(), "journal seeded from backend");
        journal.trades = trades;
        journal.trades.extend(unsaved);
        true
    }

    /// Append a trade before persistence has been acknowledged.
    /// Returns the local id to confirm or roll back later.
    pub fn append_optimistic(&self, journal: &mut TradeJournal, trade: Trade) -> Uuid {
        let local_id = trade.local_id;
        journal.trades.push(trade);
        debug!(%local_id, "trade appended optimistically");
        local_id
    }

    /// Swap the optimistic record for the backend's canonical one.
    ///
    /// The canonical record keeps the optimistic record's local identity and
    /// position in the journal.
    pub fn confirm(
        &self,
        journal: &mut TradeJournal,
        local_id: Uuid,
        mut canonical: Trade,
    ) -> Result<(), CoreError> {
        let slot = journal
            .trades
            .iter_mut()
            .find(|t| t.local_id == local_id)
            .ok_or_else(|| CoreError::TradeNotFound(local_id.to_string()))?;
        canonical.local_id = local_id;
        debug!(%local_id, server_id = ?canonical.id, "trade persistence confirmed");
        *slot = canonical;
        Ok(())
    }

    /// Remove an optimistically appended trade after a persistence failure.
    pub fn rollback(&self, journal: &mut TradeJournal, local_id: Uuid) -> Result<Trade, CoreError> {
        let removed = self.remove(journal, local_id)?;
        warn!(%local_id, "optimistic trade rolled back");
        Ok(removed)
    }

    /// Delete a trade from the journal.
    pub fn remove(&self, journal: &mut TradeJournal, local_id: Uuid) -> Result<Trade, CoreError> {
        let idx = journal
            .trades
            .iter()
            .position(|t| t.local_id == local_id)
            .ok_or_else(|| CoreError::TradeNotFound(local_id.to_string()))?;
        Ok(journal.trades.remove(idx))
    }

    pub fn closed_trades<'a>(&self, journal: &'a TradeJournal) -> Vec<&'a Trade> {
        journal.trades.iter().filter(|t| t.is_closed()).collect()
    }

    pub fn open_trades<'a>(&self, journal: &'a TradeJournal) -> Vec<&'a Trade> {
        journal.trades.iter().filter(|t| !t.is_closed()).collect()
    }

    /// Trades for a ticker (case-insensitive).
    pub fn trades_for_ticker<'a>(&self, journal: &'a TradeJournal, ticker: &str) -> Vec<&'a Trade> {
        let lower = ticker.to_lowercase();
        journal.trades.iter().filter(|t| t.ticker == lower).collect()
    }

    /// Trades of `ticker` entered within `[from, to]`: the trades that
    /// belong on a replay chart spanning that window.
    pub fn trades_in_window<'a>(
        &self,
        journal: &'a TradeJournal,
        ticker: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<&'a Trade> {
        let lower = ticker.to_lowercase();
        journal
            .trades
            .iter()
            .filter(|t| t.ticker == lower && t.entry_time >= from && t.entry_time <= to)
            .collect()
    }

    /// Trades entered on a given (UTC) date.
    pub fn trades_on<'a>(&self, journal: &'a TradeJournal, date: NaiveDate) -> Vec<&'a Trade> {
        journal
            .trades
            .iter()
            .filter(|t| t.entry_time.date_naive() == date)
            .collect()
    }
}

impl Default for JournalService {
    fn default() -> Self {
        Self::new()
    }
}
