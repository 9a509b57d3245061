pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use errors::CoreError;
use models::{
    analytics::{DailyFilter, DailyPerformance, TradeStats},
    candle::Candle,
    chart::{PnlPoint, TradeMarkers},
    journal::{PendingSave, TradeJournal},
    marking::{EntryForm, ExitForm, PendingEntry, Prompt, PromptInput},
    notification::Notification,
    replay::ReplayCursor,
    settings::{validate_timeframe, Settings},
    trade::{Trade, TradeKind},
    workspace::Workspace,
};
use providers::{
    http_api::{HttpApiClient, RegisteredUser}, registry::CandleProviderRegistry, traits::TradeStore,
};
use services::{
    analytics_service::AnalyticsService, candle_service::CandleService,
    chart_service::ChartService, journal_service::JournalService,
    marking_service::MarkingService, pnl_service::PnlService,
};
use storage::manager::StorageManager;

pub use services::pnl_service::compute_cumulative_pnl;

/// Main entry point for the replay journal core.
///
/// Owns one chart session: the candle series and replay cursor, the
/// marking state machine, the trade journal and the collaborators used
/// to fetch candles and persist trades. Everything the UI layer needs is
/// a method on this type; the UI only renders what it returns.
#[must_use]
pub struct ReplaySession {
    workspace: Workspace,
    ticker: String,
    timeframe: String,
    trading_date: Option<NaiveDate>,
    candles: Vec<Candle>,
    cursor: ReplayCursor,
    mark_mode: bool,
    marking: MarkingService,
    candle_service: CandleService,
    trade_store: Arc<dyn TradeStore>,
    /// Rebuild the HTTP collaborators when API settings change
    default_providers: bool,
    journal_service: JournalService,
    pnl_service: PnlService,
    analytics_service: AnalyticsService,
    chart_service: ChartService,
    notifications: Vec<Notification>,
    /// Tracks whether the workspace changed since the last save/load.
    dirty: bool,
}

impl std::fmt::Debug for ReplaySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplaySession")
            .field("ticker", &self.ticker)
            .field("timeframe", &self.timeframe)
            .field("trading_date", &self.trading_date)
            .field("candles", &self.candles.len())
            .field("visible", &self.cursor.visible_count())
            .field("mark_mode", &self.mark_mode)
            .field("trades", &self.workspace.journal.len())
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl ReplaySession {
    /// New session with default settings and the HTTP backend.
    pub fn create_new() -> Self {
        Self::build(Workspace::default())
    }

    /// New session with `REPLAY_API_URL` / `REPLAY_API_TOKEN` applied.
    pub fn from_env() -> Result<Self, CoreError> {
        let settings = Settings::from_env()?;
        Ok(Self::build(Workspace {
            settings,
            journal: TradeJournal::new(),
        }))
    }

    /// New session with caller-supplied collaborators (offline use, tests).
    /// Settings changes never replace these.
    pub fn with_providers(
        settings: Settings,
        registry: CandleProviderRegistry,
        trade_store: Arc<dyn TradeStore>,
    ) -> Self {
        let workspace = Workspace {
            settings,
            journal: TradeJournal::new(),
        };
        let mut session = Self::build(workspace);
        session.candle_service = CandleService::new(registry);
        session.trade_store = trade_store;
        session.default_providers = false;
        session
    }

    /// Restore a workspace snapshot (password required).
    pub fn load_from_bytes(encrypted: &[u8], password: &str) -> Result<Self, CoreError> {
        let workspace = StorageManager::load_from_bytes(encrypted, password)?;
        Ok(Self::build(workspace))
    }

    /// Snapshot settings and journal to encrypted bytes.
    /// Clears the unsaved-changes flag on success.
    pub fn save_to_bytes(&mut self, password: &str) -> Result<Vec<u8>, CoreError> {
        let bytes = StorageManager::save_to_bytes(&self.workspace, password)?;
        self.dirty = false;
        Ok(bytes)
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_file(path: &str, password: &str) -> Result<Self, CoreError> {
        let workspace = StorageManager::load_from_file(path, password)?;
        Ok(Self::build(workspace))
    }

    /// Clears the unsaved-changes flag on success.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_file(&mut self, path: &str, password: &str) -> Result<(), CoreError> {
        StorageManager::save_to_file(&self.workspace, path, password)?;
        self.dirty = false;
        Ok(())
    }

    // ── Session loading ─────────────────────────────────────────────

    /// Load a session's candles and its stored trades.
    ///
    /// Candle failures are returned. A failure to fetch stored trades is
    /// logged and the current journal is kept. The replay starts with no
    /// bars revealed and any pending entry is dropped.
    pub async fn load_session(
        &mut self,
        ticker: &str,
        timeframe: &str,
        trading_date: NaiveDate,
    ) -> Result<usize, CoreError> {
        let timeframe = validate_timeframe(timeframe)?;
        let ticker = ticker.trim().to_lowercase();

        let candles = self
            .candle_service
            .get_candles(&ticker, &timeframe, trading_date)
            .await?;

        match self
            .trade_store
            .get_trades(&ticker, trading_date, TradeKind::Simulated)
            .await
        {
            Ok(trades) => {
                if self.journal_service.seed(&mut self.workspace.journal, trades) {
                    self.dirty = true;
                }
            }
            Err(e) => warn!(error = %e, %ticker, "could not fetch stored trades, keeping journal"),
        }

        info!(%ticker, %timeframe, %trading_date, bars = candles.len(), "session loaded");
        self.start_session(ticker, timeframe, Some(trading_date), candles);
        Ok(self.candles.len())
    }

    /// Use an already-fetched candle series (sorted and de-duplicated here).
    pub fn load_candles(
        &mut self,
        ticker: &str,
        timeframe: &str,
        candles: Vec<Candle>,
    ) -> Result<usize, CoreError> {
        let timeframe = validate_timeframe(timeframe)?;
        let candles = services::candle_service::normalize_series(candles)?;
        let trading_date = candles.first().map(|c| c.timestamp.date_naive());
        self.start_session(ticker.trim().to_lowercase(), timeframe, trading_date, candles);
        Ok(self.candles.len())
    }

    /// Seed the journal with trades obtained elsewhere.
    /// Returns `true` if the journal changed.
    pub fn seed_trades(&mut self, trades: Vec<Trade>) -> bool {
        let changed = self.journal_service.seed(&mut self.workspace.journal, trades);
        if changed {
            self.dirty = true;
        }
        changed
    }

    #[must_use]
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    #[must_use]
    pub fn timeframe(&self) -> &str {
        &self.timeframe
    }

    #[must_use]
    pub fn trading_date(&self) -> Option<NaiveDate> {
        self.trading_date
    }

    /// The full session series, revealed or not.
    #[must_use]
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    // ── Replay ──────────────────────────────────────────────────────

    /// Candles currently visible on the chart.
    #[must_use]
    pub fn revealed_candles(&self) -> &[Candle] {
        self.cursor.revealed(&self.candles)
    }

    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.cursor.visible_count()
    }

    /// Reveal the next bar. Returns `false` once every bar is visible.
    pub fn next_bar(&mut self) -> bool {
        self.cursor.next_bar(self.candles.len())
    }

    /// Hide all bars and drop any pending entry.
    pub fn clear_replay(&mut self) {
        self.cursor.clear();
        self.marking.abandon_pending();
    }

    pub fn reveal_all(&mut self) {
        self.cursor.reveal_all(self.candles.len());
    }

    #[must_use]
    pub fn is_replay_finished(&self) -> bool {
        self.cursor.is_finished(self.candles.len())
    }

    #[must_use]
    pub fn progress_label(&self) -> String {
        self.cursor.progress_label(self.candles.len())
    }

    // ── Marking ─────────────────────────────────────────────────────

    #[must_use]
    pub fn mark_mode(&self) -> bool {
        self.mark_mode
    }

    /// Turning mark mode off closes an open prompt; a pending entry stays.
    pub fn set_mark_mode(&mut self, enabled: bool) {
        self.mark_mode = enabled;
        if !enabled {
            self.marking.cancel();
        }
    }

    /// A click on revealed candle `index`. Returns the prompt to show, or
    /// `None` if the click is ignored.
    pub fn handle_chart_click(&mut self, index: usize) -> Option<Prompt> {
        let revealed = self.cursor.revealed(&self.candles);
        self.marking.handle_chart_click(self.mark_mode, revealed, index)
    }

    #[must_use]
    pub fn open_prompt(&self) -> Option<&Prompt> {
        self.marking.open_prompt()
    }

    #[must_use]
    pub fn pending_entry(&self) -> Option<&PendingEntry> {
        self.marking.pending_entry()
    }

    #[must_use]
    pub fn entry_form_defaults(&self) -> EntryForm {
        self.marking.entry_form_defaults()
    }

    #[must_use]
    pub fn exit_form_defaults(&self) -> ExitForm {
        self.marking.exit_form_defaults()
    }

    pub fn cancel_prompt(&mut self) {
        self.marking.cancel();
    }

    /// Confirm the open prompt. An exit confirmation returns the completed
    /// trade, which is not yet in the journal; pass it to `save_trade` or
    /// `begin_save`.
    pub fn confirm_prompt(&mut self, input: PromptInput) -> Result<Option<Trade>, CoreError> {
        self.marking.confirm(input)
    }

    /// Confirm the open prompt and, if it completes a trade, save it.
    pub async fn confirm_and_save(&mut self, input: PromptInput) -> Result<Option<Trade>, CoreError> {
        match self.marking.confirm(input)? {
            Some(trade) => self.save_trade(trade).await.map(Some),
            None => Ok(None),
        }
    }

    // ── Journal & persistence ───────────────────────────────────────

    /// Append `trade` to the journal before it is persisted.
    ///
    /// The trade is visible to `cumulative_pnl` immediately. The caller
    /// sends `pending.trade` to the store (see `trade_store`) and reports
    /// the answer through `complete_save`.
    pub fn begin_save(&mut self, trade: Trade) -> PendingSave {
        let local_id = self
            .journal_service
            .append_optimistic(&mut self.workspace.journal, trade.clone());
        self.dirty = true;
        PendingSave { local_id, trade }
    }

    /// Resolve an optimistic append.
    ///
    /// On success the canonical record replaces the optimistic one. On
    /// failure the optimistic trade is removed and an error notification
    /// is queued; the failure is returned. There is no retry.
    pub fn complete_save(
        &mut self,
        pending: PendingSave,
        result: Result<Trade, CoreError>,
    ) -> Result<Trade, CoreError> {
        match result {
            Ok(canonical) => {
                self.journal_service.confirm(
                    &mut self.workspace.journal,
                    pending.local_id,
                    canonical.clone(),
                )?;
                self.dirty = true;
                info!(server_id = ?canonical.id, "trade saved");
                self.notifications
                    .push(Notification::success("Trade saved", "Trade logged successfully!"));
                let mut canonical = canonical;
                canonical.local_id = pending.local_id;
                Ok(canonical)
            }
            Err(e) => {
                if let Err(missing) = self
                    .journal_service
                    .rollback(&mut self.workspace.journal, pending.local_id)
                {
                    debug!(error = %missing, "optimistic trade already gone");
                }
                let reason = match &e {
                    CoreError::Persistence(reason) => reason.clone(),
                    other => other.to_string(),
                };
                warn!(%reason, "trade persistence failed");
                self.notifications
                    .push(Notification::error("Error saving trade", reason));
                Err(e)
            }
        }
    }

    /// Optimistically append `trade`, persist it, then confirm or roll back.
    pub async fn save_trade(&mut self, trade: Trade) -> Result<Trade, CoreError> {
        let pending = self.begin_save(trade);
        let store = Arc::clone(&self.trade_store);
        let result = store.save_trade(&pending.trade).await;
        self.complete_save(pending, result)
    }

    /// The trade persistence collaborator, for callers driving
    /// `begin_save` / `complete_save` themselves.
    #[must_use]
    pub fn trade_store(&self) -> Arc<dyn TradeStore> {
        Arc::clone(&self.trade_store)
    }

    /// Delete a trade from the journal and, when it has a server id, from
    /// the store.
    ///
    /// The store is asked first; if it refuses, the trade stays in the
    /// journal, an error notification is queued and the failure returned.
    /// Trades never acknowledged by the store are removed locally.
    pub async fn delete_trade(&mut self, local_id: Uuid) -> Result<Trade, CoreError> {
        let server_id = self
            .get_trade(local_id)
            .ok_or_else(|| CoreError::TradeNotFound(local_id.to_string()))?
            .id;

        if let Some(id) = server_id {
            let store = Arc::clone(&self.trade_store);
            if let Err(e) = store.delete_trade(id).await {
                warn!(id, error = %e, "trade deletion failed");
                self.notifications
                    .push(Notification::error("Error deleting trade", e.to_string()));
                return Err(e);
            }
        }

        let removed = self
            .journal_service
            .remove(&mut self.workspace.journal, local_id)?;
        self.dirty = true;
        info!(server_id = ?removed.id, "trade deleted");
        self.notifications
            .push(Notification::success("Trade deleted", "Trade removed from the journal."));
        Ok(removed)
    }

    #[must_use]
    pub fn trades(&self) -> &[Trade] {
        self.workspace.journal.as_slice()
    }

    #[must_use]
    pub fn get_trade(&self, local_id: Uuid) -> Option<&Trade> {
        self.workspace.journal.trades.iter().find(|t| t.local_id == local_id)
    }

    #[must_use]
    pub fn trade_count(&self) -> usize {
        self.workspace.journal.len()
    }

    #[must_use]
    pub fn closed_trades(&self) -> Vec<&Trade> {
        self.journal_service.closed_trades(&self.workspace.journal)
    }

    #[must_use]
    pub fn trades_for_ticker(&self, ticker: &str) -> Vec<&Trade> {
        self.journal_service
            .trades_for_ticker(&self.workspace.journal, ticker)
    }

    #[must_use]
    pub fn trades_on(&self, date: NaiveDate) -> Vec<&Trade> {
        self.journal_service.trades_on(&self.workspace.journal, date)
    }

    /// Take all queued notifications, oldest first.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    // ── Derived series & analytics ──────────────────────────────────

    /// Trades drawn on this session's chart: the session ticker, entered
    /// between the first and last candle of the loaded series.
    #[must_use]
    pub fn session_trades(&self) -> Vec<Trade> {
        let (Some(first), Some(last)) = (self.candles.first(), self.candles.last()) else {
            return Vec::new();
        };
        self.journal_service
            .trades_in_window(&self.workspace.journal, &self.ticker, first.timestamp, last.timestamp)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Cumulative realized P&L of the session's trades, one value per
    /// revealed candle.
    #[must_use]
    pub fn cumulative_pnl(&self) -> Vec<f64> {
        self.pnl_service
            .compute_cumulative_pnl(self.revealed_candles(), &self.session_trades())
    }

    #[must_use]
    pub fn cumulative_pnl_points(&self) -> Vec<PnlPoint> {
        self.pnl_service
            .cumulative_pnl_points(self.revealed_candles(), &self.session_trades())
    }

    #[must_use]
    pub fn trade_markers(&self) -> TradeMarkers {
        self.chart_service.trade_markers(&self.session_trades())
    }

    /// Statistics over the whole journal, every ticker and date.
    #[must_use]
    pub fn trade_stats(&self) -> TradeStats {
        self.analytics_service.trade_stats(self.trades())
    }

    #[must_use]
    pub fn daily_performance(&self, filter: &DailyFilter) -> Vec<DailyPerformance> {
        self.analytics_service
            .daily_performance(self.trades(), filter)
    }

    // ── Settings ────────────────────────────────────────────────────

    #[must_use]
    pub fn get_settings(&self) -> &Settings {
        &self.workspace.settings
    }

    /// Point the session at another backend. Rebuilds the HTTP collaborators.
    pub fn set_api_url(&mut self, url: &str) -> Result<(), CoreError> {
        self.workspace.settings.set_api_url(url)?;
        self.dirty = true;
        self.rebuild_collaborators();
        Ok(())
    }

    /// Size pre-filled in future entry prompts.
    pub fn set_default_size(&mut self, size: f64) -> Result<(), CoreError> {
        self.workspace.settings.set_default_size(size)?;
        self.marking.set_default_size(size)?;
        self.dirty = true;
        Ok(())
    }

    pub fn set_default_ticker(&mut self, ticker: &str) -> Result<(), CoreError> {
        self.workspace.settings.set_default_ticker(ticker)?;
        self.dirty = true;
        Ok(())
    }

    pub fn set_default_timeframe(&mut self, timeframe: &str) -> Result<(), CoreError> {
        self.workspace.settings.set_default_timeframe(timeframe)?;
        self.dirty = true;
        Ok(())
    }

    /// Log in against the configured backend and keep the bearer token.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), CoreError> {
        let client = HttpApiClient::from_settings(&self.workspace.settings);
        let token = client.login(username, password).await?;
        self.set_auth_token(Some(token));
        Ok(())
    }

    /// Create an account on the configured backend. Does not log in.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<RegisteredUser, CoreError> {
        HttpApiClient::from_settings(&self.workspace.settings)
            .register(username, email, password)
            .await
    }

    /// Set or clear the bearer token. Rebuilds the HTTP collaborators.
    pub fn set_auth_token(&mut self, token: Option<String>) {
        self.workspace.settings.auth_token = token;
        self.dirty = true;
        self.rebuild_collaborators();
    }

    pub fn logout(&mut self) {
        self.set_auth_token(None);
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.workspace.settings.auth_token.is_some()
    }

    /// Candle provider names serving the current timeframe, in fallback order.
    #[must_use]
    pub fn candle_provider_names(&self) -> Vec<String> {
        self.candle_service.get_provider_names(&self.timeframe)
    }

    /// Returns `true` if the workspace changed since the last save or load.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    // ── Internal ────────────────────────────────────────────────────

    fn start_session(
        &mut self,
        ticker: String,
        timeframe: String,
        trading_date: Option<NaiveDate>,
        candles: Vec<Candle>,
    ) {
        self.marking = MarkingService::new(ticker.clone());
        if let Err(e) = self.marking.set_default_size(self.workspace.settings.default_size) {
            warn!(error = %e, "ignoring invalid default size from settings");
        }
        self.ticker = ticker;
        self.timeframe = timeframe;
        self.trading_date = trading_date;
        self.candles = candles;
        self.cursor.clear();
    }

    fn rebuild_collaborators(&mut self) {
        if !self.default_providers {
            return;
        }
        let api = HttpApiClient::from_settings(&self.workspace.settings);
        self.candle_service = CandleService::new(CandleProviderRegistry::new_with_defaults(&api));
        self.trade_store = Arc::new(api);
    }

    fn build(workspace: Workspace) -> Self {
        let api = HttpApiClient::from_settings(&workspace.settings);
        let candle_service = CandleService::new(CandleProviderRegistry::new_with_defaults(&api));
        let ticker = workspace.settings.default_ticker.clone();
        let timeframe = workspace.settings.default_timeframe.clone();
        let mut marking = MarkingService::new(ticker.clone());
        if let Err(e) = marking.set_default_size(workspace.settings.default_size) {
            warn!(error = %e, "ignoring invalid default size from settings");
        }

        Self {
            workspace,
            ticker,
            timeframe,
            trading_date: None,
            candles: Vec::new(),
            cursor: ReplayCursor::new(),
            mark_mode: true,
            marking,
            candle_service,
            trade_store: Arc::new(api),
            default_providers: true,
            journal_service: JournalService::new(),
            pnl_service: PnlService::new(),
            analytics_service: AnalyticsService::new(),
            chart_service: ChartService::new(),
            notifications: Vec::new(),
            dirty: false,
        }
    }
}
