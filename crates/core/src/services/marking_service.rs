use tracing::debug;

use crate::errors::CoreError;
use crate::models::candle::Candle;
use crate::models::marking::{
    ClickTarget, EntryForm, ExitForm, MarkState, PendingEntry, Prompt, PromptInput,
    DEFAULT_ENTRY_SIZE,
};
use crate::models::settings::validate_size;
use crate::models::trade::{Trade, TradeKind};

/// Entry/exit marking state machine for one chart.
///
/// `Idle` → (entry click + confirm) → `AwaitingExit` → (exit click + confirm)
/// → emits a closed `Trade` and returns to `Idle`. At most one position is
/// pending at a time; while one is pending every click is an exit click.
///
/// A click only opens a prompt. Nothing is committed until the prompt is
/// confirmed, so cancelling or failing validation leaves the state as it was.
#[derive(Debug, Clone)]
pub struct MarkingService {
    ticker: String,
    kind: TradeKind,
    default_size: f64,
    state: MarkState,
    prompt: Option<Prompt>,
}

impl MarkingService {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into().to_lowercase(),
            kind: TradeKind::Simulated,
            default_size: DEFAULT_ENTRY_SIZE,
            state: MarkState::Idle,
            prompt: None,
        }
    }

    /// Kind stamped on emitted trades (replay marking defaults to simulated).
    #[must_use]
    pub fn with_kind(mut self, kind: TradeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Size pre-filled by `entry_form_defaults`.
    pub fn set_default_size(&mut self, size: f64) -> Result<(), CoreError> {
        validate_size(size)?;
        self.default_size = size;
        Ok(())
    }

    #[must_use]
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    #[must_use]
    pub fn state(&self) -> &MarkState {
        &self.state
    }

    #[must_use]
    pub fn pending_entry(&self) -> Option<&PendingEntry> {
        match &self.state {
            MarkState::Idle => None,
            MarkState::AwaitingExit(pending) => Some(pending),
        }
    }

    #[must_use]
    pub fn is_awaiting_exit(&self) -> bool {
        matches!(self.state, MarkState::AwaitingExit(_))
    }

    /// The prompt currently waiting for confirmation, if any.
    #[must_use]
    pub fn open_prompt(&self) -> Option<&Prompt> {
        self.prompt.as_ref()
    }

    /// Pre-filled values for a new entry prompt.
    #[must_use]
    pub fn entry_form_defaults(&self) -> EntryForm {
        EntryForm {
            size: self.default_size,
            ..EntryForm::default()
        }
    }

    /// Pre-filled values for an exit prompt.
    #[must_use]
    pub fn exit_form_defaults(&self) -> ExitForm {
        ExitForm::default()
    }

    /// React to a click on the chart.
    ///
    /// Returns the prompt to show, or `None` when the click is ignored
    /// (mark mode off, or `index` outside the revealed candles). A click
    /// while a prompt is already open retargets that prompt.
    pub fn handle_chart_click(
        &mut self,
        mark_mode: bool,
        revealed: &[Candle],
        index: usize,
    ) -> Option<Prompt> {
        if !mark_mode {
            return None;
        }
        let candle = revealed.get(index)?;
        let target = ClickTarget {
            index,
            timestamp: candle.timestamp,
            open: candle.open,
            close: candle.close,
        };

        let prompt = match &self.state {
            MarkState::Idle => Prompt::Entry { target },
            MarkState::AwaitingExit(pending) => Prompt::Exit {
                target,
                pending: pending.clone(),
            },
        };
        debug!(index, title = prompt.title(), "chart click opened prompt");
        self.prompt = Some(prompt.clone());
        Some(prompt)
    }

    /// Close the open prompt without committing anything.
    pub fn cancel(&mut self) {
        if self.prompt.take().is_some() {
            debug!("marking prompt cancelled");
        }
    }

    /// Drop a pending entry without emitting a trade.
    pub fn abandon_pending(&mut self) -> Option<PendingEntry> {
        self.prompt = None;
        match std::mem::take(&mut self.state) {
            MarkState::Idle => None,
            MarkState::AwaitingExit(pending) => {
                debug!(entry_time = %pending.entry_time, "pending entry abandoned");
                Some(pending)
            }
        }
    }

    /// Confirm the open prompt.
    ///
    /// - Entry prompt: stores the pending entry, emits nothing (`Ok(None)`).
    /// - Exit prompt: emits the completed trade (`Ok(Some(trade))`).
    ///
    /// On `Err` the prompt stays open and the state is unchanged.
    pub fn confirm(&mut self, input: PromptInput) -> Result<Option<Trade>, CoreError> {
        let prompt = self
            .prompt
            .clone()
            .ok_or_else(|| CoreError::Validation("No marking prompt is open".into()))?;

        match (prompt, input, self.state.clone()) {
            (Prompt::Entry { target }, PromptInput::Entry(form), MarkState::Idle) => {
                validate_size(form.size)?;
                let entry_price = target.price(form.price_field);
                if !entry_price.is_finite() {
                    return Err(CoreError::Validation(format!(
                        "Entry price is not a number: {entry_price}"
                    )));
                }
                let pending = PendingEntry {
                    direction: form.direction,
                    size: form.size,
                    entry_price,
                    entry_time: target.timestamp,
                };
                debug!(
                    direction = %pending.direction,
                    size = pending.size,
                    price = pending.entry_price,
                    "entry marked"
                );
                self.state = MarkState::AwaitingExit(pending);
                self.prompt = None;
                Ok(None)
            }
            (Prompt::Exit { target, .. }, PromptInput::Exit(form), MarkState::AwaitingExit(pending)) => {
                if target.timestamp < pending.entry_time {
                    return Err(CoreError::Validation(format!(
                        "Exit at {} is before the entry at {}",
                        target.timestamp, pending.entry_time
                    )));
                }
                let exit_price = target.price(form.price_field);
                if !exit_price.is_finite() {
                    return Err(CoreError::Validation(format!(
                        "Exit price is not a number: {exit_price}"
                    )));
                }
                let trade = Trade::open(
                    self.ticker.clone(),
                    pending.direction,
                    pending.size,
                    pending.entry_price,
                    pending.entry_time,
                )
                .with_kind(self.kind)
                .closed_at(exit_price, target.timestamp);

                debug!(
                    local_id = %trade.local_id,
                    pnl = trade.realized_pnl().unwrap_or_default(),
                    "exit marked, trade completed"
                );
                self.state = MarkState::Idle;
                self.prompt = None;
                Ok(Some(trade))
            }
            (Prompt::Entry { .. }, PromptInput::Exit(_), _) => Err(CoreError::Validation(
                "Entry prompt needs direction, size and entry price".into(),
            )),
            (Prompt::Exit { .. }, PromptInput::Entry(_), _) => Err(CoreError::Validation(
                "Exit prompt only takes an exit price".into(),
            )),
            // The prompt was opened for a state that no longer holds
            // (e.g. the pending entry was abandoned in between).
            _ => {
                self.prompt = None;
                Err(CoreError::Validation(
                    "Marking prompt is stale; click the chart again".into(),
                ))
            }
        }
    }
}
