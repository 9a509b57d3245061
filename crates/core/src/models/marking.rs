use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::candle::PriceField;
use super::trade::Direction;

/// Size pre-filled in the entry prompt.
pub const DEFAULT_ENTRY_SIZE: f64 = 0.01;

/// Entry parameters captured on the first click, waiting for an exit click.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingEntry {
    pub direction: Direction,
    pub size: f64,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
}

/// State of the marking machine.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum MarkState {
    #[default]
    Idle,
    AwaitingExit(PendingEntry),
}

/// A click resolved against the revealed candle series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickTarget {
    /// Index into the revealed candles
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub close: f64,
}

impl ClickTarget {
    #[must_use]
    pub fn price(&self, field: PriceField) -> f64 {
        match field {
            PriceField::Open => self.open,
            PriceField::Close => self.close,
        }
    }
}

/// Confirmation prompt opened by a qualifying click.
#[derive(Debug, Clone, PartialEq)]
pub enum Prompt {
    /// No position pending: collect direction, size and entry price.
    Entry { target: ClickTarget },
    /// A position is pending: collect the exit price.
    Exit {
        target: ClickTarget,
        pending: PendingEntry,
    },
}

impl Prompt {
    #[must_use]
    pub fn target(&self) -> &ClickTarget {
        match self {
            Prompt::Entry { target } | Prompt::Exit { target, .. } => target,
        }
    }

    /// Dialog title for the renderer.
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            Prompt::Entry { .. } => "Mark Entry",
            Prompt::Exit { .. } => "Mark Exit",
        }
    }
}

/// Fields of the entry prompt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntryForm {
    pub direction: Direction,
    pub size: f64,
    pub price_field: PriceField,
}

impl Default for EntryForm {
    fn default() -> Self {
        Self {
            direction: Direction::Long,
            size: DEFAULT_ENTRY_SIZE,
            price_field: PriceField::Close,
        }
    }
}

/// Fields of the exit prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExitForm {
    pub price_field: PriceField,
}

/// What the user submitted when confirming a prompt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PromptInput {
    Entry(EntryForm),
    Exit(ExitForm),
}
