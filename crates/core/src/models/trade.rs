use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Side of a round-trip position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Long,
    Short,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

/// Whether a trade was taken live or marked on a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeKind {
    Real,
    #[default]
    Simulated,
}

impl std::fmt::Display for TradeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeKind::Real => write!(f, "real"),
            TradeKind::Simulated => write!(f, "simulated"),
        }
    }
}

/// A round-trip position.
///
/// A trade is closed iff both `exit_price` and `exit_time` are present.
/// `local_id` identifies the record inside this process (optimistic
/// append, rollback, P&L admission); `id` is assigned by the backend once
/// the trade has been persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    #[serde(skip, default = "Uuid::new_v4")]
    pub local_id: Uuid,

    /// Server-assigned identifier, absent until persisted
    #[serde(default)]
    pub id: Option<i64>,

    /// Instrument symbol, lower-case (e.g. "xauusd")
    #[serde(default)]
    pub ticker: String,

    #[serde(rename = "type", default)]
    pub kind: TradeKind,

    pub direction: Direction,

    /// Position size, always positive
    pub size: f64,

    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,

    #[serde(default)]
    pub exit_price: Option<f64>,

    #[serde(default)]
    pub exit_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub notes: Option<String>,
}

impl Trade {
    /// Build an open trade with a fresh local identity.
    pub fn open(
        ticker: impl Into<String>,
        direction: Direction,
        size: f64,
        entry_price: f64,
        entry_time: DateTime<Utc>,
    ) -> Self {
        Self {
            local_id: Uuid::new_v4(),
            id: None,
            ticker: ticker.into().to_lowercase(),
            kind: TradeKind::default(),
            direction,
            size,
            entry_price,
            entry_time,
            exit_price: None,
            exit_time: None,
            notes: None,
        }
    }

    /// Return this trade closed at the given price and time.
    #[must_use]
    pub fn closed_at(mut self, exit_price: f64, exit_time: DateTime<Utc>) -> Self {
        self.exit_price = Some(exit_price);
        self.exit_time = Some(exit_time);
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: TradeKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.exit_price.is_some() && self.exit_time.is_some()
    }

    /// Exit fill of a closed trade.
    #[must_use]
    pub fn exit(&self) -> Option<(f64, DateTime<Utc>)> {
        Some((self.exit_price?, self.exit_time?))
    }

    /// Realized profit or loss; `None` while the position is open.
    ///
    /// Long: `(exit - entry) * size`. Short: `(entry - exit) * size`.
    #[must_use]
    pub fn realized_pnl(&self) -> Option<f64> {
        let (exit_price, _) = self.exit()?;
        let per_unit = match self.direction {
            Direction::Long => exit_price - self.entry_price,
            Direction::Short => self.entry_price - exit_price,
        };
        Some(per_unit * self.size)
    }

    /// Classify a closed trade. Open trades report `TradeOutcome::Open`.
    #[must_use]
    pub fn outcome(&self) -> TradeOutcome {
        match self.realized_pnl() {
            None => TradeOutcome::Open,
            Some(pnl) if pnl > 0.0 => TradeOutcome::Win,
            Some(pnl) if pnl < 0.0 => TradeOutcome::Loss,
            Some(_) => TradeOutcome::Breakeven,
        }
    }
}

/// Result classification of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeOutcome {
    Win,
    Loss,
    Breakeven,
    Open,
}
