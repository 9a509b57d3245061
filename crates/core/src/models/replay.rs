use serde::{Deserialize, Serialize};

use super::candle::Candle;

/// Replay cursor: how many candles of the session are currently revealed.
///
/// The cursor never exceeds the length of the series it is applied to;
/// `revealed` clamps when the series is shorter than the cursor (e.g.
/// after switching to a session with fewer bars).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayCursor {
    visible_count: usize,
}

impl ReplayCursor {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.visible_count
    }

    /// Reveal one more bar. Returns `false` if the replay is already at the end.
    pub fn next_bar(&mut self, total: usize) -> bool {
        if self.visible_count >= total {
            self.visible_count = total;
            return false;
        }
        self.visible_count += 1;
        true
    }

    /// Hide every bar again.
    pub fn clear(&mut self) {
        self.visible_count = 0;
    }

    pub fn reveal_all(&mut self, total: usize) {
        self.visible_count = total;
    }

    #[must_use]
    pub fn is_finished(&self, total: usize) -> bool {
        self.visible_count >= total
    }

    /// The revealed prefix of `candles`.
    #[must_use]
    pub fn revealed<'a>(&self, candles: &'a [Candle]) -> &'a [Candle] {
        &candles[..self.visible_count.min(candles.len())]
    }

    /// Progress text shown next to the replay controls.
    #[must_use]
    pub fn progress_label(&self, total: usize) -> String {
        format!("Showing {}/{} bars", self.visible_count.min(total), total)
    }
}
