use serde::{Deserialize, Serialize};

use super::journal::TradeJournal;
use super::settings::Settings;

/// Everything a session persists locally: settings (including the bearer
/// token) and the journal as it stands when the snapshot is written.
///
/// A trade the backend rejected has already been rolled back, so only
/// acknowledged trades and saves still in flight reach a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub settings: Settings,

    pub journal: TradeJournal,
}
