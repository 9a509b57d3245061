use thiserror::Error;

/// Unified error type for the entire replay-journal-core library.
/// Every fallible public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Snapshot / File ─────────────────────────────────────────────
    #[error("Invalid snapshot format: {0}")]
    InvalidSnapshot(String),

    #[error("Unsupported snapshot version: {0}")]
    UnsupportedVersion(u16),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed — wrong password or corrupted snapshot")]
    Decryption,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ── File I/O (native only) ──────────────────────────────────────
    #[error("File I/O error: {0}")]
    FileIO(String),

    // ── API / Network ───────────────────────────────────────────────
    #[error("API error ({provider}): {message}")]
    Api {
        provider: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("No candle provider available for timeframe: {0}")]
    NoProvider(String),

    #[error("Failed to save trade: {0}")]
    Persistence(String),

    // ── Business Logic ──────────────────────────────────────────────
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Trade not found: {0}")]
    TradeNotFound(String),

    #[error("No candles available for {ticker} ({timeframe}) on {date}")]
    NoCandles {
        ticker: String,
        timeframe: String,
        date: String,
    },
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<bincode::Error> for CoreError {
    fn from(e: bincode::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest errors embed the full URL; drop the query string so
        // tokens passed as parameters never reach logs.
        let msg = e.to_string();
        let sanitized = match msg.find('?') {
            Some(idx) => format!("{}?<query redacted>", &msg[..idx]),
            None => msg,
        };
        CoreError::Network(sanitized)
    }
}

impl From<aes_gcm::Error> for CoreError {
    fn from(_: aes_gcm::Error) -> Self {
        CoreError::Decryption
    }
}
