// ═══════════════════════════════════════════════════════════════════
// Storage Tests — encryption, snapshot format, StorageManager
// ═══════════════════════════════════════════════════════════════════

use chrono::{TimeZone, Utc};
use replay_journal_core::errors::CoreError;
use replay_journal_core::models::journal::TradeJournal;
use replay_journal_core::models::settings::Settings;
use replay_journal_core::models::trade::{Direction, Trade, TradeKind};
use replay_journal_core::models::workspace::Workspace;
use replay_journal_core::storage::encryption::{self, KdfParams, Sealed};
use replay_journal_core::storage::format::{self, CURRENT_VERSION, HEADER_LEN, MAGIC};
use replay_journal_core::storage::manager::StorageManager;

/// Smallest Argon2 cost accepted by the header bounds; keeps tests fast.
const CHEAP: KdfParams = KdfParams {
    memory_cost: 8,
    time_cost: 1,
    parallelism: 1,
};

fn sample_workspace() -> Workspace {
    let entry = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
    let exit = Utc.with_ymd_and_hms(2025, 3, 10, 9, 45, 0).unwrap();
    let mut saved = Trade::open("xauusd", Direction::Short, 0.01, 2912.4, entry)
        .closed_at(2905.1, exit)
        .with_kind(TradeKind::Simulated);
    saved.id = Some(17);
    saved.notes = Some("faded the open".into());

    let mut settings = Settings::default();
    settings.auth_token = Some("secret-token".into());

    Workspace {
        settings,
        journal: TradeJournal {
            trades: vec![saved, Trade::open("eurusd", Direction::Long, 1.0, 1.08, entry)],
        },
    }
}

// ═══════════════════════════════════════════════════════════════════
// KdfParams
// ═══════════════════════════════════════════════════════════════════

mod kdf_params {
    use super::*;

    #[test]
    fn default_values() {
        let p = KdfParams::default();
        assert_eq!(p.memory_cost, 19_456);
        assert_eq!(p.time_cost, 2);
        assert_eq!(p.parallelism, 1);
        assert!(p.check_bounds().is_ok());
    }

    #[test]
    fn out_of_range_rejected() {
        for p in [
            KdfParams { memory_cost: 4, ..CHEAP },
            KdfParams { memory_cost: 1 << 20, ..CHEAP },
            KdfParams { time_cost: 0, ..CHEAP },
            KdfParams { time_cost: 11, ..CHEAP },
            KdfParams { parallelism: 0, ..CHEAP },
        ] {
            assert!(matches!(p.check_bounds(), Err(CoreError::InvalidSnapshot(_))));
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// Seal / open
// ═══════════════════════════════════════════════════════════════════

mod sealing {
    use super::*;

    #[test]
    fn round_trip() {
        let sealed = encryption::seal(b"journal bytes", "pw", CHEAP).unwrap();
        assert_ne!(sealed.ciphertext, b"journal bytes");
        assert_eq!(encryption::open(&sealed, "pw").unwrap(), b"journal bytes");
    }

    #[test]
    fn wrong_password_is_decryption_error() {
        let sealed = encryption::seal(b"data", "right", CHEAP).unwrap();
        assert!(matches!(encryption::open(&sealed, "wrong"), Err(CoreError::Decryption)));
    }

    #[test]
    fn tampered_ciphertext_is_decryption_error() {
        let mut sealed = encryption::seal(b"data", "pw", CHEAP).unwrap();
        sealed.ciphertext[0] ^= 0xFF;
        assert!(matches!(encryption::open(&sealed, "pw"), Err(CoreError::Decryption)));
    }

    #[test]
    fn fresh_salt_and_nonce_each_time() {
        let a = encryption::seal(b"same", "pw", CHEAP).unwrap();
        let b = encryption::seal(b"same", "pw", CHEAP).unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Snapshot format
// ═══════════════════════════════════════════════════════════════════

mod snapshot_format {
    use super::*;

    fn sealed() -> Sealed {
        Sealed {
            kdf: CHEAP,
            salt: [1; 16],
            nonce: [2; 12],
            ciphertext: vec![9, 9, 9],
        }
    }

    #[test]
    fn encode_decode_round_trip() {
        let bytes = format::encode(&sealed());
        assert_eq!(bytes.len(), HEADER_LEN + 3);
        assert_eq!(&bytes[..4], MAGIC);
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), CURRENT_VERSION);
        assert_eq!(format::decode(&bytes).unwrap(), sealed());
    }

    #[test]
    fn bad_magic() {
        let mut bytes = format::encode(&sealed());
        bytes[0] = b'X';
        assert!(matches!(format::decode(&bytes), Err(CoreError::InvalidSnapshot(_))));
    }

    #[test]
    fn future_version() {
        let mut bytes = format::encode(&sealed());
        bytes[4..6].copy_from_slice(&(CURRENT_VERSION + 1).to_le_bytes());
        assert!(matches!(
            format::decode(&bytes),
            Err(CoreError::UnsupportedVersion(v)) if v == CURRENT_VERSION + 1
        ));
    }

    #[test]
    fn truncated_header() {
        let bytes = format::encode(&sealed());
        for len in [0, 3, 10, HEADER_LEN - 1] {
            assert!(matches!(
                format::decode(&bytes[..len]),
                Err(CoreError::InvalidSnapshot(_))
            ));
        }
    }

    #[test]
    fn header_without_payload() {
        let bytes = format::encode(&sealed());
        assert!(matches!(
            format::decode(&bytes[..HEADER_LEN]),
            Err(CoreError::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn hostile_kdf_params_rejected() {
        let mut bytes = format::encode(&sealed());
        // memory_cost lives right after magic + version
        bytes[6..10].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(format::decode(&bytes), Err(CoreError::InvalidSnapshot(_))));
    }
}

// ═══════════════════════════════════════════════════════════════════
// StorageManager
// ═══════════════════════════════════════════════════════════════════

mod manager {
    use super::*;

    fn assert_same_content(a: &Workspace, b: &Workspace) {
        assert_eq!(a.settings, b.settings);
        assert_eq!(a.journal.len(), b.journal.len());
        for (x, y) in a.journal.trades.iter().zip(&b.journal.trades) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.ticker, y.ticker);
            assert_eq!(x.kind, y.kind);
            assert_eq!(x.direction, y.direction);
            assert_eq!(x.size, y.size);
            assert_eq!(x.entry_price, y.entry_price);
            assert_eq!(x.entry_time, y.entry_time);
            assert_eq!(x.exit_price, y.exit_price);
            assert_eq!(x.exit_time, y.exit_time);
            assert_eq!(x.notes, y.notes);
        }
    }

    #[test]
    fn bytes_round_trip() {
        let ws = sample_workspace();
        let bytes = StorageManager::save_with_params(&ws, "pw", CHEAP).unwrap();
        let loaded = StorageManager::load_from_bytes(&bytes, "pw").unwrap();
        assert_same_content(&ws, &loaded);
    }

    #[test]
    fn token_is_not_stored_in_clear() {
        let bytes = StorageManager::save_with_params(&sample_workspace(), "pw", CHEAP).unwrap();
        let needle = b"secret-token";
        assert!(!bytes.windows(needle.len()).any(|w| w == needle));
    }

    #[test]
    fn wrong_password() {
        let bytes = StorageManager::save_with_params(&sample_workspace(), "pw", CHEAP).unwrap();
        assert!(matches!(
            StorageManager::load_from_bytes(&bytes, "nope"),
            Err(CoreError::Decryption)
        ));
    }

    #[test]
    fn default_params_round_trip() {
        let ws = Workspace::default();
        let bytes = StorageManager::save_to_bytes(&ws, "pw").unwrap();
        let loaded = StorageManager::load_from_bytes(&bytes, "pw").unwrap();
        assert_eq!(loaded, ws);
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.rjnl");
        let path = path.to_str().unwrap();

        let ws = sample_workspace();
        StorageManager::save_to_file(&ws, path, "pw").unwrap();
        let loaded = StorageManager::load_from_file(path, "pw").unwrap();
        assert_same_content(&ws, &loaded);
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.rjnl");
        assert!(matches!(
            StorageManager::load_from_file(path.to_str().unwrap(), "pw"),
            Err(CoreError::FileIO(_))
        ));
    }
}
