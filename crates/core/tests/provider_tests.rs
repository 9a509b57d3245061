// ═══════════════════════════════════════════════════════════════════
// Provider Tests — registry routing, HTTP client helpers, Yahoo mapping
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use replay_journal_core::errors::CoreError;
use replay_journal_core::models::candle::Candle;
use replay_journal_core::models::settings::Settings;
use replay_journal_core::models::trade::{Direction, Trade, TradeKind};
use replay_journal_core::providers::http_api::{
    failure_reason, parse_timestamp, HttpApiClient, RegisteredUser,
};
use replay_journal_core::providers::registry::CandleProviderRegistry;
use replay_journal_core::providers::traits::{CandleProvider, TradeStore};
use replay_journal_core::providers::yahoo_finance::YahooCandleProvider;
use replay_journal_core::ReplaySession;

struct NamedProvider {
    name: &'static str,
    timeframes: &'static [&'static str],
}

#[async_trait]
impl CandleProvider for NamedProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn supported_timeframes(&self) -> Vec<String> {
        self.timeframes.iter().map(|s| s.to_string()).collect()
    }

    async fn get_candles(
        &self,
        _ticker: &str,
        _timeframe: &str,
        _trading_date: NaiveDate,
    ) -> Result<Vec<Candle>, CoreError> {
        Ok(Vec::new())
    }
}

// ═══════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════

mod registry {
    use super::*;

    fn registry() -> CandleProviderRegistry {
        let mut r = CandleProviderRegistry::new();
        r.register(Box::new(NamedProvider {
            name: "backend",
            timeframes: &["1min", "5min", "4h"],
        }));
        r.register(Box::new(NamedProvider {
            name: "fallback",
            timeframes: &["5min", "1h"],
        }));
        r
    }

    #[test]
    fn empty_registry() {
        let r = CandleProviderRegistry::default();
        assert!(r.is_empty());
        assert!(r.get_provider_for("5min").is_none());
    }

    #[test]
    fn routes_by_timeframe_in_registration_order() {
        let r = registry();
        assert_eq!(r.len(), 2);
        assert_eq!(r.provider_names(), vec!["backend", "fallback"]);
        assert_eq!(r.get_provider_for("5min").unwrap().name(), "backend");
        assert_eq!(r.get_provider_for("1h").unwrap().name(), "fallback");
        assert!(r.get_provider_for("1d").is_none());

        let names: Vec<&str> = r.get_providers_for("5MIN").iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["backend", "fallback"]);
    }

    #[test]
    fn defaults_put_backend_first() {
        let api = HttpApiClient::new("http://localhost:8000");
        let r = CandleProviderRegistry::new_with_defaults(&api);
        let names = r.provider_names();
        assert_eq!(names.first().map(String::as_str), Some("Journal API"));
        assert!(names.iter().any(|n| n == "Yahoo Finance"));
    }
}

// ═══════════════════════════════════════════════════════════════════
// HTTP client helpers
// ═══════════════════════════════════════════════════════════════════

mod http_api {
    use super::*;

    #[test]
    fn parses_rfc3339_with_offset() {
        let ts = parse_timestamp("2025-03-10T17:00:00+08:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap());
    }

    #[test]
    fn parses_naive_timestamps_as_utc() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 10, 9, 5, 0).unwrap();
        assert_eq!(parse_timestamp("2025-03-10T09:05:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2025-03-10 09:05:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2025-03-10T09:05:00.000").unwrap(), expected);
    }

    #[test]
    fn rejects_garbage_timestamp() {
        assert!(matches!(parse_timestamp("yesterday"), Err(CoreError::Api { .. })));
    }

    #[test]
    fn failure_reason_prefers_detail() {
        assert_eq!(
            failure_reason(400, r#"{"detail":"Trade already exists"}"#, "Failed to save trade"),
            "Trade already exists"
        );
    }

    #[test]
    fn failure_reason_falls_back_to_body_then_status() {
        assert_eq!(failure_reason(502, "Bad Gateway", "Failed"), "Bad Gateway");
        assert_eq!(failure_reason(500, "  ", "Failed to save trade"), "Failed to save trade (HTTP 500)");
        assert_eq!(failure_reason(422, r#"{"detail":""}"#, "x"), r#"{"detail":""}"#);
    }

    #[test]
    fn client_from_settings() {
        let mut settings = Settings::default();
        settings.set_api_url("https://journal.example.com/").unwrap();
        let client = HttpApiClient::from_settings(&settings);
        assert_eq!(client.base_url(), "https://journal.example.com");
        assert!(!client.is_authenticated());
        assert!(client.with_token("t").is_authenticated());
    }

    #[test]
    fn debug_does_not_leak_token() {
        let client = HttpApiClient::new("http://localhost:8000").with_token("super-secret");
        assert!(!format!("{client:?}").contains("super-secret"));
    }

    // Port 9 (discard) is closed on test machines, so the request fails fast.
    fn unreachable() -> HttpApiClient {
        HttpApiClient::new("http://127.0.0.1:9")
    }

    #[tokio::test]
    async fn save_failure_is_persistence_error() {
        let trade = Trade::open("xauusd", Direction::Long, 0.01, 2900.0, Utc::now());
        let err = unreachable().save_trade(&trade).await.unwrap_err();
        assert!(matches!(err, CoreError::Persistence(_)));
    }

    #[tokio::test]
    async fn candle_fetch_failure_is_network_error() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let err = unreachable().get_candles("xauusd", "5min", date).await.unwrap_err();
        assert!(matches!(err, CoreError::Network(_)));
    }

    #[tokio::test]
    async fn trade_fetch_failure_is_network_error() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let err = unreachable()
            .get_trades("xauusd", date, TradeKind::Simulated)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Network(_)));
    }

    #[tokio::test]
    async fn delete_failure_is_network_error() {
        let err = unreachable().delete_trade(42).await.unwrap_err();
        assert!(matches!(err, CoreError::Network(_)));
    }

    #[tokio::test]
    async fn register_failure_is_network_error() {
        let err = unreachable()
            .register("trader", "trader@example.com", "hunter22")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Network(_)));
    }

    #[tokio::test]
    async fn session_register_uses_configured_backend() {
        let mut session = ReplaySession::create_new();
        session.set_api_url("http://127.0.0.1:9").unwrap();
        let err = session
            .register("trader", "trader@example.com", "hunter22")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Network(_)));
        assert!(!session.is_authenticated());
    }

    #[test]
    fn registered_user_tolerates_missing_fields() {
        let user: RegisteredUser = serde_json::from_str(r#"{"username": "trader"}"#).unwrap();
        assert_eq!(user.username, "trader");
        assert_eq!(user.id, None);

        let user: RegisteredUser =
            serde_json::from_str(r#"{"id": 3, "username": "trader", "email": "t@example.com"}"#).unwrap();
        assert_eq!(user.id, Some(3));
        assert_eq!(user.email.as_deref(), Some("t@example.com"));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Yahoo Finance mapping
// ═══════════════════════════════════════════════════════════════════

mod yahoo {
    use super::*;

    #[test]
    fn symbol_aliases() {
        assert_eq!(YahooCandleProvider::yahoo_symbol("xauusd"), "GC=F");
        assert_eq!(YahooCandleProvider::yahoo_symbol("XAGUSD"), "SI=F");
        assert_eq!(YahooCandleProvider::yahoo_symbol("aapl"), "AAPL");
    }

    #[test]
    fn intervals() {
        assert_eq!(YahooCandleProvider::yahoo_interval("5min"), Some("5m"));
        assert_eq!(YahooCandleProvider::yahoo_interval("1D"), Some("1d"));
        assert_eq!(YahooCandleProvider::yahoo_interval("4h"), None);
    }

    #[test]
    fn does_not_claim_4h() {
        let provider = YahooCandleProvider::new().unwrap();
        assert_eq!(provider.name(), "Yahoo Finance");
        assert!(!provider.supported_timeframes().contains(&"4h".to_string()));
    }
}
