pub mod analytics_service;
pub mod candle_service;
pub mod chart_service;
pub mod journal_service;
pub mod marking_service;
pub mod pnl_service;
