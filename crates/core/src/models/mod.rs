pub mod analytics;
pub mod candle;
pub mod chart;
pub mod journal;
pub mod marking;
pub mod notification;
pub mod replay;
pub mod settings;
pub mod trade;
pub mod workspace;
