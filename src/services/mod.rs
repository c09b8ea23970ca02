pub mod trade_service;
pub mod portfolio_service;
pub mod alert_service;
pub mod price_simulator;
pub mod notification;
pub mod market_service;
pub mod user_service;
pub mod market_stream;
pub mod scheduler;
