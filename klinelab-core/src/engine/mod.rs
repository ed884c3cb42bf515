//! Simulation engine: costs, broker, sizing, feed alignment and the bar loop.

pub mod broker;
pub mod cost_model;
pub mod feed;
pub mod loop_runner;
pub mod sizer;

pub use broker::{Broker, BrokerConfig, EquityPoint, OrderEvent, PositionSnapshot};
pub use cost_model::{CommissionConfig, CommissionMode, CostModel, SlippageConfig};
pub use feed::Feed;
pub use loop_runner::{run_backtest, EngineConfig, RunResult};
pub use sizer::PercentSizer;
