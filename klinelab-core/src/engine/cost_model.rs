//! Cost model: slippage and commission.
//!
//! Slippage is directional: buyers pay more, sellers receive less. The slipped
//! price is capped to the fill bar's range. Commission is a rate on notional.

use crate::domain::{Bar, OrderSide};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommissionMode {
    Maker,
    #[default]
    Taker,
    /// Arithmetic mean of maker and taker.
    Blended,
}

impl FromStr for CommissionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "maker" => Ok(CommissionMode::Maker),
            "taker" => Ok(CommissionMode::Taker),
            "blended" => Ok(CommissionMode::Blended),
            other => Err(format!(
                "unknown commission mode '{other}' (expected maker, taker or blended)"
            )),
        }
    }
}

impl fmt::Display for CommissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CommissionMode::Maker => "maker",
            CommissionMode::Taker => "taker",
            CommissionMode::Blended => "blended",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommissionConfig {
    pub maker_rate: f64,
    pub taker_rate: f64,
    pub mode: CommissionMode,
}

impl CommissionConfig {
    /// Rate applied to every fill.
    pub fn rate(&self) -> f64 {
        match self.mode {
            CommissionMode::Maker => self.maker_rate,
            CommissionMode::Taker => self.taker_rate,
            CommissionMode::Blended => (self.maker_rate + self.taker_rate) / 2.0,
        }
    }
}

impl Default for CommissionConfig {
    fn default() -> Self {
        Self {
            maker_rate: 0.0002,
            taker_rate: 0.0005,
            mode: CommissionMode::Taker,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlippageConfig {
    pub rate: f64,
}

impl Default for SlippageConfig {
    fn default() -> Self {
        Self { rate: 0.0001 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CostModel {
    pub commission: CommissionConfig,
    pub slippage: SlippageConfig,
}

impl CostModel {
    pub fn new(commission: CommissionConfig, slippage: SlippageConfig) -> Self {
        Self {
            commission,
            slippage,
        }
    }

    pub fn frictionless() -> Self {
        Self::new(
            CommissionConfig {
                maker_rate: 0.0,
                taker_rate: 0.0,
                mode: CommissionMode::Taker,
            },
            SlippageConfig { rate: 0.0 },
        )
    }

    /// Market fill price at `bar`'s open.
    ///
    /// `open * (1 + rate)` for buys, `open * (1 - rate)` for sells, then capped
    /// to `[low, high]` when the bar has a valid range.
    pub fn fill_price(&self, bar: &Bar, side: OrderSide) -> f64 {
        let slipped = match side {
            OrderSide::Buy => bar.open * (1.0 + self.slippage.rate),
            OrderSide::Sell => bar.open * (1.0 - self.slippage.rate),
        };
        match side {
            OrderSide::Buy if !bar.high.is_nan() => slipped.min(bar.high),
            OrderSide::Sell if !bar.low.is_nan() => slipped.max(bar.low),
            _ => slipped,
        }
    }

    /// `|size| * price * rate`
    pub fn commission(&self, size: f64, price: f64) -> f64 {
        size.abs() * price * self.commission.rate()
    }
}
