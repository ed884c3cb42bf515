//! Trend-follow: fast SMA crossing the slow SMA, with optional TP/SL on top.

use super::params::{
    param_fraction, param_period, ParamKind, ParamSpec, StrategyError, StrategyParams,
    STOP_LOSS, TAKE_PROFIT,
};
use super::{risk_exit, Intent, StrategyContext};
use crate::domain::{Bar, ExitReason};
use crate::indicators::{CrossOver, Indicator, IndicatorValues};

pub const PARAMS: &[ParamSpec] = &[
    ParamSpec {
        name: "fast",
        kind: ParamKind::Int,
        default: Some(10.0),
        help: "fast SMA period",
    },
    ParamSpec {
        name: "slow",
        kind: ParamKind::Int,
        default: Some(30.0),
        help: "slow SMA period",
    },
    ParamSpec {
        name: TAKE_PROFIT,
        kind: ParamKind::Float,
        default: None,
        help: "take-profit distance from entry (fraction)",
    },
    ParamSpec {
        name: STOP_LOSS,
        kind: ParamKind::Float,
        default: None,
        help: "stop-loss distance from entry (fraction)",
    },
];

#[derive(Debug, Clone)]
pub struct MaCross {
    pub fast: usize,
    pub slow: usize,
    pub take_profit_pct: Option<f64>,
    pub stop_loss_pct: Option<f64>,
    crossover: CrossOver,
}

impl MaCross {
    pub fn from_params(params: &StrategyParams) -> Result<Self, StrategyError> {
        let fast = param_period(params, PARAMS, "fast")?;
        let slow = param_period(params, PARAMS, "slow")?;
        Ok(Self {
            fast,
            slow,
            take_profit_pct: param_fraction(params, PARAMS, TAKE_PROFIT)?,
            stop_loss_pct: param_fraction(params, PARAMS, STOP_LOSS)?,
            crossover: CrossOver::new(fast, slow),
        })
    }

    pub fn compute_indicators(&self, signal_bars: &[Bar]) -> IndicatorValues {
        let mut iv = IndicatorValues::new();
        iv.compute(&self.crossover, signal_bars);
        iv
    }

    pub fn warmup(&self) -> usize {
        self.crossover.lookback()
    }

    pub fn evaluate_entry(&self, ctx: &StrategyContext, iv: &IndicatorValues) -> Option<Intent> {
        let cross = iv.get(self.crossover.name(), ctx.signal_index)?;
        (cross > 0.0).then_some(Intent::Enter)
    }

    pub fn evaluate_exit(&self, ctx: &StrategyContext, iv: &IndicatorValues) -> Option<Intent> {
        if let Some(entry) = ctx.position.entry_price {
            let hit = risk_exit(entry, ctx.risk_bar, self.stop_loss_pct, self.take_profit_pct);
            if let Some(reason) = hit {
                return Some(Intent::Exit(reason));
            }
        }
        let cross = iv.get(self.crossover.name(), ctx.signal_index)?;
        (cross < 0.0).then_some(Intent::Exit(ExitReason::Signal))
    }
}
