//! Mean reversion: buy an oversold dip to the lower Bollinger band while the
//! close holds above its trend SMA; exit on SL, TP, or RSI recovery.
//!
//! The same logic backs both the single- and multi-timeframe variants; only
//! the bar feeding SL/TP differs, and that is chosen by the loop.

use super::params::{
    param, param_fraction, param_period, ParamKind, ParamSpec, StrategyError, StrategyParams,
    STOP_LOSS, TAKE_PROFIT,
};
use super::{risk_exit, Intent, StrategyContext};
use crate::domain::{Bar, ExitReason};
use crate::indicators::{Bollinger, Indicator, IndicatorValues, Rsi, Sma};

pub const PARAMS: &[ParamSpec] = &[
    ParamSpec {
        name: "rsi_period",
        kind: ParamKind::Int,
        default: Some(14.0),
        help: "RSI period",
    },
    ParamSpec {
        name: "rsi_oversold",
        kind: ParamKind::Float,
        default: Some(28.0),
        help: "enter below this RSI",
    },
    ParamSpec {
        name: "rsi_exit",
        kind: ParamKind::Float,
        default: Some(55.0),
        help: "exit above this RSI",
    },
    ParamSpec {
        name: "trend_ma",
        kind: ParamKind::Int,
        default: Some(50.0),
        help: "trend SMA period",
    },
    ParamSpec {
        name: "bb_period",
        kind: ParamKind::Int,
        default: Some(20.0),
        help: "Bollinger period",
    },
    ParamSpec {
        name: "bb_devfactor",
        kind: ParamKind::Float,
        default: Some(2.0),
        help: "Bollinger width in standard deviations",
    },
    ParamSpec {
        name: TAKE_PROFIT,
        kind: ParamKind::Float,
        default: Some(0.015),
        help: "take-profit distance from entry (fraction)",
    },
    ParamSpec {
        name: STOP_LOSS,
        kind: ParamKind::Float,
        default: Some(0.006),
        help: "stop-loss distance from entry (fraction)",
    },
];

#[derive(Debug, Clone)]
pub struct OversoldBounce {
    pub rsi_oversold: f64,
    pub rsi_exit: f64,
    pub take_profit_pct: Option<f64>,
    pub stop_loss_pct: Option<f64>,
    rsi: Rsi,
    lower_band: Bollinger,
    trend: Sma,
}

impl OversoldBounce {
    pub fn from_params(params: &StrategyParams) -> Result<Self, StrategyError> {
        let threshold = |name: &str| -> Result<f64, StrategyError> {
            match param(params, PARAMS, name) {
                Some(v) if v.is_finite() => Ok(v),
                other => Err(StrategyError::InvalidParam {
                    name: name.to_string(),
                    reason: format!("expected a finite number, got {other:?}"),
                }),
            }
        };
        let devfactor = threshold("bb_devfactor")?;
        Ok(Self {
            rsi_oversold: threshold("rsi_oversold")?,
            rsi_exit: threshold("rsi_exit")?,
            take_profit_pct: param_fraction(params, PARAMS, TAKE_PROFIT)?,
            stop_loss_pct: param_fraction(params, PARAMS, STOP_LOSS)?,
            rsi: Rsi::new(param_period(params, PARAMS, "rsi_period")?),
            lower_band: Bollinger::lower(param_period(params, PARAMS, "bb_period")?, devfactor),
            trend: Sma::new(param_period(params, PARAMS, "trend_ma")?),
        })
    }

    pub fn compute_indicators(&self, signal_bars: &[Bar]) -> IndicatorValues {
        let mut iv = IndicatorValues::new();
        iv.compute(&self.rsi, signal_bars);
        iv.compute(&self.lower_band, signal_bars);
        iv.compute(&self.trend, signal_bars);
        iv
    }

    pub fn warmup(&self) -> usize {
        self.rsi
            .lookback()
            .max(self.lower_band.lookback())
            .max(self.trend.lookback())
    }

    pub fn evaluate_entry(&self, ctx: &StrategyContext, iv: &IndicatorValues) -> Option<Intent> {
        let i = ctx.signal_index;
        let rsi = iv.get(self.rsi.name(), i)?;
        let lower = iv.get(self.lower_band.name(), i)?;
        let trend = iv.get(self.trend.name(), i)?;
        let price = ctx.signal_bar.close;

        let in_uptrend = price > trend;
        let oversold = rsi < self.rsi_oversold;
        let at_lower_band = price <= lower;
        (in_uptrend && oversold && at_lower_band).then_some(Intent::Enter)
    }

    pub fn evaluate_exit(&self, ctx: &StrategyContext, iv: &IndicatorValues) -> Option<Intent> {
        // Nothing to measure against until the fill is known.
        let entry = ctx.position.entry_price?;
        if let Some(reason) = risk_exit(entry, ctx.risk_bar, self.stop_loss_pct, self.take_profit_pct) {
            return Some(Intent::Exit(reason));
        }
        let rsi = iv.get(self.rsi.name(), ctx.signal_index)?;
        (rsi > self.rsi_exit).then_some(Intent::Exit(ExitReason::Signal))
    }
}
