//! Strategy state machines.
//!
//! A closed set of variants sharing one shape: an entry condition evaluated
//! while flat and a prioritized exit chain evaluated while long. Strategies
//! see a read-only [`PositionSnapshot`] and return an [`Intent`]; the broker
//! alone mutates state.

pub mod ma_cross;
pub mod oversold_bounce;
pub mod params;

pub use ma_cross::MaCross;
pub use oversold_bounce::OversoldBounce;
pub use params::{
    defaults, find_spec, ParamKind, ParamSpec, StrategyError, StrategyParams, STOP_LOSS,
    TAKE_PROFIT,
};

use crate::domain::{Bar, ExitReason};
use crate::engine::PositionSnapshot;
use crate::indicators::IndicatorValues;
use std::fmt;

/// What a strategy asks the engine to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Enter,
    Exit(ExitReason),
}

/// Which clock SL/TP checks run on in multi-timeframe mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskClock {
    /// Evaluate only when a signal bar completes, against that bar's range.
    Signal,
    /// Evaluate on every execution bar, against the execution bar's range.
    Granular,
}

/// Everything visible to a strategy at one evaluation step.
#[derive(Debug, Clone, Copy)]
pub struct StrategyContext<'a> {
    /// Index of the most recently completed signal bar.
    pub signal_index: usize,
    pub signal_bar: &'a Bar,
    /// Bar whose high/low is tested against SL/TP.
    pub risk_bar: &'a Bar,
    pub position: PositionSnapshot,
}

/// Shared stop-loss / take-profit check. Stop-loss wins when both trigger.
pub fn risk_exit(
    entry_price: f64,
    bar: &Bar,
    stop_loss_pct: Option<f64>,
    take_profit_pct: Option<f64>,
) -> Option<ExitReason> {
    if let Some(sl) = stop_loss_pct {
        if bar.low <= entry_price * (1.0 - sl) {
            return Some(ExitReason::StopLoss);
        }
    }
    if let Some(tp) = take_profit_pct {
        if bar.high >= entry_price * (1.0 + tp) {
            return Some(ExitReason::TakeProfit);
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    MaCross,
    OversoldBounce,
    OversoldBounceMtf,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::MaCross,
        StrategyKind::OversoldBounce,
        StrategyKind::OversoldBounceMtf,
    ];

    pub fn id(self) -> &'static str {
        match self {
            StrategyKind::MaCross => "ma_cross",
            StrategyKind::OversoldBounce => "oversold_bounce",
            StrategyKind::OversoldBounceMtf => "oversold_bounce_mtf",
        }
    }

    /// Legacy class-style name, accepted as an alias.
    pub fn class_name(self) -> &'static str {
        match self {
            StrategyKind::MaCross => "MAStrategy",
            StrategyKind::OversoldBounce => "OversoldBounceStrategy",
            StrategyKind::OversoldBounceMtf => "OversoldBounceMTFStrategy",
        }
    }

    /// Resolve `ma_cross`, `MAStrategy` or `strategies.MAStrategy` style identifiers.
    pub fn resolve(identifier: &str) -> Result<Self, StrategyError> {
        let trimmed = identifier.trim();
        let name = trimmed.strip_prefix("strategies.").unwrap_or(trimmed);
        Self::ALL
            .into_iter()
            .find(|k| k.id() == name || k.class_name() == name)
            .ok_or_else(|| StrategyError::UnknownStrategy {
                identifier: identifier.to_string(),
                available: Self::ALL.iter().map(|k| k.id().to_string()).collect(),
            })
    }

    pub fn param_specs(self) -> &'static [ParamSpec] {
        match self {
            StrategyKind::MaCross => ma_cross::PARAMS,
            StrategyKind::OversoldBounce | StrategyKind::OversoldBounceMtf => {
                oversold_bounce::PARAMS
            }
        }
    }

    pub fn declares(self, name: &str) -> bool {
        find_spec(self.param_specs(), name).is_some()
    }

    pub fn risk_clock(self) -> RiskClock {
        match self {
            StrategyKind::OversoldBounceMtf => RiskClock::Granular,
            _ => RiskClock::Signal,
        }
    }

    /// Only meaningful with a granular execution series.
    pub fn requires_granular(self) -> bool {
        self.risk_clock() == RiskClock::Granular
    }

    /// Reject undeclared names, then build the variant.
    pub fn build(self, params: &StrategyParams) -> Result<Strategy, StrategyError> {
        if let Some(name) = params.keys().find(|k| !self.declares(k)) {
            return Err(StrategyError::UnknownParam {
                strategy: self.id().to_string(),
                name: name.clone(),
                valid: self
                    .param_specs()
                    .iter()
                    .map(|s| s.name.to_string())
                    .collect(),
            });
        }
        Ok(match self {
            StrategyKind::MaCross => Strategy::MaCross(MaCross::from_params(params)?),
            StrategyKind::OversoldBounce => {
                Strategy::OversoldBounce(OversoldBounce::from_params(params)?)
            }
            StrategyKind::OversoldBounceMtf => {
                Strategy::OversoldBounceMtf(OversoldBounce::from_params(params)?)
            }
        })
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone)]
pub enum Strategy {
    MaCross(MaCross),
    OversoldBounce(OversoldBounce),
    OversoldBounceMtf(OversoldBounce),
}

impl Strategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::MaCross(_) => StrategyKind::MaCross,
            Strategy::OversoldBounce(_) => StrategyKind::OversoldBounce,
            Strategy::OversoldBounceMtf(_) => StrategyKind::OversoldBounceMtf,
        }
    }

    /// Precompute every indicator the variant reads, over the signal series.
    pub fn compute_indicators(&self, signal_bars: &[Bar]) -> IndicatorValues {
        match self {
            Strategy::MaCross(s) => s.compute_indicators(signal_bars),
            Strategy::OversoldBounce(s) | Strategy::OversoldBounceMtf(s) => {
                s.compute_indicators(signal_bars)
            }
        }
    }

    /// Signal bars before the first possible entry.
    pub fn warmup(&self) -> usize {
        match self {
            Strategy::MaCross(s) => s.warmup(),
            Strategy::OversoldBounce(s) | Strategy::OversoldBounceMtf(s) => s.warmup(),
        }
    }

    pub fn evaluate_entry(&self, ctx: &StrategyContext, iv: &IndicatorValues) -> Option<Intent> {
        match self {
            Strategy::MaCross(s) => s.evaluate_entry(ctx, iv),
            Strategy::OversoldBounce(s) | Strategy::OversoldBounceMtf(s) => {
                s.evaluate_entry(ctx, iv)
            }
        }
    }

    pub fn evaluate_exit(&self, ctx: &StrategyContext, iv: &IndicatorValues) -> Option<Intent> {
        match self {
            Strategy::MaCross(s) => s.evaluate_exit(ctx, iv),
            Strategy::OversoldBounce(s) | Strategy::OversoldBounceMtf(s) => {
                s.evaluate_exit(ctx, iv)
            }
        }
    }

    /// Entry while flat, exit chain while long, nothing while an order is pending.
    pub fn evaluate(&self, ctx: &StrategyContext, iv: &IndicatorValues) -> Option<Intent> {
        if ctx.position.order_pending {
            return None;
        }
        if ctx.position.is_flat() {
            self.evaluate_entry(ctx, iv)
        } else {
            self.evaluate_exit(ctx, iv)
        }
    }
}
