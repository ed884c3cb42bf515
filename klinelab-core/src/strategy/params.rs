//! Static parameter declarations and typed lookups.
//!
//! Every strategy variant publishes a `&'static [ParamSpec]`. Configuration is
//! checked against it before any data is touched; there is no runtime
//! introspection of strategy types.

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Resolved parameter values by name. Integers are stored exactly as `f64`.
pub type StrategyParams = BTreeMap<String, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Int,
    Float,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParamKind::Int => "int",
            ParamKind::Float => "float",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    /// `None` means the parameter is off unless set.
    pub default: Option<f64>,
    pub help: &'static str,
}

pub const TAKE_PROFIT: &str = "takeprofit_pct";
pub const STOP_LOSS: &str = "stoploss_pct";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyError {
    #[error("unknown strategy '{identifier}' (available: {})", available.join(", "))]
    UnknownStrategy {
        identifier: String,
        available: Vec<String>,
    },

    #[error("strategy {strategy} has no param '{name}'. Declared params: [{}]", valid.join(", "))]
    UnknownParam {
        strategy: String,
        name: String,
        valid: Vec<String>,
    },

    #[error("invalid value for param '{name}': {reason}")]
    InvalidParam { name: String, reason: String },
}

pub fn find_spec<'a>(specs: &'a [ParamSpec], name: &str) -> Option<&'a ParamSpec> {
    specs.iter().find(|s| s.name == name)
}

/// Declared defaults, skipping parameters that default to off.
pub fn defaults(specs: &[ParamSpec]) -> StrategyParams {
    specs
        .iter()
        .filter_map(|s| s.default.map(|d| (s.name.to_string(), d)))
        .collect()
}

/// Named float parameter, falling back to the declared default.
pub(crate) fn param(params: &StrategyParams, specs: &[ParamSpec], name: &str) -> Option<f64> {
    params
        .get(name)
        .copied()
        .or_else(|| find_spec(specs, name).and_then(|s| s.default))
}

/// Named period-like parameter; must be a whole number >= 1.
pub(crate) fn param_period(
    params: &StrategyParams,
    specs: &[ParamSpec],
    name: &str,
) -> Result<usize, StrategyError> {
    let value = param(params, specs, name).ok_or_else(|| StrategyError::InvalidParam {
        name: name.to_string(),
        reason: "missing".into(),
    })?;
    if value.fract() != 0.0 || value < 1.0 {
        return Err(StrategyError::InvalidParam {
            name: name.to_string(),
            reason: format!("expected a whole number >= 1, got {value}"),
        });
    }
    Ok(value as usize)
}

/// Optional fraction such as a TP/SL percentage; must be finite and >= 0 when set.
pub(crate) fn param_fraction(
    params: &StrategyParams,
    specs: &[ParamSpec],
    name: &str,
) -> Result<Option<f64>, StrategyError> {
    match param(params, specs, name) {
        Some(v) if !v.is_finite() || v < 0.0 => Err(StrategyError::InvalidParam {
            name: name.to_string(),
            reason: format!("expected a non-negative fraction, got {v}"),
        }),
        other => Ok(other),
    }
}
