//! Run configuration: TOML file and CLI overrides, validated before any data access.
//!
//! `RunConfig` is the serializable surface. `validate()` resolves intervals,
//! the strategy variant and its typed parameters, and the broker settings into
//! a [`ValidatedRun`] that everything downstream consumes.

use chrono::NaiveDate;
use klinelab_core::domain::Interval;
use klinelab_core::engine::{
    BrokerConfig, CommissionConfig, CommissionMode, CostModel, EngineConfig, SlippageConfig,
};
use klinelab_core::strategy::{
    defaults, find_spec, ParamKind, Strategy, StrategyError, StrategyKind, StrategyParams,
    STOP_LOSS, TAKE_PROFIT,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors detected while reading or validating a run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown interval '{0}' (valid: 1m, 3m, 5m, 15m, 30m, 1h, 2h, 4h, 1d)")]
    UnknownInterval(String),

    #[error(transparent)]
    Strategy(#[from] StrategyError),

    #[error("param '{name}' expects {expected}, got {value}")]
    ParamType {
        name: String,
        expected: ParamKind,
        value: String,
    },

    #[error("Bad --param format '{0}', expected KEY=VALUE")]
    BadParamFormat(String),

    #[error("strategy {0} executes SL/TP on a finer series; set granular_interval (--granular-tf)")]
    GranularRequired(String),

    #[error("granular interval {granular} must be finer than and evenly divide signal interval {signal}")]
    GranularNotFiner { granular: Interval, signal: Interval },

    #[error("start date {start} must be before end date {end} (end is exclusive)")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A strategy parameter value before coercion to its declared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Type a raw override: booleans first, then integer, then float, else text.
    pub fn auto_type(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => return ParamValue::Bool(true),
            "false" | "no" | "0" => return ParamValue::Bool(false),
            _ => {}
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return ParamValue::Int(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return ParamValue::Float(f);
        }
        ParamValue::Text(raw.to_string())
    }

    /// Coerce into a declared kind. Ints accept bools as 0/1; floats accept any number.
    /// Text is auto-typed first, so a quoted `"10"` from TOML counts as an integer.
    pub fn coerce(&self, kind: ParamKind) -> Option<f64> {
        match (kind, self) {
            (_, ParamValue::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
            (_, ParamValue::Int(i)) => Some(*i as f64),
            (ParamKind::Float, ParamValue::Float(f)) => Some(*f),
            (_, ParamValue::Text(raw)) => match ParamValue::auto_type(raw) {
                ParamValue::Text(_) => None,
                typed => typed.coerce(kind),
            },
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Int(i) => write!(f, "{i}"),
            ParamValue::Float(x) => write!(f, "{x}"),
            ParamValue::Text(s) => write!(f, "'{s}'"),
        }
    }
}

/// Split a `KEY=VALUE` override and auto-type the value.
pub fn parse_param_override(item: &str) -> Result<(String, ParamValue), ConfigError> {
    let (key, value) = item
        .split_once('=')
        .ok_or_else(|| ConfigError::BadParamFormat(item.to_string()))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(ConfigError::BadParamFormat(item.to_string()));
    }
    Ok((key.to_string(), ParamValue::auto_type(value)))
}

fn default_cash() -> f64 {
    10_000.0
}
fn default_leverage() -> f64 {
    5.0
}
fn default_position_fraction() -> f64 {
    0.95
}
fn default_maker_rate() -> f64 {
    0.0002
}
fn default_taker_rate() -> f64 {
    0.0005
}
fn default_slippage_rate() -> f64 {
    0.0001
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("Data")
}

/// Serializable configuration for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub symbol: String,
    /// Inclusive.
    pub start_date: NaiveDate,
    /// Exclusive.
    pub end_date: NaiveDate,
    pub signal_interval: String,
    #[serde(default)]
    pub granular_interval: Option<String>,
    pub strategy: String,
    /// Applied as `takeprofit_pct` when the strategy declares it.
    #[serde(default)]
    pub take_profit_pct: Option<f64>,
    /// Applied as `stoploss_pct` when the strategy declares it.
    #[serde(default)]
    pub stop_loss_pct: Option<f64>,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,

    #[serde(default = "default_cash")]
    pub starting_cash: f64,
    #[serde(default = "default_leverage")]
    pub leverage: f64,
    #[serde(default = "default_position_fraction")]
    pub position_fraction: f64,
    #[serde(default = "default_maker_rate")]
    pub commission_maker_rate: f64,
    #[serde(default = "default_taker_rate")]
    pub commission_taker_rate: f64,
    #[serde(default)]
    pub commission_mode: CommissionMode,
    #[serde(default = "default_slippage_rate")]
    pub slippage_rate: f64,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl RunConfig {
    /// Required fields only; everything else takes its default.
    pub fn new(
        symbol: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        signal_interval: impl Into<String>,
        strategy: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            start_date,
            end_date,
            signal_interval: signal_interval.into(),
            granular_interval: None,
            strategy: strategy.into(),
            take_profit_pct: None,
            stop_loss_pct: None,
            params: BTreeMap::new(),
            starting_cash: default_cash(),
            leverage: default_leverage(),
            position_fraction: default_position_fraction(),
            commission_maker_rate: default_maker_rate(),
            commission_taker_rate: default_taker_rate(),
            commission_mode: CommissionMode::default(),
            slippage_rate: default_slippage_rate(),
            data_dir: default_data_dir(),
        }
    }

    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Deterministic identifier for this configuration (BLAKE3 over its JSON form).
    pub fn run_id(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        let hex = blake3::hash(json.as_bytes()).to_hex();
        hex.as_str()[..16].to_string()
    }

    /// Check everything that can be checked without touching data.
    pub fn validate(&self) -> Result<ValidatedRun, ConfigError> {
        let symbol = self.symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "symbol",
                reason: "must not be empty".into(),
            });
        }
        if self.start_date >= self.end_date {
            return Err(ConfigError::InvalidDateRange {
                start: self.start_date,
                end: self.end_date,
            });
        }

        let signal_interval = parse_interval(&self.signal_interval)?;
        let granular_interval = self
            .granular_interval
            .as_deref()
            .map(parse_interval)
            .transpose()?;
        if let Some(granular) = granular_interval {
            if !granular.divides(signal_interval) {
                return Err(ConfigError::GranularNotFiner {
                    granular,
                    signal: signal_interval,
                });
            }
        }

        let kind = StrategyKind::resolve(&self.strategy)?;
        if kind.requires_granular() && granular_interval.is_none() {
            return Err(ConfigError::GranularRequired(kind.id().to_string()));
        }

        let (params, warnings) = self.resolve_params(kind)?;
        let strategy = kind.build(&params)?;
        let engine = self.engine_config()?;

        Ok(ValidatedRun {
            symbol,
            start: self.start_date,
            end: self.end_date,
            signal_interval,
            granular_interval,
            strategy,
            params,
            engine,
            data_dir: self.data_dir.clone(),
            warnings,
        })
    }

    /// TP/SL shortcuts first, then explicit overrides, on top of declared defaults.
    fn resolve_params(&self, kind: StrategyKind) -> Result<(StrategyParams, Vec<String>), ConfigError> {
        let specs = kind.param_specs();
        let mut params = defaults(specs);
        let mut warnings = Vec::new();

        for (option, name, value) in [
            ("take_profit_pct", TAKE_PROFIT, self.take_profit_pct),
            ("stop_loss_pct", STOP_LOSS, self.stop_loss_pct),
        ] {
            let Some(value) = value else { continue };
            if kind.declares(name) {
                params.insert(name.to_string(), value);
            } else {
                let msg = format!("{option} ignored: {kind} has no '{name}' param");
                tracing::warn!("{msg}");
                warnings.push(msg);
            }
        }

        for (name, raw) in &self.params {
            let spec = find_spec(specs, name).ok_or_else(|| StrategyError::UnknownParam {
                strategy: kind.id().to_string(),
                name: name.clone(),
                valid: specs.iter().map(|s| s.name.to_string()).collect(),
            })?;
            let value = raw.coerce(spec.kind).ok_or_else(|| ConfigError::ParamType {
                name: name.clone(),
                expected: spec.kind,
                value: raw.to_string(),
            })?;
            params.insert(name.clone(), value);
        }
        Ok((params, warnings))
    }

    fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        positive("starting_cash", self.starting_cash)?;
        positive("leverage", self.leverage)?;
        positive("position_fraction", self.position_fraction)?;
        non_negative("commission_maker_rate", self.commission_maker_rate)?;
        non_negative("commission_taker_rate", self.commission_taker_rate)?;
        non_negative("slippage_rate", self.slippage_rate)?;

        Ok(EngineConfig {
            broker: BrokerConfig {
                starting_cash: self.starting_cash,
                leverage: self.leverage,
                costs: CostModel::new(
                    CommissionConfig {
                        maker_rate: self.commission_maker_rate,
                        taker_rate: self.commission_taker_rate,
                        mode: self.commission_mode,
                    },
                    SlippageConfig {
                        rate: self.slippage_rate,
                    },
                ),
            },
            position_fraction: self.position_fraction,
        })
    }
}

fn parse_interval(label: &str) -> Result<Interval, ConfigError> {
    label
        .parse()
        .map_err(|_| ConfigError::UnknownInterval(label.to_string()))
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field,
            reason: format!("must be a positive number, got {value}"),
        })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field,
            reason: format!("must be a non-negative number, got {value}"),
        })
    }
}

/// A configuration that passed every static check.
#[derive(Debug, Clone)]
pub struct ValidatedRun {
    /// Upper-cased pair, e.g. `BTCUSDT`.
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub signal_interval: Interval,
    pub granular_interval: Option<Interval>,
    pub strategy: Strategy,
    /// Resolved parameter values, defaults included.
    pub params: StrategyParams,
    pub engine: EngineConfig,
    pub data_dir: PathBuf,
    /// Options that were accepted but ignored.
    pub warnings: Vec<String>,
}

impl ValidatedRun {
    pub fn kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub fn is_multi_timeframe(&self) -> bool {
        self.granular_interval.is_some()
    }

    /// The interval that is fetched and loaded from the cache.
    pub fn data_interval(&self) -> Interval {
        self.granular_interval.unwrap_or(self.signal_interval)
    }
}
