use thiserror::Error;

use crate::factors::Factor;
use crate::record::Side;

/// Problems with the static engine configuration. Any of these stops the
/// engine from being built, so no request is ever served with them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{side} weights sum to {sum:.2}, expected 100 (tolerance {tolerance})")]
    WeightSum { side: Side, sum: f64, tolerance: f64 },

    #[error("no {side} weight configured for factor `{factor}`")]
    MissingWeight { side: Side, factor: Factor },

    #[error("{side} weight for `{factor}` is {value}, must be a finite value >= 0")]
    InvalidWeight { side: Side, factor: Factor, value: f64 },

    #[error("softmax temperature must be finite and > 0, got {0}")]
    Temperature(f64),

    #[error("draw model {field} is {value}: {reason}")]
    DrawModel {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("threshold table `{table}` is invalid: {reason}")]
    Thresholds { table: &'static str, reason: String },

    #[error("composite blend weights must be finite, >= 0 and sum to 1, got {probability} + {value}")]
    CompositeBlend { probability: f64, value: f64 },

    #[error("market catalogue is empty")]
    EmptyCatalogue,

    #[error("market key `{0}` is declared more than once")]
    DuplicateMarket(String),

    #[error("market `{key}` is invalid: {reason}")]
    InvalidMarket { key: String, reason: String },

    #[error("cannot read config file {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("config file {path} is not valid: {reason}")]
    Malformed { path: String, reason: String },

    #[error("environment override {var}={value} is not valid")]
    EnvOverride { var: &'static str, value: String },
}

/// Reasons a match record cannot be analysed. These are structured so the
/// calling layer can render its own message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("required field `{0}` is missing or blank")]
    MissingField(&'static str),

    #[error("odd `{field}` is {value}, must be a finite decimal > 1.0")]
    InvalidOdd { field: String, value: f64 },

    #[error("`{field}` is {value}, must be a finite value >= 0")]
    InvalidNumber { field: &'static str, value: f64 },

    #[error("`{field}` has unrecognised form token `{token}`")]
    InvalidForm { field: &'static str, token: String },

    #[error("`kickoff` value `{0}` is not an ISO date-time")]
    InvalidKickoff(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("match {match_id} rejected: {source}")]
    Input {
        match_id: String,
        #[source]
        source: InputError,
    },
}

impl EngineError {
    pub fn input(match_id: &str, source: InputError) -> Self {
        EngineError::Input {
            match_id: match_id.to_string(),
            source,
        }
    }

    pub fn input_reason(&self) -> Option<&InputError> {
        match self {
            EngineError::Input { source, .. } => Some(source),
            EngineError::Config(_) => None,
        }
    }
}
