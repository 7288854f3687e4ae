use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::factors::round2;
use crate::goals::{GoalModel, GoalRates};
use crate::normalize::OutcomeProbabilities;
use crate::record::{MatchRecord, Outcome, Side};

/// What a market pays out on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketKind {
    Outcome { outcome: Outcome },
    DoubleChance { first: Outcome, second: Outcome },
    BothTeamsScore,
    BothTeamsScoreNo,
    OverGoals { line: f64 },
    UnderGoals { line: f64 },
    Handicap { side: Side, line: f64 },
}

/// Where a market's probability came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ProbabilitySource {
    /// The normalized 1X2 distribution.
    OutcomeModel,
    GoalModel(GoalRates),
}

impl MarketKind {
    /// Probability in percent, rounded to two decimals.
    pub fn probability(
        &self,
        outcomes: &OutcomeProbabilities,
        goals: &GoalModel,
    ) -> (f64, ProbabilitySource) {
        let goal_source = ProbabilitySource::GoalModel(goals.rates());
        match *self {
            MarketKind::Outcome { outcome } => {
                (outcomes.get(outcome), ProbabilitySource::OutcomeModel)
            }
            MarketKind::DoubleChance { first, second } => (
                round2(outcomes.get(first) + outcomes.get(second)),
                ProbabilitySource::OutcomeModel,
            ),
            MarketKind::BothTeamsScore => (round2(goals.both_teams_score()), goal_source),
            MarketKind::BothTeamsScoreNo => {
                (round2(100.0 - goals.both_teams_score()), goal_source)
            }
            MarketKind::OverGoals { line } => (round2(goals.over(line)), goal_source),
            MarketKind::UnderGoals { line } => (round2(goals.under(line)), goal_source),
            MarketKind::Handicap { side, line } => (round2(goals.handicap(side, line)), goal_source),
        }
    }

    fn validate(&self, key: &str) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidMarket {
            key: key.to_string(),
            reason,
        };
        match *self {
            MarketKind::DoubleChance { first, second } if first == second => {
                Err(invalid(format!("double chance repeats `{first}`")))
            }
            MarketKind::OverGoals { line } | MarketKind::UnderGoals { line } => {
                if !is_half_line(line) || line < 0.0 {
                    return Err(invalid(format!("goal line {line} must be a positive half line")));
                }
                Ok(())
            }
            MarketKind::Handicap { line, .. } if !is_half_line(line) => {
                Err(invalid(format!("handicap line {line} must be a half line")))
            }
            _ => Ok(()),
        }
    }
}

fn is_half_line(line: f64) -> bool {
    line.is_finite() && (line.fract().abs() - 0.5).abs() < 1e-9
}

/// One entry of the multi-market catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSpec {
    /// Stable identifier, also the lookup key in `MatchRecord::market_odds`.
    pub key: String,
    pub label: String,
    pub kind: MarketKind,
    /// Odd used when the record offers none. Outcome markets fall back to the
    /// record's 1X2 odds instead.
    #[serde(default)]
    pub default_odd: Option<f64>,
}

impl MarketSpec {
    pub fn new(key: &str, label: &str, kind: MarketKind, default_odd: Option<f64>) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            kind,
            default_odd,
        }
    }

    /// Odd offered for this market on `record`, if there is one.
    pub fn resolve_odd(&self, record: &MatchRecord) -> Option<f64> {
        if let Some(&odd) = record.market_odds.get(&self.key) {
            return Some(odd);
        }
        if let MarketKind::Outcome { outcome } = self.kind
            && self.default_odd.is_none()
        {
            return Some(record.odds.get(outcome));
        }
        self.default_odd
    }
}

/// Ordered list of markets; declaration order is the last ranking tie-break.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketCatalogue(pub Vec<MarketSpec>);

impl Default for MarketCatalogue {
    fn default() -> Self {
        let double = |first, second| MarketKind::DoubleChance { first, second };
        Self(vec![
            MarketSpec::new("home", "Home", MarketKind::Outcome { outcome: Outcome::Home }, None),
            MarketSpec::new("draw", "Draw", MarketKind::Outcome { outcome: Outcome::Draw }, None),
            MarketSpec::new("away", "Away", MarketKind::Outcome { outcome: Outcome::Away }, None),
            MarketSpec::new("home_or_draw", "Home or Draw", double(Outcome::Home, Outcome::Draw), Some(1.30)),
            MarketSpec::new("away_or_draw", "Away or Draw", double(Outcome::Away, Outcome::Draw), Some(1.50)),
            MarketSpec::new("home_or_away", "Home or Away", double(Outcome::Home, Outcome::Away), Some(1.25)),
            MarketSpec::new("btts", "Both teams score", MarketKind::BothTeamsScore, Some(1.85)),
            MarketSpec::new("over_1_5", "Over 1.5 goals", MarketKind::OverGoals { line: 1.5 }, Some(1.50)),
            MarketSpec::new("over_2_5", "Over 2.5 goals", MarketKind::OverGoals { line: 2.5 }, Some(2.00)),
            MarketSpec::new("under_2_5", "Under 2.5 goals", MarketKind::UnderGoals { line: 2.5 }, Some(1.70)),
        ])
    }
}

impl MarketCatalogue {
    pub fn iter(&self) -> impl Iterator<Item = &MarketSpec> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.0.is_empty() {
            return Err(ConfigError::EmptyCatalogue);
        }
        let mut seen = HashSet::new();
        for spec in &self.0 {
            if spec.key.trim().is_empty() {
                return Err(ConfigError::InvalidMarket {
                    key: spec.key.clone(),
                    reason: "key is blank".to_string(),
                });
            }
            if !seen.insert(spec.key.as_str()) {
                return Err(ConfigError::DuplicateMarket(spec.key.clone()));
            }
            if let Some(odd) = spec.default_odd
                && (!odd.is_finite() || odd <= 1.0)
            {
                return Err(ConfigError::InvalidMarket {
                    key: spec.key.clone(),
                    reason: format!("default odd {odd} must be a finite decimal > 1.0"),
                });
            }
            spec.kind.validate(&spec.key)?;
        }
        Ok(())
    }
}
