use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How sure the 1X2 prediction is, from the gap between the top two outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConfidenceBand {
    #[serde(rename = "Sem recomendação segura")]
    NoSafePick,
    #[serde(rename = "Baixa")]
    Low,
    #[serde(rename = "Média")]
    Medium,
    #[serde(rename = "Alta")]
    High,
}

impl ConfidenceBand {
    pub fn label(self) -> &'static str {
        match self {
            ConfidenceBand::NoSafePick => "Sem recomendação segura",
            ConfidenceBand::Low => "Baixa",
            ConfidenceBand::Medium => "Média",
            ConfidenceBand::High => "Alta",
        }
    }

    pub fn is_actionable(self) -> bool {
        self > ConfidenceBand::NoSafePick
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProbabilityTier {
    #[serde(rename = "Baixa")]
    Low,
    #[serde(rename = "Média")]
    Medium,
    #[serde(rename = "Alta")]
    High,
    #[serde(rename = "Muito Alta")]
    VeryHigh,
}

impl ProbabilityTier {
    pub fn label(self) -> &'static str {
        match self {
            ProbabilityTier::Low => "Baixa",
            ProbabilityTier::Medium => "Média",
            ProbabilityTier::High => "Alta",
            ProbabilityTier::VeryHigh => "Muito Alta",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ValueTier {
    #[serde(rename = "Sem valor")]
    NoValue,
    #[serde(rename = "Valor Moderado")]
    Moderate,
    #[serde(rename = "Alto Valor")]
    High,
}

impl ValueTier {
    pub fn label(self) -> &'static str {
        match self {
            ValueTier::NoValue => "Sem valor",
            ValueTier::Moderate => "Valor Moderado",
            ValueTier::High => "Alto Valor",
        }
    }
}

macro_rules! display_label {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        })*
    };
}

display_label!(ConfidenceBand, ProbabilityTier, ValueTier);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    /// A step applies when `value >= from`.
    Inclusive,
    /// A step applies when `value > from`.
    Exclusive,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Step<B> {
    pub from: f64,
    pub band: B,
}

/// Step function from a number to an ordered band. `floor` applies below the
/// first step; steps must ascend in both threshold and band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdTable<B> {
    pub boundary: Boundary,
    pub floor: B,
    pub steps: Vec<Step<B>>,
}

impl<B: Copy + Ord + fmt::Debug> ThresholdTable<B> {
    pub fn new(boundary: Boundary, floor: B, steps: &[(f64, B)]) -> Self {
        Self {
            boundary,
            floor,
            steps: steps
                .iter()
                .map(|&(from, band)| Step { from, band })
                .collect(),
        }
    }

    pub fn classify(&self, value: f64) -> B {
        let mut band = self.floor;
        for step in &self.steps {
            let reached = match self.boundary {
                Boundary::Inclusive => value >= step.from,
                Boundary::Exclusive => value > step.from,
            };
            if !reached {
                break;
            }
            band = step.band;
        }
        band
    }

    pub fn validate(&self, table: &'static str) -> Result<(), ConfigError> {
        let mut prev_from = f64::NEG_INFINITY;
        let mut prev_band = self.floor;
        for step in &self.steps {
            if !step.from.is_finite() {
                return Err(ConfigError::Thresholds {
                    table,
                    reason: format!("threshold {} is not finite", step.from),
                });
            }
            if step.from <= prev_from {
                return Err(ConfigError::Thresholds {
                    table,
                    reason: format!("threshold {} does not ascend", step.from),
                });
            }
            if step.band <= prev_band {
                return Err(ConfigError::Thresholds {
                    table,
                    reason: format!("band {:?} does not ascend", step.band),
                });
            }
            prev_from = step.from;
            prev_band = step.band;
        }
        Ok(())
    }
}

/// All qualitative classifications in one tunable place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationBands {
    /// Keyed on the top-two probability gap, in percentage points.
    pub confidence: ThresholdTable<ConfidenceBand>,
    /// Keyed on a market probability, in percent.
    pub probability: ThresholdTable<ProbabilityTier>,
    /// Keyed on EV in percent.
    pub value: ThresholdTable<ValueTier>,
}

impl Default for ClassificationBands {
    fn default() -> Self {
        Self {
            confidence: ThresholdTable::new(
                Boundary::Inclusive,
                ConfidenceBand::NoSafePick,
                &[
                    (5.0, ConfidenceBand::Low),
                    (15.0, ConfidenceBand::Medium),
                    (30.0, ConfidenceBand::High),
                ],
            ),
            probability: ThresholdTable::new(
                Boundary::Inclusive,
                ProbabilityTier::Low,
                &[
                    (50.0, ProbabilityTier::Medium),
                    (65.0, ProbabilityTier::High),
                    (80.0, ProbabilityTier::VeryHigh),
                ],
            ),
            value: ThresholdTable::new(
                Boundary::Exclusive,
                ValueTier::NoValue,
                &[(0.0, ValueTier::Moderate), (10.0, ValueTier::High)],
            ),
        }
    }
}

impl ClassificationBands {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.confidence.validate("confidence")?;
        self.probability.validate("probability")?;
        self.value.validate("value")?;
        Ok(())
    }

    pub fn confidence(&self, gap: f64) -> ConfidenceBand {
        self.confidence.classify(gap)
    }

    pub fn probability_tier(&self, probability: f64) -> ProbabilityTier {
        self.probability.classify(probability)
    }

    pub fn value_tier(&self, ev_pct: f64) -> ValueTier {
        self.value.classify(ev_pct)
    }
}
