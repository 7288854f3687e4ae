use serde::{Deserialize, Serialize};

use crate::aggregate::FactorBreakdown;
use crate::bands::{ClassificationBands, ConfidenceBand, ProbabilityTier, ValueTier};
use crate::error::ConfigError;
use crate::ev::{self, OutcomeValue};
use crate::factors::round2;
use crate::markets::{MarketKind, MarketSpec, ProbabilitySource};
use crate::normalize::{Normalized, OutcomeProbabilities};
use crate::record::{MarketOdds, Outcome};

/// `composite = probability_weight * probability + value_weight * value_points`,
/// clamped to [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeBlend {
    pub probability: f64,
    pub value: f64,
}

impl Default for CompositeBlend {
    fn default() -> Self {
        Self {
            probability: 0.7,
            value: 0.3,
        }
    }
}

impl CompositeBlend {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = self.probability.is_finite() && self.value.is_finite();
        let non_negative = self.probability >= 0.0 && self.value >= 0.0;
        if !finite || !non_negative || (self.probability + self.value - 1.0).abs() > 1e-9 {
            return Err(ConfigError::CompositeBlend {
                probability: self.probability,
                value: self.value,
            });
        }
        Ok(())
    }

    pub fn score(&self, probability: f64, tier: ValueTier) -> f64 {
        let raw = self.probability * probability + self.value * value_points(tier);
        round2(raw.clamp(0.0, 100.0))
    }
}

pub fn value_points(tier: ValueTier) -> f64 {
    match tier {
        ValueTier::NoValue => 0.0,
        ValueTier::Moderate => 50.0,
        ValueTier::High => 100.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Recommendation {
    #[serde(rename = "Aposta de alto valor")]
    HighValueBet,
    #[serde(rename = "Aposta de valor moderado")]
    ModerateValueBet,
    #[serde(rename = "Não recomendada")]
    NotRecommended,
}

impl Recommendation {
    pub fn from_value(tier: ValueTier) -> Self {
        match tier {
            ValueTier::High => Recommendation::HighValueBet,
            ValueTier::Moderate => Recommendation::ModerateValueBet,
            ValueTier::NoValue => Recommendation::NotRecommended,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Recommendation::HighValueBet => "Aposta de alto valor",
            Recommendation::ModerateValueBet => "Aposta de valor moderado",
            Recommendation::NotRecommended => "Não recomendada",
        }
    }
}

/// One evaluated market. `ev` always equals `probability / 100 * odd - 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketAnalysis {
    pub key: String,
    pub label: String,
    pub kind: MarketKind,
    pub odd: f64,
    pub probability: f64,
    pub fair_odd: Option<f64>,
    pub ev: f64,
    pub probability_tier: ProbabilityTier,
    pub value_tier: ValueTier,
    pub composite_score: f64,
    pub recommendation: Recommendation,
    pub source: ProbabilitySource,
    pub justification: String,
    pub factors: FactorBreakdown,
}

impl MarketAnalysis {
    pub fn ev_pct(&self) -> f64 {
        ev::ev_pct(self.ev)
    }
}

/// Classification inputs shared by every market of one analysis.
#[derive(Debug, Clone, Copy)]
pub struct Selector<'a> {
    pub bands: &'a ClassificationBands,
    pub blend: &'a CompositeBlend,
}

impl Selector<'_> {
    pub fn evaluate(
        &self,
        spec: &MarketSpec,
        odd: f64,
        probability: f64,
        source: ProbabilitySource,
        factors: FactorBreakdown,
    ) -> MarketAnalysis {
        let ev = ev::expected_value(probability, odd);
        let value_tier = self.bands.value_tier(ev::ev_pct(ev));
        MarketAnalysis {
            key: spec.key.clone(),
            label: spec.label.clone(),
            kind: spec.kind,
            odd,
            probability,
            fair_odd: ev::fair_odd(probability),
            ev,
            probability_tier: self.bands.probability_tier(probability),
            value_tier,
            composite_score: self.blend.score(probability, value_tier),
            recommendation: Recommendation::from_value(value_tier),
            source,
            justification: String::new(),
            factors,
        }
    }
}

/// Composite score descending, then EV descending; the stable sort keeps
/// declaration order for anything still tied.
pub fn rank_markets(markets: &mut [MarketAnalysis]) {
    markets.sort_by(|a, b| {
        b.composite_score
            .total_cmp(&a.composite_score)
            .then(b.ev.total_cmp(&a.ev))
    });
}

/// Single-outcome mode: the most probable result plus descriptive EV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomePrediction {
    pub predicted: Outcome,
    pub probabilities: OutcomeProbabilities,
    /// Points between the two most probable reported outcomes.
    pub gap: f64,
    pub confidence: ConfidenceBand,
    /// False when the gap is below the lowest confidence threshold.
    pub actionable: bool,
    pub values: Vec<OutcomeValue>,
}

impl OutcomePrediction {
    pub fn value(&self, outcome: Outcome) -> Option<&OutcomeValue> {
        self.values.iter().find(|v| v.outcome == outcome)
    }

    pub fn positive_ev(&self) -> impl Iterator<Item = &OutcomeValue> {
        self.values.iter().filter(|v| v.is_positive())
    }
}

pub fn predict_outcome(
    normalized: &Normalized,
    odds: &MarketOdds,
    bands: &ClassificationBands,
) -> OutcomePrediction {
    let probabilities = normalized.reported;
    let gap = probabilities.top_gap();
    let confidence = bands.confidence(gap);
    OutcomePrediction {
        predicted: normalized.predicted(),
        probabilities,
        gap,
        confidence,
        actionable: confidence.is_actionable(),
        values: ev::outcome_values(&probabilities, odds, bands),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::RawOutcomeScores;
    use crate::normalize::{DEFAULT_TEMPERATURE, normalize};

    fn empty_breakdown() -> FactorBreakdown {
        FactorBreakdown {
            home: Vec::new(),
            away: Vec::new(),
        }
    }

    fn market(key: &str, odd: f64, probability: f64) -> MarketAnalysis {
        let bands = ClassificationBands::default();
        let blend = CompositeBlend::default();
        let selector = Selector {
            bands: &bands,
            blend: &blend,
        };
        let spec = MarketSpec::new(key, key, MarketKind::BothTeamsScore, Some(odd));
        selector.evaluate(
            &spec,
            odd,
            probability,
            ProbabilitySource::OutcomeModel,
            empty_breakdown(),
        )
    }

    #[test]
    fn composite_blends_probability_and_value() {
        let blend = CompositeBlend::default();
        assert!((blend.score(60.0, ValueTier::High) - 72.0).abs() < 1e-9);
        assert!((blend.score(60.0, ValueTier::Moderate) - 57.0).abs() < 1e-9);
        assert!((blend.score(60.0, ValueTier::NoValue) - 42.0).abs() < 1e-9);
        assert_eq!(blend.score(100.0, ValueTier::High), 100.0);
    }

    #[test]
    fn blend_must_sum_to_one() {
        let blend = CompositeBlend {
            probability: 0.7,
            value: 0.4,
        };
        assert!(blend.validate().is_err());
        assert!(CompositeBlend::default().validate().is_ok());
    }

    #[test]
    fn evaluate_reports_exact_ev() {
        let m = market("btts", 1.85, 57.31);
        assert_eq!(m.ev, 57.31 / 100.0 * 1.85 - 1.0);
        assert_eq!(m.value_tier, ValueTier::Moderate);
        assert_eq!(m.recommendation, Recommendation::ModerateValueBet);
        assert_eq!(m.probability_tier, ProbabilityTier::Medium);
    }

    #[test]
    fn ranking_uses_composite_then_ev_then_declaration() {
        let mut markets = vec![
            market("a", 1.50, 60.0),
            market("b", 2.00, 60.0),
            market("c", 1.50, 60.0),
            market("d", 1.20, 90.0),
        ];
        rank_markets(&mut markets);
        let keys: Vec<&str> = markets.iter().map(|m| m.key.as_str()).collect();
        // b: 60 * 0.7 + 30 = 72, ev 0.2; d: 63 + 15 = 78, ev 0.08;
        // a and c tie completely and keep their order.
        assert_eq!(keys, vec!["d", "b", "a", "c"]);
    }

    #[test]
    fn identical_ev_and_score_keep_order() {
        let mut markets = vec![market("x", 1.5, 40.0), market("y", 1.5, 40.0)];
        rank_markets(&mut markets);
        assert_eq!(markets[0].key, "x");
    }

    #[test]
    fn prediction_flags_close_calls_as_not_actionable() {
        let raw = RawOutcomeScores {
            home: 50.0,
            draw: 50.0,
            away: 50.0,
        };
        let n = normalize(&raw, DEFAULT_TEMPERATURE);
        let odds = MarketOdds {
            home: 3.0,
            draw: 3.0,
            away: 3.0,
        };
        let p = predict_outcome(&n, &odds, &ClassificationBands::default());
        assert_eq!(p.confidence, ConfidenceBand::NoSafePick);
        assert!(!p.actionable);
        assert_eq!(p.predicted, Outcome::Draw);
        assert_eq!(p.values.len(), 3);
        // 33.34 * 3 = 100.02
        assert_eq!(p.positive_ev().count(), 1);
        assert_eq!(p.value(Outcome::Draw).map(|v| v.is_positive()), Some(true));
    }
}
