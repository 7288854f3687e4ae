use serde::{Deserialize, Serialize};

use crate::bands::{ClassificationBands, ValueTier};
use crate::normalize::OutcomeProbabilities;
use crate::record::{MarketOdds, Outcome};

/// `probability / 100 * odd - 1`, with `probability` in percent.
pub fn expected_value(probability: f64, odd: f64) -> f64 {
    probability / 100.0 * odd - 1.0
}

pub fn ev_pct(ev: f64) -> f64 {
    ev * 100.0
}

/// Decimal odd at which EV is zero. `None` for a zero probability.
pub fn fair_odd(probability: f64) -> Option<f64> {
    (probability > 0.0).then(|| 100.0 / probability)
}

/// Descriptive value figures for one 1X2 outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeValue {
    pub outcome: Outcome,
    pub probability: f64,
    pub odd: f64,
    pub fair_odd: Option<f64>,
    pub ev: f64,
    pub value_tier: ValueTier,
}

impl OutcomeValue {
    pub fn is_positive(&self) -> bool {
        self.ev > 0.0
    }
}

/// EV for all three outcomes in `Outcome::ALL` order. Never feeds back into
/// the probabilities.
pub fn outcome_values(
    probabilities: &OutcomeProbabilities,
    odds: &MarketOdds,
    bands: &ClassificationBands,
) -> Vec<OutcomeValue> {
    Outcome::ALL
        .iter()
        .map(|&outcome| {
            let probability = probabilities.get(outcome);
            let odd = odds.get(outcome);
            let ev = expected_value(probability, odd);
            OutcomeValue {
                outcome,
                probability,
                odd,
                fair_odd: fair_odd(probability),
                ev,
                value_tier: bands.value_tier(ev_pct(ev)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ev_matches_formula() {
        assert!((expected_value(50.0, 2.2) - 0.1).abs() < 1e-12);
        assert!((expected_value(25.0, 3.0) + 0.25).abs() < 1e-12);
        assert_eq!(expected_value(40.0, 2.5), 40.0 / 100.0 * 2.5 - 1.0);
    }

    #[test]
    fn fair_odds_give_zero_ev() {
        for p in [12.5, 33.34, 50.0, 71.93] {
            let odd = fair_odd(p).unwrap();
            assert!(expected_value(p, odd).abs() < 1e-12);
        }
        assert_eq!(fair_odd(0.0), None);
    }

    #[test]
    fn outcome_values_classify_each_outcome() {
        let probabilities = OutcomeProbabilities {
            home: 50.0,
            draw: 30.0,
            away: 20.0,
        };
        let odds = MarketOdds {
            home: 2.5,
            draw: 3.5,
            away: 4.0,
        };
        let values = outcome_values(&probabilities, &odds, &ClassificationBands::default());
        assert_eq!(values.len(), 3);
        assert_eq!(values[0].value_tier, ValueTier::High);
        assert_eq!(values[1].value_tier, ValueTier::Moderate);
        assert_eq!(values[2].value_tier, ValueTier::NoValue);
        assert!(values[0].is_positive());
        assert!(!values[2].is_positive());
    }
}
