use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::factors::{Factor, FactorScores, round2};
use crate::record::{Outcome, Side};
use crate::weights::WeightTable;

/// One factor's audit row: `weighted = score * weight / 100`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedFactor {
    pub factor: Factor,
    pub score: f64,
    pub weight: f64,
    pub weighted: f64,
}

/// Unnormalized per-outcome aggregates on a 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawOutcomeScores {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl RawOutcomeScores {
    pub fn get(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }

    pub fn side_gap(&self) -> f64 {
        (self.home - self.away).abs()
    }
}

/// Draw propensity as a function of how close the two sides are:
/// `max(0, min(home, away) + bonus - gap_slope * |home - away|)`.
/// Anchored on the weaker side, the term falls whenever one side pulls away
/// and rises when the weaker side closes the gap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawModel {
    pub bonus: f64,
    pub gap_slope: f64,
}

impl Default for DrawModel {
    fn default() -> Self {
        Self {
            bonus: 2.0,
            gap_slope: 0.1,
        }
    }
}

impl DrawModel {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.bonus.is_finite() {
            return Err(ConfigError::DrawModel {
                field: "bonus",
                value: self.bonus,
                reason: "must be finite",
            });
        }
        // With a zero slope the draw term would not respond to the stronger side.
        if !self.gap_slope.is_finite() || self.gap_slope <= 0.0 {
            return Err(ConfigError::DrawModel {
                field: "gap_slope",
                value: self.gap_slope,
                reason: "must be finite and > 0",
            });
        }
        Ok(())
    }

    pub fn raw_draw(&self, raw_home: f64, raw_away: f64) -> f64 {
        let weaker = raw_home.min(raw_away);
        (weaker + self.bonus - self.gap_slope * (raw_home - raw_away).abs()).max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub home: Vec<WeightedFactor>,
    pub away: Vec<WeightedFactor>,
    /// Per-side strength on the 0-10 factor scale.
    pub strength_home: f64,
    pub strength_away: f64,
    pub raw: RawOutcomeScores,
}

impl Aggregation {
    pub fn side(&self, side: Side) -> &[WeightedFactor] {
        match side {
            Side::Home => &self.home,
            Side::Away => &self.away,
        }
    }

    /// Factors of one side by weighted value, largest first; ties keep
    /// declaration order.
    pub fn top_factors(&self, side: Side, n: usize) -> Vec<WeightedFactor> {
        let mut rows = self.side(side).to_vec();
        rows.sort_by(|a, b| b.weighted.total_cmp(&a.weighted));
        rows.truncate(n);
        rows
    }
}

pub fn weigh_side(scores: &FactorScores, weights: &WeightTable, side: Side) -> Vec<WeightedFactor> {
    scores
        .side(side)
        .iter()
        .map(|s| {
            let weight = weights.weight(side, s.factor);
            WeightedFactor {
                factor: s.factor,
                score: s.score,
                weight,
                weighted: s.score * weight / 100.0,
            }
        })
        .collect()
}

pub fn aggregate(scores: &FactorScores, weights: &WeightTable, draw: &DrawModel) -> Aggregation {
    let home = weigh_side(scores, weights, Side::Home);
    let away = weigh_side(scores, weights, Side::Away);
    let strength_home: f64 = home.iter().map(|w| w.weighted).sum();
    let strength_away: f64 = away.iter().map(|w| w.weighted).sum();

    let raw_home = strength_home * 10.0;
    let raw_away = strength_away * 10.0;
    let raw = RawOutcomeScores {
        home: raw_home,
        draw: draw.raw_draw(raw_home, raw_away),
        away: raw_away,
    };

    Aggregation {
        home,
        away,
        strength_home,
        strength_away,
        raw,
    }
}

/// Per-side factor audit rows, rounded for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorBreakdown {
    pub home: Vec<WeightedFactor>,
    pub away: Vec<WeightedFactor>,
}

impl Aggregation {
    pub fn breakdown(&self) -> FactorBreakdown {
        FactorBreakdown {
            home: self.home.iter().map(WeightedFactor::rounded).collect(),
            away: self.away.iter().map(WeightedFactor::rounded).collect(),
        }
    }
}

impl WeightedFactor {
    pub fn rounded(&self) -> Self {
        Self {
            factor: self.factor,
            score: round2(self.score),
            weight: round2(self.weight),
            weighted: round2(self.weighted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_values_reproduce_score_times_weight() {
        let scores = FactorScores::from_fn(|side, _| if side == Side::Home { 8.0 } else { 4.0 });
        let agg = aggregate(&scores, &WeightTable::default(), &DrawModel::default());
        for row in agg.home.iter().chain(agg.away.iter()) {
            assert!((row.weighted - row.score * row.weight / 100.0).abs() < 1e-12);
        }
        assert!((agg.strength_home - 8.0).abs() < 1e-9);
        assert!((agg.strength_away - 4.0).abs() < 1e-9);
        assert!((agg.raw.home - 80.0).abs() < 1e-9);
        assert!((agg.raw.away - 40.0).abs() < 1e-9);
    }

    #[test]
    fn draw_term_shrinks_as_gap_grows() {
        let model = DrawModel::default();
        let mut last = f64::INFINITY;
        for gap in 0..=60 {
            let home = 50.0 + gap as f64 / 2.0;
            let away = 50.0 - gap as f64 / 2.0;
            let d = model.raw_draw(home, away);
            assert!(d <= last);
            assert!(d >= 0.0);
            last = d;
        }
        assert_eq!(model.raw_draw(100.0, 0.0), 0.0);
    }

    #[test]
    fn draw_term_falls_as_one_side_pulls_away() {
        for model in [
            DrawModel::default(),
            DrawModel {
                bonus: 2.0,
                gap_slope: 0.01,
            },
        ] {
            let mut last = model.raw_draw(50.0, 50.0);
            for home in [60.0, 70.0, 80.0, 90.0] {
                let d = model.raw_draw(home, 50.0);
                assert!(d < last, "{model:?}: home {home} gave {d}");
                last = d;
            }
            let mut last = model.raw_draw(50.0, 50.0);
            for away in [40.0, 30.0, 20.0] {
                let d = model.raw_draw(50.0, away);
                assert!(d < last, "{model:?}: away {away} gave {d}");
                last = d;
            }
        }
    }

    #[test]
    fn stronger_home_side_lowers_the_aggregated_draw() {
        let raw_draw = |home: f64| {
            let scores = FactorScores::from_fn(|side, _| if side == Side::Home { home } else { 5.0 });
            aggregate(&scores, &WeightTable::default(), &DrawModel::default()).raw.draw
        };
        assert!(raw_draw(8.0) < raw_draw(6.0));
        assert!(raw_draw(6.0) < raw_draw(5.0));
        // Weaker home side closing on the away side raises it.
        assert!(raw_draw(3.0) < raw_draw(4.0));
    }

    #[test]
    fn identical_sides_give_draw_the_largest_raw_score() {
        let agg = aggregate(
            &FactorScores::uniform(6.0),
            &WeightTable::default(),
            &DrawModel::default(),
        );
        assert_eq!(agg.raw.home, agg.raw.away);
        assert!(agg.raw.draw > agg.raw.home);
    }

    #[test]
    fn draw_model_rejects_flat_slope() {
        let model = DrawModel {
            bonus: 2.0,
            gap_slope: 0.0,
        };
        assert!(model.validate().is_err());
        assert!(DrawModel::default().validate().is_ok());
    }

    #[test]
    fn top_factors_break_ties_by_declaration_order() {
        let agg = aggregate(
            &FactorScores::uniform(5.0),
            &WeightTable::default(),
            &DrawModel::default(),
        );
        let top: Vec<Factor> = agg.top_factors(Side::Home, 4).iter().map(|w| w.factor).collect();
        assert_eq!(
            top,
            vec![
                Factor::RecentForm,
                Factor::SquadStrength,
                Factor::HomeAwayPerformance,
                Factor::HeadToHead
            ]
        );
    }
}
