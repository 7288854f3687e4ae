use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::factors::Factor;
use crate::record::Side;

pub const WEIGHT_SUM_TOLERANCE: f64 = 0.5;

/// Factor importance in percent, one table per side. Each side must sum to 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightTable {
    pub home: BTreeMap<Factor, f64>,
    pub away: BTreeMap<Factor, f64>,
}

impl Default for WeightTable {
    fn default() -> Self {
        let side = default_side_weights();
        Self {
            home: side.clone(),
            away: side,
        }
    }
}

fn default_side_weights() -> BTreeMap<Factor, f64> {
    BTreeMap::from([
        (Factor::RecentForm, 25.0),
        (Factor::SquadStrength, 15.0),
        (Factor::HomeAwayPerformance, 15.0),
        (Factor::HeadToHead, 15.0),
        (Factor::Motivation, 10.0),
        (Factor::Referee, 10.0),
        (Factor::Conditions, 10.0),
    ])
}

impl WeightTable {
    pub fn side(&self, side: Side) -> &BTreeMap<Factor, f64> {
        match side {
            Side::Home => &self.home,
            Side::Away => &self.away,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut BTreeMap<Factor, f64> {
        match side {
            Side::Home => &mut self.home,
            Side::Away => &mut self.away,
        }
    }

    /// Weight in percent. Validated tables always carry every factor.
    pub fn weight(&self, side: Side, factor: Factor) -> f64 {
        self.side(side).get(&factor).copied().unwrap_or(0.0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for side in Side::BOTH {
            let table = self.side(side);
            for factor in Factor::ALL {
                let Some(&value) = table.get(&factor) else {
                    return Err(ConfigError::MissingWeight { side, factor });
                };
                if !value.is_finite() || value < 0.0 {
                    return Err(ConfigError::InvalidWeight {
                        side,
                        factor,
                        value,
                    });
                }
            }
            let sum: f64 = table.values().sum();
            if (sum - 100.0).abs() > WEIGHT_SUM_TOLERANCE {
                return Err(ConfigError::WeightSum {
                    side,
                    sum,
                    tolerance: WEIGHT_SUM_TOLERANCE,
                });
            }
        }
        Ok(())
    }
}
