use std::fmt;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::aggregate::{Aggregation, FactorBreakdown, RawOutcomeScores, aggregate};
use crate::bands::ConfidenceBand;
use crate::config::{EngineConfig, load_env_files};
use crate::error::{ConfigError, EngineError};
use crate::factors::extract_factors;
use crate::goals::GoalModel;
use crate::justify::{self, Observation};
use crate::markets::{MarketKind, MarketSpec, ProbabilitySource};
use crate::normalize::normalize;
use crate::recommend::{MarketAnalysis, OutcomePrediction, Selector, predict_outcome, rank_markets};
use crate::record::MatchRecord;

static SHARED: OnceCell<Engine> = OnceCell::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// 1X2 prediction; one market, the predicted result.
    Outcome,
    /// Every evaluable market of the configured catalogue, ranked.
    MultiMarket,
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AnalysisMode::Outcome => "outcome",
            AnalysisMode::MultiMarket => "multi_market",
        })
    }
}

/// Everything computed for one record. Built once per request and never
/// changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub match_id: String,
    pub home_team: String,
    pub away_team: String,
    pub mode: AnalysisMode,
    pub prediction: OutcomePrediction,
    pub confidence: ConfidenceBand,
    pub raw_scores: RawOutcomeScores,
    pub factors: FactorBreakdown,
    /// Top of `markets`; `None` only if no market had an odd to price.
    pub best: Option<MarketAnalysis>,
    pub markets: Vec<MarketAnalysis>,
    pub justification: String,
    pub observations: Vec<Observation>,
}

/// The validated, immutable recommendation pipeline.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
}

struct Pipeline {
    aggregation: Aggregation,
    prediction: OutcomePrediction,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(EngineConfig::from_env()?)
    }

    /// Process-wide engine built from the environment on first use. A config
    /// error is returned on every call until the configuration is fixed.
    pub fn shared() -> Result<&'static Engine, ConfigError> {
        SHARED.get_or_try_init(|| {
            load_env_files();
            Engine::from_env()
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn analyze(
        &self,
        record: &MatchRecord,
        mode: AnalysisMode,
    ) -> Result<AnalysisResult, EngineError> {
        match mode {
            AnalysisMode::Outcome => self.compute_analysis(record),
            AnalysisMode::MultiMarket => self.compute_multi_market_analysis(record),
        }
    }

    /// Single-outcome (1X2) analysis.
    pub fn compute_analysis(&self, record: &MatchRecord) -> Result<AnalysisResult, EngineError> {
        let pipeline = self.run(record)?;
        let prediction = &pipeline.prediction;
        let outcome = prediction.predicted;
        let justification = justify::outcome_justification(record, prediction, &pipeline.aggregation);

        let spec = MarketSpec::new(
            &outcome.to_string().to_lowercase(),
            outcome.label(),
            MarketKind::Outcome { outcome },
            None,
        );
        let mut market = self.selector().evaluate(
            &spec,
            record.odds.get(outcome),
            prediction.probabilities.get(outcome),
            ProbabilitySource::OutcomeModel,
            pipeline.aggregation.breakdown(),
        );
        market.justification = justification.clone();

        Ok(self.finish(record, AnalysisMode::Outcome, pipeline, vec![market], justification))
    }

    /// Multi-market analysis over the configured catalogue.
    pub fn compute_multi_market_analysis(
        &self,
        record: &MatchRecord,
    ) -> Result<AnalysisResult, EngineError> {
        let pipeline = self.run(record)?;
        let goals = GoalModel::from_record(record);
        let selector = self.selector();
        let breakdown = pipeline.aggregation.breakdown();

        let mut markets = Vec::with_capacity(self.config.markets.len());
        for spec in self.config.markets.iter() {
            let Some(odd) = spec.resolve_odd(record) else {
                debug!(match_id = %record.id, market = %spec.key, "no odd offered, market skipped");
                continue;
            };
            let (probability, source) = spec
                .kind
                .probability(&pipeline.prediction.probabilities, &goals);
            let mut market = selector.evaluate(spec, odd, probability, source, breakdown.clone());
            market.justification = justify::market_justification(
                record,
                &market,
                &pipeline.prediction,
                &pipeline.aggregation,
            );
            markets.push(market);
        }
        rank_markets(&mut markets);

        let justification = match markets.first() {
            Some(best) => best.justification.clone(),
            None => justify::outcome_justification(record, &pipeline.prediction, &pipeline.aggregation),
        };
        Ok(self.finish(record, AnalysisMode::MultiMarket, pipeline, markets, justification))
    }

    fn selector(&self) -> Selector<'_> {
        Selector {
            bands: &self.config.bands,
            blend: &self.config.composite,
        }
    }

    fn run(&self, record: &MatchRecord) -> Result<Pipeline, EngineError> {
        let checked = record.check().map_err(|err| {
            warn!(match_id = %record.id, error = %err, "match record rejected");
            EngineError::input(&record.id, err)
        })?;
        let scores = extract_factors(&checked);
        let aggregation = aggregate(&scores, &self.config.weights, &self.config.draw);
        let normalized = normalize(&aggregation.raw, self.config.temperature);
        let prediction = predict_outcome(&normalized, &record.odds, &self.config.bands);
        Ok(Pipeline {
            aggregation,
            prediction,
        })
    }

    fn finish(
        &self,
        record: &MatchRecord,
        mode: AnalysisMode,
        pipeline: Pipeline,
        markets: Vec<MarketAnalysis>,
        justification: String,
    ) -> AnalysisResult {
        let Pipeline {
            aggregation,
            prediction,
        } = pipeline;
        let p = &prediction.probabilities;
        debug!(
            match_id = %record.id,
            %mode,
            home = p.home,
            draw = p.draw,
            away = p.away,
            predicted = %prediction.predicted,
            confidence = %prediction.confidence,
            markets = markets.len(),
            "analysis computed"
        );

        AnalysisResult {
            match_id: record.id.clone(),
            home_team: record.home_team.clone(),
            away_team: record.away_team.clone(),
            mode,
            confidence: prediction.confidence,
            raw_scores: aggregation.raw,
            factors: aggregation.breakdown(),
            best: markets.first().cloned(),
            observations: justify::observations(record, prediction.predicted),
            prediction,
            markets,
            justification,
        }
    }
}
