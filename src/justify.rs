//! Deterministic explanation text and contextual observations.
//!
//! Nothing here reads the clock or any random source, so identical inputs
//! always render identical text.

use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregation, WeightedFactor};
use crate::factors::{
    is_adverse_conditions, is_explicit_no_absences, is_severe_absences, is_strict_referee,
    news_sentiment, news_target,
};
use crate::markets::ProbabilitySource;
use crate::recommend::{MarketAnalysis, OutcomePrediction};
use crate::record::{MatchRecord, Outcome, Side};

pub const TOP_FACTORS: usize = 3;

const SCORER_IMPACT: i32 = -2;
const ABSENCE_IMPACT: i32 = -1;
const SEVERE_ABSENCE_IMPACT: i32 = -2;

/// A contextual note. `impact` is relative to the predicted outcome: positive
/// supports it, negative undermines it, zero is informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub text: String,
    pub impact: i32,
}

impl Observation {
    fn new(text: impl Into<String>, impact: i32) -> Self {
        Self {
            text: text.into(),
            impact,
        }
    }
}

/// Explanation of the 1X2 prediction.
pub fn outcome_justification(
    record: &MatchRecord,
    prediction: &OutcomePrediction,
    aggregation: &Aggregation,
) -> String {
    let mut lines = prediction_lines(record, prediction, aggregation);
    lines.extend(factor_lines(record, aggregation));

    let positive: Vec<String> = prediction
        .positive_ev()
        .map(|v| format!("{} at {:.2} (EV {:+.2}%)", v.outcome, v.odd, v.ev * 100.0))
        .collect();
    if positive.is_empty() {
        lines.push("Positive EV: none".to_string());
    } else {
        lines.push(format!("Positive EV: {}", positive.join(", ")));
    }

    lines.extend(alert_lines(record));
    lines.join("\n")
}

/// Explanation of one evaluated market, with the 1X2 context it sits in.
pub fn market_justification(
    record: &MatchRecord,
    market: &MarketAnalysis,
    prediction: &OutcomePrediction,
    aggregation: &Aggregation,
) -> String {
    let source = match market.source {
        ProbabilitySource::OutcomeModel => "the 1X2 model".to_string(),
        ProbabilitySource::GoalModel(rates) => format!(
            "the goal model (expected goals {:.2} - {:.2})",
            rates.lambda_home, rates.lambda_away
        ),
    };
    let mut lines = vec![
        format!("Market: {} at {:.2}", market.label, market.odd),
        format!(
            "Probability {:.2}% ({}) from {source}",
            market.probability, market.probability_tier
        ),
        format!(
            "EV {:+.2}% ({}), composite score {:.2}/100",
            market.ev_pct(),
            market.value_tier,
            market.composite_score
        ),
        market.recommendation.label().to_string(),
    ];
    lines.extend(prediction_lines(record, prediction, aggregation));
    lines.extend(factor_lines(record, aggregation));
    lines.extend(alert_lines(record));
    lines.join("\n")
}

fn prediction_lines(
    record: &MatchRecord,
    prediction: &OutcomePrediction,
    aggregation: &Aggregation,
) -> Vec<String> {
    let headline = match prediction.predicted.side() {
        Some(side) => format!("Prediction: {} win", record.team(side)),
        None => "Prediction: Draw".to_string(),
    };
    let p = &prediction.probabilities;
    let mut confidence = format!(
        "Confidence: {} ({:.2} points between the top two outcomes)",
        prediction.confidence, prediction.gap
    );
    if !prediction.actionable {
        confidence.push_str(", not actionable");
    }
    let raw = &aggregation.raw;
    vec![
        headline,
        format!(
            "Probabilities: Home {:.2}% | Draw {:.2}% | Away {:.2}%",
            p.home, p.draw, p.away
        ),
        confidence,
        format!(
            "Raw scores: home {:.2}, draw {:.2}, away {:.2} (side gap {:.2})",
            raw.home,
            raw.draw,
            raw.away,
            raw.side_gap()
        ),
    ]
}

fn factor_lines(record: &MatchRecord, aggregation: &Aggregation) -> Vec<String> {
    Side::BOTH
        .iter()
        .map(|&side| {
            let top: Vec<String> = aggregation
                .top_factors(side, TOP_FACTORS)
                .iter()
                .map(describe_factor)
                .collect();
            format!("Top factors for {}: {}", record.team(side), top.join(", "))
        })
        .collect()
}

fn describe_factor(row: &WeightedFactor) -> String {
    format!(
        "{} {:.2} ({:.1}/10 x {:.0}%)",
        row.factor.title(),
        row.weighted,
        row.score,
        row.weight
    )
}

fn alert_lines(record: &MatchRecord) -> Vec<String> {
    let mut alerts = Vec::new();
    for side in Side::BOTH {
        if record.top_scorer_available(side) == Some(false) {
            alerts.push(format!("{} top scorer unavailable", record.team(side)));
        }
        if let Some(absences) = record.absences(side)
            && !is_explicit_no_absences(absences)
        {
            alerts.push(format!("{} absences: {absences}", record.team(side)));
        }
    }
    if record.lineup_confirmed == Some(false) {
        alerts.push("Lineups not confirmed".to_string());
    }
    if alerts.is_empty() {
        return Vec::new();
    }
    let mut lines = vec!["Alerts:".to_string()];
    lines.extend(alerts.into_iter().map(|a| format!("- {a}")));
    lines
}

/// Signed impact on `predicted` of something worth `impact` to `side`.
fn relative(side: Side, impact: i32, predicted: Outcome) -> i32 {
    match predicted.side() {
        Some(s) if s == side => impact,
        Some(_) => -impact,
        None => 0,
    }
}

pub fn observations(record: &MatchRecord, predicted: Outcome) -> Vec<Observation> {
    let mut out = Vec::new();

    for side in Side::BOTH {
        let team = record.team(side);
        if record.top_scorer_available(side) == Some(false) {
            out.push(Observation::new(
                format!("{team} without their top scorer"),
                relative(side, SCORER_IMPACT, predicted),
            ));
        }
        if let Some(absences) = record.absences(side)
            && !is_explicit_no_absences(absences)
        {
            let impact = if is_severe_absences(absences) {
                SEVERE_ABSENCE_IMPACT
            } else {
                ABSENCE_IMPACT
            };
            out.push(Observation::new(
                format!("{team} absences: {absences}"),
                relative(side, impact, predicted),
            ));
        }
        if let Some(notes) = record.side_notes(side) {
            out.push(Observation::new(format!("{team}: {notes}"), 0));
        }
    }

    if let Some(cards) = record.referee_avg_cards
        && is_strict_referee(cards)
    {
        let referee = record
            .referee
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or("Referee");
        out.push(Observation::new(
            format!("{referee} averages {cards:.1} cards per match"),
            -1,
        ));
    }

    if let Some(conditions) = record.conditions_text()
        && is_adverse_conditions(conditions)
    {
        out.push(Observation::new(format!("Adverse conditions: {conditions}"), -1));
    }

    for item in record.news_items() {
        let impact = match news_target(record, item) {
            Some(side) => relative(side, news_sentiment(item), predicted),
            None => 0,
        };
        out.push(Observation::new(item, impact));
    }

    if record.lineup_confirmed == Some(false) {
        out.push(Observation::new("Lineups not confirmed yet", 0));
    }
    if let Some(notes) = record.notes_text() {
        out.push(Observation::new(notes, 0));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{DrawModel, aggregate};
    use crate::bands::ClassificationBands;
    use crate::factors::extract_factors;
    use crate::normalize::{DEFAULT_TEMPERATURE, normalize};
    use crate::recommend::predict_outcome;
    use crate::record::tests::stub_record;
    use crate::weights::WeightTable;

    fn explain(record: &MatchRecord) -> String {
        let checked = record.check().unwrap();
        let agg = aggregate(
            &extract_factors(&checked),
            &WeightTable::default(),
            &DrawModel::default(),
        );
        let n = normalize(&agg.raw, DEFAULT_TEMPERATURE);
        let prediction = predict_outcome(&n, &record.odds, &ClassificationBands::default());
        outcome_justification(record, &prediction, &agg)
    }

    #[test]
    fn justification_is_deterministic_and_complete() {
        let record = stub_record();
        let text = explain(&record);
        assert_eq!(text, explain(&record));
        assert!(text.starts_with("Prediction: "));
        assert!(text.contains("Probabilities: Home "));
        assert!(text.contains("Top factors for Chelsea: Recent form"));
        assert!(text.contains("Top factors for Arsenal: "));
        assert!(text.contains("Raw scores: "));
        assert!(text.contains("Alerts:\n- Chelsea absences: 1 desfalque menor"));
    }

    #[test]
    fn alerts_are_omitted_when_nothing_to_flag() {
        let mut record = stub_record();
        record.home_absences = Some("Nenhuma".to_string());
        record.away_absences = None;
        assert!(!explain(&record).contains("Alerts:"));
    }

    #[test]
    fn observation_impacts_follow_the_predicted_side() {
        let mut record = stub_record();
        record.away_top_scorer_available = Some(false);
        record.home_absences = Some("3 titulares fora".to_string());
        record.away_absences = None;

        let obs = observations(&record, Outcome::Home);
        let scorer = obs.iter().find(|o| o.text.contains("top scorer")).unwrap();
        assert_eq!(scorer.impact, 2);
        let absences = obs.iter().find(|o| o.text.starts_with("Chelsea absences")).unwrap();
        assert_eq!(absences.impact, -2);

        let obs = observations(&record, Outcome::Away);
        let scorer = obs.iter().find(|o| o.text.contains("top scorer")).unwrap();
        assert_eq!(scorer.impact, -2);

        let obs = observations(&record, Outcome::Draw);
        assert!(obs.iter().filter(|o| o.text.contains("absences")).all(|o| o.impact == 0));
    }

    #[test]
    fn context_observations() {
        let mut record = stub_record();
        record.referee_avg_cards = Some(5.6);
        record.conditions = Some("Chuva forte".to_string());
        record.lineup_confirmed = Some(false);
        record.notes = Some("Jogo às 16h".to_string());
        record.news = vec![
            "Chelsea confiante após vitória".to_string(),
            "Clássico equilibrado".to_string(),
        ];
        let obs = observations(&record, Outcome::Home);
        let find = |needle: &str| obs.iter().find(|o| o.text.contains(needle)).unwrap().impact;
        assert_eq!(find("cards per match"), -1);
        assert_eq!(find("Adverse conditions"), -1);
        assert_eq!(find("Chelsea confiante"), 1);
        assert_eq!(find("Clássico"), 0);
        assert_eq!(find("not confirmed"), 0);
        assert_eq!(find("16h"), 0);
    }

    #[test]
    fn missing_context_gives_no_observations() {
        let mut record = stub_record();
        record.home_absences = None;
        record.away_absences = None;
        record.news.clear();
        record.referee_avg_cards = None;
        record.conditions = None;
        assert!(observations(&record, Outcome::Home).is_empty());
    }
}
