use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::domain::{
    AssessmentStatus, EntityRecord, RiskAssessment, RiskFactor, RiskModel, RiskModelTier, TierId,
};
use super::jobs::RunState;
use super::scoring::Scorer;
use super::sources::{CostEstimate, CostEstimator, CountryIndexSource, QuestionnaireSource};

/// Caller-facing outcome of a start-test request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TestStart {
    Started,
    /// The single-flight guard found a live run; this is an observation of
    /// that run, not a failure.
    AlreadyRunning {
        pid: u32,
        started_at: chrono::DateTime<Utc>,
    },
}

/// Per-tier slice of the test population with an informational cost estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSummaryEntry {
    pub tier: TierId,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<CostEstimate>,
}

/// Snapshot of a model's test run as observed through the marker files and
/// the stored test assessments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestState {
    pub population_count: usize,
    pub scored_count: usize,
    pub run_status: RunState,
    pub elapsed_seconds: i64,
    pub tier_summary: Vec<TierSummaryEntry>,
}

/// Score every entity in the population and collect assessment rows.
///
/// Entities that fail to score (a collaborator hiccup, never a configuration
/// gap once the run preconditions passed) are logged and skipped; the rows
/// that did score still land, matching the partial-write tolerance of the
/// detached worker model.
pub(crate) fn score_population(
    model: &RiskModel,
    factors: &[RiskFactor],
    bands: &[RiskModelTier],
    population: &[EntityRecord],
    questionnaires: &dyn QuestionnaireSource,
    country_index: &dyn CountryIndexSource,
    status: AssessmentStatus,
) -> Vec<RiskAssessment> {
    let scorer = Scorer::new(model, factors, bands, questionnaires, country_index);
    let mut rows = Vec::with_capacity(population.len());

    for entity in population {
        match scorer.score(entity) {
            Ok(outcome) => rows.push(RiskAssessment {
                entity: entity.id.clone(),
                model: model.id.clone(),
                tier: outcome.tier,
                score: outcome.score,
                status,
                assessed_at: Utc::now(),
            }),
            Err(err) => {
                tracing::warn!(
                    entity = %entity.id.0,
                    model = %model.id.0,
                    error = %err,
                    "skipping entity that failed to score"
                );
            }
        }
    }

    rows
}

/// Build the per-tier summary from stored test rows, projecting operational
/// cost per tier via the estimation collaborator keyed by tier scope and
/// entity country. Estimation failures degrade to a countless projection;
/// they never affect the run itself.
pub(crate) fn tier_summary(
    bands: &[RiskModelTier],
    assessments: &[RiskAssessment],
    population: &[EntityRecord],
    costs: &dyn CostEstimator,
) -> Vec<TierSummaryEntry> {
    let countries: BTreeMap<_, _> = population
        .iter()
        .filter_map(|entity| {
            entity
                .country
                .as_ref()
                .map(|country| (entity.id.clone(), country.clone()))
        })
        .collect();

    bands
        .iter()
        .map(|band| {
            let members: Vec<&RiskAssessment> = assessments
                .iter()
                .filter(|row| row.tier == band.tier)
                .collect();

            let mut total_cents: i64 = 0;
            let mut currency: Option<String> = None;
            for row in &members {
                let Some(country) = countries.get(&row.entity) else {
                    continue;
                };
                match costs.estimate(&band.scope, country) {
                    Ok(Some(estimate)) => {
                        total_cents += estimate.amount_cents;
                        currency.get_or_insert(estimate.currency);
                    }
                    Ok(None) => {}
                    Err(err) => {
                        tracing::debug!(
                            tier = %band.tier.0,
                            error = %err,
                            "cost estimation unavailable for tier summary"
                        );
                    }
                }
            }

            TierSummaryEntry {
                tier: band.tier.clone(),
                count: members.len(),
                estimated_cost: currency.map(|currency| CostEstimate {
                    amount_cents: total_cents,
                    currency,
                }),
            }
        })
        .collect()
}
