//! Composite scoring: sums every enabled component's contribution for one
//! entity under one model and resolves the tier band.

mod components;

pub use components::ComponentScore;

use serde::{Deserialize, Serialize};

use super::domain::{
    ComponentKind, EntityRecord, FactorPayload, RiskFactor, RiskModel, RiskModelTier, TierId,
};
use super::sources::{CountryIndexSource, QuestionnaireSource, SourceError};
use super::tiers;

/// Scoring-time failures. Configuration gaps here are invariant violations:
/// the publish gate guarantees a complete model never reaches them.
#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    #[error("component {} is enabled but has no stored factor", .0.label())]
    NotConfigured(ComponentKind),
    #[error("no tier band matches score {0}")]
    UnresolvedTier(i64),
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Discrete contribution to a composite score, for transparent audits.
/// `points` is `None` when the component resolved to the unscored sentinel or
/// the entity had no matching questionnaire response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub kind: ComponentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<i64>,
    pub note: String,
}

/// Composite outcome for one entity under one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreOutcome {
    pub score: i64,
    pub tier: TierId,
    pub components: Vec<ScoreComponent>,
}

/// Stateless evaluator over one model's configuration.
///
/// Pure with respect to its inputs: no wall clock, no randomness, so repeated
/// calls with unchanged configuration and entity data yield identical results.
pub struct Scorer<'a> {
    model: &'a RiskModel,
    factors: &'a [RiskFactor],
    /// Tier bands ordered highest threshold first with the lowest forced to 0.
    bands: &'a [RiskModelTier],
    questionnaires: &'a dyn QuestionnaireSource,
    country_index: &'a dyn CountryIndexSource,
}

impl<'a> Scorer<'a> {
    pub fn new(
        model: &'a RiskModel,
        factors: &'a [RiskFactor],
        bands: &'a [RiskModelTier],
        questionnaires: &'a dyn QuestionnaireSource,
        country_index: &'a dyn CountryIndexSource,
    ) -> Self {
        Self {
            model,
            factors,
            bands,
            questionnaires,
            country_index,
        }
    }

    pub fn score(&self, entity: &EntityRecord) -> Result<ScoreOutcome, ScoreError> {
        let mut total: i64 = 0;
        let mut breakdown = Vec::new();

        for kind in &self.model.enabled_components {
            match kind {
                ComponentKind::CountryIndex => {
                    let factor = self.single_factor(ComponentKind::CountryIndex)?;
                    let FactorPayload::CountryIndex { weight_percent } = &factor.payload else {
                        unreachable!("factor rows are keyed by payload kind");
                    };
                    match components::country_score(
                        *weight_percent,
                        self.model.cpi_year,
                        entity,
                        self.country_index,
                    )? {
                        ComponentScore::Scored(points) => {
                            total += points;
                            breakdown.push(ScoreComponent {
                                kind: ComponentKind::CountryIndex,
                                points: Some(points),
                                note: format!(
                                    "country index year {} weighted {}%",
                                    self.model.cpi_year, weight_percent
                                ),
                            });
                        }
                        ComponentScore::Unscored => breakdown.push(ScoreComponent {
                            kind: ComponentKind::CountryIndex,
                            points: None,
                            note: "jurisdiction unscored for the configured year".to_string(),
                        }),
                    }
                }
                ComponentKind::Questionnaire => {
                    let factors = self.questionnaire_factors()?;
                    for factor in factors {
                        let FactorPayload::Questionnaire { rules } = &factor.payload else {
                            unreachable!("factor rows are keyed by payload kind");
                        };
                        let reference = factor
                            .questionnaire
                            .as_ref()
                            .ok_or(ScoreError::NotConfigured(ComponentKind::Questionnaire))?;
                        match self.questionnaires.response(&entity.id, reference)? {
                            Some(response) => {
                                let points =
                                    components::questionnaire_score(rules, &response.answers);
                                total += points;
                                breakdown.push(ScoreComponent {
                                    kind: ComponentKind::Questionnaire,
                                    points: Some(points),
                                    note: format!(
                                        "{} v{} answered",
                                        reference.questionnaire, reference.version
                                    ),
                                });
                            }
                            None => breakdown.push(ScoreComponent {
                                kind: ComponentKind::Questionnaire,
                                points: None,
                                note: format!(
                                    "{} v{} not answered",
                                    reference.questionnaire, reference.version
                                ),
                            }),
                        }
                    }
                }
                ComponentKind::CustomField => {
                    let factor = self.single_factor(ComponentKind::CustomField)?;
                    let FactorPayload::CustomField { field, scores } = &factor.payload else {
                        unreachable!("factor rows are keyed by payload kind");
                    };
                    match components::custom_field_score(field, scores, entity) {
                        ComponentScore::Scored(points) => {
                            total += points;
                            breakdown.push(ScoreComponent {
                                kind: ComponentKind::CustomField,
                                points: Some(points),
                                note: format!("field '{field}' option scored"),
                            });
                        }
                        ComponentScore::Unscored => breakdown.push(ScoreComponent {
                            kind: ComponentKind::CustomField,
                            points: None,
                            note: format!("field '{field}' unset or option unmapped"),
                        }),
                    }
                }
                ComponentKind::Category => {
                    let factor = self.single_factor(ComponentKind::Category)?;
                    let FactorPayload::Category { scores } = &factor.payload else {
                        unreachable!("factor rows are keyed by payload kind");
                    };
                    match components::category_score(scores, entity) {
                        ComponentScore::Scored(points) => {
                            total += points;
                            breakdown.push(ScoreComponent {
                                kind: ComponentKind::Category,
                                points: Some(points),
                                note: format!("category '{}' scored", entity.category.0),
                            });
                        }
                        ComponentScore::Unscored => breakdown.push(ScoreComponent {
                            kind: ComponentKind::Category,
                            points: None,
                            note: format!("category '{}' unmapped", entity.category.0),
                        }),
                    }
                }
            }
        }

        // Mitigating components can push the raw sum below zero; the
        // normalized score is floored at 0 so band resolution stays total.
        let total = total.max(0);
        let band =
            tiers::resolve(self.bands, total).ok_or(ScoreError::UnresolvedTier(total))?;

        Ok(ScoreOutcome {
            score: total,
            tier: band.tier.clone(),
            components: breakdown,
        })
    }

    fn single_factor(&self, kind: ComponentKind) -> Result<&RiskFactor, ScoreError> {
        self.factors
            .iter()
            .find(|factor| factor.kind() == kind)
            .ok_or_else(|| components::not_configured(kind))
    }

    fn questionnaire_factors(&self) -> Result<Vec<&RiskFactor>, ScoreError> {
        let factors: Vec<&RiskFactor> = self
            .factors
            .iter()
            .filter(|factor| factor.kind() == ComponentKind::Questionnaire)
            .collect();
        if factors.is_empty() {
            return Err(components::not_configured(ComponentKind::Questionnaire));
        }
        Ok(factors)
    }
}
