use std::collections::BTreeMap;

use super::super::country::canonical_country_code;
use super::super::domain::{AnswerRule, CategoryId, ComponentKind, EntityRecord};
use super::super::sources::{CountryIndexSource, SourceError};
use super::ScoreError;

/// Resolution result for one component: either a concrete number of points or
/// the explicit unscored sentinel. Unscored is never coerced to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentScore {
    Scored(i64),
    Unscored,
}

/// Country-index contribution: the captured code is normalized through the
/// legacy alias table before the per-year lookup, and anything the table does
/// not cover stays unscored rather than dragging the composite toward zero.
pub(crate) fn country_score(
    weight_percent: i64,
    cpi_year: u16,
    entity: &EntityRecord,
    index: &dyn CountryIndexSource,
) -> Result<ComponentScore, SourceError> {
    let Some(raw) = entity.country.as_deref() else {
        return Ok(ComponentScore::Unscored);
    };
    let Some(code) = canonical_country_code(raw) else {
        return Ok(ComponentScore::Unscored);
    };

    match index.index(cpi_year, &code)? {
        Some(value) => {
            // A high index marks a clean jurisdiction; risk points grow as
            // the index falls.
            let inverted = 100 - value.clamp(0, 100);
            Ok(ComponentScore::Scored(inverted * weight_percent / 100))
        }
        None => Ok(ComponentScore::Unscored),
    }
}

/// Sum of one questionnaire version's answer rules against a response.
///
/// Absent answers score the rule's `unanswered` value; free-text answers and
/// answer values outside the rule's table contribute nothing.
pub(crate) fn questionnaire_score(
    rules: &[AnswerRule],
    answers: &BTreeMap<String, super::super::domain::AnswerValue>,
) -> i64 {
    let mut total = 0;
    for rule in rules {
        match answers.get(&rule.question) {
            None => total += rule.unanswered,
            Some(answer) => {
                if let Some(key) = answer.scoring_key() {
                    total += rule.scores.get(key).copied().unwrap_or(0);
                }
            }
        }
    }
    total
}

pub(crate) fn custom_field_score(
    field: &str,
    scores: &BTreeMap<String, i64>,
    entity: &EntityRecord,
) -> ComponentScore {
    match entity
        .custom_fields
        .get(field)
        .and_then(|option| scores.get(option))
    {
        Some(points) => ComponentScore::Scored(*points),
        None => ComponentScore::Unscored,
    }
}

pub(crate) fn category_score(
    scores: &BTreeMap<CategoryId, i64>,
    entity: &EntityRecord,
) -> ComponentScore {
    match scores.get(&entity.category) {
        Some(points) => ComponentScore::Scored(*points),
        None => ComponentScore::Unscored,
    }
}

pub(crate) fn not_configured(kind: ComponentKind) -> ScoreError {
    ScoreError::NotConfigured(kind)
}
