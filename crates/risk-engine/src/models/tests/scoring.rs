use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;

use super::common::*;
use crate::models::country::canonical_country_code;
use crate::models::domain::{
    AnswerValue, ComponentKind, EntityRecord, FactorPayload, ModelId, ModelStatus,
    QuestionnaireResponse, RiskFactor, RiskModel, TierId,
};
use crate::models::scoring::{ScoreError, Scorer};
use crate::models::tiers::normalize;

fn scoring_model(components: BTreeSet<ComponentKind>) -> RiskModel {
    let now = Utc::now();
    RiskModel {
        id: ModelId("rm-scoring".to_string()),
        tenant: ctx().tenant,
        name: "Vendor AML".to_string(),
        entity_type: vendor_type(),
        categories: vec![supplier(), distributor()],
        role: aml_role(),
        cloned_from: None,
        cpi_year: 2024,
        enabled_components: components,
        status: ModelStatus::Setup,
        created_at: now,
        updated_at: now,
    }
}

fn factor(payload: FactorPayload) -> RiskFactor {
    let questionnaire = match payload {
        FactorPayload::Questionnaire { .. } => Some(questionnaire_ref()),
        _ => None,
    };
    RiskFactor {
        model: ModelId("rm-scoring".to_string()),
        questionnaire,
        payload,
    }
}

fn all_factors() -> Vec<RiskFactor> {
    vec![
        factor(country_factor()),
        factor(questionnaire_factor()),
        factor(custom_field_factor()),
        factor(category_factor()),
    ]
}

fn entity_record(id: &str) -> EntityRecord {
    entities()
        .into_iter()
        .find(|record| record.id.0 == id)
        .expect("fixture entity")
}

#[test]
fn composite_sums_every_enabled_component() {
    let model = scoring_model(all_components());
    let factors = all_factors();
    let bands = normalize(standard_tiers()).expect("bands normalize");
    let questionnaires = ScriptedQuestionnaires::canned();
    let index = TableIndex::canned();
    let scorer = Scorer::new(&model, &factors, &bands, &questionnaires, &index);

    let outcome = scorer.score(&entity_record("ent-alpha")).expect("scores");

    // 20 country + 10 questionnaire + 5 custom field + 10 category.
    assert_eq!(outcome.score, 45);
    assert_eq!(outcome.tier, TierId("tier-medium".to_string()));
    assert_eq!(outcome.components.len(), 4);
    assert!(outcome
        .components
        .iter()
        .all(|component| component.points.is_some()));
}

#[test]
fn scoring_is_deterministic_and_idempotent() {
    let model = scoring_model(all_components());
    let factors = all_factors();
    let bands = normalize(standard_tiers()).expect("bands normalize");
    let questionnaires = ScriptedQuestionnaires::canned();
    let index = TableIndex::canned();
    let scorer = Scorer::new(&model, &factors, &bands, &questionnaires, &index);
    let record = entity_record("ent-chi");

    let first = scorer.score(&record).expect("scores");
    let second = scorer.score(&record).expect("scores");

    assert_eq!(first, second);
    assert_eq!(first.score, 84);
    assert_eq!(first.tier, TierId("tier-high".to_string()));
}

#[test]
fn missing_questionnaire_response_contributes_nothing() {
    let model = scoring_model(all_components());
    let factors = all_factors();
    let bands = normalize(standard_tiers()).expect("bands normalize");
    let questionnaires = ScriptedQuestionnaires::canned();
    let index = TableIndex::canned();
    let scorer = Scorer::new(&model, &factors, &bands, &questionnaires, &index);

    let outcome = scorer.score(&entity_record("ent-bravo")).expect("scores");

    // 75 country + 15 custom field + 20 category; the questionnaire is
    // unanswered and must not act as a penalty.
    assert_eq!(outcome.score, 110);
    let questionnaire = outcome
        .components
        .iter()
        .find(|component| component.kind == ComponentKind::Questionnaire)
        .expect("questionnaire component reported");
    assert_eq!(questionnaire.points, None);
}

#[test]
fn free_text_answers_never_score() {
    let model = scoring_model(BTreeSet::from([ComponentKind::Questionnaire]));
    let factors = vec![factor(questionnaire_factor())];
    let bands = normalize(standard_tiers()).expect("bands normalize");
    let mut questionnaires = ScriptedQuestionnaires::default();
    questionnaires.responses.insert(
        (entity("ent-alpha"), questionnaire_ref()),
        QuestionnaireResponse {
            answers: BTreeMap::from([
                (
                    "sanctions_hits".to_string(),
                    AnswerValue::FreeText("see attached memo".to_string()),
                ),
                (
                    "uses_agents".to_string(),
                    AnswerValue::Choice("often".to_string()),
                ),
            ]),
        },
    );
    let index = TableIndex::canned();
    let scorer = Scorer::new(&model, &factors, &bands, &questionnaires, &index);

    let outcome = scorer.score(&entity_record("ent-alpha")).expect("scores");

    // Only the single-select answer lands: 25. The free-text answer is
    // present, so the unanswered score must not apply either.
    assert_eq!(outcome.score, 25);
}

#[test]
fn unanswered_questions_score_the_unanswered_value() {
    let model = scoring_model(BTreeSet::from([ComponentKind::Questionnaire]));
    let factors = vec![factor(questionnaire_factor())];
    let bands = normalize(standard_tiers()).expect("bands normalize");
    let questionnaires = ScriptedQuestionnaires::canned();
    let index = TableIndex::canned();
    let scorer = Scorer::new(&model, &factors, &bands, &questionnaires, &index);

    // ent-chi answered sanctions_hits=yes (40) and skipped uses_agents (5).
    let outcome = scorer.score(&entity_record("ent-chi")).expect("scores");
    assert_eq!(outcome.score, 45);
}

#[test]
fn legacy_alias_codes_resolve_before_the_index_lookup() {
    // The alias table wins before any table lookup, in exactly this mapping.
    let expectations = [
        ("UK", "GB"),
        ("EL", "GR"),
        ("BU", "MM"),
        ("TP", "TL"),
        ("ZR", "CD"),
        ("YU", "RS"),
        ("CS", "RS"),
        ("AN", "CW"),
        ("FX", "FR"),
        ("DD", "DE"),
    ];
    for (alias, canonical) in expectations {
        assert_eq!(
            canonical_country_code(alias).as_deref(),
            Some(canonical),
            "alias {alias} must normalize to {canonical}"
        );
    }

    assert_eq!(canonical_country_code(" de ").as_deref(), Some("DE"));
    assert_eq!(canonical_country_code("NG").as_deref(), Some("NG"));
    assert_eq!(canonical_country_code("   "), None);

    // End to end: ent-chi carries "UK" and scores through GB's index of 71.
    let model = scoring_model(BTreeSet::from([ComponentKind::CountryIndex]));
    let factors = vec![factor(country_factor())];
    let bands = normalize(standard_tiers()).expect("bands normalize");
    let questionnaires = ScriptedQuestionnaires::default();
    let index = TableIndex::canned();
    let scorer = Scorer::new(&model, &factors, &bands, &questionnaires, &index);

    let outcome = scorer.score(&entity_record("ent-chi")).expect("scores");
    assert_eq!(outcome.score, 29);
}

#[test]
fn unmapped_jurisdictions_stay_unscored_instead_of_zero() {
    let model = scoring_model(BTreeSet::from([
        ComponentKind::CountryIndex,
        ComponentKind::Category,
    ]));
    let factors = vec![factor(country_factor()), factor(category_factor())];
    let bands = normalize(standard_tiers()).expect("bands normalize");
    let questionnaires = ScriptedQuestionnaires::default();
    let index = TableIndex::canned();
    let scorer = Scorer::new(&model, &factors, &bands, &questionnaires, &index);

    let mut unmapped = entity_record("ent-alpha");
    unmapped.country = Some("XX".to_string());
    let outcome = scorer.score(&unmapped).expect("scores");
    let country = outcome
        .components
        .iter()
        .find(|component| component.kind == ComponentKind::CountryIndex)
        .expect("country component reported");
    assert_eq!(country.points, None);
    assert_eq!(outcome.score, 10);

    // A genuinely clean jurisdiction scores zero points, which is distinct
    // from the unscored sentinel.
    let mut clean = entity_record("ent-alpha");
    clean.country = Some("DK".to_string());
    let outcome = scorer.score(&clean).expect("scores");
    let country = outcome
        .components
        .iter()
        .find(|component| component.kind == ComponentKind::CountryIndex)
        .expect("country component reported");
    assert_eq!(country.points, Some(0));
    assert_eq!(outcome.score, 10);
}

#[test]
fn enabled_component_without_factor_is_not_configured() {
    let model = scoring_model(all_components());
    let factors = vec![factor(country_factor())];
    let bands = normalize(standard_tiers()).expect("bands normalize");
    let questionnaires = ScriptedQuestionnaires::canned();
    let index = TableIndex::canned();
    let scorer = Scorer::new(&model, &factors, &bands, &questionnaires, &index);

    match scorer.score(&entity_record("ent-alpha")) {
        Err(ScoreError::NotConfigured(ComponentKind::Questionnaire)) => {}
        other => panic!("expected not-configured error, got {other:?}"),
    }
}

#[test]
fn raising_one_contribution_moves_the_tier_across_the_boundary() {
    // Category-only configuration puts the entity at 42: medium.
    let mut scores = BTreeMap::new();
    scores.insert(supplier(), 42);
    scores.insert(distributor(), 42);
    let category_only = vec![factor(FactorPayload::Category { scores })];
    let model = scoring_model(BTreeSet::from([ComponentKind::Category]));
    let bands = normalize(standard_tiers()).expect("bands normalize");
    let questionnaires = ScriptedQuestionnaires::default();
    let index = TableIndex::canned();
    let scorer = Scorer::new(&model, &category_only, &bands, &questionnaires, &index);

    let record = {
        let mut record = entity_record("ent-alpha");
        // An index of 67 contributes exactly 33 points at weight 100.
        record.country = Some("CZ".to_string());
        record
    };
    let outcome = scorer.score(&record).expect("scores");
    assert_eq!(outcome.score, 42);
    assert_eq!(outcome.tier, TierId("tier-medium".to_string()));

    // Enabling the country component adds 33 and lands on the inclusive 75
    // boundary: high.
    let mut scores = BTreeMap::new();
    scores.insert(supplier(), 42);
    scores.insert(distributor(), 42);
    let with_country = vec![
        factor(country_factor()),
        factor(FactorPayload::Category { scores }),
    ];
    let model = scoring_model(BTreeSet::from([
        ComponentKind::CountryIndex,
        ComponentKind::Category,
    ]));
    let mut index = TableIndex::canned();
    index
        .by_year
        .get_mut(&2024)
        .expect("2024 table")
        .insert("CZ".to_string(), 67);
    let scorer = Scorer::new(&model, &with_country, &bands, &questionnaires, &index);

    let outcome = scorer.score(&record).expect("scores");
    assert_eq!(outcome.score, 75);
    assert_eq!(outcome.tier, TierId("tier-high".to_string()));
}
