use std::collections::{BTreeMap, BTreeSet};
use std::thread;
use std::time::{Duration, Instant};

use clap::Args;
use risk_engine::config::AppConfig;
use risk_engine::error::AppError;
use risk_engine::models::{
    AnswerRule, CategoryId, ComponentKind, EntityId, EntityTypeId, FactorPayload, NewModelSpec,
    QuestionnaireRef, RiskModelTier, RiskRoleId, RunState, TenantContext, TierId, TierScope,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Country-index data year for the demo model (defaults to configuration).
    #[arg(long)]
    pub(crate) cpi_year: Option<u16>,
    /// Seconds to wait for the background test run before giving up.
    #[arg(long, default_value_t = 10)]
    pub(crate) test_wait_secs: u64,
}

/// End-to-end walkthrough against the seeded in-memory infrastructure:
/// create a model, bind tiers and factors, run a test pass, publish, and show
/// the resulting live ratings.
pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let engine = crate::infra::build_engine(&config)?;
    let ctx = TenantContext::new("demo-tenant", "demo-analyst");
    let cpi_year = args.cpi_year.unwrap_or(config.engine.cpi_year);

    let model = engine.create_model(
        &ctx,
        NewModelSpec {
            name: "Vendor AML baseline".to_string(),
            entity_type: EntityTypeId("vendor".to_string()),
            categories: vec![
                CategoryId("supplier".to_string()),
                CategoryId("distributor".to_string()),
            ],
            role: RiskRoleId("aml".to_string()),
            cpi_year,
            components: BTreeSet::from([
                ComponentKind::CountryIndex,
                ComponentKind::Questionnaire,
                ComponentKind::CustomField,
            ]),
        },
    )?;
    println!("created model {} ({})", model.id.0, model.name);

    engine.replace_tiers(
        &ctx,
        &model.id,
        vec![
            RiskModelTier {
                tier: TierId("low".to_string()),
                threshold: 0,
                scope: TierScope("standard".to_string()),
            },
            RiskModelTier {
                tier: TierId("medium".to_string()),
                threshold: 40,
                scope: TierScope("enhanced".to_string()),
            },
            RiskModelTier {
                tier: TierId("high".to_string()),
                threshold: 75,
                scope: TierScope("enhanced-plus".to_string()),
            },
        ],
    )?;

    engine.save_factor(
        &ctx,
        &model.id,
        None,
        FactorPayload::CountryIndex {
            weight_percent: 100,
        },
    )?;
    engine.save_factor(
        &ctx,
        &model.id,
        Some(QuestionnaireRef {
            questionnaire: "vendor-onboarding".to_string(),
            version: 3,
        }),
        FactorPayload::Questionnaire {
            rules: vec![
                AnswerRule {
                    question: "sanctions_hits".to_string(),
                    scores: BTreeMap::from([("yes".to_string(), 40), ("no".to_string(), 0)]),
                    unanswered: 10,
                },
                AnswerRule {
                    question: "uses_agents".to_string(),
                    scores: BTreeMap::from([
                        ("never".to_string(), 0),
                        ("sometimes".to_string(), 10),
                        ("often".to_string(), 25),
                    ]),
                    unanswered: 5,
                },
            ],
        },
    )?;
    engine.save_factor(
        &ctx,
        &model.id,
        None,
        FactorPayload::CustomField {
            field: "payment_terms".to_string(),
            scores: BTreeMap::from([
                ("prepaid".to_string(), 0),
                ("net-30".to_string(), 5),
                ("net-90".to_string(), 15),
            ]),
        },
    )?;

    engine.start_test(&ctx, &model.id)?;
    let deadline = Instant::now() + Duration::from_secs(args.test_wait_secs);
    let state = loop {
        let state = engine.test_state(&ctx, &model.id)?;
        if state.run_status == RunState::Complete || Instant::now() >= deadline {
            break state;
        }
        thread::sleep(Duration::from_millis(100));
    };
    println!(
        "test run: {}/{} scored, status {:?}",
        state.scored_count, state.population_count, state.run_status
    );
    for entry in &state.tier_summary {
        match &entry.estimated_cost {
            Some(cost) => println!(
                "  tier {:<12} {:>3} entities, projected {:.2} {}",
                entry.tier.0,
                entry.count,
                cost.amount_cents as f64 / 100.0,
                cost.currency
            ),
            None => println!("  tier {:<12} {:>3} entities", entry.tier.0, entry.count),
        }
    }

    let receipt = engine.publish(&ctx, &model.id)?;
    println!(
        "published {} (displaced: {})",
        receipt.model.id.0,
        receipt.displaced.len()
    );

    let aml = RiskRoleId("aml".to_string());
    for entity in ["vnd-1001", "vnd-1002", "vnd-1003"] {
        if let Some(rating) =
            engine.current_assessment(&ctx, &EntityId(entity.to_string()), &aml)?
        {
            println!(
                "  {} -> tier {} (score {})",
                entity, rating.tier.0, rating.score
            );
        }
    }

    Ok(())
}
