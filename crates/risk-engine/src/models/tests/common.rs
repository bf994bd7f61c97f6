use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::models::domain::{
    AnswerRule, AnswerValue, AuditEvent, CategoryId, ComponentKind, EntityId, EntityRecord,
    EntityTypeId, FactorPayload, NewModelSpec, QuestionnaireRef, QuestionnaireResponse, RiskModel,
    RiskModelTier, RiskRoleId, TenantContext, TierId, TierScope,
};
use crate::models::jobs::{JobCoordinator, JobError, JobSpawner};
use crate::models::memory::InMemoryModelStore;
use crate::models::service::{Collaborators, EngineSettings, RiskModelService};
use crate::models::sources::{
    AuditSink, CostEstimate, CostEstimator, CountryIndexSource, EntityDirectory,
    QuestionnaireSource, SourceError, TenantCatalog,
};

pub(super) fn ctx() -> TenantContext {
    TenantContext::new("acme", "analyst-7")
}

pub(super) fn vendor_type() -> EntityTypeId {
    EntityTypeId("vendor".to_string())
}

pub(super) fn supplier() -> CategoryId {
    CategoryId("supplier".to_string())
}

pub(super) fn distributor() -> CategoryId {
    CategoryId("distributor".to_string())
}

pub(super) fn aml_role() -> RiskRoleId {
    RiskRoleId("aml".to_string())
}

pub(super) fn questionnaire_ref() -> QuestionnaireRef {
    QuestionnaireRef {
        questionnaire: "vendor-onboarding".to_string(),
        version: 3,
    }
}

pub(super) fn entities() -> Vec<EntityRecord> {
    vec![
        EntityRecord {
            id: EntityId("ent-alpha".to_string()),
            entity_type: vendor_type(),
            category: supplier(),
            country: Some("DE".to_string()),
            custom_fields: BTreeMap::from([("payment_terms".to_string(), "net-30".to_string())]),
            active: true,
        },
        EntityRecord {
            id: EntityId("ent-bravo".to_string()),
            entity_type: vendor_type(),
            category: distributor(),
            country: Some("NG".to_string()),
            custom_fields: BTreeMap::from([("payment_terms".to_string(), "net-90".to_string())]),
            active: true,
        },
        EntityRecord {
            id: EntityId("ent-chi".to_string()),
            entity_type: vendor_type(),
            category: supplier(),
            country: Some("UK".to_string()),
            custom_fields: BTreeMap::new(),
            active: true,
        },
        EntityRecord {
            id: EntityId("ent-delta".to_string()),
            entity_type: vendor_type(),
            category: supplier(),
            country: Some("DE".to_string()),
            custom_fields: BTreeMap::new(),
            active: false,
        },
    ]
}

pub(super) struct StaticDirectory {
    pub(super) entities: Vec<EntityRecord>,
}

impl EntityDirectory for StaticDirectory {
    fn fetch(&self, id: &EntityId) -> Result<Option<EntityRecord>, SourceError> {
        Ok(self.entities.iter().find(|entity| &entity.id == id).cloned())
    }

    fn population(
        &self,
        entity_type: &EntityTypeId,
        categories: &[CategoryId],
    ) -> Result<Vec<EntityRecord>, SourceError> {
        Ok(self
            .entities
            .iter()
            .filter(|entity| {
                entity.active
                    && &entity.entity_type == entity_type
                    && categories.contains(&entity.category)
            })
            .cloned()
            .collect())
    }
}

pub(super) struct StaticCatalog {
    pub(super) max_roles: usize,
}

impl TenantCatalog for StaticCatalog {
    fn entity_type_exists(&self, entity_type: &EntityTypeId) -> Result<bool, SourceError> {
        Ok(entity_type.0 == "vendor" || entity_type.0 == "customer")
    }

    fn category_valid(
        &self,
        entity_type: &EntityTypeId,
        category: &CategoryId,
    ) -> Result<bool, SourceError> {
        Ok(entity_type.0 == "vendor" && matches!(category.0.as_str(), "supplier" | "distributor"))
    }

    fn role_exists(&self, role: &RiskRoleId) -> Result<bool, SourceError> {
        Ok(matches!(role.0.as_str(), "aml" | "sanctions" | "fraud"))
    }

    fn max_model_roles(&self) -> usize {
        self.max_roles
    }
}

#[derive(Default)]
pub(super) struct ScriptedQuestionnaires {
    pub(super) responses: HashMap<(EntityId, QuestionnaireRef), QuestionnaireResponse>,
}

impl ScriptedQuestionnaires {
    pub(super) fn canned() -> Self {
        let mut responses = HashMap::new();
        responses.insert(
            (EntityId("ent-alpha".to_string()), questionnaire_ref()),
            QuestionnaireResponse {
                answers: BTreeMap::from([
                    ("sanctions_hits".to_string(), AnswerValue::YesNo(false)),
                    (
                        "uses_agents".to_string(),
                        AnswerValue::Choice("sometimes".to_string()),
                    ),
                ]),
            },
        );
        responses.insert(
            (EntityId("ent-chi".to_string()), questionnaire_ref()),
            QuestionnaireResponse {
                answers: BTreeMap::from([(
                    "sanctions_hits".to_string(),
                    AnswerValue::YesNo(true),
                )]),
            },
        );
        Self { responses }
    }
}

impl QuestionnaireSource for ScriptedQuestionnaires {
    fn response(
        &self,
        entity: &EntityId,
        questionnaire: &QuestionnaireRef,
    ) -> Result<Option<QuestionnaireResponse>, SourceError> {
        Ok(self
            .responses
            .get(&(entity.clone(), questionnaire.clone()))
            .cloned())
    }
}

pub(super) struct TableIndex {
    pub(super) by_year: BTreeMap<u16, BTreeMap<String, i64>>,
}

impl TableIndex {
    pub(super) fn canned() -> Self {
        let year_2024 = BTreeMap::from([
            ("DE".to_string(), 80),
            ("DK".to_string(), 100),
            ("FR".to_string(), 69),
            ("GB".to_string(), 71),
            ("NG".to_string(), 25),
        ]);
        Self {
            by_year: BTreeMap::from([(2024, year_2024)]),
        }
    }
}

impl CountryIndexSource for TableIndex {
    fn index(&self, year: u16, canonical_code: &str) -> Result<Option<i64>, SourceError> {
        Ok(self
            .by_year
            .get(&year)
            .and_then(|table| table.get(canonical_code))
            .copied())
    }
}

pub(super) struct FlatCosts;

impl CostEstimator for FlatCosts {
    fn estimate(
        &self,
        scope: &TierScope,
        _country: &str,
    ) -> Result<Option<CostEstimate>, SourceError> {
        let amount_cents = match scope.0.as_str() {
            "standard" => 5_000,
            "enhanced" => 20_000,
            "enhanced-plus" => 45_000,
            _ => return Ok(None),
        };
        Ok(Some(CostEstimate {
            amount_cents,
            currency: "USD".to_string(),
        }))
    }
}

#[derive(Default)]
pub(super) struct RecordingAudit {
    events: Mutex<Vec<AuditEvent>>,
}

impl RecordingAudit {
    pub(super) fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().expect("audit mutex poisoned").clone()
    }
}

impl AuditSink for RecordingAudit {
    fn append(&self, event: AuditEvent) -> Result<(), SourceError> {
        self.events
            .lock()
            .expect("audit mutex poisoned")
            .push(event);
        Ok(())
    }
}

/// Runs the worker on the calling thread so tests observe finished runs.
pub(super) struct InlineSpawner;

impl JobSpawner for InlineSpawner {
    fn spawn(
        &self,
        _name: &str,
        work: Box<dyn FnOnce() + Send + 'static>,
    ) -> Result<(), JobError> {
        work();
        Ok(())
    }
}

/// Swallows the worker so tests can observe the failsafe timeout path.
pub(super) struct NoopSpawner;

impl JobSpawner for NoopSpawner {
    fn spawn(
        &self,
        _name: &str,
        _work: Box<dyn FnOnce() + Send + 'static>,
    ) -> Result<(), JobError> {
        Ok(())
    }
}

pub(super) struct Harness {
    pub(super) service: Arc<RiskModelService<InMemoryModelStore>>,
    pub(super) store: Arc<InMemoryModelStore>,
    pub(super) audit: Arc<RecordingAudit>,
    pub(super) jobs: JobCoordinator,
    pub(super) work_path: std::path::PathBuf,
    _work_dir: tempfile::TempDir,
}

pub(super) fn build_harness() -> Harness {
    build_harness_with(Arc::new(InlineSpawner), EngineSettings::default())
}

pub(super) fn build_harness_with(
    spawner: Arc<dyn JobSpawner>,
    settings: EngineSettings,
) -> Harness {
    let work_dir = tempfile::TempDir::new().expect("temp work dir");
    let store = Arc::new(InMemoryModelStore::default());
    let audit = Arc::new(RecordingAudit::default());
    let jobs = JobCoordinator::new(work_dir.path());

    let collaborators = Collaborators {
        directory: Arc::new(StaticDirectory {
            entities: entities(),
        }),
        catalog: Arc::new(StaticCatalog { max_roles: 2 }),
        questionnaires: Arc::new(ScriptedQuestionnaires::canned()),
        country_index: Arc::new(TableIndex::canned()),
        costs: Arc::new(FlatCosts),
        audit: audit.clone(),
    };

    let service = Arc::new(RiskModelService::new(
        store.clone(),
        collaborators,
        jobs.clone(),
        spawner,
        settings,
    ));

    Harness {
        service,
        store,
        audit,
        jobs,
        work_path: work_dir.path().to_path_buf(),
        _work_dir: work_dir,
    }
}

pub(super) fn quick_settings() -> EngineSettings {
    EngineSettings {
        publish_wait: Duration::from_millis(80),
        poll_interval: Duration::from_millis(10),
    }
}

pub(super) fn standard_tiers() -> Vec<RiskModelTier> {
    vec![
        RiskModelTier {
            tier: TierId("tier-low".to_string()),
            threshold: 0,
            scope: TierScope("standard".to_string()),
        },
        RiskModelTier {
            tier: TierId("tier-medium".to_string()),
            threshold: 40,
            scope: TierScope("enhanced".to_string()),
        },
        RiskModelTier {
            tier: TierId("tier-high".to_string()),
            threshold: 75,
            scope: TierScope("enhanced-plus".to_string()),
        },
    ]
}

pub(super) fn country_factor() -> FactorPayload {
    FactorPayload::CountryIndex {
        weight_percent: 100,
    }
}

pub(super) fn questionnaire_factor() -> FactorPayload {
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
    }
}

pub(super) fn custom_field_factor() -> FactorPayload {
    FactorPayload::CustomField {
        field: "payment_terms".to_string(),
        scores: BTreeMap::from([
            ("prepaid".to_string(), 0),
            ("net-30".to_string(), 5),
            ("net-90".to_string(), 15),
        ]),
    }
}

pub(super) fn category_factor() -> FactorPayload {
    FactorPayload::Category {
        scores: BTreeMap::from([(supplier(), 10), (distributor(), 20)]),
    }
}

pub(super) fn all_components() -> BTreeSet<ComponentKind> {
    BTreeSet::from([
        ComponentKind::CountryIndex,
        ComponentKind::Questionnaire,
        ComponentKind::CustomField,
        ComponentKind::Category,
    ])
}

pub(super) fn model_spec(name: &str) -> NewModelSpec {
    NewModelSpec {
        name: name.to_string(),
        entity_type: vendor_type(),
        categories: vec![supplier(), distributor()],
        role: aml_role(),
        cpi_year: 2024,
        components: all_components(),
    }
}

/// Create a model and configure tiers and every factor so it is publishable.
pub(super) fn configured_model(harness: &Harness, name: &str) -> RiskModel {
    configured_model_with(harness, model_spec(name))
}

pub(super) fn configured_model_with(harness: &Harness, spec: NewModelSpec) -> RiskModel {
    let ctx = ctx();
    let model = harness
        .service
        .create_model(&ctx, spec)
        .expect("model created");

    harness
        .service
        .replace_tiers(&ctx, &model.id, standard_tiers())
        .expect("tiers stored");
    harness
        .service
        .save_factor(&ctx, &model.id, None, country_factor())
        .expect("country factor stored");
    harness
        .service
        .save_factor(
            &ctx,
            &model.id,
            Some(questionnaire_ref()),
            questionnaire_factor(),
        )
        .expect("questionnaire factor stored");
    harness
        .service
        .save_factor(&ctx, &model.id, None, custom_field_factor())
        .expect("custom field factor stored");
    harness
        .service
        .save_factor(&ctx, &model.id, None, category_factor())
        .expect("category factor stored");

    model
}

pub(super) fn published_model(harness: &Harness, name: &str) -> RiskModel {
    let model = configured_model(harness, name);
    harness
        .service
        .publish(&ctx(), &model.id)
        .expect("model published")
        .model
}

pub(super) fn entity(id: &str) -> EntityId {
    EntityId(id.to_string())
}
