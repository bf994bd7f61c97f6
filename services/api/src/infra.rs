use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use risk_engine::config::AppConfig;
use risk_engine::error::AppError;
use risk_engine::models::{
    AnswerValue, AuditEvent, AuditSink, CategoryId, Collaborators, CostEstimate, CostEstimator,
    CsvCountryIndexSource, EngineSettings, EntityDirectory, EntityId, EntityRecord, EntityTypeId,
    InMemoryModelStore, JobCoordinator, QuestionnaireRef, QuestionnaireResponse,
    QuestionnaireSource, RiskModelService, RiskRoleId, SourceError, TenantCatalog, ThreadSpawner,
    TierScope,
};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Country-risk index shipped with the service until the tenant uploads a
/// fresher year (`year,code,index`).
const COUNTRY_INDEX_CSV: &str = "\
year,code,index
2025,DK,90
2025,DE,78
2025,GB,73
2025,FR,70
2025,US,67
2025,CZ,57
2025,BR,36
2025,NG,26
2025,RU,22
";

pub(crate) struct SeedDirectory {
    entities: Vec<EntityRecord>,
}

impl Default for SeedDirectory {
    fn default() -> Self {
        let vendor = EntityTypeId("vendor".to_string());
        Self {
            entities: vec![
                EntityRecord {
                    id: EntityId("vnd-1001".to_string()),
                    entity_type: vendor.clone(),
                    category: CategoryId("supplier".to_string()),
                    country: Some("DE".to_string()),
                    custom_fields: BTreeMap::from([(
                        "payment_terms".to_string(),
                        "net-30".to_string(),
                    )]),
                    active: true,
                },
                EntityRecord {
                    id: EntityId("vnd-1002".to_string()),
                    entity_type: vendor.clone(),
                    category: CategoryId("distributor".to_string()),
                    country: Some("UK".to_string()),
                    custom_fields: BTreeMap::from([(
                        "payment_terms".to_string(),
                        "net-90".to_string(),
                    )]),
                    active: true,
                },
                EntityRecord {
                    id: EntityId("vnd-1003".to_string()),
                    entity_type: vendor.clone(),
                    category: CategoryId("supplier".to_string()),
                    country: Some("NG".to_string()),
                    custom_fields: BTreeMap::new(),
                    active: true,
                },
                EntityRecord {
                    id: EntityId("vnd-1004".to_string()),
                    entity_type: vendor,
                    category: CategoryId("distributor".to_string()),
                    country: Some("BR".to_string()),
                    custom_fields: BTreeMap::new(),
                    active: false,
                },
            ],
        }
    }
}

impl EntityDirectory for SeedDirectory {
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

pub(crate) struct SeedCatalog;

impl TenantCatalog for SeedCatalog {
    fn entity_type_exists(&self, entity_type: &EntityTypeId) -> Result<bool, SourceError> {
        Ok(matches!(entity_type.0.as_str(), "vendor" | "customer"))
    }

    fn category_valid(
        &self,
        entity_type: &EntityTypeId,
        category: &CategoryId,
    ) -> Result<bool, SourceError> {
        Ok(entity_type.0 == "vendor"
            && matches!(category.0.as_str(), "supplier" | "distributor"))
    }

    fn role_exists(&self, role: &RiskRoleId) -> Result<bool, SourceError> {
        Ok(matches!(role.0.as_str(), "aml" | "sanctions"))
    }

    fn max_model_roles(&self) -> usize {
        4
    }
}

pub(crate) struct SeedQuestionnaires {
    responses: HashMap<(EntityId, QuestionnaireRef), QuestionnaireResponse>,
}

impl Default for SeedQuestionnaires {
    fn default() -> Self {
        let onboarding = QuestionnaireRef {
            questionnaire: "vendor-onboarding".to_string(),
            version: 3,
        };
        let mut responses = HashMap::new();
        responses.insert(
            (EntityId("vnd-1001".to_string()), onboarding.clone()),
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
            (EntityId("vnd-1003".to_string()), onboarding),
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

impl QuestionnaireSource for SeedQuestionnaires {
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

/// Flat per-review pricing until the billing integration supplies real rates.
pub(crate) struct SeedCosts;

impl CostEstimator for SeedCosts {
    fn estimate(
        &self,
        scope: &TierScope,
        _country: &str,
    ) -> Result<Option<CostEstimate>, SourceError> {
        let amount_cents = match scope.0.as_str() {
            "standard" => 4_000,
            "enhanced" => 18_000,
            "enhanced-plus" => 40_000,
            _ => return Ok(None),
        };
        Ok(Some(CostEstimate {
            amount_cents,
            currency: "USD".to_string(),
        }))
    }
}

/// Audit sink writing structured log lines; the platform-wide audit service
/// consumes the same stream.
pub(crate) struct LogAuditSink;

impl AuditSink for LogAuditSink {
    fn append(&self, event: AuditEvent) -> Result<(), SourceError> {
        info!(
            tenant = %event.tenant.0,
            user = %event.user.0,
            model = %event.model.0,
            action = event.action.label(),
            detail = %event.detail,
            "audit"
        );
        Ok(())
    }
}

pub(crate) fn build_engine(
    config: &AppConfig,
) -> Result<Arc<RiskModelService<InMemoryModelStore>>, AppError> {
    let country_index = CsvCountryIndexSource::from_reader(Cursor::new(COUNTRY_INDEX_CSV))
        .map_err(|err| {
            AppError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                err.to_string(),
            ))
        })?;

    let collaborators = Collaborators {
        directory: Arc::new(SeedDirectory::default()),
        catalog: Arc::new(SeedCatalog),
        questionnaires: Arc::new(SeedQuestionnaires::default()),
        country_index: Arc::new(country_index),
        costs: Arc::new(SeedCosts),
        audit: Arc::new(LogAuditSink),
    };

    let settings = EngineSettings {
        publish_wait: config.engine.publish_wait(),
        poll_interval: config.engine.poll_interval(),
    };

    Ok(Arc::new(RiskModelService::new(
        Arc::new(InMemoryModelStore::default()),
        collaborators,
        JobCoordinator::new(config.engine.work_dir.clone()),
        Arc::new(ThreadSpawner),
        settings,
    )))
}
