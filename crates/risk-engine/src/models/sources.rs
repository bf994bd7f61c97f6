use serde::{Deserialize, Serialize};

use super::domain::{
    AuditEvent, CategoryId, EntityId, EntityRecord, EntityTypeId, QuestionnaireRef,
    QuestionnaireResponse, RiskRoleId, TierScope,
};

/// Failure raised by an external collaborator.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
    #[error("malformed reference data: {0}")]
    Malformed(String),
}

/// Entity-data source: lookups by id and the active population in scope.
pub trait EntityDirectory: Send + Sync {
    fn fetch(&self, id: &EntityId) -> Result<Option<EntityRecord>, SourceError>;

    /// Active entities of the given type within any of the given categories.
    fn population(
        &self,
        entity_type: &EntityTypeId,
        categories: &[CategoryId],
    ) -> Result<Vec<EntityRecord>, SourceError>;
}

/// Tenant configuration catalog validating model references.
pub trait TenantCatalog: Send + Sync {
    fn entity_type_exists(&self, entity_type: &EntityTypeId) -> Result<bool, SourceError>;

    fn category_valid(
        &self,
        entity_type: &EntityTypeId,
        category: &CategoryId,
    ) -> Result<bool, SourceError>;

    fn role_exists(&self, role: &RiskRoleId) -> Result<bool, SourceError>;

    /// Upper bound on distinct risk roles mapped for one (type, category).
    fn max_model_roles(&self) -> usize;
}

/// Questionnaire-response source keyed by entity and questionnaire version.
pub trait QuestionnaireSource: Send + Sync {
    fn response(
        &self,
        entity: &EntityId,
        questionnaire: &QuestionnaireRef,
    ) -> Result<Option<QuestionnaireResponse>, SourceError>;
}

/// Country-risk index lookup by data year and canonical country code.
pub trait CountryIndexSource: Send + Sync {
    fn index(&self, year: u16, canonical_code: &str) -> Result<Option<i64>, SourceError>;
}

/// Monetary projection returned by the cost-estimation collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub amount_cents: i64,
    pub currency: String,
}

/// Cost/time estimation collaborator; informational only, never gates publish.
pub trait CostEstimator: Send + Sync {
    fn estimate(&self, scope: &TierScope, country: &str)
        -> Result<Option<CostEstimate>, SourceError>;
}

/// Append-only audit sink. Failures are logged, never propagated.
pub trait AuditSink: Send + Sync {
    fn append(&self, event: AuditEvent) -> Result<(), SourceError>;
}
