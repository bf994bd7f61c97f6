use super::domain::{
    CategoryId, ComponentKind, EntityId, EntityTypeId, ModelId, RiskAssessment, RiskFactor,
    RiskModel, RiskModelTier, RiskRoleId, RiskTier, ScopeKey, TenantId,
};

/// Error enumeration for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Storage abstraction for models, tiers, factors, assessments, and the scope
/// map, so the engine can be exercised against in-memory state in tests and
/// backed by the case database in production.
///
/// `remap_scope` is the one cross-request mutation: implementations must make
/// the delete+insert for a key a single indivisible step.
pub trait ModelStore: Send + Sync {
    fn insert_model(&self, model: RiskModel) -> Result<RiskModel, StoreError>;
    fn update_model(&self, model: RiskModel) -> Result<(), StoreError>;
    fn fetch_model(&self, id: &ModelId) -> Result<Option<RiskModel>, StoreError>;
    fn models_for_tenant(&self, tenant: &TenantId) -> Result<Vec<RiskModel>, StoreError>;
    /// Remove a model together with its tiers, factors, and test assessments.
    /// Current ratings and the scope map are left untouched.
    fn delete_model(&self, id: &ModelId) -> Result<(), StoreError>;

    /// Tenant-level reusable tier labels; many models may bind the same one.
    fn upsert_tier_label(&self, tenant: &TenantId, tier: RiskTier) -> Result<(), StoreError>;
    fn tier_labels(&self, tenant: &TenantId) -> Result<Vec<RiskTier>, StoreError>;

    fn replace_tiers(&self, model: &ModelId, tiers: Vec<RiskModelTier>)
        -> Result<(), StoreError>;
    fn tiers(&self, model: &ModelId) -> Result<Vec<RiskModelTier>, StoreError>;

    /// Insert or replace the factor row keyed by (model, kind, questionnaire).
    fn upsert_factor(&self, factor: RiskFactor) -> Result<(), StoreError>;
    fn factors(&self, model: &ModelId) -> Result<Vec<RiskFactor>, StoreError>;
    fn delete_factors(&self, model: &ModelId, kind: ComponentKind) -> Result<(), StoreError>;

    fn replace_test_assessments(
        &self,
        model: &ModelId,
        rows: Vec<RiskAssessment>,
    ) -> Result<(), StoreError>;
    fn purge_test_assessments(&self, model: &ModelId) -> Result<(), StoreError>;
    fn test_assessments(&self, model: &ModelId) -> Result<Vec<RiskAssessment>, StoreError>;

    /// Replace the current rating per (entity, role) for every given row.
    fn put_current_assessments(
        &self,
        role: &RiskRoleId,
        rows: Vec<RiskAssessment>,
    ) -> Result<(), StoreError>;
    fn remove_current_assessments(
        &self,
        role: &RiskRoleId,
        entities: &[EntityId],
    ) -> Result<(), StoreError>;
    fn current_assessment(
        &self,
        entity: &EntityId,
        role: &RiskRoleId,
    ) -> Result<Option<RiskAssessment>, StoreError>;
    fn current_assessments_for_model(
        &self,
        model: &ModelId,
    ) -> Result<Vec<RiskAssessment>, StoreError>;

    /// Atomically point the key at the given model, returning the previously
    /// mapped model id (the displaced one) if it differed.
    fn remap_scope(&self, key: &ScopeKey, model: &ModelId)
        -> Result<Option<ModelId>, StoreError>;
    fn scope_for(&self, key: &ScopeKey) -> Result<Option<ModelId>, StoreError>;
    fn scopes_for_model(&self, model: &ModelId) -> Result<Vec<ScopeKey>, StoreError>;
    fn clear_scopes(&self, model: &ModelId) -> Result<(), StoreError>;

    /// Distinct roles currently mapped for one (type, category).
    fn roles_mapped(
        &self,
        entity_type: &EntityTypeId,
        category: &CategoryId,
    ) -> Result<Vec<RiskRoleId>, StoreError>;
}
