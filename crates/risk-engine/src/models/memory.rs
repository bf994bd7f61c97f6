use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use super::domain::{
    CategoryId, ComponentKind, EntityId, EntityTypeId, ModelId, RiskAssessment, RiskFactor,
    RiskModel, RiskModelTier, RiskRoleId, RiskTier, ScopeKey, TenantId,
};
use super::store::{ModelStore, StoreError};

#[derive(Debug, Default)]
struct StoreState {
    models: HashMap<ModelId, RiskModel>,
    tier_labels: HashMap<TenantId, Vec<RiskTier>>,
    tiers: HashMap<ModelId, Vec<RiskModelTier>>,
    factors: HashMap<ModelId, Vec<RiskFactor>>,
    test_assessments: HashMap<ModelId, Vec<RiskAssessment>>,
    current: BTreeMap<(EntityId, RiskRoleId), RiskAssessment>,
    scope_map: BTreeMap<ScopeKey, ModelId>,
}

/// In-memory [`ModelStore`] backing the API service and the test suites.
#[derive(Debug, Default)]
pub struct InMemoryModelStore {
    state: Mutex<StoreState>,
}

impl InMemoryModelStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().expect("model store mutex poisoned")
    }
}

fn factor_key(factor: &RiskFactor) -> (ComponentKind, Option<super::domain::QuestionnaireRef>) {
    (factor.kind(), factor.questionnaire.clone())
}

impl ModelStore for InMemoryModelStore {
    fn insert_model(&self, model: RiskModel) -> Result<RiskModel, StoreError> {
        let mut state = self.lock();
        if state.models.contains_key(&model.id) {
            return Err(StoreError::Conflict);
        }
        state.models.insert(model.id.clone(), model.clone());
        Ok(model)
    }

    fn update_model(&self, model: RiskModel) -> Result<(), StoreError> {
        let mut state = self.lock();
        if !state.models.contains_key(&model.id) {
            return Err(StoreError::NotFound);
        }
        state.models.insert(model.id.clone(), model);
        Ok(())
    }

    fn fetch_model(&self, id: &ModelId) -> Result<Option<RiskModel>, StoreError> {
        Ok(self.lock().models.get(id).cloned())
    }

    fn models_for_tenant(&self, tenant: &TenantId) -> Result<Vec<RiskModel>, StoreError> {
        let state = self.lock();
        let mut models: Vec<RiskModel> = state
            .models
            .values()
            .filter(|model| &model.tenant == tenant)
            .cloned()
            .collect();
        models.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(models)
    }

    fn delete_model(&self, id: &ModelId) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.models.remove(id).is_none() {
            return Err(StoreError::NotFound);
        }
        state.tiers.remove(id);
        state.factors.remove(id);
        state.test_assessments.remove(id);
        Ok(())
    }

    fn upsert_tier_label(&self, tenant: &TenantId, tier: RiskTier) -> Result<(), StoreError> {
        let mut state = self.lock();
        let labels = state.tier_labels.entry(tenant.clone()).or_default();
        if let Some(existing) = labels.iter_mut().find(|label| label.id == tier.id) {
            *existing = tier;
        } else {
            labels.push(tier);
        }
        Ok(())
    }

    fn tier_labels(&self, tenant: &TenantId) -> Result<Vec<RiskTier>, StoreError> {
        Ok(self
            .lock()
            .tier_labels
            .get(tenant)
            .cloned()
            .unwrap_or_default())
    }

    fn replace_tiers(
        &self,
        model: &ModelId,
        tiers: Vec<RiskModelTier>,
    ) -> Result<(), StoreError> {
        self.lock().tiers.insert(model.clone(), tiers);
        Ok(())
    }

    fn tiers(&self, model: &ModelId) -> Result<Vec<RiskModelTier>, StoreError> {
        Ok(self.lock().tiers.get(model).cloned().unwrap_or_default())
    }

    fn upsert_factor(&self, factor: RiskFactor) -> Result<(), StoreError> {
        let mut state = self.lock();
        let rows = state.factors.entry(factor.model.clone()).or_default();
        let key = factor_key(&factor);
        if let Some(existing) = rows.iter_mut().find(|row| factor_key(row) == key) {
            *existing = factor;
        } else {
            rows.push(factor);
        }
        Ok(())
    }

    fn factors(&self, model: &ModelId) -> Result<Vec<RiskFactor>, StoreError> {
        Ok(self.lock().factors.get(model).cloned().unwrap_or_default())
    }

    fn delete_factors(&self, model: &ModelId, kind: ComponentKind) -> Result<(), StoreError> {
        let mut state = self.lock();
        if let Some(rows) = state.factors.get_mut(model) {
            rows.retain(|row| row.kind() != kind);
        }
        Ok(())
    }

    fn replace_test_assessments(
        &self,
        model: &ModelId,
        rows: Vec<RiskAssessment>,
    ) -> Result<(), StoreError> {
        self.lock().test_assessments.insert(model.clone(), rows);
        Ok(())
    }

    fn purge_test_assessments(&self, model: &ModelId) -> Result<(), StoreError> {
        self.lock().test_assessments.remove(model);
        Ok(())
    }

    fn test_assessments(&self, model: &ModelId) -> Result<Vec<RiskAssessment>, StoreError> {
        Ok(self
            .lock()
            .test_assessments
            .get(model)
            .cloned()
            .unwrap_or_default())
    }

    fn put_current_assessments(
        &self,
        role: &RiskRoleId,
        rows: Vec<RiskAssessment>,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        for row in rows {
            state
                .current
                .insert((row.entity.clone(), role.clone()), row);
        }
        Ok(())
    }

    fn remove_current_assessments(
        &self,
        role: &RiskRoleId,
        entities: &[EntityId],
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        for entity in entities {
            state.current.remove(&(entity.clone(), role.clone()));
        }
        Ok(())
    }

    fn current_assessment(
        &self,
        entity: &EntityId,
        role: &RiskRoleId,
    ) -> Result<Option<RiskAssessment>, StoreError> {
        Ok(self
            .lock()
            .current
            .get(&(entity.clone(), role.clone()))
            .cloned())
    }

    fn current_assessments_for_model(
        &self,
        model: &ModelId,
    ) -> Result<Vec<RiskAssessment>, StoreError> {
        Ok(self
            .lock()
            .current
            .values()
            .filter(|row| &row.model == model)
            .cloned()
            .collect())
    }

    fn remap_scope(
        &self,
        key: &ScopeKey,
        model: &ModelId,
    ) -> Result<Option<ModelId>, StoreError> {
        // Single critical section covers the delete+insert pair for the key.
        let mut state = self.lock();
        let previous = state.scope_map.insert(key.clone(), model.clone());
        Ok(previous.filter(|prev| prev != model))
    }

    fn scope_for(&self, key: &ScopeKey) -> Result<Option<ModelId>, StoreError> {
        Ok(self.lock().scope_map.get(key).cloned())
    }

    fn scopes_for_model(&self, model: &ModelId) -> Result<Vec<ScopeKey>, StoreError> {
        Ok(self
            .lock()
            .scope_map
            .iter()
            .filter(|(_, mapped)| *mapped == model)
            .map(|(key, _)| key.clone())
            .collect())
    }

    fn clear_scopes(&self, model: &ModelId) -> Result<(), StoreError> {
        self.lock().scope_map.retain(|_, mapped| mapped != model);
        Ok(())
    }

    fn roles_mapped(
        &self,
        entity_type: &EntityTypeId,
        category: &CategoryId,
    ) -> Result<Vec<RiskRoleId>, StoreError> {
        let state = self.lock();
        let mut roles: Vec<RiskRoleId> = state
            .scope_map
            .keys()
            .filter(|key| &key.entity_type == entity_type && &key.category == category)
            .map(|key| key.role.clone())
            .collect();
        roles.dedup();
        Ok(roles)
    }
}
