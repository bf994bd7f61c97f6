use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;

use super::domain::{
    AssessmentStatus, AuditAction, AuditEvent, CategoryId, ComponentKind, EntityId, EntityRecord,
    EntityTypeId, FactorError, FactorPayload, ModelId, ModelStatus, NewModelSpec,
    QuestionnaireRef, RiskAssessment, RiskFactor, RiskModel, RiskModelTier, RiskRoleId, RiskTier,
    ScopeKey, TenantContext,
};
use super::jobs::{BeginOutcome, JobCoordinator, JobError, JobKey, JobMode, JobSpawner};
use super::lifecycle::{self, LifecycleError};
use super::publish::{self, PublishError, PublishReceipt};
use super::scoring::Scorer;
use super::sources::{
    AuditSink, CostEstimator, CountryIndexSource, EntityDirectory, QuestionnaireSource,
    SourceError, TenantCatalog,
};
use super::store::{ModelStore, StoreError};
use super::testrun::{self, TestStart, TestState};
use super::tiers::{self, TierConfigError};

/// Error raised by the risk model service.
#[derive(Debug, thiserror::Error)]
pub enum ModelServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error(transparent)]
    Tiers(#[from] TierConfigError),
    #[error(transparent)]
    Factor(#[from] FactorError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Jobs(#[from] JobError),
}

/// Knobs for the publish wait loop.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub publish_wait: Duration,
    pub poll_interval: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            publish_wait: Duration::from_secs(10),
            poll_interval: Duration::from_millis(200),
        }
    }
}

/// External collaborators the engine consumes but does not own.
#[derive(Clone)]
pub struct Collaborators {
    pub directory: Arc<dyn EntityDirectory>,
    pub catalog: Arc<dyn TenantCatalog>,
    pub questionnaires: Arc<dyn QuestionnaireSource>,
    pub country_index: Arc<dyn CountryIndexSource>,
    pub costs: Arc<dyn CostEstimator>,
    pub audit: Arc<dyn AuditSink>,
}

/// Model definition with its tier bands and factor rows, for API responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelDetail {
    pub model: RiskModel,
    pub tiers: Vec<RiskModelTier>,
    pub factors: Vec<RiskFactor>,
}

/// Service composing the store, the scoring engine, the lifecycle rules, and
/// the background-run coordination.
pub struct RiskModelService<S> {
    store: Arc<S>,
    collaborators: Collaborators,
    jobs: JobCoordinator,
    spawner: Arc<dyn JobSpawner>,
    settings: EngineSettings,
}

static MODEL_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_model_id() -> ModelId {
    let id = MODEL_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ModelId(format!("rm-{id:06}"))
}

impl<S> RiskModelService<S>
where
    S: ModelStore + 'static,
{
    pub fn new(
        store: Arc<S>,
        collaborators: Collaborators,
        jobs: JobCoordinator,
        spawner: Arc<dyn JobSpawner>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            collaborators,
            jobs,
            spawner,
            settings,
        }
    }

    /// Create a fresh model in setup.
    pub fn create_model(
        &self,
        ctx: &TenantContext,
        spec: NewModelSpec,
    ) -> Result<RiskModel, ModelServiceError> {
        self.check_references(&spec.entity_type, &spec.categories, &spec.role)?;

        let now = Utc::now();
        let model = RiskModel {
            id: next_model_id(),
            tenant: ctx.tenant.clone(),
            name: spec.name,
            entity_type: spec.entity_type,
            categories: spec.categories,
            role: spec.role,
            cloned_from: None,
            cpi_year: spec.cpi_year,
            enabled_components: spec.components,
            status: ModelStatus::Setup,
            created_at: now,
            updated_at: now,
        };

        let stored = self.store.insert_model(model)?;
        self.record_audit(ctx, AuditAction::Created, &stored.id, stored.name.clone());
        Ok(stored)
    }

    /// Clone a complete or disabled model into a new setup draft with
    /// value-equal tiers and factors.
    pub fn clone_model(
        &self,
        ctx: &TenantContext,
        source_id: &ModelId,
    ) -> Result<RiskModel, ModelServiceError> {
        let source = self.fetch_owned(ctx, source_id)?;
        lifecycle::ensure_clonable(&source)?;

        let now = Utc::now();
        let clone = RiskModel {
            id: next_model_id(),
            cloned_from: Some(source.id.clone()),
            status: ModelStatus::Setup,
            created_at: now,
            updated_at: now,
            ..source.clone()
        };
        let stored = self.store.insert_model(clone)?;

        self.store
            .replace_tiers(&stored.id, self.store.tiers(&source.id)?)?;
        for factor in self.store.factors(&source.id)? {
            self.store.upsert_factor(RiskFactor {
                model: stored.id.clone(),
                ..factor
            })?;
        }

        self.record_audit(
            ctx,
            AuditAction::Cloned,
            &stored.id,
            format!("cloned from {}", source.id.0),
        );
        Ok(stored)
    }

    pub fn model_detail(
        &self,
        ctx: &TenantContext,
        id: &ModelId,
    ) -> Result<ModelDetail, ModelServiceError> {
        let model = self.fetch_owned(ctx, id)?;
        let tiers = self.store.tiers(id)?;
        let factors = self.store.factors(id)?;
        Ok(ModelDetail {
            model,
            tiers,
            factors,
        })
    }

    pub fn models(&self, ctx: &TenantContext) -> Result<Vec<RiskModel>, ModelServiceError> {
        Ok(self.store.models_for_tenant(&ctx.tenant)?)
    }

    /// Create or update a tenant-level tier label; models bind these by id.
    pub fn save_tier_label(
        &self,
        ctx: &TenantContext,
        tier: RiskTier,
    ) -> Result<(), ModelServiceError> {
        Ok(self.store.upsert_tier_label(&ctx.tenant, tier)?)
    }

    pub fn tier_labels(&self, ctx: &TenantContext) -> Result<Vec<RiskTier>, ModelServiceError> {
        Ok(self.store.tier_labels(&ctx.tenant)?)
    }

    /// Replace the tier bindings of a draft model.
    pub fn replace_tiers(
        &self,
        ctx: &TenantContext,
        id: &ModelId,
        bands: Vec<RiskModelTier>,
    ) -> Result<(), ModelServiceError> {
        let mut model = self.fetch_owned(ctx, id)?;
        lifecycle::ensure_editable(&model)?;
        tiers::ensure_distinct(&bands)?;

        self.store.replace_tiers(id, bands)?;
        self.touch(&mut model)?;
        self.record_audit(ctx, AuditAction::TiersReplaced, id, "tier bindings replaced");
        Ok(())
    }

    /// Insert or replace one factor row of a draft model.
    pub fn save_factor(
        &self,
        ctx: &TenantContext,
        id: &ModelId,
        questionnaire: Option<QuestionnaireRef>,
        payload: FactorPayload,
    ) -> Result<(), ModelServiceError> {
        let mut model = self.fetch_owned(ctx, id)?;
        lifecycle::ensure_editable(&model)?;

        let factor = RiskFactor {
            model: id.clone(),
            questionnaire,
            payload,
        };
        factor.ensure_well_formed()?;
        let kind = factor.kind();

        self.store.upsert_factor(factor)?;
        self.touch(&mut model)?;
        self.record_audit(
            ctx,
            AuditAction::FactorSaved,
            id,
            format!("{} factor saved", kind.label()),
        );
        Ok(())
    }

    /// Replace the enabled component set of a draft model.
    pub fn set_components(
        &self,
        ctx: &TenantContext,
        id: &ModelId,
        components: BTreeSet<ComponentKind>,
    ) -> Result<RiskModel, ModelServiceError> {
        let mut model = self.fetch_owned(ctx, id)?;
        lifecycle::ensure_editable(&model)?;

        model.enabled_components = components;
        self.touch(&mut model)?;
        self.record_audit(ctx, AuditAction::ComponentsChanged, id, "component set changed");
        Ok(model)
    }

    /// Delete a draft model with its tiers, factors, and test assessments.
    /// Current ratings and the scope map are never touched.
    pub fn delete_model(
        &self,
        ctx: &TenantContext,
        id: &ModelId,
    ) -> Result<(), ModelServiceError> {
        let model = self.fetch_owned(ctx, id)?;
        lifecycle::ensure_deletable(&model)?;

        self.store.purge_test_assessments(id)?;
        self.store.delete_model(id)?;
        self.record_audit(ctx, AuditAction::Deleted, id, model.name);
        Ok(())
    }

    /// Start (or observe) the background test run for a draft model.
    pub fn start_test(
        &self,
        ctx: &TenantContext,
        id: &ModelId,
    ) -> Result<TestStart, ModelServiceError> {
        let mut model = self.fetch_owned(ctx, id)?;
        lifecycle::ensure_editable(&model)?;

        // A run needs a scorable configuration: total tier bands and the
        // factor rows every enabled component requires.
        let bands = tiers::normalize(self.store.tiers(id)?)?;
        let factors = self.store.factors(id)?;
        publish::check_factor_arity(&model.enabled_components, &factors)?;

        let key = JobKey::new(ctx.tenant.clone(), id.clone(), JobMode::Test);
        match self.jobs.begin(&key)? {
            BeginOutcome::AlreadyRunning { pid, started_at } => {
                return Ok(TestStart::AlreadyRunning { pid, started_at });
            }
            BeginOutcome::Started => {}
        }

        if model.status == ModelStatus::Setup {
            model.status = ModelStatus::Test;
            self.touch(&mut model)?;
        }

        let work = {
            let store = Arc::clone(&self.store);
            let directory = Arc::clone(&self.collaborators.directory);
            let questionnaires = Arc::clone(&self.collaborators.questionnaires);
            let country_index = Arc::clone(&self.collaborators.country_index);
            let coordinator = self.jobs.clone();
            let key = key.clone();
            let model = model.clone();
            move || {
                let population = match directory.population(&model.entity_type, &model.categories)
                {
                    Ok(population) => population,
                    Err(err) => {
                        tracing::error!(model = %model.id.0, error = %err, "test run aborted");
                        let _ = coordinator.abandon(&key);
                        return;
                    }
                };

                let rows = testrun::score_population(
                    &model,
                    &factors,
                    &bands,
                    &population,
                    questionnaires.as_ref(),
                    country_index.as_ref(),
                    AssessmentStatus::Test,
                );

                if let Err(err) = store.replace_test_assessments(&model.id, rows) {
                    tracing::error!(model = %model.id.0, error = %err, "test rows not stored");
                    let _ = coordinator.abandon(&key);
                    return;
                }
                if let Err(err) = coordinator.complete(&key) {
                    tracing::error!(model = %model.id.0, error = %err, "test marker not written");
                }
            }
        };

        if let Err(err) = self
            .spawner
            .spawn(&format!("risk-test-{}", id.0), Box::new(work))
        {
            let _ = self.jobs.abandon(&key);
            return Err(err.into());
        }

        self.record_audit(ctx, AuditAction::TestStarted, id, "test run started");
        Ok(TestStart::Started)
    }

    /// Observe the test run and summarize the scored population.
    pub fn test_state(
        &self,
        ctx: &TenantContext,
        id: &ModelId,
    ) -> Result<TestState, ModelServiceError> {
        let model = self.fetch_owned(ctx, id)?;
        let population = self
            .collaborators
            .directory
            .population(&model.entity_type, &model.categories)?;
        let assessments = self.store.test_assessments(id)?;

        let key = JobKey::new(ctx.tenant.clone(), id.clone(), JobMode::Test);
        let run_status = self.jobs.state(&key)?;
        let elapsed_seconds = self.jobs.elapsed_seconds(&key)?;

        let bands = tiers::normalize(self.store.tiers(id)?).unwrap_or_default();
        let tier_summary = testrun::tier_summary(
            &bands,
            &assessments,
            &population,
            self.collaborators.costs.as_ref(),
        );

        Ok(TestState {
            population_count: population.len(),
            scored_count: assessments.len(),
            run_status,
            elapsed_seconds,
            tier_summary,
        })
    }

    /// Validate a draft model and take it live: atomic scope cutover,
    /// displacement of the previous holder, and an awaited recompute of every
    /// affected current rating.
    pub fn publish(
        &self,
        ctx: &TenantContext,
        id: &ModelId,
    ) -> Result<PublishReceipt, ModelServiceError> {
        let mut model = self.fetch_owned(ctx, id)?;
        if !model.status.is_draft() {
            return Err(PublishError::NotInSetup(model.id.0).into());
        }

        if model.categories.is_empty() {
            return Err(PublishError::NoCategories.into());
        }
        self.check_references(&model.entity_type, &model.categories, &model.role)?;

        let bands =
            tiers::normalize(self.store.tiers(id)?).map_err(PublishError::Tiers)?;
        let factors = self.store.factors(id)?;
        let purge = publish::check_factor_arity(&model.enabled_components, &factors)?;
        self.check_role_limit(&model)?;

        // Preconditions hold; from here on the transition is recorded.
        for kind in purge {
            self.store.delete_factors(id, kind)?;
        }
        self.store.replace_tiers(id, bands)?;

        self.cutover(ctx, &mut model, AuditAction::Published)
    }

    /// Take a complete model off-line. Its scope rows are removed so nothing
    /// routes to it; the model itself is kept for re-enabling or cloning.
    pub fn disable(
        &self,
        ctx: &TenantContext,
        id: &ModelId,
    ) -> Result<RiskModel, ModelServiceError> {
        let mut model = self.fetch_owned(ctx, id)?;
        lifecycle::ensure_disableable(&model)?;

        self.store.clear_scopes(id)?;
        model.status = ModelStatus::Disabled;
        self.touch(&mut model)?;
        self.record_audit(ctx, AuditAction::Disabled, id, "model disabled");
        Ok(model)
    }

    /// Re-enable a disabled model. The at-most-one-complete-per-scope
    /// invariant is re-validated by displacement: a competing complete model
    /// is disabled, not rejected (last writer wins).
    pub fn enable(
        &self,
        ctx: &TenantContext,
        id: &ModelId,
    ) -> Result<PublishReceipt, ModelServiceError> {
        let mut model = self.fetch_owned(ctx, id)?;
        lifecycle::ensure_enableable(&model)?;
        self.check_role_limit(&model)?;

        self.cutover(ctx, &mut model, AuditAction::Enabled)
    }

    /// The production rating for one entity under one risk role.
    pub fn current_assessment(
        &self,
        _ctx: &TenantContext,
        entity: &EntityId,
        role: &RiskRoleId,
    ) -> Result<Option<RiskAssessment>, ModelServiceError> {
        Ok(self.store.current_assessment(entity, role)?)
    }

    fn fetch_owned(
        &self,
        ctx: &TenantContext,
        id: &ModelId,
    ) -> Result<RiskModel, ModelServiceError> {
        let model = self.store.fetch_model(id)?.ok_or(StoreError::NotFound)?;
        if model.tenant != ctx.tenant {
            // Another tenant's model is indistinguishable from a missing one.
            return Err(StoreError::NotFound.into());
        }
        Ok(model)
    }

    fn touch(&self, model: &mut RiskModel) -> Result<(), ModelServiceError> {
        model.updated_at = Utc::now();
        self.store.update_model(model.clone())?;
        Ok(())
    }

    fn check_references(
        &self,
        entity_type: &EntityTypeId,
        categories: &[CategoryId],
        role: &RiskRoleId,
    ) -> Result<(), ModelServiceError> {
        let catalog = self.collaborators.catalog.as_ref();
        if !catalog.entity_type_exists(entity_type)? {
            return Err(PublishError::UnknownEntityType(entity_type.0.clone()).into());
        }
        if !catalog.role_exists(role)? {
            return Err(PublishError::UnknownRiskRole(role.0.clone()).into());
        }
        for category in categories {
            if !catalog.category_valid(entity_type, category)? {
                return Err(PublishError::InvalidCategory {
                    entity_type: entity_type.0.clone(),
                    category: category.0.clone(),
                }
                .into());
            }
        }
        Ok(())
    }

    fn check_role_limit(&self, model: &RiskModel) -> Result<(), ModelServiceError> {
        let limit = self.collaborators.catalog.max_model_roles();
        for category in &model.categories {
            let roles = self.store.roles_mapped(&model.entity_type, category)?;
            if !roles.contains(&model.role) && roles.len() >= limit {
                return Err(PublishError::RoleLimit {
                    entity_type: model.entity_type.0.clone(),
                    category: category.0.clone(),
                    found: roles.len(),
                    limit,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Shared tail of publish and enable: rewrite the scope map, disable
    /// displaced holders, flip the status, purge test rows, and run the
    /// awaited recompute over every affected entity.
    fn cutover(
        &self,
        ctx: &TenantContext,
        model: &mut RiskModel,
        action: AuditAction,
    ) -> Result<PublishReceipt, ModelServiceError> {
        let mut displaced: BTreeSet<ModelId> = BTreeSet::new();
        for category in &model.categories {
            let key = ScopeKey {
                entity_type: model.entity_type.clone(),
                category: category.clone(),
                role: model.role.clone(),
            };
            if let Some(previous) = self.store.remap_scope(&key, &model.id)? {
                displaced.insert(previous);
            }
        }

        for previous_id in &displaced {
            if let Some(mut previous) = self.store.fetch_model(previous_id)? {
                previous.status = ModelStatus::Disabled;
                previous.updated_at = Utc::now();
                self.store.update_model(previous)?;
            }
            // Leftover rows of the displaced model under other keys would
            // route entities to a disabled model.
            self.store.clear_scopes(previous_id)?;
        }

        model.status = ModelStatus::Complete;
        self.touch(model)?;
        self.store.purge_test_assessments(&model.id)?;

        self.record_audit(ctx, action, &model.id, format!("scope cutover to {}", model.id.0));

        let displaced: Vec<ModelId> = displaced.into_iter().collect();
        self.recompute_current(ctx, model, &displaced)?;

        Ok(PublishReceipt {
            model: model.clone(),
            displaced,
        })
    }

    /// Spawn (or observe) the detached recompute worker and wait for its
    /// marker within the failsafe window.
    fn recompute_current(
        &self,
        ctx: &TenantContext,
        model: &RiskModel,
        displaced: &[ModelId],
    ) -> Result<(), ModelServiceError> {
        let key = JobKey::new(ctx.tenant.clone(), model.id.clone(), JobMode::Publish);

        match self.jobs.begin(&key)? {
            BeginOutcome::AlreadyRunning { pid, .. } => {
                tracing::info!(model = %model.id.0, pid, "recompute already in flight");
            }
            BeginOutcome::Started => {
                let work = {
                    let store = Arc::clone(&self.store);
                    let directory = Arc::clone(&self.collaborators.directory);
                    let questionnaires = Arc::clone(&self.collaborators.questionnaires);
                    let country_index = Arc::clone(&self.collaborators.country_index);
                    let coordinator = self.jobs.clone();
                    let key = key.clone();
                    let role = model.role.clone();
                    let entity_type = model.entity_type.clone();
                    let categories = model.categories.clone();
                    let displaced = displaced.to_vec();
                    move || {
                        recompute_worker(
                            store.as_ref(),
                            directory.as_ref(),
                            questionnaires.as_ref(),
                            country_index.as_ref(),
                            &coordinator,
                            &key,
                            &role,
                            &entity_type,
                            &categories,
                            &displaced,
                        );
                    }
                };

                if let Err(err) = self
                    .spawner
                    .spawn(&format!("risk-publish-{}", model.id.0), Box::new(work))
                {
                    let _ = self.jobs.abandon(&key);
                    return Err(err.into());
                }
            }
        }

        self.jobs
            .await_marker(&key, self.settings.poll_interval, self.settings.publish_wait)
            .map_err(|err| match err {
                JobError::AcknowledgmentTimeout(secs) => {
                    ModelServiceError::Publish(PublishError::RecomputeAcknowledgmentTimeout(secs))
                }
                other => ModelServiceError::Jobs(other),
            })
    }

    fn record_audit(
        &self,
        ctx: &TenantContext,
        action: AuditAction,
        model: &ModelId,
        detail: impl Into<String>,
    ) {
        let event = AuditEvent {
            tenant: ctx.tenant.clone(),
            user: ctx.user.clone(),
            action,
            model: model.clone(),
            detail: detail.into(),
        };
        if let Err(err) = self.collaborators.audit.append(event) {
            tracing::warn!(error = %err, "audit sink rejected event");
        }
    }
}

/// Body of the detached publish worker: rescore every affected entity against
/// whatever model the rewritten scope map routes it to, drop ratings for
/// entities no scope covers anymore, then drop the completion marker.
#[allow(clippy::too_many_arguments)]
fn recompute_worker<S: ModelStore>(
    store: &S,
    directory: &dyn EntityDirectory,
    questionnaires: &dyn QuestionnaireSource,
    country_index: &dyn CountryIndexSource,
    coordinator: &JobCoordinator,
    key: &JobKey,
    role: &RiskRoleId,
    entity_type: &EntityTypeId,
    categories: &[CategoryId],
    displaced: &[ModelId],
) {
    let mut affected: BTreeMap<EntityId, Option<EntityRecord>> = BTreeMap::new();

    match directory.population(entity_type, categories) {
        Ok(population) => {
            for entity in population {
                affected.insert(entity.id.clone(), Some(entity));
            }
        }
        Err(err) => {
            tracing::error!(error = %err, "recompute aborted: population unavailable");
            let _ = coordinator.abandon(key);
            return;
        }
    }

    for previous in displaced {
        match store.current_assessments_for_model(previous) {
            Ok(rows) => {
                for row in rows {
                    if !affected.contains_key(&row.entity) {
                        let record = directory.fetch(&row.entity).ok().flatten();
                        affected.insert(row.entity, record);
                    }
                }
            }
            Err(err) => {
                tracing::warn!(model = %previous.0, error = %err, "displaced ratings unreadable");
            }
        }
    }

    type ScoringConfig = (RiskModel, Vec<RiskFactor>, Vec<RiskModelTier>);
    let mut cache: HashMap<ModelId, Option<ScoringConfig>> = HashMap::new();
    let mut rows = Vec::new();
    let mut orphaned = Vec::new();

    for (entity_id, record) in affected {
        let Some(record) = record.filter(|record| record.active) else {
            orphaned.push(entity_id);
            continue;
        };
        let scope = ScopeKey {
            entity_type: record.entity_type.clone(),
            category: record.category.clone(),
            role: role.clone(),
        };
        let Some(mapped) = store.scope_for(&scope).ok().flatten() else {
            orphaned.push(entity_id);
            continue;
        };
        let config = cache
            .entry(mapped.clone())
            .or_insert_with(|| load_scoring_config(store, &mapped));
        let Some((model, factors, bands)) = config.as_ref() else {
            orphaned.push(entity_id);
            continue;
        };

        let scorer = Scorer::new(model, factors, bands, questionnaires, country_index);
        match scorer.score(&record) {
            Ok(outcome) => rows.push(RiskAssessment {
                entity: entity_id,
                model: model.id.clone(),
                tier: outcome.tier,
                score: outcome.score,
                status: AssessmentStatus::Current,
                assessed_at: Utc::now(),
            }),
            Err(err) => {
                tracing::warn!(
                    entity = %entity_id.0,
                    model = %model.id.0,
                    error = %err,
                    "recompute skipped an entity that failed to score"
                );
            }
        }
    }

    if let Err(err) = store.put_current_assessments(role, rows) {
        tracing::error!(error = %err, "recomputed ratings not stored");
        let _ = coordinator.abandon(key);
        return;
    }
    if let Err(err) = store.remove_current_assessments(role, &orphaned) {
        tracing::warn!(error = %err, "orphaned ratings not removed");
    }
    if let Err(err) = coordinator.complete(key) {
        tracing::error!(error = %err, "publish marker not written");
    }
}

fn load_scoring_config(
    store: &dyn ModelStore,
    id: &ModelId,
) -> Option<(RiskModel, Vec<RiskFactor>, Vec<RiskModelTier>)> {
    let model = store.fetch_model(id).ok().flatten()?;
    let factors = store.factors(id).ok()?;
    let bands = tiers::normalize(store.tiers(id).ok()?).ok()?;
    Some((model, factors, bands))
}
