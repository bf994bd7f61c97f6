//! Risk model definitions, composite scoring, and the draft → test →
//! complete/disabled lifecycle, including the detached test and publish runs
//! coordinated through marker files.

pub mod country;
pub mod domain;
pub mod jobs;
pub mod lifecycle;
pub mod memory;
pub mod publish;
pub mod router;
pub mod scoring;
pub mod service;
pub mod sources;
pub mod store;
pub mod testrun;
pub mod tiers;

#[cfg(test)]
mod tests;

pub use country::{canonical_country_code, CsvCountryIndexSource};
pub use domain::{
    AnswerRule, AnswerValue, AssessmentStatus, AuditAction, AuditEvent, CategoryId, ComponentKind,
    EntityId, EntityRecord, EntityTypeId, FactorError, FactorPayload, ModelId, ModelStatus,
    NewModelSpec, QuestionnaireRef, QuestionnaireResponse, RiskAssessment, RiskFactor, RiskModel,
    RiskModelTier, RiskRoleId, RiskTier, ScopeKey, TenantContext, TenantId, TierId, TierScope,
    UserId,
};
pub use jobs::{JobCoordinator, JobError, JobKey, JobMode, JobSpawner, RunState, ThreadSpawner};
pub use lifecycle::LifecycleError;
pub use memory::InMemoryModelStore;
pub use publish::{PublishError, PublishReceipt};
pub use router::risk_model_router;
pub use scoring::{ScoreComponent, ScoreError, ScoreOutcome, Scorer};
pub use service::{
    Collaborators, EngineSettings, ModelDetail, ModelServiceError, RiskModelService,
};
pub use sources::{
    AuditSink, CostEstimate, CostEstimator, CountryIndexSource, EntityDirectory,
    QuestionnaireSource, SourceError, TenantCatalog,
};
pub use store::{ModelStore, StoreError};
pub use testrun::{TestStart, TestState, TierSummaryEntry};
pub use tiers::TierConfigError;
