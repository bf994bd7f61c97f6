use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for the tenant owning a model.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TenantId(pub String);

/// Identifier wrapper for the acting user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Identifier wrapper for a risk model definition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModelId(pub String);

/// Identifier wrapper for a tenant-level reusable tier label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TierId(pub String);

/// Identifier wrapper for a scored business entity ("profile").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub String);

/// Identifier wrapper for an entity type (vendor, customer, intermediary, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityTypeId(pub String);

/// Identifier wrapper for an entity category within a type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CategoryId(pub String);

/// Identifier wrapper for a risk role: one named axis of risk, since a tenant
/// may run several independent ratings per entity type and category.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RiskRoleId(pub String);

/// Tag restricting downstream cost and time calculations for a tier band.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TierScope(pub String);

/// Explicit caller identity threaded through every operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub tenant: TenantId,
    pub user: UserId,
}

impl TenantContext {
    pub fn new(tenant: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            tenant: TenantId(tenant.into()),
            user: UserId(user.into()),
        }
    }
}

/// Lifecycle status of a model definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    Setup,
    Test,
    Complete,
    Disabled,
}

impl ModelStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ModelStatus::Setup => "setup",
            ModelStatus::Test => "test",
            ModelStatus::Complete => "complete",
            ModelStatus::Disabled => "disabled",
        }
    }

    /// Setup and test are the same editable phase; `test` only records that a
    /// trial run has been started for the draft.
    pub const fn is_draft(self) -> bool {
        matches!(self, ModelStatus::Setup | ModelStatus::Test)
    }
}

/// Pluggable scoring component kinds a model may enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    CountryIndex,
    Questionnaire,
    CustomField,
    Category,
}

impl ComponentKind {
    pub const fn label(self) -> &'static str {
        match self {
            ComponentKind::CountryIndex => "country_index",
            ComponentKind::Questionnaire => "questionnaire",
            ComponentKind::CustomField => "custom_field",
            ComponentKind::Category => "category",
        }
    }

    /// Questionnaire factors are keyed per questionnaire version; every other
    /// kind carries at most one factor row per model.
    pub const fn single_factor(self) -> bool {
        !matches!(self, ComponentKind::Questionnaire)
    }
}

/// A named, tenant-scoped risk model definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskModel {
    pub id: ModelId,
    pub tenant: TenantId,
    pub name: String,
    pub entity_type: EntityTypeId,
    pub categories: Vec<CategoryId>,
    pub role: RiskRoleId,
    pub cloned_from: Option<ModelId>,
    pub cpi_year: u16,
    pub enabled_components: BTreeSet<ComponentKind>,
    pub status: ModelStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request payload for creating a model from scratch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewModelSpec {
    pub name: String,
    pub entity_type: EntityTypeId,
    pub categories: Vec<CategoryId>,
    pub role: RiskRoleId,
    pub cpi_year: u16,
    #[serde(default)]
    pub components: BTreeSet<ComponentKind>,
}

/// Tenant-level reusable tier label, independent of any model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskTier {
    pub id: TierId,
    pub name: String,
    pub foreground: String,
    pub background: String,
}

/// Binding of a tier to a model with the minimum score at which it applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskModelTier {
    pub tier: TierId,
    /// Minimum score, inclusive. Bands are matched highest threshold first.
    pub threshold: i64,
    pub scope: TierScope,
}

/// Reference to one questionnaire version scored by a questionnaire factor.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QuestionnaireRef {
    pub questionnaire: String,
    pub version: u32,
}

/// One question's answer-to-score table inside a questionnaire factor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRule {
    pub question: String,
    /// Scorable answer values: "yes"/"no" for boolean questions, the option
    /// key for single-select questions. Free-text answers never score.
    pub scores: BTreeMap<String, i64>,
    /// Score applied when the question was left unanswered.
    pub unanswered: i64,
}

/// Typed per-kind factor configuration. Kept as an explicit schema so the
/// publish gate can validate shape instead of probing an opaque blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FactorPayload {
    CountryIndex {
        /// Percentage weight applied to the inverted country index.
        weight_percent: i64,
    },
    Questionnaire {
        rules: Vec<AnswerRule>,
    },
    CustomField {
        field: String,
        scores: BTreeMap<String, i64>,
    },
    Category {
        scores: BTreeMap<CategoryId, i64>,
    },
}

impl FactorPayload {
    pub const fn kind(&self) -> ComponentKind {
        match self {
            FactorPayload::CountryIndex { .. } => ComponentKind::CountryIndex,
            FactorPayload::Questionnaire { .. } => ComponentKind::Questionnaire,
            FactorPayload::CustomField { .. } => ComponentKind::CustomField,
            FactorPayload::Category { .. } => ComponentKind::Category,
        }
    }
}

/// One scoring component's configuration for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub model: ModelId,
    /// Present exactly when the payload is a questionnaire table.
    pub questionnaire: Option<QuestionnaireRef>,
    pub payload: FactorPayload,
}

impl RiskFactor {
    pub const fn kind(&self) -> ComponentKind {
        self.payload.kind()
    }
}

/// Shape errors rejected when a factor row is saved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FactorError {
    #[error("questionnaire factors must reference a questionnaire version")]
    MissingQuestionnaireRef,
    #[error("only questionnaire factors may reference a questionnaire")]
    UnexpectedQuestionnaireRef,
}

impl RiskFactor {
    /// Validate the questionnaire-reference pairing rule for this row.
    pub fn ensure_well_formed(&self) -> Result<(), FactorError> {
        match (self.kind(), &self.questionnaire) {
            (ComponentKind::Questionnaire, None) => Err(FactorError::MissingQuestionnaireRef),
            (kind, Some(_)) if kind.single_factor() => {
                Err(FactorError::UnexpectedQuestionnaireRef)
            }
            _ => Ok(()),
        }
    }
}

/// Whether an assessment row is disposable test output or the live rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    Test,
    Current,
}

impl AssessmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AssessmentStatus::Test => "test",
            AssessmentStatus::Current => "current",
        }
    }
}

/// A computed rating for one entity under one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub entity: EntityId,
    pub model: ModelId,
    pub tier: TierId,
    pub score: i64,
    pub status: AssessmentStatus,
    pub assessed_at: DateTime<Utc>,
}

/// Routing key of the scope map: exactly one complete model per key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScopeKey {
    pub entity_type: EntityTypeId,
    pub category: CategoryId,
    pub role: RiskRoleId,
}

/// Projection of a business entity supplied by the entity directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: EntityId,
    pub entity_type: EntityTypeId,
    pub category: CategoryId,
    /// ISO country code as captured, possibly a legacy alias.
    pub country: Option<String>,
    pub custom_fields: BTreeMap<String, String>,
    pub active: bool,
}

/// Answer value captured for one questionnaire question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerValue {
    YesNo(bool),
    Choice(String),
    FreeText(String),
}

impl AnswerValue {
    /// Key used against an [`AnswerRule`] score table. Free text is never
    /// scorable and yields no key.
    pub fn scoring_key(&self) -> Option<&str> {
        match self {
            AnswerValue::YesNo(true) => Some("yes"),
            AnswerValue::YesNo(false) => Some("no"),
            AnswerValue::Choice(option) => Some(option.as_str()),
            AnswerValue::FreeText(_) => None,
        }
    }
}

/// An entity's answers for one questionnaire version.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuestionnaireResponse {
    pub answers: BTreeMap<String, AnswerValue>,
}

/// Action recorded against the audit sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    Cloned,
    TiersReplaced,
    FactorSaved,
    ComponentsChanged,
    TestStarted,
    Published,
    Disabled,
    Enabled,
    Deleted,
}

impl AuditAction {
    pub const fn label(self) -> &'static str {
        match self {
            AuditAction::Created => "created",
            AuditAction::Cloned => "cloned",
            AuditAction::TiersReplaced => "tiers_replaced",
            AuditAction::FactorSaved => "factor_saved",
            AuditAction::ComponentsChanged => "components_changed",
            AuditAction::TestStarted => "test_started",
            AuditAction::Published => "published",
            AuditAction::Disabled => "disabled",
            AuditAction::Enabled => "enabled",
            AuditAction::Deleted => "deleted",
        }
    }
}

/// Append-only audit entry handed to the external sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub tenant: TenantId,
    pub user: UserId,
    pub action: AuditAction,
    pub model: ModelId,
    pub detail: String,
}
