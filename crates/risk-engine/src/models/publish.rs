use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::domain::{ComponentKind, ModelId, RiskFactor, RiskModel};
use super::tiers::TierConfigError;

/// Publish preconditions, each with its own variant so callers can tell the
/// gates apart. All checks run before any row is mutated.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("model {0} is not in setup; only draft models can be published")]
    NotInSetup(String),
    #[error("unknown entity type {0}")]
    UnknownEntityType(String),
    #[error("unknown risk role {0}")]
    UnknownRiskRole(String),
    #[error("a model must cover at least one category")]
    NoCategories,
    #[error("category {category} is not valid for entity type {entity_type}")]
    InvalidCategory {
        entity_type: String,
        category: String,
    },
    #[error(transparent)]
    Tiers(#[from] TierConfigError),
    #[error("a model must enable at least one score component")]
    NoComponents,
    #[error("component {0} is enabled but has no stored factor")]
    MissingFactor(&'static str),
    #[error("component {kind} must have exactly one factor, found {found}")]
    FactorArity { kind: &'static str, found: usize },
    #[error(
        "scope ({entity_type}, {category}) already carries {found} model roles; the limit is {limit}"
    )]
    RoleLimit {
        entity_type: String,
        category: String,
        found: usize,
        limit: usize,
    },
    #[error(
        "recompute acknowledgment timed out after {0} seconds; the worker may still complete, poll the model again"
    )]
    RecomputeAcknowledgmentTimeout(u64),
}

/// Check the per-kind factor arity for every enabled component and return the
/// kinds whose leftover rows must be purged before the transition is recorded.
///
/// Exactly one row for country-index, custom-field, and category; one or more
/// (keyed per questionnaire version) for questionnaire.
pub(crate) fn check_factor_arity(
    enabled: &BTreeSet<ComponentKind>,
    factors: &[RiskFactor],
) -> Result<Vec<ComponentKind>, PublishError> {
    if enabled.is_empty() {
        return Err(PublishError::NoComponents);
    }

    for kind in enabled {
        let found = factors
            .iter()
            .filter(|factor| factor.kind() == *kind)
            .count();
        match found {
            0 => return Err(PublishError::MissingFactor(kind.label())),
            1 => {}
            _ if kind.single_factor() => {
                return Err(PublishError::FactorArity {
                    kind: kind.label(),
                    found,
                })
            }
            _ => {}
        }
    }

    let purge: Vec<ComponentKind> = factors
        .iter()
        .map(RiskFactor::kind)
        .filter(|kind| !enabled.contains(kind))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    Ok(purge)
}

/// Outcome of a successful publish or re-enable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishReceipt {
    pub model: RiskModel,
    /// Previously complete models displaced from the scope, now disabled.
    pub displaced: Vec<ModelId>,
}
