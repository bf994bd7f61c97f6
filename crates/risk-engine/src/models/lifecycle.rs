use super::domain::{ModelStatus, RiskModel};

/// Illegal lifecycle transitions, rejected before any mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("model {model} is {status}; tiers, factors, and components only change during setup")]
    EditLocked { model: String, status: &'static str },
    #[error("model {model} is {status}; only setup models can be deleted")]
    DeleteLocked { model: String, status: &'static str },
    #[error("model {model} is {status}; only complete models can be disabled")]
    NotComplete { model: String, status: &'static str },
    #[error("model {model} is {status}; only disabled models can be re-enabled")]
    NotDisabled { model: String, status: &'static str },
    #[error("model {model} is {status}; only complete or disabled models can be cloned")]
    NotClonable { model: String, status: &'static str },
}

pub(crate) fn ensure_editable(model: &RiskModel) -> Result<(), LifecycleError> {
    if model.status.is_draft() {
        Ok(())
    } else {
        Err(LifecycleError::EditLocked {
            model: model.id.0.clone(),
            status: model.status.label(),
        })
    }
}

pub(crate) fn ensure_deletable(model: &RiskModel) -> Result<(), LifecycleError> {
    if model.status.is_draft() {
        Ok(())
    } else {
        Err(LifecycleError::DeleteLocked {
            model: model.id.0.clone(),
            status: model.status.label(),
        })
    }
}

pub(crate) fn ensure_disableable(model: &RiskModel) -> Result<(), LifecycleError> {
    if model.status == ModelStatus::Complete {
        Ok(())
    } else {
        Err(LifecycleError::NotComplete {
            model: model.id.0.clone(),
            status: model.status.label(),
        })
    }
}

pub(crate) fn ensure_enableable(model: &RiskModel) -> Result<(), LifecycleError> {
    if model.status == ModelStatus::Disabled {
        Ok(())
    } else {
        Err(LifecycleError::NotDisabled {
            model: model.id.0.clone(),
            status: model.status.label(),
        })
    }
}

pub(crate) fn ensure_clonable(model: &RiskModel) -> Result<(), LifecycleError> {
    if matches!(model.status, ModelStatus::Complete | ModelStatus::Disabled) {
        Ok(())
    } else {
        Err(LifecycleError::NotClonable {
            model: model.id.0.clone(),
            status: model.status.label(),
        })
    }
}
