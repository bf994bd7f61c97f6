use super::domain::RiskModelTier;

/// Tier band configuration errors caught before a model can go live.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TierConfigError {
    #[error("a model requires at least one tier binding")]
    Empty,
    #[error("duplicate tier threshold {0}")]
    DuplicateThreshold(i64),
}

/// Reject duplicate thresholds without reordering or rewriting the bands.
///
/// Used on every tier edit; the full normalization below runs only when a
/// run or a publish needs a total band list.
pub fn ensure_distinct(bands: &[RiskModelTier]) -> Result<(), TierConfigError> {
    let mut seen = Vec::with_capacity(bands.len());
    for band in bands {
        if seen.contains(&band.threshold) {
            return Err(TierConfigError::DuplicateThreshold(band.threshold));
        }
        seen.push(band.threshold);
    }
    Ok(())
}

/// Order bands highest threshold first and force the lowest to exactly 0 so
/// that every non-negative score resolves to a band.
pub fn normalize(mut bands: Vec<RiskModelTier>) -> Result<Vec<RiskModelTier>, TierConfigError> {
    if bands.is_empty() {
        return Err(TierConfigError::Empty);
    }
    ensure_distinct(&bands)?;

    bands.sort_by(|a, b| b.threshold.cmp(&a.threshold));
    if let Some(lowest) = bands.last_mut() {
        lowest.threshold = 0;
    }

    Ok(bands)
}

/// Greatest-lower-bound match: the first band (walking highest threshold
/// first) whose threshold is less than or equal to the score wins.
pub fn resolve(bands: &[RiskModelTier], score: i64) -> Option<&RiskModelTier> {
    bands.iter().find(|band| band.threshold <= score)
}
