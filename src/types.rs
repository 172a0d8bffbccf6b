// src/types.rs

use std::str::FromStr;

use serde::Deserialize;

/// Canonical job identifier used for logging and checkpoint lookup.
pub type JobId = String;

/// How strictly the scheduler applies `pool_size` on admission.
///
/// - `Literal`: admit while `queue.len() <= pool_size`, so the active queue
///   can hold one job more than the pool size. The default.
/// - `Strict`: admit while `queue.len() < pool_size`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdmissionPolicy {
    #[default]
    Literal,
    Strict,
}

impl AdmissionPolicy {
    /// Maximum number of jobs the active queue may hold under this policy.
    pub fn capacity(self, pool_size: usize) -> usize {
        match self {
            AdmissionPolicy::Literal => pool_size.saturating_add(1),
            AdmissionPolicy::Strict => pool_size,
        }
    }
}

impl FromStr for AdmissionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "literal" => Ok(AdmissionPolicy::Literal),
            "strict" => Ok(AdmissionPolicy::Strict),
            other => Err(format!(
                "invalid admission policy: {other} (expected \"literal\" or \"strict\")"
            )),
        }
    }
}
