use std::fmt;
use std::str::FromStr;

/// What an injection loop does when the push endpoint rejects a batch.
///
/// Transport failures always abort regardless of policy; this only governs
/// pushes that reached the endpoint and got something other than 200/202.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    AbortOnFirstFailure,
    AbortOnThreshold(u32),
    #[default]
    NeverAbort,
}

impl FailurePolicy {
    pub fn should_abort(&self, rejected_so_far: u32) -> bool {
        match self {
            FailurePolicy::AbortOnFirstFailure => rejected_so_far >= 1,
            FailurePolicy::AbortOnThreshold(limit) => rejected_so_far >= *limit,
            FailurePolicy::NeverAbort => false,
        }
    }

    /// Builds a policy from its CLI/env name; `threshold` only matters for
    /// `threshold`.
    pub fn from_name(name: &str, threshold: u32) -> Result<Self, String> {
        match name.trim().to_lowercase().as_str() {
            "continue" | "never" | "never-abort" => Ok(FailurePolicy::NeverAbort),
            "abort" | "abort-on-first-failure" => Ok(FailurePolicy::AbortOnFirstFailure),
            "threshold" | "abort-on-threshold" => {
                if threshold == 0 {
                    Err("failure threshold must be at least 1".to_string())
                } else {
                    Ok(FailurePolicy::AbortOnThreshold(threshold))
                }
            }
            other => Err(format!(
                "unknown push failure policy '{other}', expected continue, abort or threshold"
            )),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s, 1)
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::AbortOnFirstFailure => write!(f, "abort"),
            FailurePolicy::AbortOnThreshold(limit) => write!(f, "threshold({limit})"),
            FailurePolicy::NeverAbort => write!(f, "continue"),
        }
    }
}
