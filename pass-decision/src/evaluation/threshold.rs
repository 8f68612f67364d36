// Threshold calibration for "good opportunity" classification.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::EvalError;

/// Default completion probability an option must reach to count as good.
pub const DEFAULT_GOOD_COMPLETION: f64 = 0.80;

/// Completion probability an option must reach to count toward the threat
/// that was realistically available.
pub const REALISTIC_COMPLETION: f64 = 0.40;

/// Quantile of the targeted xThreat distribution used when no explicit
/// threat threshold is configured.
pub const GOOD_THREAT_QUANTILE: f64 = 0.75;

/// User-facing threshold settings. A missing `good_threat` means "calibrate
/// from the data".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    #[serde(default = "default_good_completion")]
    pub good_completion: f64,
    #[serde(default)]
    pub good_threat: Option<f64>,
}

fn default_good_completion() -> f64 {
    DEFAULT_GOOD_COMPLETION
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        ThresholdConfig {
            good_completion: DEFAULT_GOOD_COMPLETION,
            good_threat: None,
        }
    }
}

/// Resolved thresholds for one dataset. Computed once per load and passed by
/// value into the comparator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub good_completion: f64,
    pub good_threat: f64,
    pub realistic_completion: f64,
}

impl Thresholds {
    /// Thresholds with an explicit threat value, no calibration.
    pub fn fixed(good_completion: f64, good_threat: f64) -> Self {
        Thresholds {
            good_completion,
            good_threat,
            realistic_completion: REALISTIC_COMPLETION,
        }
    }

    /// Resolve thresholds for a population of targeted xThreat values.
    ///
    /// With an explicit `good_threat` the population is not inspected. Otherwise
    /// the 75th percentile of the population is used, and an empty population
    /// is an error rather than a silent zero.
    pub fn calibrate<I>(config: &ThresholdConfig, targeted_xthreats: I) -> Result<Self, EvalError>
    where
        I: IntoIterator<Item = f64>,
    {
        let good_threat = match config.good_threat {
            Some(explicit) => explicit,
            None => {
                let mut values: Vec<f64> = targeted_xthreats
                    .into_iter()
                    .filter(|v| v.is_finite())
                    .collect();
                values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                percentile_sorted(&values, GOOD_THREAT_QUANTILE).ok_or(EvalError::EmptyPopulation)?
            }
        };

        let thresholds = Thresholds::fixed(config.good_completion, good_threat);
        info!(
            "Using thresholds: xpass >= {} and xthreat >= {}",
            thresholds.good_completion, thresholds.good_threat
        );
        Ok(thresholds)
    }

    /// Both completion and threat clear the "good" bar (inclusive).
    pub fn is_good_opportunity(&self, xpass_completion: f64, xthreat: f64) -> bool {
        xpass_completion >= self.good_completion && xthreat >= self.good_threat
    }
}

/// Percentile of an ascending-sorted slice with linear interpolation between
/// neighbouring order statistics. `None` for an empty slice.
pub fn percentile_sorted(values: &[f64], pct: f64) -> Option<f64> {
    if values.is_empty() || !pct.is_finite() {
        return None;
    }
    let p = pct.clamp(0.0, 1.0);
    let pos = p * ((values.len() - 1) as f64);
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let lo_v = values.get(lo).copied()?;
    let hi_v = values.get(hi).copied()?;
    Some(lo_v + (hi_v - lo_v) * (pos - lo as f64))
}
