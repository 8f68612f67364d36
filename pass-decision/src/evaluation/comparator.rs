// Option comparison: judge one passing decision against the alternatives the
// player actually had.
//
// Everything here is a pure function of the targeted option, the option list
// and the thresholds, so events can be evaluated in any order or in parallel.

use serde::{Deserialize, Serialize};

use super::threshold::Thresholds;
use crate::data::possessions::PassingOption;

/// The option the player actually chose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetedOption {
    pub xthreat: f64,
    pub xpass_completion: f64,
}

impl TargetedOption {
    pub fn expected_threat(&self) -> f64 {
        self.xthreat * self.xpass_completion
    }
}

/// Per-event decision quality derived from the option comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionMetrics {
    /// No option had a strictly higher completion probability.
    pub safest_pass: bool,
    /// No option had a strictly higher xThreat.
    pub highest_xthreat_pass: bool,
    /// At least one option cleared both good-opportunity thresholds.
    pub has_good_pass_opportunities: bool,
    /// The targeted option itself cleared both thresholds.
    pub good_pass_opportunity: bool,
    /// A good option existed but the targeted one was not good.
    pub missed_good_pass_opportunity: bool,

    /// Best realistic xThreat, raised to the targeted xThreat when the
    /// player created more than the realistic ceiling.
    pub xthreat_available: f64,
    pub missed_xthreat: f64,
    /// Targeted xThreat as a percentage of `xthreat_available`; `None` when
    /// nothing was available.
    pub decision_efficiency: Option<f64>,

    pub player_targeted_x_xthreat: f64,
    pub x_xthreat_best: f64,
    pub x_xthreat_avg: f64,
    pub better_x_xthreats_count: u32,
    pub options_count: u32,
}

/// Highest xThreat among options with a realistic chance of completion, or
/// 0.0 when none qualifies.
pub fn realistic_xthreat(options: &[PassingOption], realistic_completion: f64) -> f64 {
    options
        .iter()
        .filter(|o| o.xpass_completion >= realistic_completion)
        .map(|o| o.xthreat)
        .fold(None, |best: Option<f64>, x| Some(best.map_or(x, |b| b.max(x))))
        .unwrap_or(0.0)
}

/// Compare the targeted option against every available option.
///
/// Returns `None` for an empty option list; such an event cannot be judged and
/// the caller decides how to report it.
pub fn evaluate_options(
    targeted: TargetedOption,
    options: &[PassingOption],
    thresholds: &Thresholds,
) -> Option<DecisionMetrics> {
    if options.is_empty() {
        return None;
    }

    let higher_completion = options
        .iter()
        .any(|o| o.xpass_completion > targeted.xpass_completion);
    let higher_xthreat = options.iter().any(|o| o.xthreat > targeted.xthreat);
    let has_good = options
        .iter()
        .any(|o| thresholds.is_good_opportunity(o.xpass_completion, o.xthreat));
    let targeted_good =
        thresholds.is_good_opportunity(targeted.xpass_completion, targeted.xthreat);

    let realistic = realistic_xthreat(options, thresholds.realistic_completion);
    let (xthreat_available, missed_xthreat) = if targeted.xthreat < realistic {
        (realistic, realistic - targeted.xthreat)
    } else {
        (targeted.xthreat, 0.0)
    };
    let decision_efficiency = if xthreat_available > 0.0 {
        Some(targeted.xthreat / xthreat_available * 100.0)
    } else {
        None
    };

    let targeted_x_xthreat = targeted.expected_threat();
    let x_xthreats: Vec<f64> = options.iter().map(PassingOption::expected_threat).collect();
    let x_xthreat_best = x_xthreats.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let x_xthreat_avg = x_xthreats.iter().sum::<f64>() / x_xthreats.len() as f64;
    let better_x_xthreats_count =
        x_xthreats.iter().filter(|&&x| x > targeted_x_xthreat).count() as u32;

    Some(DecisionMetrics {
        safest_pass: !higher_completion,
        highest_xthreat_pass: !higher_xthreat,
        has_good_pass_opportunities: has_good,
        good_pass_opportunity: targeted_good,
        missed_good_pass_opportunity: has_good && !targeted_good,
        xthreat_available,
        missed_xthreat,
        decision_efficiency,
        player_targeted_x_xthreat: targeted_x_xthreat,
        x_xthreat_best,
        x_xthreat_avg,
        better_x_xthreats_count,
        options_count: options.len() as u32,
    })
}
