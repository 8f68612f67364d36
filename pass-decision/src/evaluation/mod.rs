// Passing decision evaluation engine: threshold calibration, per-event option
// comparison, player and league aggregation, filters.

pub mod comparator;
pub mod filters;
pub mod league;
pub mod pipeline;
pub mod players;
pub mod threshold;

pub use comparator::{evaluate_options, DecisionMetrics, TargetedOption};
pub use filters::{page_filter, third_filter, time_bin_summary, time_bins, PageFilter, TimeBin};
pub use league::{get_metrics, rank_by_decision_efficiency, LeagueSummary};
pub use pipeline::{compute_metrics, EnrichedEvent, Evaluation};
pub use players::{group_by_players, PlayerAggregate};
pub use threshold::{ThresholdConfig, Thresholds};

/// Failures the engine surfaces to its caller. Degenerate denominators are not
/// errors; they resolve to `None` values on the affected metric.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("cannot calibrate the xThreat threshold: no eligible events")]
    EmptyPopulation,

    #[error("eligible event {event_id} has no passing options attached")]
    NoPassingOptions { event_id: String },

    #[error("eligible event {event_id} has no targeted completion probability")]
    MissingTargetedCompletion { event_id: String },

    #[error("eligible event {event_id} has an out-of-range targeted option (xthreat {xthreat}, xpass_completion {xpass_completion})")]
    InvalidTargetedOption {
        event_id: String,
        xthreat: f64,
        xpass_completion: f64,
    },
}

/// Round to three decimals, the precision of every published aggregate.
pub(crate) fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Arithmetic mean, `None` for an empty input.
pub(crate) fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}
