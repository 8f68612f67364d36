// Event metrics pipeline: run the option comparator over every eligible
// possession and keep the results for repeated aggregation.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use super::comparator::{evaluate_options, DecisionMetrics, TargetedOption};
use super::filters::third_filter;
use super::players::group_by_players;
use super::threshold::{ThresholdConfig, Thresholds};
use super::{EvalError, PlayerAggregate};
use crate::data::minutes::MinutesPlayed;
use crate::data::possessions::{PossessionEvent, ThirdFilter};

/// A possession event together with its decision metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedEvent {
    pub event: PossessionEvent,
    pub metrics: DecisionMetrics,
}

impl EnrichedEvent {
    /// xThreat of the option the player chose.
    pub fn targeted_xthreat(&self) -> f64 {
        self.event.player_targeted_xthreat.unwrap_or(0.0)
    }
}

/// Evaluate a single eligible event.
fn enrich(event: &PossessionEvent, thresholds: &Thresholds) -> Result<EnrichedEvent, EvalError> {
    // Eligibility guarantees a targeted xThreat.
    let xthreat = event.player_targeted_xthreat.unwrap_or(0.0);
    let xpass_completion = event.player_targeted_xpass_completion.ok_or_else(|| {
        EvalError::MissingTargetedCompletion {
            event_id: event.event_id.clone(),
        }
    })?;

    if !xthreat.is_finite() || xthreat < 0.0 || !(0.0..=1.0).contains(&xpass_completion) {
        return Err(EvalError::InvalidTargetedOption {
            event_id: event.event_id.clone(),
            xthreat,
            xpass_completion,
        });
    }

    let targeted = TargetedOption {
        xthreat,
        xpass_completion,
    };
    let metrics = evaluate_options(targeted, &event.passing_options, thresholds).ok_or_else(|| {
        EvalError::NoPassingOptions {
            event_id: event.event_id.clone(),
        }
    })?;

    Ok(EnrichedEvent {
        event: event.clone(),
        metrics,
    })
}

/// Compute decision metrics for every eligible event.
///
/// Ineligible events (one option or fewer recorded, or no targeted xThreat)
/// are dropped. An eligible event that cannot be evaluated fails the whole
/// batch. Output order follows input order.
pub fn compute_metrics(
    events: &[PossessionEvent],
    thresholds: &Thresholds,
) -> Result<Vec<EnrichedEvent>, EvalError> {
    let enriched: Vec<EnrichedEvent> = events
        .par_iter()
        .filter(|e| e.is_eligible())
        .map(|e| enrich(e, thresholds))
        .collect::<Result<_, _>>()?;

    debug!(
        "Evaluated {} of {} events against thresholds {:?}",
        enriched.len(),
        events.len(),
        thresholds
    );
    Ok(enriched)
}

/// One dataset load: thresholds calibrated over the full eligible population
/// plus the enriched events. Player tables for any pitch third are derived
/// from this without recalibrating.
#[derive(Debug, Clone)]
pub struct Evaluation {
    thresholds: Thresholds,
    events: Vec<EnrichedEvent>,
}

impl Evaluation {
    pub fn run(events: &[PossessionEvent], config: &ThresholdConfig) -> Result<Self, EvalError> {
        let thresholds = Thresholds::calibrate(
            config,
            events
                .iter()
                .filter(|e| e.is_eligible())
                .filter_map(|e| e.player_targeted_xthreat),
        )?;
        let enriched = compute_metrics(events, &thresholds)?;

        info!(
            "Evaluated {} eligible possessions out of {}",
            enriched.len(),
            events.len()
        );

        Ok(Evaluation {
            thresholds,
            events: enriched,
        })
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn events(&self) -> &[EnrichedEvent] {
        &self.events
    }

    /// Player aggregates restricted to possessions touching `third`.
    pub fn player_table(&self, third: ThirdFilter, minutes: &[MinutesPlayed]) -> Vec<PlayerAggregate> {
        group_by_players(third_filter(&self.events, third), minutes)
    }
}
