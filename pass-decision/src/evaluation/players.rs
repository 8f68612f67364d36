// Player aggregation: per-player rates, sums and per-90 figures built from
// enriched events joined with playing time.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use super::pipeline::EnrichedEvent;
use super::{mean, round3};
use crate::data::minutes::MinutesPlayed;
use crate::data::possessions::PositionCategory;

/// One row of the player table. Percentages are in 0..=100, every float is
/// rounded to three decimals, and `None` marks a ratio whose denominator was
/// zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerAggregate {
    pub player_id: u64,
    pub short_name: String,
    pub team_shortname: String,
    pub player_position: String,
    pub position_category: PositionCategory,
    /// Number of evaluated passing decisions.
    pub event_count: u32,

    pub safest_pass_perc: f64,
    pub safest_pass_sum: u32,
    pub highest_xthreat_pass_perc: f64,
    pub highest_xthreat_pass_sum: u32,
    pub has_good_pass_opportunities_perc: f64,
    pub has_good_pass_opportunities_sum: u32,
    /// Share of decisions with a good option available where the chosen
    /// option was itself good.
    pub good_pass_opportunity_perc: f64,
    pub good_pass_opportunity_sum: u32,
    pub missed_good_pass_opportunity_perc: f64,
    pub missed_good_pass_opportunity_sum: u32,

    pub completed_perc: f64,
    pub completed_sum: u32,
    /// Completion rate over decisions where the safest option was chosen.
    pub completed_safest_pass_perc: f64,
    pub completed_safest_pass_sum: u32,
    /// Completion rate over decisions where the most threatening option was
    /// chosen.
    pub completed_highest_xthreat_pass_perc: f64,
    pub completed_highest_xthreat_pass_sum: u32,
    /// Over decisions with a good option available: share where a good option
    /// was chosen and completed.
    pub completed_good_pass_opportunity_perc: f64,
    pub completed_good_pass_opportunity_sum: u32,

    pub player_targeted_xthreat_sum: f64,
    pub player_targeted_xthreat_mean: f64,
    pub xthreat_available_sum: f64,
    pub xthreat_available_mean: f64,
    pub missed_xthreat_sum: f64,
    pub missed_xthreat_mean: f64,
    pub decision_efficiency_mean: Option<f64>,

    pub minutes_played: f64,
    pub minutes_tip: f64,
    pub player_targeted_xthreat_p90: Option<f64>,
    pub xthreat_available_p90: Option<f64>,
    pub missed_xthreat_p90: Option<f64>,
    pub decision_efficiency_p90: Option<f64>,
}

// ---------------------------------------------------------------------------
// Rate helpers
// ---------------------------------------------------------------------------

/// Count of events matching `hit` within the subset matching `within`.
#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    hits: u32,
    total: u32,
}

impl Tally {
    fn over<F, G>(events: &[&EnrichedEvent], within: F, hit: G) -> Self
    where
        F: Fn(&EnrichedEvent) -> bool,
        G: Fn(&EnrichedEvent) -> bool,
    {
        events
            .iter()
            .copied()
            .filter(|e| within(*e))
            .fold(Tally::default(), |mut t, e| {
                t.total += 1;
                if hit(e) {
                    t.hits += 1;
                }
                t
            })
    }

    /// Percentage of hits, 0.0 for an empty subset.
    fn perc(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.hits as f64 / self.total as f64 * 100.0
        }
    }
}

/// Scale a season sum to a 90-minute basis.
pub fn per90(sum: f64, minutes_played: f64) -> Option<f64> {
    if minutes_played > 0.0 && minutes_played.is_finite() {
        Some(sum * 90.0 / minutes_played)
    } else {
        None
    }
}

/// Created threat as a percentage of available threat.
pub fn efficiency(created: Option<f64>, available: Option<f64>) -> Option<f64> {
    match (created, available) {
        (Some(c), Some(a)) if a > 0.0 => Some(c / a * 100.0),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

fn aggregate_player(player_id: u64, events: &[&EnrichedEvent], minutes: &MinutesPlayed) -> PlayerAggregate {
    let all = |_: &EnrichedEvent| true;
    let has_good = |e: &EnrichedEvent| e.metrics.has_good_pass_opportunities;
    let completed = |e: &EnrichedEvent| e.event.is_completed();

    let safest = Tally::over(events, all, |e| e.metrics.safest_pass);
    let highest = Tally::over(events, all, |e| e.metrics.highest_xthreat_pass);
    let good_available = Tally::over(events, all, has_good);
    let good = Tally::over(events, has_good, |e| e.metrics.good_pass_opportunity);
    let missed_good = Tally::over(events, has_good, |e| e.metrics.missed_good_pass_opportunity);
    let completed_all = Tally::over(events, all, completed);
    let completed_safest = Tally::over(events, |e| e.metrics.safest_pass, completed);
    let completed_highest = Tally::over(events, |e| e.metrics.highest_xthreat_pass, completed);
    let completed_good = Tally::over(events, has_good, |e| {
        e.metrics.good_pass_opportunity && e.event.is_completed()
    });

    let n = events.len() as f64;
    let created_sum: f64 = events.iter().map(|e| e.targeted_xthreat()).sum();
    let available_sum: f64 = events.iter().map(|e| e.metrics.xthreat_available).sum();
    let missed_sum: f64 = events.iter().map(|e| e.metrics.missed_xthreat).sum();

    let created_p90 = per90(created_sum, minutes.minutes_played);
    let available_p90 = per90(available_sum, minutes.minutes_played);

    // Identity fields come from the player's first event.
    let first = events.first().map(|e| &e.event);

    PlayerAggregate {
        player_id,
        short_name: minutes.short_name.clone(),
        team_shortname: first.map(|e| e.team_shortname.clone()).unwrap_or_default(),
        player_position: first.map(|e| e.player_position.clone()).unwrap_or_default(),
        position_category: first.map(|e| e.position_category).unwrap_or_default(),
        event_count: events.len() as u32,

        safest_pass_perc: round3(safest.perc()),
        safest_pass_sum: safest.hits,
        highest_xthreat_pass_perc: round3(highest.perc()),
        highest_xthreat_pass_sum: highest.hits,
        has_good_pass_opportunities_perc: round3(good_available.perc()),
        has_good_pass_opportunities_sum: good_available.hits,
        good_pass_opportunity_perc: round3(good.perc()),
        good_pass_opportunity_sum: good.hits,
        missed_good_pass_opportunity_perc: round3(missed_good.perc()),
        missed_good_pass_opportunity_sum: missed_good.hits,

        completed_perc: round3(completed_all.perc()),
        completed_sum: completed_all.hits,
        completed_safest_pass_perc: round3(completed_safest.perc()),
        completed_safest_pass_sum: completed_safest.hits,
        completed_highest_xthreat_pass_perc: round3(completed_highest.perc()),
        completed_highest_xthreat_pass_sum: completed_highest.hits,
        completed_good_pass_opportunity_perc: round3(completed_good.perc()),
        completed_good_pass_opportunity_sum: completed_good.hits,

        player_targeted_xthreat_sum: round3(created_sum),
        player_targeted_xthreat_mean: round3(created_sum / n),
        xthreat_available_sum: round3(available_sum),
        xthreat_available_mean: round3(available_sum / n),
        missed_xthreat_sum: round3(missed_sum),
        missed_xthreat_mean: round3(missed_sum / n),
        decision_efficiency_mean: mean(events.iter().filter_map(|e| e.metrics.decision_efficiency))
            .map(round3),

        minutes_played: round3(minutes.minutes_played),
        minutes_tip: round3(minutes.minutes_tip),
        player_targeted_xthreat_p90: created_p90.map(round3),
        xthreat_available_p90: available_p90.map(round3),
        missed_xthreat_p90: per90(missed_sum, minutes.minutes_played).map(round3),
        decision_efficiency_p90: efficiency(created_p90, available_p90).map(round3),
    }
}

/// Index the minutes table by player id, merging duplicate ids.
fn minutes_by_player(minutes: &[MinutesPlayed]) -> HashMap<u64, MinutesPlayed> {
    let mut by_id: HashMap<u64, MinutesPlayed> = HashMap::with_capacity(minutes.len());
    for m in minutes {
        by_id
            .entry(m.player_id)
            .and_modify(|existing| {
                warn!(
                    "player {} listed as both '{}' and '{}', summing minutes",
                    m.player_id, existing.short_name, m.short_name
                );
                existing.minutes_played += m.minutes_played;
                existing.minutes_tip += m.minutes_tip;
            })
            .or_insert_with(|| m.clone());
    }
    by_id
}

/// Group enriched events by player and join playing time.
///
/// Players without a minutes entry are dropped. Rows are ordered by player id
/// and events keep their input order within a player, so identical inputs
/// always give identical tables.
pub fn group_by_players<'a, I>(events: I, minutes: &[MinutesPlayed]) -> Vec<PlayerAggregate>
where
    I: IntoIterator<Item = &'a EnrichedEvent>,
{
    let mut groups: BTreeMap<u64, Vec<&EnrichedEvent>> = BTreeMap::new();
    for e in events {
        groups.entry(e.event.player_id).or_default().push(e);
    }

    let minutes = minutes_by_player(minutes);
    let mut dropped = 0usize;
    let players: Vec<PlayerAggregate> = groups
        .into_iter()
        .filter_map(|(player_id, player_events)| match minutes.get(&player_id) {
            Some(m) => Some(aggregate_player(player_id, &player_events, m)),
            None => {
                dropped += 1;
                None
            }
        })
        .collect();

    if dropped > 0 {
        debug!("{} players without playing time were left out", dropped);
    }
    players
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::possessions::PossessionEvent;
    use crate::evaluation::comparator::DecisionMetrics;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[derive(Clone, Copy)]
    struct Flags {
        safest: bool,
        highest: bool,
        has_good: bool,
        good: bool,
        completed: bool,
    }

    const PLAIN: Flags = Flags {
        safest: false,
        highest: false,
        has_good: false,
        good: false,
        completed: false,
    };

    fn ev(player_id: u64, flags: Flags, xthreat: f64, available: f64, efficiency: Option<f64>) -> EnrichedEvent {
        EnrichedEvent {
            event: PossessionEvent {
                player_id,
                team_shortname: "ADL".into(),
                player_position: "DM".into(),
                position_category: PositionCategory::Midfielder,
                pass_outcome: Some(if flags.completed { "successful" } else { "unsuccessful" }.into()),
                player_targeted_xthreat: Some(xthreat),
                ..Default::default()
            },
            metrics: DecisionMetrics {
                safest_pass: flags.safest,
                highest_xthreat_pass: flags.highest,
                has_good_pass_opportunities: flags.has_good,
                good_pass_opportunity: flags.good,
                missed_good_pass_opportunity: flags.has_good && !flags.good,
                xthreat_available: available,
                missed_xthreat: (available - xthreat).max(0.0),
                decision_efficiency: efficiency,
                player_targeted_x_xthreat: 0.0,
                x_xthreat_best: 0.0,
                x_xthreat_avg: 0.0,
                better_x_xthreats_count: 0,
                options_count: 3,
            },
        }
    }

    fn minutes(player_id: u64, played: f64) -> MinutesPlayed {
        MinutesPlayed {
            player_id,
            short_name: format!("P{player_id}"),
            minutes_played: played,
            minutes_tip: played / 2.0,
        }
    }

    fn sample_events() -> Vec<EnrichedEvent> {
        vec![
            ev(
                1,
                Flags { safest: true, completed: true, ..PLAIN },
                0.1,
                0.2,
                Some(50.0),
            ),
            ev(
                1,
                Flags { has_good: true, good: true, completed: true, ..PLAIN },
                0.3,
                0.3,
                Some(100.0),
            ),
            ev(
                1,
                Flags { has_good: true, highest: true, ..PLAIN },
                0.2,
                0.4,
                Some(50.0),
            ),
            ev(1, PLAIN, 0.0, 0.0, None),
        ]
    }

    #[test]
    fn plain_and_conditional_rates() {
        let events = sample_events();
        let table = group_by_players(&events, &[minutes(1, 180.0)]);
        assert_eq!(table.len(), 1);
        let p = &table[0];

        assert_eq!(p.event_count, 4);
        assert_eq!(p.short_name, "P1");
        assert_eq!(p.team_shortname, "ADL");
        assert_eq!(p.position_category, PositionCategory::Midfielder);

        assert!(approx_eq(p.safest_pass_perc, 25.0, 1e-9));
        assert_eq!(p.safest_pass_sum, 1);
        assert!(approx_eq(p.highest_xthreat_pass_perc, 25.0, 1e-9));
        assert!(approx_eq(p.has_good_pass_opportunities_perc, 50.0, 1e-9));
        assert_eq!(p.has_good_pass_opportunities_sum, 2);

        // Conditional on the two events with a good option available.
        assert!(approx_eq(p.good_pass_opportunity_perc, 50.0, 1e-9));
        assert_eq!(p.good_pass_opportunity_sum, 1);
        assert!(approx_eq(p.missed_good_pass_opportunity_perc, 50.0, 1e-9));
        assert_eq!(p.missed_good_pass_opportunity_sum, 1);

        assert!(approx_eq(p.completed_perc, 50.0, 1e-9));
        assert_eq!(p.completed_sum, 2);
        assert!(approx_eq(p.completed_safest_pass_perc, 100.0, 1e-9));
        assert_eq!(p.completed_safest_pass_sum, 1);
        // The only highest-xThreat pass was not completed.
        assert!(approx_eq(p.completed_highest_xthreat_pass_perc, 0.0, 1e-9));
        assert_eq!(p.completed_highest_xthreat_pass_sum, 0);
        assert!(approx_eq(p.completed_good_pass_opportunity_perc, 50.0, 1e-9));
        assert_eq!(p.completed_good_pass_opportunity_sum, 1);
    }

    #[test]
    fn empty_conditional_subset_rate_is_zero() {
        let events = vec![ev(1, PLAIN, 0.1, 0.1, Some(100.0))];
        let p = &group_by_players(&events, &[minutes(1, 90.0)])[0];
        assert_eq!(p.good_pass_opportunity_perc, 0.0);
        assert_eq!(p.completed_safest_pass_perc, 0.0);
        assert_eq!(p.completed_good_pass_opportunity_perc, 0.0);
    }

    #[test]
    fn sums_means_and_efficiency() {
        let events = sample_events();
        let p = &group_by_players(&events, &[minutes(1, 180.0)])[0];

        assert!(approx_eq(p.player_targeted_xthreat_sum, 0.6, 1e-9));
        assert!(approx_eq(p.player_targeted_xthreat_mean, 0.15, 1e-9));
        assert!(approx_eq(p.xthreat_available_sum, 0.9, 1e-9));
        assert!(approx_eq(p.xthreat_available_mean, 0.225, 1e-9));
        assert!(approx_eq(p.missed_xthreat_sum, 0.3, 1e-9));
        // Not-applicable efficiency is skipped: (50 + 100 + 50) / 3.
        assert!(approx_eq(p.decision_efficiency_mean.unwrap(), 66.667, 1e-9));
    }

    #[test]
    fn per_90_figures() {
        let events = sample_events();
        let p = &group_by_players(&events, &[minutes(1, 180.0)])[0];

        assert!(approx_eq(p.player_targeted_xthreat_p90.unwrap(), 0.3, 1e-9));
        assert!(approx_eq(p.xthreat_available_p90.unwrap(), 0.45, 1e-9));
        assert!(approx_eq(p.missed_xthreat_p90.unwrap(), 0.15, 1e-9));
        assert!(approx_eq(p.decision_efficiency_p90.unwrap(), 66.667, 1e-9));
        assert!(approx_eq(p.minutes_tip, 90.0, 1e-9));
    }

    #[test]
    fn doubling_minutes_halves_p90() {
        let events = vec![ev(1, PLAIN, 0.4, 0.8, Some(50.0))];
        let base = &group_by_players(&events, &[minutes(1, 90.0)])[0];
        let doubled = &group_by_players(&events, &[minutes(1, 180.0)])[0];

        assert!(approx_eq(doubled.player_targeted_xthreat_p90.unwrap() * 2.0, base.player_targeted_xthreat_p90.unwrap(), 1e-9));
        assert!(approx_eq(doubled.xthreat_available_p90.unwrap() * 2.0, base.xthreat_available_p90.unwrap(), 1e-9));
        assert!(approx_eq(doubled.missed_xthreat_p90.unwrap() * 2.0, base.missed_xthreat_p90.unwrap(), 1e-9));
        // A ratio of two p90 figures does not depend on minutes.
        assert!(approx_eq(
            doubled.decision_efficiency_p90.unwrap(),
            base.decision_efficiency_p90.unwrap(),
            1e-9
        ));
    }

    #[test]
    fn zero_minutes_has_no_p90() {
        let events = vec![ev(1, PLAIN, 0.4, 0.8, Some(50.0))];
        let p = &group_by_players(&events, &[minutes(1, 0.0)])[0];
        assert_eq!(p.player_targeted_xthreat_p90, None);
        assert_eq!(p.xthreat_available_p90, None);
        assert_eq!(p.missed_xthreat_p90, None);
        assert_eq!(p.decision_efficiency_p90, None);
        // Non-normalized figures are still available.
        assert!(approx_eq(p.player_targeted_xthreat_sum, 0.4, 1e-9));
    }

    #[test]
    fn zero_available_threat_has_no_p90_efficiency() {
        let events = vec![ev(1, PLAIN, 0.0, 0.0, None)];
        let p = &group_by_players(&events, &[minutes(1, 90.0)])[0];
        assert_eq!(p.xthreat_available_p90, Some(0.0));
        assert_eq!(p.decision_efficiency_p90, None);
        assert_eq!(p.decision_efficiency_mean, None);
    }

    #[test]
    fn players_without_minutes_are_dropped() {
        let mut events = sample_events();
        events.push(ev(2, PLAIN, 0.1, 0.1, Some(100.0)));
        events.push(ev(3, PLAIN, 0.1, 0.1, Some(100.0)));

        let table = group_by_players(&events, &[minutes(3, 90.0), minutes(1, 90.0), minutes(99, 90.0)]);
        let ids: Vec<u64> = table.iter().map(|p| p.player_id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn duplicate_minutes_rows_are_merged() {
        let events = vec![ev(1, PLAIN, 0.1, 0.1, Some(100.0))];
        let table = group_by_players(&events, &[minutes(1, 45.0), minutes(1, 45.0)]);
        assert_eq!(table.len(), 1);
        assert!(approx_eq(table[0].minutes_played, 90.0, 1e-9));
    }

    #[test]
    fn aggregates_are_rounded_to_three_decimals() {
        let events = vec![
            ev(1, Flags { safest: true, ..PLAIN }, 0.1, 0.3, Some(33.3333)),
            ev(1, PLAIN, 0.1, 0.3, Some(33.3333)),
            ev(1, PLAIN, 0.1, 0.3, Some(33.3333)),
        ];
        let p = &group_by_players(&events, &[minutes(1, 70.0)])[0];
        assert_eq!(p.safest_pass_perc, 33.333);
        assert_eq!(p.decision_efficiency_mean, Some(33.333));
        // 0.3 * 90 / 70 = 0.385714...
        assert_eq!(p.player_targeted_xthreat_p90, Some(0.386));
    }
}
