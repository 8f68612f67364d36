// Filter layer: pitch-third selection on events, page filters on player
// aggregates, and match-time binning.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::mean;
use super::pipeline::EnrichedEvent;
use super::players::PlayerAggregate;
use crate::data::possessions::{PositionCategory, ThirdFilter};

/// Sentinel that disables the team filter.
pub const ALL_TEAMS: &str = "All Teams";
/// Sentinel that disables the category and position filters.
pub const ALL: &str = "All";

// ---------------------------------------------------------------------------
// Pitch third
// ---------------------------------------------------------------------------

/// Keep events that start or end in the requested third. `All` passes every
/// event through.
pub fn third_filter(events: &[EnrichedEvent], third: ThirdFilter) -> Vec<&EnrichedEvent> {
    match third {
        ThirdFilter::All => events.iter().collect(),
        ThirdFilter::Only(t) => events.iter().filter(|e| e.event.touches_third(t)).collect(),
    }
}

// ---------------------------------------------------------------------------
// Player table page filter
// ---------------------------------------------------------------------------

/// Selection applied to the player table. Empty lists, or lists containing
/// the sentinel, match everything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageFilter {
    #[serde(default)]
    pub teams: Vec<String>,
    #[serde(default)]
    pub position_categories: Vec<String>,
    #[serde(default)]
    pub positions: Vec<String>,
    #[serde(default)]
    pub min_events: u32,
}

impl Default for PageFilter {
    fn default() -> Self {
        PageFilter {
            teams: vec![ALL_TEAMS.to_string()],
            position_categories: vec![ALL.to_string()],
            positions: vec![ALL.to_string()],
            min_events: 0,
        }
    }
}

fn selection_matches(selected: &[String], sentinel: &str, value: &str) -> bool {
    selected.is_empty() || selected.iter().any(|s| s == sentinel) || selected.iter().any(|s| s == value)
}

impl PageFilter {
    pub fn matches(&self, player: &PlayerAggregate) -> bool {
        selection_matches(&self.teams, ALL_TEAMS, &player.team_shortname)
            && selection_matches(
                &self.position_categories,
                ALL,
                player.position_category.label(),
            )
            && selection_matches(&self.positions, ALL, &player.player_position)
            && player.event_count >= self.min_events
    }
}

/// Keep players matching every part of the page filter.
pub fn page_filter<'a>(players: &'a [PlayerAggregate], filter: &PageFilter) -> Vec<&'a PlayerAggregate> {
    players.iter().filter(|p| filter.matches(p)).collect()
}

/// Sorted distinct values available to the page filter for an event set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterChoices {
    pub teams: Vec<String>,
    pub position_categories: Vec<PositionCategory>,
    pub positions: Vec<String>,
}

impl FilterChoices {
    pub fn from_events<'a, I>(events: I) -> Self
    where
        I: IntoIterator<Item = &'a EnrichedEvent>,
    {
        let mut teams = BTreeSet::new();
        let mut categories = BTreeSet::new();
        let mut positions = BTreeSet::new();
        for e in events {
            teams.insert(e.event.team_shortname.clone());
            categories.insert(e.event.position_category);
            positions.insert(e.event.player_position.clone());
        }
        FilterChoices {
            teams: teams.into_iter().collect(),
            position_categories: categories.into_iter().collect(),
            positions: positions.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Time bins
// ---------------------------------------------------------------------------

/// Fifteen-minute match windows; the last one absorbs stoppage and extra time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimeBin {
    Min0To15,
    Min15To30,
    Min30To45,
    Min45To60,
    Min60To75,
    Min75Plus,
}

impl TimeBin {
    pub const ALL: [TimeBin; 6] = [
        TimeBin::Min0To15,
        TimeBin::Min15To30,
        TimeBin::Min30To45,
        TimeBin::Min45To60,
        TimeBin::Min60To75,
        TimeBin::Min75Plus,
    ];

    /// Bin for a start minute: `[0,15)`, `[15,30)`, ... `[60,75)`, `[75,120]`.
    /// Minutes outside `[0,120]` have no bin.
    pub fn from_minute(minute: f64) -> Option<Self> {
        if !(0.0..=120.0).contains(&minute) {
            return None;
        }
        let bin = match minute {
            m if m < 15.0 => TimeBin::Min0To15,
            m if m < 30.0 => TimeBin::Min15To30,
            m if m < 45.0 => TimeBin::Min30To45,
            m if m < 60.0 => TimeBin::Min45To60,
            m if m < 75.0 => TimeBin::Min60To75,
            _ => TimeBin::Min75Plus,
        };
        Some(bin)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeBin::Min0To15 => "0-15",
            TimeBin::Min15To30 => "15-30",
            TimeBin::Min30To45 => "30-45",
            TimeBin::Min45To60 => "45-60",
            TimeBin::Min60To75 => "60-75",
            TimeBin::Min75Plus => "75-90+",
        }
    }
}

/// An event labelled with its match-time window.
#[derive(Debug, Clone, Copy)]
pub struct BinnedEvent<'a> {
    pub bin: Option<TimeBin>,
    pub event: &'a EnrichedEvent,
}

/// Label every event with the bin of its start minute.
pub fn time_bins<'a, I>(events: I) -> Vec<BinnedEvent<'a>>
where
    I: IntoIterator<Item = &'a EnrichedEvent>,
{
    events
        .into_iter()
        .map(|event| BinnedEvent {
            bin: event.event.minute_start.and_then(TimeBin::from_minute),
            event,
        })
        .collect()
}

/// Decision profile for one match-time window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeBinStats {
    pub bin: TimeBin,
    pub event_count: u32,
    pub decision_efficiency_mean: Option<f64>,
    pub safest_pass_perc: f64,
    pub highest_xthreat_pass_perc: f64,
    pub good_pass_opportunity_perc: f64,
}

/// Per-bin averages over binned events, for one player or for everyone.
/// Bins without events are omitted.
pub fn time_bin_summary(binned: &[BinnedEvent<'_>], player_id: Option<u64>) -> Vec<TimeBinStats> {
    let mut groups: BTreeMap<TimeBin, Vec<&EnrichedEvent>> = BTreeMap::new();
    for b in binned {
        let Some(bin) = b.bin else { continue };
        if player_id.is_some_and(|id| id != b.event.event.player_id) {
            continue;
        }
        groups.entry(bin).or_default().push(b.event);
    }

    groups
        .into_iter()
        .map(|(bin, events)| {
            let n = events.len() as f64;
            let rate = |flag: fn(&EnrichedEvent) -> bool| {
                events.iter().filter(|e| flag(**e)).count() as f64 / n * 100.0
            };
            TimeBinStats {
                bin,
                event_count: events.len() as u32,
                decision_efficiency_mean: mean(
                    events.iter().filter_map(|e| e.metrics.decision_efficiency),
                ),
                safest_pass_perc: rate(|e| e.metrics.safest_pass),
                highest_xthreat_pass_perc: rate(|e| e.metrics.highest_xthreat_pass),
                good_pass_opportunity_perc: rate(|e| e.metrics.good_pass_opportunity),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::possessions::{PossessionEvent, Third};
    use crate::evaluation::comparator::DecisionMetrics;

    fn metrics(safest: bool, efficiency: Option<f64>) -> DecisionMetrics {
        DecisionMetrics {
            safest_pass: safest,
            highest_xthreat_pass: !safest,
            has_good_pass_opportunities: false,
            good_pass_opportunity: false,
            missed_good_pass_opportunity: false,
            xthreat_available: 0.1,
            missed_xthreat: 0.0,
            decision_efficiency: efficiency,
            player_targeted_x_xthreat: 0.0,
            x_xthreat_best: 0.0,
            x_xthreat_avg: 0.0,
            better_x_xthreats_count: 0,
            options_count: 2,
        }
    }

    fn enriched(player_id: u64, minute: f64, start: Option<Third>, end: Option<Third>) -> EnrichedEvent {
        EnrichedEvent {
            event: PossessionEvent {
                player_id,
                minute_start: Some(minute),
                third_start: start,
                third_end: end,
                ..Default::default()
            },
            metrics: metrics(true, Some(50.0)),
        }
    }

    fn player(team: &str, position: &str, events: u32) -> PlayerAggregate {
        PlayerAggregate {
            team_shortname: team.into(),
            player_position: position.into(),
            position_category: PositionCategory::from_position(position),
            event_count: events,
            ..Default::default()
        }
    }

    #[test]
    fn third_filter_matches_start_or_end() {
        let events = vec![
            enriched(1, 1.0, Some(Third::Defensive), Some(Third::Middle)),
            enriched(1, 1.0, Some(Third::Middle), Some(Third::Attacking)),
            enriched(1, 1.0, Some(Third::Attacking), Some(Third::Attacking)),
        ];
        assert_eq!(third_filter(&events, ThirdFilter::All).len(), 3);
        assert_eq!(third_filter(&events, ThirdFilter::Only(Third::Middle)).len(), 2);
        assert_eq!(third_filter(&events, ThirdFilter::Only(Third::Attacking)).len(), 2);
        assert_eq!(third_filter(&events, ThirdFilter::Only(Third::Defensive)).len(), 1);
    }

    #[test]
    fn page_filter_sentinels_only_apply_min_events() {
        let players = vec![
            player("ADL", "CB", 30),
            player("MVC", "CF", 5),
            player("SYD", "DM", 20),
        ];
        let kept = page_filter(&players, &PageFilter { min_events: 20, ..Default::default() });
        assert_eq!(kept.len(), 2);

        let everyone = page_filter(&players, &PageFilter::default());
        assert_eq!(everyone.len(), 3);
    }

    #[test]
    fn page_filter_empty_lists_match_everything() {
        let players = vec![player("ADL", "CB", 3), player("MVC", "CF", 5)];
        let filter = PageFilter {
            teams: vec![],
            position_categories: vec![],
            positions: vec![],
            min_events: 0,
        };
        assert_eq!(page_filter(&players, &filter).len(), 2);
    }

    #[test]
    fn page_filter_combines_selections() {
        let players = vec![
            player("ADL", "CB", 30),
            player("ADL", "CF", 30),
            player("MVC", "LCB", 30),
        ];
        let filter = PageFilter {
            teams: vec!["ADL".into()],
            position_categories: vec!["Defender".into()],
            positions: vec![ALL.into()],
            min_events: 0,
        };
        let kept = page_filter(&players, &filter);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].player_position, "CB");

        let by_position = PageFilter {
            positions: vec!["LCB".into(), "CF".into()],
            ..Default::default()
        };
        assert_eq!(page_filter(&players, &by_position).len(), 2);
    }

    #[test]
    fn min_events_floor_is_inclusive() {
        let players = vec![player("ADL", "CB", 10)];
        let filter = PageFilter {
            min_events: 10,
            ..Default::default()
        };
        assert_eq!(page_filter(&players, &filter).len(), 1);
    }

    #[test]
    fn time_bin_boundaries() {
        assert_eq!(TimeBin::from_minute(0.0), Some(TimeBin::Min0To15));
        assert_eq!(TimeBin::from_minute(14.9), Some(TimeBin::Min0To15));
        assert_eq!(TimeBin::from_minute(15.0), Some(TimeBin::Min15To30));
        assert_eq!(TimeBin::from_minute(74.0), Some(TimeBin::Min60To75));
        assert_eq!(TimeBin::from_minute(75.0), Some(TimeBin::Min75Plus));
        assert_eq!(TimeBin::from_minute(120.0), Some(TimeBin::Min75Plus));
        assert_eq!(TimeBin::from_minute(120.5), None);
        assert_eq!(TimeBin::from_minute(-1.0), None);
        assert_eq!(TimeBin::Min75Plus.label(), "75-90+");
    }

    #[test]
    fn time_bins_label_every_event() {
        let mut events = vec![enriched(1, 3.0, None, None), enriched(1, 50.0, None, None)];
        events[1].event.minute_start = None;
        let binned = time_bins(&events);
        assert_eq!(binned.len(), 2);
        assert_eq!(binned[0].bin, Some(TimeBin::Min0To15));
        assert_eq!(binned[1].bin, None);
    }

    #[test]
    fn time_bin_summary_per_player_and_global() {
        let mut events = vec![
            enriched(1, 3.0, None, None),
            enriched(1, 10.0, None, None),
            enriched(2, 12.0, None, None),
            enriched(1, 80.0, None, None),
        ];
        events[1].metrics = metrics(false, Some(100.0));
        events[2].metrics = metrics(false, None);

        let binned = time_bins(&events);

        let player = time_bin_summary(&binned, Some(1));
        assert_eq!(player.len(), 2);
        assert_eq!(player[0].bin, TimeBin::Min0To15);
        assert_eq!(player[0].event_count, 2);
        assert_eq!(player[0].decision_efficiency_mean, Some(75.0));
        assert!((player[0].safest_pass_perc - 50.0).abs() < 1e-10);
        assert_eq!(player[1].bin, TimeBin::Min75Plus);

        let global = time_bin_summary(&binned, None);
        assert_eq!(global[0].event_count, 3);
        // The not-applicable efficiency is skipped, not averaged as zero.
        assert_eq!(global[0].decision_efficiency_mean, Some(75.0));
    }

    #[test]
    fn filter_choices_are_sorted_and_distinct() {
        let mut a = enriched(1, 1.0, None, None);
        a.event.team_shortname = "SYD".into();
        a.event.player_position = "CF".into();
        a.event.position_category = PositionCategory::Attacker;
        let mut b = enriched(2, 1.0, None, None);
        b.event.team_shortname = "ADL".into();
        b.event.player_position = "CB".into();
        b.event.position_category = PositionCategory::Defender;
        let c = a.clone();

        let events = vec![a, b, c];
        let choices = FilterChoices::from_events(&events);
        assert_eq!(choices.teams, vec!["ADL", "SYD"]);
        assert_eq!(
            choices.position_categories,
            vec![PositionCategory::Defender, PositionCategory::Attacker]
        );
        assert_eq!(choices.positions, vec!["CB", "CF"]);
    }
}
