// League-wide summary of a player table, plus decision-efficiency rankings.

use serde::Serialize;

use super::mean;
use super::players::PlayerAggregate;

/// Unweighted league averages over the players in a (filtered) table. Every
/// qualifying player counts once regardless of minutes or pass volume.
/// Means over no players, or over only not-applicable values, are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LeagueSummary {
    pub players: usize,
    pub xthreat_available_p90_mean: Option<f64>,
    pub player_targeted_xthreat_p90_mean: Option<f64>,
    pub missed_xthreat_p90_mean: Option<f64>,
    pub efficiency_p90: Option<f64>,
    pub has_good_pass_opportunities_mean: Option<f64>,
    pub good_pass_opportunity_mean: Option<f64>,
    pub missed_good_pass_opportunity_mean: Option<f64>,
    /// Total, not average, of missed xThreat across the table.
    pub missed_xthreat_sum: f64,
    pub safest_pass_perc_mean: Option<f64>,
    pub highest_xthreat_pass_perc_mean: Option<f64>,
    pub completed_perc_mean: Option<f64>,
    pub completed_safest_pass_perc_mean: Option<f64>,
    pub completed_highest_xthreat_pass_perc_mean: Option<f64>,
    pub completed_good_pass_opportunity_perc_mean: Option<f64>,
}

impl LeagueSummary {
    /// Metric name and value pairs, in display order.
    pub fn entries(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![
            ("xthreat_available_p90_mean", self.xthreat_available_p90_mean),
            ("player_targeted_xthreat_p90_mean", self.player_targeted_xthreat_p90_mean),
            ("missed_xthreat_p90_mean", self.missed_xthreat_p90_mean),
            ("efficiency_p90", self.efficiency_p90),
            ("has_good_pass_opportunities_mean", self.has_good_pass_opportunities_mean),
            ("good_pass_opportunity_mean", self.good_pass_opportunity_mean),
            ("missed_good_pass_opportunity_mean", self.missed_good_pass_opportunity_mean),
            ("missed_xthreat_sum", Some(self.missed_xthreat_sum)),
            ("safest_pass_perc_mean", self.safest_pass_perc_mean),
            ("highest_xthreat_pass_perc_mean", self.highest_xthreat_pass_perc_mean),
            ("completed_perc_mean", self.completed_perc_mean),
            ("completed_safest_pass_perc_mean", self.completed_safest_pass_perc_mean),
            (
                "completed_highest_xthreat_pass_perc_mean",
                self.completed_highest_xthreat_pass_perc_mean,
            ),
            (
                "completed_good_pass_opportunity_perc_mean",
                self.completed_good_pass_opportunity_perc_mean,
            ),
        ]
    }

    /// Look up a single metric by name.
    pub fn get(&self, metric: &str) -> Option<f64> {
        self.entries()
            .into_iter()
            .find(|(name, _)| *name == metric)
            .and_then(|(_, value)| value)
    }
}

/// Summarize a player table into league averages.
pub fn get_metrics<'a, I>(players: I) -> LeagueSummary
where
    I: IntoIterator<Item = &'a PlayerAggregate>,
{
    let players: Vec<&PlayerAggregate> = players.into_iter().collect();
    let column = |f: fn(&PlayerAggregate) -> f64| mean(players.iter().map(|p| f(*p)));
    let optional = |f: fn(&PlayerAggregate) -> Option<f64>| mean(players.iter().filter_map(|p| f(*p)));

    LeagueSummary {
        players: players.len(),
        xthreat_available_p90_mean: optional(|p| p.xthreat_available_p90),
        player_targeted_xthreat_p90_mean: optional(|p| p.player_targeted_xthreat_p90),
        missed_xthreat_p90_mean: optional(|p| p.missed_xthreat_p90),
        efficiency_p90: optional(|p| p.decision_efficiency_p90),
        has_good_pass_opportunities_mean: column(|p| p.has_good_pass_opportunities_perc),
        good_pass_opportunity_mean: column(|p| p.good_pass_opportunity_perc),
        missed_good_pass_opportunity_mean: column(|p| p.missed_good_pass_opportunity_perc),
        missed_xthreat_sum: players.iter().map(|p| p.missed_xthreat_sum).sum(),
        safest_pass_perc_mean: column(|p| p.safest_pass_perc),
        highest_xthreat_pass_perc_mean: column(|p| p.highest_xthreat_pass_perc),
        completed_perc_mean: column(|p| p.completed_perc),
        completed_safest_pass_perc_mean: column(|p| p.completed_safest_pass_perc),
        completed_highest_xthreat_pass_perc_mean: column(|p| p.completed_highest_xthreat_pass_perc),
        completed_good_pass_opportunity_perc_mean: column(|p| p.completed_good_pass_opportunity_perc),
    }
}

/// A player with their 1-based position in the decision-efficiency table.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RankedPlayer<'a> {
    pub rank: usize,
    pub player: &'a PlayerAggregate,
}

/// Order players by per-90 decision efficiency, best first. Players without
/// an applicable efficiency go last; ties fall back to player id.
pub fn rank_by_decision_efficiency<'a, I>(players: I) -> Vec<RankedPlayer<'a>>
where
    I: IntoIterator<Item = &'a PlayerAggregate>,
{
    let mut sorted: Vec<&PlayerAggregate> = players.into_iter().collect();
    sorted.sort_by(|a, b| match (a.decision_efficiency_p90, b.decision_efficiency_p90) {
        (Some(x), Some(y)) => y
            .partial_cmp(&x)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.player_id.cmp(&b.player_id)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.player_id.cmp(&b.player_id),
    });
    sorted
        .into_iter()
        .enumerate()
        .map(|(i, player)| RankedPlayer { rank: i + 1, player })
        .collect()
}
