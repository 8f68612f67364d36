// Batch report: display labels, plain-text league summary and ranking
// tables, and the JSON export.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::evaluation::league::{LeagueSummary, RankedPlayer};
use crate::evaluation::players::PlayerAggregate;
use crate::evaluation::threshold::Thresholds;

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

/// Display label for a metric column. Unknown keys are returned unchanged.
pub fn metric_label(key: &str) -> &str {
    match key {
        "safest_pass" => "Safest Pass",
        "highest_xthreat_pass" => "Highest xThreat Pass",
        "has_good_pass_opportunities" => "Has Good Opportunities",
        "good_pass_opportunity" => "Is Good Opportunity",
        "missed_good_pass_opportunity" => "Missed Good Opportunity",
        "xthreat_available" => "xThreat Available",
        "missed_xthreat" => "Missed xThreat",
        "decision_efficiency" => "Decision Efficiency",
        "x_xthreat_best" => "Expected xThreat Best",
        "x_xthreat_avg" => "Expected xThreat Average",
        "options_count" => "Options Count",
        "better_x_xthreats_count" => "Better Expected xThreat Count",

        "safest_pass_perc" => "Safest Pass %",
        "safest_pass_sum" => "Safest Pass Count",
        "highest_xthreat_pass_perc" => "Highest xThreat Pass %",
        "highest_xthreat_pass_sum" => "Highest xThreat Count",
        "has_good_pass_opportunities_perc" => "Good Opportunities Available %",
        "has_good_pass_opportunities_sum" => "Good Opportunities Available Count",
        "good_pass_opportunity_perc" => "Good Opportunity %",
        "good_pass_opportunity_sum" => "Good Opportunity Count",
        "missed_good_pass_opportunity_perc" => "Missed Good Opportunity %",
        "missed_good_pass_opportunity_sum" => "Missed Good Opportunity Count",
        "completed_perc" => "Completion Rate",
        "completed_sum" => "Completed",
        "completed_safest_pass_perc" => "Safest Pass Completion Rate",
        "completed_safest_pass_sum" => "Safest Pass Completed",
        "completed_highest_xthreat_pass_perc" => "Highest xThreat Completion Rate",
        "completed_highest_xthreat_pass_sum" => "Highest xThreat Completed",
        "completed_good_pass_opportunity_perc" => "Good Opportunity Completion Rate",
        "completed_good_pass_opportunity_sum" => "Good Opportunity Completed",
        "player_targeted_xthreat" | "player_targeted_xthreat_sum" => "xThreat Created",
        "player_targeted_xthreat_mean" => "xThreat Created (Average)",
        "xthreat_available_sum" => "xThreat Available",
        "xthreat_available_mean" => "xThreat Available (Average)",
        "missed_xthreat_sum" => "xThreat Missed",
        "missed_xthreat_mean" => "xThreat Missed (Average)",
        "decision_efficiency_mean" => "Decision Efficiency (Average)",
        "event_count" => "Total Passes",
        "player_position" => "Player Position",
        "position_category" => "Position Category",
        "team_shortname" => "Team",
        "short_name" => "Player Name",
        "player_id" => "Player ID",
        "minutes_played" => "Minutes Played",

        "xthreat_available_p90" => "xThreat Available (P90)",
        "player_targeted_xthreat_p90" => "xThreat Created (P90)",
        "missed_xthreat_p90" => "Missed xThreat (P90)",
        "decision_efficiency_p90" => "Decision Efficiency (P90)",

        "xthreat_available_p90_mean" => "Average xThreat Available (P90)",
        "player_targeted_xthreat_p90_mean" => "Average xThreat Created (P90)",
        "missed_xthreat_p90_mean" => "Average Missed xThreat (P90)",
        "efficiency_p90" => "Average Decision Efficiency (P90)",
        "highest_xthreat_pass_perc_mean" => "Average Highest xThreat",
        "has_good_pass_opportunities_mean" => "Good Opportunities Available On Average",
        "good_pass_opportunity_mean" => "Average Good Opportunity",
        "missed_good_pass_opportunity_mean" => "Missed Good Opportunity On Average",
        "safest_pass_perc_mean" => "Average Safest Pass",
        "completed_perc_mean" => "Average Completion Rate",
        "completed_safest_pass_perc_mean" => "Average Safest Pass Completion Rate",
        "completed_highest_xthreat_pass_perc_mean" => "Average Highest xThreat Completion Rate",
        "completed_good_pass_opportunity_perc_mean" => "Average Good Opportunity Completion Rate",
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Plain-text tables
// ---------------------------------------------------------------------------

fn fmt_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.3}"),
        None => "n/a".to_string(),
    }
}

/// League summary as `label: value` lines.
pub fn format_summary(summary: &LeagueSummary) -> String {
    let mut out = format!("League summary ({} players)\n", summary.players);
    for (key, value) in summary.entries() {
        let _ = writeln!(out, "  {:<42} {:>10}", metric_label(key), fmt_value(value));
    }
    out
}

/// The first `top` rows of a decision-efficiency ranking.
pub fn format_ranking(ranked: &[RankedPlayer<'_>], top: usize) -> String {
    let mut out = format!(
        "{:>4}  {:<24} {:<16} {:<5} {:>6} {:>10} {:>10} {:>10} {:>8}\n",
        "Rank", "Player", "Team", "Pos", "Passes", "Eff P90", "xT Cr P90", "xT Av P90", "Safest%"
    );
    for r in ranked.iter().take(top) {
        let p = r.player;
        let _ = writeln!(
            out,
            "{:>4}  {:<24} {:<16} {:<5} {:>6} {:>10} {:>10} {:>10} {:>8.1}",
            r.rank,
            truncate(&p.short_name, 24),
            truncate(&p.team_shortname, 16),
            truncate(&p.player_position, 5),
            p.event_count,
            fmt_value(p.decision_efficiency_p90),
            fmt_value(p.player_targeted_xthreat_p90),
            fmt_value(p.xthreat_available_p90),
            p.safest_pass_perc,
        );
    }
    out
}

fn truncate(s: &str, width: usize) -> String {
    s.chars().take(width).collect()
}

// ---------------------------------------------------------------------------
// JSON export
// ---------------------------------------------------------------------------

/// Everything the batch run produced, as written to `json_output`.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub third: String,
    pub thresholds: Thresholds,
    pub summary: &'a LeagueSummary,
    pub players: Vec<&'a PlayerAggregate>,
}

impl<'a> JsonReport<'a> {
    pub fn new(
        third: String,
        thresholds: Thresholds,
        summary: &'a LeagueSummary,
        players: Vec<&'a PlayerAggregate>,
    ) -> Self {
        JsonReport {
            generated_at: Utc::now(),
            third,
            thresholds,
            summary,
            players,
        }
    }
}

/// Serialize the report to `path`, creating parent directories as needed.
pub fn write_json(path: &Path, report: &JsonReport<'_>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(report).context("failed to serialize report")?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
