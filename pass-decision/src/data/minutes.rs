// Playing-time table used to normalize player aggregates to 90 minutes.
//
// The roster feed has one row per player per match; minutes are summed
// across matches so every player ends up with a single season total.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use super::possessions::IngestError;

/// Total playing time for one player across every loaded match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinutesPlayed {
    pub player_id: u64,
    pub short_name: String,
    pub minutes_played: f64,
    /// Minutes played while the player's team was in possession.
    pub minutes_tip: f64,
}

#[derive(Debug, Deserialize)]
struct RawPlayerMatch {
    id: f64,
    #[serde(default)]
    short_name: Option<String>,
    #[serde(rename = "playing_time.total.minutes_played", default)]
    minutes_played: Option<f64>,
    #[serde(rename = "playing_time.total.minutes_tip", default)]
    minutes_tip: Option<f64>,
}

/// Sum per-match rows into one entry per `(player_id, short_name)`, ordered
/// by player id.
pub fn sum_minutes(rows: impl IntoIterator<Item = MinutesPlayed>) -> Vec<MinutesPlayed> {
    let mut totals: BTreeMap<(u64, String), MinutesPlayed> = BTreeMap::new();
    for row in rows {
        totals
            .entry((row.player_id, row.short_name.clone()))
            .and_modify(|total| {
                total.minutes_played += row.minutes_played;
                total.minutes_tip += row.minutes_tip;
            })
            .or_insert(row);
    }
    totals.into_values().collect()
}

fn load_minutes_from_reader<R: Read>(rdr: R) -> Result<Vec<MinutesPlayed>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut rows = Vec::new();
    for result in reader.deserialize::<RawPlayerMatch>() {
        match result {
            Ok(raw) => {
                if !raw.id.is_finite() || raw.id < 0.0 || raw.id.fract() != 0.0 {
                    warn!("skipping player row with invalid id {}", raw.id);
                    continue;
                }
                // Unused substitutes have no playing time recorded.
                let Some(minutes_played) = raw.minutes_played.filter(|m| m.is_finite()) else {
                    continue;
                };
                rows.push(MinutesPlayed {
                    player_id: raw.id as u64,
                    short_name: raw.short_name.unwrap_or_default().trim().to_string(),
                    minutes_played,
                    minutes_tip: raw.minutes_tip.filter(|m| m.is_finite()).unwrap_or(0.0),
                });
            }
            Err(e) => {
                warn!("skipping malformed player row: {}", e);
            }
        }
    }
    Ok(sum_minutes(rows))
}

/// Load per-match player rows from CSV and return season totals.
pub fn load_minutes(path: &Path) -> Result<Vec<MinutesPlayed>, IngestError> {
    let file = std::fs::File::open(path).map_err(|e| IngestError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let minutes = load_minutes_from_reader(file).map_err(|e| IngestError::Csv {
        path: path.display().to_string(),
        source: e,
    })?;

    if minutes.is_empty() {
        return Err(IngestError::Validation(format!(
            "{} produced zero players with playing time",
            path.display()
        )));
    }

    info!("Loaded playing time for {} players", minutes.len());
    Ok(minutes)
}
