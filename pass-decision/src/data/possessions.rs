// Possession events and their passing options.
//
// Reads SkillCorner-style dynamic events CSVs: one row per event, where
// `player_possession` rows are the on-ball decisions and `passing_option` rows
// are the alternatives linked back to them through
// `associated_player_possession_event_id`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Pitch thirds
// ---------------------------------------------------------------------------

/// Horizontal third of the pitch, from the acting team's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Third {
    Defensive,
    Middle,
    Attacking,
}

impl Third {
    /// Parse the raw event-feed value (`"defensive_third"`, ...).
    pub fn from_feed(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "defensive_third" => Some(Third::Defensive),
            "middle_third" => Some(Third::Middle),
            "attacking_third" => Some(Third::Attacking),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Third::Defensive => "Defensive",
            Third::Middle => "Middle",
            Third::Attacking => "Attacking",
        }
    }
}

/// Error returned when a third name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown pitch third '{0}' (expected All, Defensive, Middle or Attacking)")]
pub struct UnknownThird(pub String);

/// Pitch-third selection: everything, or one specific third.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThirdFilter {
    #[default]
    All,
    Only(Third),
}

impl FromStr for ThirdFilter {
    type Err = UnknownThird;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(ThirdFilter::All),
            "defensive" => Ok(ThirdFilter::Only(Third::Defensive)),
            "middle" => Ok(ThirdFilter::Only(Third::Middle)),
            "attacking" => Ok(ThirdFilter::Only(Third::Attacking)),
            _ => Err(UnknownThird(s.to_string())),
        }
    }
}

impl fmt::Display for ThirdFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThirdFilter::All => write!(f, "All"),
            ThirdFilter::Only(third) => write!(f, "{}", third.label()),
        }
    }
}

// ---------------------------------------------------------------------------
// Position categories
// ---------------------------------------------------------------------------

/// Coarse role grouping derived from the detailed player position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum PositionCategory {
    Keeper,
    Defender,
    Midfielder,
    Attacker,
    #[default]
    Unknown,
}

impl PositionCategory {
    /// Map a position acronym ("LCB", "DM", "CF", ...) to its category.
    pub fn from_position(position: &str) -> Self {
        match position.trim().to_uppercase().as_str() {
            "GK" => PositionCategory::Keeper,
            "LB" | "RB" | "LCB" | "RCB" | "CB" | "LWB" | "RWB" => PositionCategory::Defender,
            "LM" | "RM" | "LDM" | "RDM" | "DM" | "AM" => PositionCategory::Midfielder,
            "LW" | "RW" | "LF" | "RF" | "CF" => PositionCategory::Attacker,
            _ => PositionCategory::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PositionCategory::Keeper => "Keeper",
            PositionCategory::Defender => "Defender",
            PositionCategory::Midfielder => "Midfielder",
            PositionCategory::Attacker => "Attacker",
            PositionCategory::Unknown => "Unknown",
        }
    }
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One alternative available to the player at the moment of the decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassingOption {
    /// Expected attacking value if the pass were completed.
    pub xthreat: f64,
    /// Probability in [0, 1] that the pass would be completed.
    pub xpass_completion: f64,
    pub off_ball_run_subtype: Option<String>,
    pub pass_range: Option<String>,
    pub passing_option_score: Option<f64>,
}

impl PassingOption {
    /// Convenience constructor for an option with only the two scoring values.
    pub fn new(xthreat: f64, xpass_completion: f64) -> Self {
        PassingOption {
            xthreat,
            xpass_completion,
            off_ball_run_subtype: None,
            pass_range: None,
            passing_option_score: None,
        }
    }

    /// Threat weighted by the chance of completing the pass.
    pub fn expected_threat(&self) -> f64 {
        self.xthreat * self.xpass_completion
    }
}

/// One player's on-ball possession ending in a pass decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PossessionEvent {
    pub event_id: String,
    pub match_id: u64,

    pub frame_start: Option<u64>,
    pub frame_end: Option<u64>,
    pub time_start: Option<String>,
    pub time_end: Option<String>,
    pub minute_start: Option<f64>,
    pub period: Option<u8>,

    pub x_start: Option<f64>,
    pub y_start: Option<f64>,
    pub x_end: Option<f64>,
    pub y_end: Option<f64>,
    pub third_start: Option<Third>,
    pub third_end: Option<Third>,
    pub channel_start: Option<String>,

    pub player_id: u64,
    pub player_name: String,
    pub player_position: String,
    pub position_category: PositionCategory,
    pub team_id: Option<u64>,
    pub team_shortname: String,

    pub game_state: Option<String>,
    pub team_score: Option<u32>,
    pub opponent_team_score: Option<u32>,
    pub phase_type: Option<String>,

    pub pass_outcome: Option<String>,
    pub pass_range: Option<String>,
    pub one_touch: bool,
    pub quick_pass: bool,
    pub is_header: bool,

    pub player_targeted_id: Option<u64>,
    pub player_targeted_xpass_completion: Option<f64>,
    pub player_targeted_xthreat: Option<f64>,
    pub n_passing_options: u32,
    pub passing_options: Vec<PassingOption>,
}

impl PossessionEvent {
    /// Eligible for evaluation: more than one recorded option and a targeted
    /// threat value.
    pub fn is_eligible(&self) -> bool {
        self.n_passing_options > 1 && self.player_targeted_xthreat.is_some()
    }

    pub fn is_completed(&self) -> bool {
        self.pass_outcome.as_deref() == Some("successful")
    }

    /// True when the possession starts or ends in the given third.
    pub fn touches_third(&self, third: Third) -> bool {
        self.third_start == Some(third) || self.third_end == Some(third)
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Raw CSV serde struct (private)
// ---------------------------------------------------------------------------

/// Dynamic events CSV row. Every column is optional because a single file
/// mixes many event types; unknown columns are ignored. Ids are read as f64
/// since exported tables write integer columns with gaps as `12.0`.
#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(default)]
    event_id: Option<String>,
    #[serde(default)]
    match_id: Option<f64>,
    #[serde(default)]
    event_type: Option<String>,
    #[serde(default)]
    frame_start: Option<f64>,
    #[serde(default)]
    frame_end: Option<f64>,
    #[serde(default)]
    time_start: Option<String>,
    #[serde(default)]
    time_end: Option<String>,
    #[serde(default)]
    minute_start: Option<f64>,
    #[serde(default)]
    period: Option<f64>,
    #[serde(default)]
    player_id: Option<f64>,
    #[serde(default)]
    player_name: Option<String>,
    #[serde(default)]
    player_position: Option<String>,
    #[serde(default)]
    team_id: Option<f64>,
    #[serde(default)]
    team_shortname: Option<String>,
    #[serde(default)]
    x_start: Option<f64>,
    #[serde(default)]
    y_start: Option<f64>,
    #[serde(default)]
    x_end: Option<f64>,
    #[serde(default)]
    y_end: Option<f64>,
    #[serde(default)]
    channel_start: Option<String>,
    #[serde(default)]
    third_start: Option<String>,
    #[serde(default)]
    third_end: Option<String>,
    #[serde(default)]
    game_state: Option<String>,
    #[serde(default)]
    team_score: Option<f64>,
    #[serde(default)]
    opponent_team_score: Option<f64>,
    #[serde(default)]
    team_in_possession_phase_type: Option<String>,
    #[serde(default)]
    one_touch: Option<String>,
    #[serde(default)]
    quick_pass: Option<String>,
    #[serde(default)]
    is_header: Option<String>,
    #[serde(default)]
    pass_outcome: Option<String>,
    #[serde(default)]
    pass_range: Option<String>,
    #[serde(default)]
    player_targeted_id: Option<f64>,
    #[serde(default)]
    player_targeted_xpass_completion: Option<f64>,
    #[serde(default)]
    player_targeted_xthreat: Option<f64>,
    #[serde(default)]
    n_passing_options: Option<f64>,
    #[serde(default)]
    associated_player_possession_event_id: Option<String>,
    #[serde(default)]
    xthreat: Option<f64>,
    #[serde(default)]
    xpass_completion: Option<f64>,
    #[serde(default)]
    passing_option_score: Option<f64>,
    #[serde(default)]
    associated_off_ball_run_subtype: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Convert a float-encoded identifier to an integer, rejecting fractions and
/// negative or non-finite values.
fn as_id(value: Option<f64>) -> Option<u64> {
    match value {
        Some(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 => Some(v as u64),
        _ => None,
    }
}

fn as_count(value: Option<f64>) -> Option<u32> {
    as_id(value).and_then(|v| u32::try_from(v).ok())
}

/// Lenient boolean parsing for flag columns. Missing or unrecognised values
/// read as false.
fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_lowercase()).as_deref(),
        Some("true") | Some("1") | Some("1.0")
    )
}

/// Trim a text field and drop it when empty.
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Identifier format shared by possession and option rows: event ids may be
/// written as `"17"` or `"17.0"` depending on the exporter.
fn normalize_event_id(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v >= 0.0 => format!("{}", v as u64),
        _ => trimmed.to_string(),
    }
}

/// Build a validated passing option from a raw row.
fn option_from_raw(raw: &RawEvent) -> Result<PassingOption, String> {
    let xthreat = raw.xthreat.ok_or("missing xthreat")?;
    let xpass_completion = raw.xpass_completion.ok_or("missing xpass_completion")?;
    if !xthreat.is_finite() || xthreat < 0.0 {
        return Err(format!("invalid xthreat {xthreat}"));
    }
    if !(0.0..=1.0).contains(&xpass_completion) {
        return Err(format!("xpass_completion {xpass_completion} outside [0, 1]"));
    }
    Ok(PassingOption {
        xthreat,
        xpass_completion,
        off_ball_run_subtype: non_empty(raw.associated_off_ball_run_subtype.clone()),
        pass_range: non_empty(raw.pass_range.clone()),
        passing_option_score: raw.passing_option_score.filter(|v| v.is_finite()),
    })
}

fn possession_from_raw(raw: RawEvent) -> Result<(PossessionEvent, Option<u32>), String> {
    let event_id = non_empty(raw.event_id)
        .map(|id| normalize_event_id(&id))
        .ok_or("missing event_id")?;
    let match_id = as_id(raw.match_id).ok_or_else(|| format!("event {event_id}: missing match_id"))?;
    let player_id =
        as_id(raw.player_id).ok_or_else(|| format!("event {event_id}: missing player_id"))?;

    // A blank targeted value leaves the possession ineligible; a present but
    // out-of-range one rejects the row. Same bounds as option rows.
    let player_targeted_xthreat = match raw.player_targeted_xthreat {
        Some(v) if !v.is_finite() || v < 0.0 => {
            return Err(format!("event {event_id}: invalid targeted xthreat {v}"));
        }
        other => other,
    };
    let player_targeted_xpass_completion = match raw.player_targeted_xpass_completion {
        Some(v) if !(0.0..=1.0).contains(&v) => {
            return Err(format!(
                "event {event_id}: targeted xpass_completion {v} outside [0, 1]"
            ));
        }
        other => other,
    };

    let player_position = non_empty(raw.player_position).unwrap_or_default();
    let position_category = PositionCategory::from_position(&player_position);

    let event = PossessionEvent {
        event_id,
        match_id,
        frame_start: as_id(raw.frame_start),
        frame_end: as_id(raw.frame_end),
        time_start: non_empty(raw.time_start),
        time_end: non_empty(raw.time_end),
        minute_start: raw.minute_start.filter(|m| m.is_finite()),
        period: as_count(raw.period).and_then(|p| u8::try_from(p).ok()),
        x_start: raw.x_start,
        y_start: raw.y_start,
        x_end: raw.x_end,
        y_end: raw.y_end,
        third_start: raw.third_start.as_deref().and_then(Third::from_feed),
        third_end: raw.third_end.as_deref().and_then(Third::from_feed),
        channel_start: non_empty(raw.channel_start),
        player_id,
        player_name: non_empty(raw.player_name).unwrap_or_default(),
        player_position,
        position_category,
        team_id: as_id(raw.team_id),
        team_shortname: non_empty(raw.team_shortname).unwrap_or_default(),
        game_state: non_empty(raw.game_state),
        team_score: as_count(raw.team_score),
        opponent_team_score: as_count(raw.opponent_team_score),
        phase_type: non_empty(raw.team_in_possession_phase_type),
        pass_outcome: non_empty(raw.pass_outcome).map(|o| o.to_lowercase()),
        pass_range: non_empty(raw.pass_range),
        one_touch: parse_flag(raw.one_touch.as_deref()),
        quick_pass: parse_flag(raw.quick_pass.as_deref()),
        is_header: parse_flag(raw.is_header.as_deref()),
        player_targeted_id: as_id(raw.player_targeted_id),
        player_targeted_xpass_completion,
        player_targeted_xthreat,
        n_passing_options: 0,
        passing_options: Vec::new(),
    };

    Ok((event, as_count(raw.n_passing_options)))
}

// ---------------------------------------------------------------------------
// Reader-based loader (private, enables testing without temp files)
// ---------------------------------------------------------------------------

fn load_possessions_from_reader<R: Read>(rdr: R) -> Result<Vec<PossessionEvent>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);

    let mut possessions: Vec<(PossessionEvent, Option<u32>)> = Vec::new();
    let mut options: HashMap<(u64, String), Vec<PassingOption>> = HashMap::new();
    let mut skipped_options = 0usize;

    for result in reader.deserialize::<RawEvent>() {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping malformed event row: {}", e);
                continue;
            }
        };

        match raw.event_type.as_deref().map(str::trim) {
            Some("player_possession") => match possession_from_raw(raw) {
                Ok(entry) => possessions.push(entry),
                Err(reason) => warn!("skipping possession row: {}", reason),
            },
            Some("passing_option") => {
                let key = match (
                    as_id(raw.match_id),
                    raw.associated_player_possession_event_id.as_deref(),
                ) {
                    (Some(match_id), Some(owner)) if !owner.trim().is_empty() => {
                        (match_id, normalize_event_id(owner))
                    }
                    _ => {
                        skipped_options += 1;
                        continue;
                    }
                };
                match option_from_raw(&raw) {
                    Ok(option) => options.entry(key).or_default().push(option),
                    Err(reason) => {
                        warn!(
                            "skipping passing option for possession {} in match {}: {}",
                            key.1, key.0, reason
                        );
                        skipped_options += 1;
                    }
                }
            }
            _ => {}
        }
    }

    if skipped_options > 0 {
        warn!("{} passing option rows could not be linked or validated", skipped_options);
    }

    let events = possessions
        .into_iter()
        .map(|(mut event, recorded_count)| {
            let linked = options
                .remove(&(event.match_id, event.event_id.clone()))
                .unwrap_or_default();
            event.n_passing_options = recorded_count.unwrap_or(linked.len() as u32);
            event.passing_options = linked;
            event
        })
        .collect();

    Ok(events)
}

// ---------------------------------------------------------------------------
// Public path-based loader
// ---------------------------------------------------------------------------

/// Load possession events with their linked passing options from a dynamic
/// events CSV file.
pub fn load_possessions(path: &Path) -> Result<Vec<PossessionEvent>, IngestError> {
    let file = std::fs::File::open(path).map_err(|e| IngestError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let events = load_possessions_from_reader(file).map_err(|e| IngestError::Csv {
        path: path.display().to_string(),
        source: e,
    })?;

    if events.is_empty() {
        return Err(IngestError::Validation(format!(
            "{} produced zero valid possession rows",
            path.display()
        )));
    }

    let with_options = events.iter().filter(|e| !e.passing_options.is_empty()).count();
    info!(
        "Loaded {} possessions ({} with passing options) from {}",
        events.len(),
        with_options,
        path.display()
    );
    Ok(events)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
