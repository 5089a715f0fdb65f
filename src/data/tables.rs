//! Historical lookup tables consumed by the decision engine.
//!
//! Each table is loaded once from a CSV produced by the play-by-play ETL and
//! is read-only afterwards, so any number of decision requests can share a
//! reference concurrently. Lookup misses are never errors here; the callers
//! apply their documented defaults.

use std::collections::HashMap;
use std::io::Read;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::bot::situation::Situation;

// ── Field goals ──────────────────────────────────────────────────────────────

/// Historical field-goal success rates keyed by field position, split by
/// indoor/outdoor kicking conditions.
#[derive(Debug, Clone, Default)]
pub struct FieldGoalTable {
    rates: HashMap<i32, FieldGoalRates>,
}

#[derive(Debug, Clone, Copy)]
struct FieldGoalRates {
    open: f64,
    dome: f64,
}

#[derive(Debug, Deserialize)]
struct FieldGoalRow {
    yfog: i32,
    open_rate: f64,
    dome_rate: f64,
}

impl FieldGoalTable {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rates = HashMap::new();
        for record in csv::Reader::from_reader(reader).deserialize() {
            let row: FieldGoalRow = record.context("malformed field-goal table row")?;
            rates.insert(row.yfog, FieldGoalRates { open: row.open_rate, dome: row.dome_rate });
        }
        Ok(FieldGoalTable { rates })
    }

    /// Make rate for a kick from the given field position, `None` when no
    /// historical kicks were attempted from there.
    pub fn success_rate(&self, yards_from_own_goal: i32, in_dome: bool) -> Option<f64> {
        self.rates
            .get(&yards_from_own_goal)
            .map(|r| if in_dome { r.dome } else { r.open })
    }
}

// ── Punts ────────────────────────────────────────────────────────────────────

/// Average net punt distance (punt minus return yards) by field position.
#[derive(Debug, Clone, Default)]
pub struct PuntTable {
    net_yards: HashMap<i32, f64>,
}

#[derive(Debug, Deserialize)]
struct PuntRow {
    yfog: i32,
    pnet: f64,
}

impl PuntTable {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut net_yards = HashMap::new();
        for record in csv::Reader::from_reader(reader).deserialize() {
            let row: PuntRow = record.context("malformed punt table row")?;
            net_yards.insert(row.yfog, row.pnet);
        }
        Ok(PuntTable { net_yards })
    }

    pub fn net_distance(&self, yards_from_own_goal: i32) -> Option<f64> {
        self.net_yards.get(&yards_from_own_goal).copied()
    }
}

// ── First-down conversion rates ──────────────────────────────────────────────

/// Historical conversion rates, in two resolutions: exact field position
/// inside the opponent's 10, and 10-yard field-position bins elsewhere.
#[derive(Debug, Clone, Default)]
pub struct FirstDownTable {
    /// Keyed by (down, yards to go, yfog / 10).
    open_field: HashMap<(i32, i32, i32), f64>,
    /// Keyed by (down, yards to go, exact yfog), yfog >= 90.
    inside_ten: HashMap<(i32, i32, i32), f64>,
}

#[derive(Debug, Deserialize)]
struct OpenFieldRow {
    dwn: i32,
    ytg: i32,
    yfog_bin: i32,
    fdr: f64,
}

#[derive(Debug, Deserialize)]
struct InsideTenRow {
    dwn: i32,
    ytg: i32,
    yfog: i32,
    fdr: f64,
}

impl FirstDownTable {
    pub fn from_readers<R: Read>(open_field: R, inside_ten: R) -> Result<Self> {
        let mut table = FirstDownTable::default();
        for record in csv::Reader::from_reader(open_field).deserialize() {
            let row: OpenFieldRow = record.context("malformed open-field conversion row")?;
            table.open_field.insert((row.dwn, row.ytg, row.yfog_bin), row.fdr);
        }
        for record in csv::Reader::from_reader(inside_ten).deserialize() {
            let row: InsideTenRow = record.context("malformed inside-ten conversion row")?;
            table.inside_ten.insert((row.dwn, row.ytg, row.yfog), row.fdr);
        }
        Ok(table)
    }

    pub fn open_field_rate(&self, down: i32, yards_to_go: i32, yfog_bin: i32) -> Option<f64> {
        self.open_field.get(&(down, yards_to_go, yfog_bin)).copied()
    }

    pub fn inside_ten_rate(&self, down: i32, yards_to_go: i32, yfog: i32) -> Option<f64> {
        self.inside_ten.get(&(down, yards_to_go, yfog)).copied()
    }
}

// ── Final drives ─────────────────────────────────────────────────────────────

/// Probability that the offense regains possession before the game ends,
/// keyed by seconds remaining. Queried by nearest time.
#[derive(Debug, Clone, Default)]
pub struct FinalDrivesTable {
    rows: Vec<(i32, f64)>,
}

#[derive(Debug, Deserialize)]
struct DriveRow {
    secs: i32,
    cum_pct: f64,
}

impl FinalDrivesTable {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rows = Vec::new();
        for record in csv::Reader::from_reader(reader).deserialize() {
            let row: DriveRow = record.context("malformed final-drives row")?;
            rows.push((row.secs, row.cum_pct));
        }
        Ok(FinalDrivesTable { rows })
    }

    /// Nearest-time lookup; `None` only when the table is empty.
    pub fn possession_probability(&self, seconds_remaining: i32) -> Option<f64> {
        self.rows
            .iter()
            .min_by_key(|(secs, _)| (secs - seconds_remaining).abs())
            .map(|(_, pct)| *pct)
    }
}

// ── Coaching decisions ───────────────────────────────────────────────────────

/// Yards-to-go class used when binning situations against coaching history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum YardsToGoClass {
    Short,
    Medium,
    Long,
}

impl YardsToGoClass {
    pub fn from_yards(yards_to_go: i32) -> Self {
        match yards_to_go {
            ..=3 => YardsToGoClass::Short,
            4..=7 => YardsToGoClass::Medium,
            _ => YardsToGoClass::Long,
        }
    }
}

/// Coarse situational bin for the historical-decision lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HistoricalBin {
    /// Trailing by a touchdown or more.
    pub down_by_td: bool,
    /// Leading by a touchdown or more.
    pub up_by_td: bool,
    /// Field position in 20-yard bands.
    pub yfog_bin: i32,
    pub distance: YardsToGoClass,
}

impl HistoricalBin {
    pub fn from_situation(situation: &Situation) -> Self {
        HistoricalBin {
            down_by_td: situation.score_differential <= -4,
            up_by_td: situation.score_differential >= 4,
            yfog_bin: situation.yards_from_own_goal / 20,
            distance: YardsToGoClass::from_yards(situation.yards_to_go),
        }
    }
}

/// Empirical proportions of go/punt/kick calls in historically similar spots.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct HistoricalRates {
    pub go_for_it_rate: f64,
    pub punt_rate: f64,
    pub kick_rate: f64,
    pub sample_size: u32,
}

/// What coaches actually did in comparable situations, binned coarsely.
#[derive(Debug, Clone, Default)]
pub struct CoachDecisionsTable {
    rows: HashMap<HistoricalBin, HistoricalRates>,
}

#[derive(Debug, Deserialize)]
struct DecisionRow {
    down_by_td: u8,
    up_by_td: u8,
    yfog_bin: i32,
    short: u8,
    med: u8,
    long: u8,
    proportion_went: f64,
    proportion_punted: f64,
    proportion_kicked: f64,
    sample_size: u32,
}

impl CoachDecisionsTable {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rows = HashMap::new();
        for record in csv::Reader::from_reader(reader).deserialize() {
            let row: DecisionRow = record.context("malformed coach-decisions row")?;
            let distance = if row.short != 0 {
                YardsToGoClass::Short
            } else if row.med != 0 {
                YardsToGoClass::Medium
            } else if row.long != 0 {
                YardsToGoClass::Long
            } else {
                continue; // unclassifiable row, skip
            };
            rows.insert(
                HistoricalBin {
                    down_by_td: row.down_by_td != 0,
                    up_by_td: row.up_by_td != 0,
                    yfog_bin: row.yfog_bin,
                    distance,
                },
                HistoricalRates {
                    go_for_it_rate: row.proportion_went,
                    punt_rate: row.proportion_punted,
                    kick_rate: row.proportion_kicked,
                    sample_size: row.sample_size,
                },
            );
        }
        Ok(CoachDecisionsTable { rows })
    }

    /// `None` is the explicit "no data" sentinel: callers must branch on it
    /// rather than assume a numeric value exists.
    pub fn rates(&self, bin: &HistoricalBin) -> Option<HistoricalRates> {
        self.rows.get(bin).copied()
    }
}
