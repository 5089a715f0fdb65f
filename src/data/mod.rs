//! Loading and aggregation of the read-only historical data.
//!
//! Everything in the bundle is loaded once at startup and shared immutably
//! across decision requests.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

pub mod tables;

use crate::model::{ModelArtifact, StandardScaler};
use tables::{
    CoachDecisionsTable, FieldGoalTable, FinalDrivesTable, FirstDownTable, PuntTable,
};

/// The lookup tables, feature scaler, and feature order consumed by one
/// decision request. Read-only after load; safe to share across threads.
#[derive(Debug, Clone)]
pub struct DataBundle {
    pub field_goals: FieldGoalTable,
    pub punts: PuntTable,
    pub first_downs: FirstDownTable,
    pub final_drives: FinalDrivesTable,
    pub decisions: CoachDecisionsTable,
    pub scaler: StandardScaler,
    pub features: Vec<String>,
}

impl DataBundle {
    /// Load every table from `data_dir`, taking the scaler and feature order
    /// from the model artifact so all three stay in lockstep.
    pub fn load(data_dir: &Path, artifact: &ModelArtifact) -> Result<Self> {
        // Prefer the kicker-adjusted field-goal rates when present.
        let fgs_path = data_dir.join("fgs_grouped_nyt.csv");
        let field_goals = if fgs_path.exists() {
            FieldGoalTable::from_reader(open(&fgs_path)?)?
        } else {
            warn!("fgs_grouped_nyt.csv not found, using base field-goal rates");
            FieldGoalTable::from_reader(open(&data_dir.join("fgs_grouped.csv"))?)?
        };

        let punts = PuntTable::from_reader(open(&data_dir.join("punts_grouped.csv"))?)?;
        let first_downs = FirstDownTable::from_readers(
            open(&data_dir.join("fd_open_field.csv"))?,
            open(&data_dir.join("fd_inside_10.csv"))?,
        )?;
        let final_drives =
            FinalDrivesTable::from_reader(open(&data_dir.join("final_drives.csv"))?)?;
        let decisions =
            CoachDecisionsTable::from_reader(open(&data_dir.join("coaches_decisions.csv"))?)?;

        info!("Loaded historical tables from {}", data_dir.display());

        Ok(DataBundle {
            field_goals,
            punts,
            first_downs,
            final_drives,
            decisions,
            scaler: artifact.scaler.clone(),
            features: artifact.features.clone(),
        })
    }
}

fn open(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("failed to open {}", path.display()))
}
