//! Top-level entry point: one call per 4th-down decision request.

use rand::Rng;
use serde::Serialize;
use tracing::debug;

use super::decision::{generate_decision, Decision};
use super::plays::simulate_scenarios;
use super::situation::{Situation, SituationInput};
use super::win_probability::{score_scenarios, ScenarioProbabilities};
use crate::data::DataBundle;
use crate::error::EngineError;
use crate::model::WinProbabilityModel;

/// Everything a caller gets back for one request.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionResponse {
    pub decision: Decision,
    pub probabilities: ScenarioProbabilities,
    /// The validated situation with all derived fields, as actually scored.
    pub situation: Situation,
}

/// Evaluate a 4th-down situation against the loaded data and model.
///
/// Deterministic: identical inputs, tables, and model produce bit-identical
/// output. The bundle and model are read-only throughout, so any number of
/// requests may run concurrently against the same instances.
pub fn decide(
    input: SituationInput,
    bundle: &DataBundle,
    model: &dyn WinProbabilityModel,
) -> Result<DecisionResponse, EngineError> {
    let mut situation = Situation::from_input(input)?;
    situation.possession_probability = bundle
        .final_drives
        .possession_probability(situation.seconds_remaining);

    let scenarios = simulate_scenarios(&situation, &bundle.punts);
    debug!(
        success_kind = ?scenarios.success_kind,
        "projected {} scenarios",
        scenarios.labelled().len()
    );

    let mut probabilities = score_scenarios(&situation, &scenarios, model, bundle)?;
    let decision = generate_decision(&situation, bundle, &mut probabilities);

    Ok(DecisionResponse { decision, probabilities, situation })
}

/// Generate a plausible random 4th-down spot, for debugging only — carries
/// no determinism guarantee.
pub fn random_input<R: Rng>(rng: &mut R) -> SituationInput {
    let yards_to_go = rng.gen_range(1..=10);
    SituationInput {
        down: 4,
        yards_to_go,
        yards_from_own_goal: rng.gen_range(1..=(100 - yards_to_go)),
        seconds_remaining: rng.gen_range(1..=3600),
        score_differential: rng.gen_range(-20..=20),
        offense_timeouts: rng.gen_range(0..=3),
        defense_timeouts: rng.gen_range(0..=3),
        point_spread: 0.0,
        in_dome: rng.gen_bool(0.5),
        fg_make_probability: None,
    }
}
