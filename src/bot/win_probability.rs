//! Win-probability estimation for the current and projected game states.
//!
//! The raw score for any state comes from the pre-fitted classifier applied
//! to the scaled feature vector. On top of that sit two asymmetric
//! end-of-game corrections: a failed conversion can leave the opponent in
//! walk-off field-goal range, and a 4th-quarter possession change may be the
//! last one the offense ever sees. The asymmetry (fail and punt are
//! possession-weighted, the others are not) is deliberate and must not be
//! "generalized" away.

use serde::Serialize;

use super::plays::{PlayOutcome, ScenarioSet};
use super::situation::Situation;
use crate::data::DataBundle;
use crate::error::EngineError;
use crate::model::WinProbabilityModel;

/// Seconds remaining under which the end-of-game corrections and overrides
/// kick in: short enough that one drive decides the game.
pub const ENDGAME_WINDOW_SECS: i32 = 40;

/// Win probabilities for the original offense, per scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioProbabilities {
    /// Probability before the 4th-down play is resolved.
    pub pre_play: f64,
    /// Conversion scenario: touchdown at goal-to-go, first down otherwise.
    pub success: f64,
    pub success_kind: PlayOutcome,
    /// Turnover on downs.
    pub fail: f64,
    pub punt: f64,
    pub field_goal: f64,
    pub missed_field_goal: f64,
}

/// Score the current situation and all five projected scenarios.
pub fn score_scenarios(
    situation: &Situation,
    scenarios: &ScenarioSet,
    model: &dyn WinProbabilityModel,
    bundle: &DataBundle,
) -> Result<ScenarioProbabilities, EngineError> {
    let pre_play = score_situation(situation, model, bundle)?;

    // Projected situations are expressed from the perspective of whichever
    // offense has the ball after the play. Every possession-changing scenario
    // therefore reports 1 - p for the original offense.
    let success_raw = score_situation(&scenarios.success, model, bundle)?;
    let success = if scenarios.success_kind.changes_possession() {
        1.0 - success_raw
    } else {
        success_raw
    };

    let mut fail = 1.0 - score_situation(&scenarios.fail, model, bundle)?;
    let mut punt = 1.0 - score_situation(&scenarios.punt, model, bundle)?;
    let field_goal = 1.0 - score_situation(&scenarios.field_goal, model, bundle)?;
    let missed_field_goal = 1.0 - score_situation(&scenarios.missed_field_goal, model, bundle)?;

    // A failed conversion with no timeouts left to answer can hand the
    // opponent a game-winning field goal as time expires.
    if situation.seconds_remaining < ENDGAME_WINDOW_SECS
        && (0..=2).contains(&situation.score_differential)
        && situation.offense_timeouts == 0
    {
        let opponent_fg_rate = bundle
            .field_goals
            .success_rate(scenarios.fail.yards_from_own_goal, situation.in_dome)
            .unwrap_or(0.0);
        fail *= 1.0 - opponent_fg_rate;
    }

    // In the 4th quarter a possession change may be permanent: weight the
    // surrendering scenarios by the chance of getting the ball back at all.
    if situation.quarter == 4 {
        let possession = situation.possession_probability.unwrap_or(1.0);
        fail *= possession;
        punt *= possession;
    }

    Ok(ScenarioProbabilities {
        pre_play,
        success,
        success_kind: scenarios.success_kind,
        fail,
        punt,
        field_goal,
        missed_field_goal,
    })
}

/// Build the feature vector in the artifact's declared order, scale it, and
/// score it.
fn score_situation(
    situation: &Situation,
    model: &dyn WinProbabilityModel,
    bundle: &DataBundle,
) -> Result<f64, EngineError> {
    let mut features = Vec::with_capacity(bundle.features.len());
    for name in &bundle.features {
        let value = situation
            .feature_value(name)
            .ok_or_else(|| EngineError::UnknownFeature(name.clone()))?;
        features.push(value);
    }
    let scaled = bundle.scaler.transform(&features)?;
    Ok(model.predict_win_probability(&scaled))
}


#[cfg(test)]
mod tests {
    use super::test_support::{empty_bundle, FixedModel};
    use super::*;
    use crate::bot::plays::simulate_scenarios;
    use crate::bot::situation::SituationInput;
    use crate::data::tables::FieldGoalTable;
    use approx::assert_relative_eq;

    fn input() -> SituationInput {
        SituationInput {
            down: 4,
            yards_to_go: 2,
            yards_from_own_goal: 45,
            seconds_remaining: 1800,
            score_differential: 0,
            offense_timeouts: 3,
            defense_timeouts: 3,
            point_spread: 0.0,
            in_dome: false,
            fg_make_probability: None,
        }
    }

    fn scored(input: SituationInput, bundle: &DataBundle, p: f64) -> ScenarioProbabilities {
        let situation = Situation::from_input(input).unwrap();
        let scenarios = simulate_scenarios(&situation, &bundle.punts);
        score_scenarios(&situation, &scenarios, &FixedModel(p), bundle).unwrap()
    }

    #[test]
    fn possession_changing_scenarios_are_flipped() {
        let bundle = empty_bundle();
        let probs = scored(input(), &bundle, 0.7);

        // First down keeps possession: reported as-is.
        assert_eq!(probs.success_kind, PlayOutcome::FirstDown);
        assert_relative_eq!(probs.success, 0.7, epsilon = 1e-9);

        // Everything else is seen from the opponent's side.
        assert_relative_eq!(probs.fail, 0.3, epsilon = 1e-9);
        assert_relative_eq!(probs.punt, 0.3, epsilon = 1e-9);
        assert_relative_eq!(probs.field_goal, 0.3, epsilon = 1e-9);
        assert_relative_eq!(probs.missed_field_goal, 0.3, epsilon = 1e-9);
    }

    #[test]
    fn touchdown_success_is_flipped_too() {
        let bundle = empty_bundle();
        let mut goal_line = input();
        goal_line.yards_from_own_goal = 98;
        let probs = scored(goal_line, &bundle, 0.7);
        assert_eq!(probs.success_kind, PlayOutcome::Touchdown);
        assert_relative_eq!(probs.success, 0.3, epsilon = 1e-9);
    }

    #[test]
    fn field_goal_threat_discounts_the_fail_scenario() {
        let mut bundle = empty_bundle();
        // Opponent would take over at 100 - 45 = 55 after a failed conversion.
        bundle.field_goals =
            FieldGoalTable::from_reader("yfog,open_rate,dome_rate\n55,0.40,0.50\n".as_bytes())
                .unwrap();

        let mut endgame = input();
        endgame.seconds_remaining = 30;
        endgame.score_differential = 1;
        endgame.offense_timeouts = 0;
        let corrected = scored(endgame.clone(), &bundle, 0.5);

        let mut later = endgame;
        later.seconds_remaining = 200;
        let uncorrected = scored(later, &bundle, 0.5);

        // fail = 0.5, discounted by the 40% walk-off kick.
        assert_relative_eq!(corrected.fail, 0.5 * 0.6, epsilon = 1e-9);
        assert_relative_eq!(uncorrected.fail, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn field_goal_threat_requires_no_timeouts() {
        let mut bundle = empty_bundle();
        bundle.field_goals =
            FieldGoalTable::from_reader("yfog,open_rate,dome_rate\n55,0.40,0.50\n".as_bytes())
                .unwrap();
        let mut endgame = input();
        endgame.seconds_remaining = 30;
        endgame.score_differential = 1;
        endgame.offense_timeouts = 1;
        let probs = scored(endgame, &bundle, 0.5);
        assert_relative_eq!(probs.fail, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn fourth_quarter_weights_fail_and_punt_by_possession_probability() {
        let bundle = empty_bundle();
        let mut late = input();
        late.seconds_remaining = 600;
        let situation = {
            let mut s = Situation::from_input(late).unwrap();
            s.possession_probability = Some(0.6);
            s
        };
        let scenarios = simulate_scenarios(&situation, &bundle.punts);
        let probs = score_scenarios(&situation, &scenarios, &FixedModel(0.5), &bundle).unwrap();

        assert_relative_eq!(probs.fail, 0.3, epsilon = 1e-9);
        assert_relative_eq!(probs.punt, 0.3, epsilon = 1e-9);
        // The kicking scenarios are deliberately not weighted here.
        assert_relative_eq!(probs.field_goal, 0.5, epsilon = 1e-9);
        assert_relative_eq!(probs.missed_field_goal, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn unknown_feature_name_is_fatal() {
        let mut bundle = empty_bundle();
        bundle.features = vec!["score_differential".into(), "mystery".into()];
        let situation = Situation::from_input(input()).unwrap();
        let scenarios = simulate_scenarios(&situation, &bundle.punts);
        let err =
            score_scenarios(&situation, &scenarios, &FixedModel(0.5), &bundle).unwrap_err();
        assert!(matches!(err, EngineError::UnknownFeature(name) if name == "mystery"));
    }

    #[test]
    fn unfitted_scaler_is_fatal() {
        let mut bundle = empty_bundle();
        bundle.scaler = crate::model::StandardScaler::default();
        let situation = Situation::from_input(input()).unwrap();
        let scenarios = simulate_scenarios(&situation, &bundle.punts);
        let err =
            score_scenarios(&situation, &scenarios, &FixedModel(0.5), &bundle).unwrap_err();
        assert!(matches!(err, EngineError::ScalerNotFitted));
    }
}
