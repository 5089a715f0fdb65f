//! Outcome simulator: projects the current situation forward under each
//! possible 4th-down result.
//!
//! Every possession-changing outcome runs through one shared transform
//! (1st & 10 for the new offense, clock run-off, timeout swap, score and
//! spread sign flip) followed by a per-outcome adjustment. The projected
//! situations are expressed from the *new* offense's perspective; the
//! probability estimator undoes that with `1 - p` when reporting.

use serde::Serialize;

use super::situation::{can_kneel, quarter, Situation};
use crate::data::tables::PuntTable;

/// Seconds of game clock assumed to elapse on the 4th-down play itself.
const PLAY_CLOCK_RUNOFF: i32 = 10;

/// Field position after a kickoff (touchbacks and typical returns).
const POST_KICKOFF_YFOG: i32 = 25;

/// Yards lost to the snap and hold on a missed field goal; the opponent
/// takes over at the spot of the kick.
const KICK_SPOT_ALLOWANCE: i32 = 8;

/// Net punt distance assumed when no historical data covers the spot,
/// which mostly happens very close to the opponent's end zone.
const DEFAULT_PUNT_NET: f64 = 5.0;

/// The modelled 4th-down outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayOutcome {
    Touchdown,
    FirstDown,
    TurnoverOnDowns,
    FieldGoalMade,
    FieldGoalMissed,
    Punt,
}

impl PlayOutcome {
    /// Everything except a converted first down hands the ball over
    /// (scoring plays included, via the ensuing kickoff).
    pub fn changes_possession(self) -> bool {
        !matches!(self, PlayOutcome::FirstDown)
    }
}

/// The five projected game states scored for one decision request.
///
/// Success is a touchdown exactly when the line to gain is the goal line,
/// otherwise a first down; failure is always a turnover on downs. Both
/// field-goal branches are always projected, even from distances where the
/// make probability is near zero, so the estimator sees a consistent set.
#[derive(Debug, Clone)]
pub struct ScenarioSet {
    pub success_kind: PlayOutcome,
    pub success: Situation,
    pub fail: Situation,
    pub punt: Situation,
    pub field_goal: Situation,
    pub missed_field_goal: Situation,
}

impl ScenarioSet {
    /// The scenarios in a fixed order, labelled for logging and tests.
    pub fn labelled(&self) -> [(&'static str, &Situation); 5] {
        [
            ("success", &self.success),
            ("fail", &self.fail),
            ("punt", &self.punt),
            ("fg", &self.field_goal),
            ("missed_fg", &self.missed_field_goal),
        ]
    }
}

/// Project the situation under each viable outcome.
pub fn simulate_scenarios(situation: &Situation, punts: &PuntTable) -> ScenarioSet {
    let (success_kind, success) = if situation.is_goal_to_go() {
        (
            PlayOutcome::Touchdown,
            change_possession(situation, PlayOutcome::Touchdown, punts),
        )
    } else {
        (PlayOutcome::FirstDown, first_down(situation))
    };

    ScenarioSet {
        success_kind,
        success,
        fail: change_possession(situation, PlayOutcome::TurnoverOnDowns, punts),
        punt: change_possession(situation, PlayOutcome::Punt, punts),
        field_goal: change_possession(situation, PlayOutcome::FieldGoalMade, punts),
        missed_field_goal: change_possession(situation, PlayOutcome::FieldGoalMissed, punts),
    }
}

/// Shared transform for every outcome that surrenders the ball.
///
/// The new offense starts 1st & 10 with the timeout counts swapped and the
/// score differential and spread seen from its side. Does not model the edge
/// case of a turnover inside the new offense's own 10.
fn change_possession(situation: &Situation, outcome: PlayOutcome, punts: &PuntTable) -> Situation {
    debug_assert!(outcome.changes_possession());

    let seconds_remaining = (situation.seconds_remaining - PLAY_CLOCK_RUNOFF).max(0);
    let new_quarter = quarter(seconds_remaining);

    // Score adjustment from the old offense's perspective, then flipped.
    let score_delta = match outcome {
        PlayOutcome::Touchdown => 7, // assumes a made extra point
        PlayOutcome::FieldGoalMade => 3,
        _ => 0,
    };
    let score_differential = -(situation.score_differential + score_delta);

    let yards_from_own_goal = match outcome {
        PlayOutcome::Touchdown | PlayOutcome::FieldGoalMade => POST_KICKOFF_YFOG,
        PlayOutcome::FieldGoalMissed => {
            100 - (situation.yards_from_own_goal - KICK_SPOT_ALLOWANCE)
        }
        PlayOutcome::TurnoverOnDowns => 100 - situation.yards_from_own_goal,
        PlayOutcome::Punt => punt_spot(situation, punts),
        PlayOutcome::FirstDown => unreachable!("first down keeps possession"),
    };

    let offense_timeouts = situation.defense_timeouts;
    let defense_timeouts = situation.offense_timeouts;

    Situation {
        down: 1,
        yards_to_go: 10,
        yards_from_own_goal,
        seconds_remaining,
        score_differential,
        offense_timeouts,
        defense_timeouts,
        point_spread: -situation.point_spread,
        in_dome: situation.in_dome,
        fg_make_probability: None,
        quarter: new_quarter,
        quarter_score_interaction: new_quarter * score_differential,
        can_kneel: can_kneel(score_differential, defense_timeouts, seconds_remaining, 1),
        possession_probability: None,
    }
}

/// Where the receiving team takes over after a punt.
fn punt_spot(situation: &Situation, punts: &PuntTable) -> i32 {
    let net = punts
        .net_distance(situation.yards_from_own_goal)
        .unwrap_or(DEFAULT_PUNT_NET);
    let new_yfog = (100.0 - (situation.yards_from_own_goal as f64 + net)).floor() as i32;
    if new_yfog > 0 {
        new_yfog
    } else {
        POST_KICKOFF_YFOG // touchback
    }
}

/// Conversion short of the goal line: same offense, fresh set of downs.
fn first_down(situation: &Situation) -> Situation {
    let yards_from_own_goal = situation.yards_from_own_goal + situation.yards_to_go;
    let seconds_remaining = (situation.seconds_remaining - PLAY_CLOCK_RUNOFF).max(0);
    let new_quarter = quarter(seconds_remaining);

    Situation {
        down: 1,
        yards_to_go: yards_from_own_goal.min(10),
        yards_from_own_goal,
        seconds_remaining,
        score_differential: situation.score_differential,
        offense_timeouts: situation.offense_timeouts,
        defense_timeouts: situation.defense_timeouts,
        point_spread: situation.point_spread,
        in_dome: situation.in_dome,
        fg_make_probability: None,
        quarter: new_quarter,
        quarter_score_interaction: new_quarter * situation.score_differential,
        can_kneel: can_kneel(
            situation.score_differential,
            situation.defense_timeouts,
            seconds_remaining,
            1,
        ),
        possession_probability: None,
    }
}
