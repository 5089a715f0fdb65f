//! Turns the five scored scenarios into a recommendation.
//!
//! Pure reduction, no state across requests: expected values for going for
//! it and for each kicking alternative, breakeven conversion rates, and the
//! final three-way call, with historical coaching behavior attached for
//! context.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use super::situation::Situation;
use super::win_probability::{ScenarioProbabilities, ENDGAME_WINDOW_SECS};
use crate::data::tables::{HistoricalBin, HistoricalRates};
use crate::data::DataBundle;

/// Conversion rate assumed when no historical row covers the attempt
/// (mostly very long 4th downs).
const DEFAULT_CONVERSION_RATE: f64 = 0.10;

/// Field positions shallower than this are implausibly long kicks; make
/// probability is forced to zero.
const FG_RANGE_FLOOR_YFOG: i32 = 42;

/// A field goal is only preferred over a punt when it is at least this
/// likely to be made.
const FG_VIABILITY_THRESHOLD: f64 = 0.3;

/// Breakeven reported when success and failure carry identical win
/// probability and the ratio is undefined.
const NEUTRAL_BREAKEVEN: f64 = 0.5;

/// The recommended play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayCall {
    GoForIt,
    Punt,
    Kick,
}

impl fmt::Display for PlayCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayCall::GoForIt => write!(f, "go for it"),
            PlayCall::Punt => write!(f, "punt"),
            PlayCall::Kick => write!(f, "kick"),
        }
    }
}

/// The better of the two kicking alternatives for this spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KickingOption {
    Punt,
    FieldGoal,
}

/// Full decision output: the call, the numbers behind it, and what coaches
/// historically did in comparable spots.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub best_play: PlayCall,
    pub kicking_option: KickingOption,
    /// Historical 4th-down conversion rate for this down/distance/field position.
    pub conversion_probability: f64,
    pub fg_make_probability: f64,
    pub go_for_it_ev: f64,
    pub field_goal_ev: f64,
    /// Conversion rate at which going for it and punting are equal in value.
    pub breakeven_punt: f64,
    /// Conversion rate at which going for it and kicking are equal in value.
    pub breakeven_fg: f64,
    /// Expected win probability gained by going for it over the best kick.
    pub win_probability_added: f64,
    /// `None` when no historically similar situations exist; callers must
    /// branch on this rather than assume a number.
    pub historical: Option<HistoricalRates>,
}

/// Reduce the scored scenarios to a recommendation.
///
/// Mutates `probs` in exactly one case: when a made field goal ends the
/// game outright, the field-goal scenario probability collapses to the
/// make probability itself.
pub fn generate_decision(
    situation: &Situation,
    bundle: &DataBundle,
    probs: &mut ScenarioProbabilities,
) -> Decision {
    let conversion_probability = conversion_probability(situation, bundle);
    let go_for_it_ev = expected_value(conversion_probability, probs.success, probs.fail);

    let fg_make_probability = fg_make_probability(situation, bundle);
    let mut field_goal_ev =
        expected_value(fg_make_probability, probs.field_goal, probs.missed_field_goal);

    // Trailing by up to three with the defense out of timeouts in the final
    // seconds: a made kick wins (or forces overtime) as time expires, so the
    // kick's value is exactly its make probability.
    if situation.seconds_remaining < ENDGAME_WINDOW_SECS
        && (-2..=0).contains(&situation.score_differential)
        && situation.defense_timeouts == 0
    {
        probs.field_goal = fg_make_probability;
        field_goal_ev = fg_make_probability;
    }

    // Down more than a field goal in the 4th quarter, a kick only matters if
    // the offense gets the ball back afterwards.
    if situation.quarter == 4 && situation.score_differential < -3 {
        field_goal_ev *= situation.possession_probability.unwrap_or(1.0);
    }

    let (breakeven_punt, breakeven_fg) =
        breakevens(probs.success, probs.fail, probs.punt, field_goal_ev);

    let (kicking_option, win_probability_added) =
        if field_goal_ev > probs.punt && fg_make_probability > FG_VIABILITY_THRESHOLD {
            (KickingOption::FieldGoal, go_for_it_ev - field_goal_ev)
        } else {
            (KickingOption::Punt, go_for_it_ev - probs.punt)
        };

    let best_play = match kicking_option {
        KickingOption::Punt if conversion_probability < breakeven_punt => PlayCall::Punt,
        KickingOption::FieldGoal if conversion_probability < breakeven_fg => PlayCall::Kick,
        _ => PlayCall::GoForIt,
    };

    debug!(
        %best_play,
        conversion_probability,
        breakeven_punt,
        breakeven_fg,
        win_probability_added,
        "decision computed"
    );

    let historical = bundle.decisions.rates(&HistoricalBin::from_situation(situation));

    Decision {
        best_play,
        kicking_option,
        conversion_probability,
        fg_make_probability,
        go_for_it_ev,
        field_goal_ev,
        breakeven_punt,
        breakeven_fg,
        win_probability_added,
        historical,
    }
}

/// Expected win probability of a binary outcome.
fn expected_value(p_success: f64, success_wp: f64, failure_wp: f64) -> f64 {
    p_success * success_wp + (1.0 - p_success) * failure_wp
}

/// Historical conversion rate. Inside the opponent's 10 the sample is dense
/// enough for an exact (down, distance, field position) key; elsewhere the
/// field is binned into 10-yard segments.
fn conversion_probability(situation: &Situation, bundle: &DataBundle) -> f64 {
    let rate = if situation.yards_from_own_goal >= 90 {
        bundle.first_downs.inside_ten_rate(
            situation.down,
            situation.yards_to_go,
            situation.yards_from_own_goal,
        )
    } else {
        bundle.first_downs.open_field_rate(
            situation.down,
            situation.yards_to_go,
            situation.yards_from_own_goal / 10,
        )
    };
    rate.unwrap_or(DEFAULT_CONVERSION_RATE)
}

/// Make probability for a field-goal attempt from the current spot. An
/// externally supplied override wins outright; otherwise the historical rate
/// table, with zero forced for kicks beyond plausible range.
fn fg_make_probability(situation: &Situation, bundle: &DataBundle) -> f64 {
    if let Some(p) = situation.fg_make_probability {
        return p;
    }
    if situation.yards_from_own_goal < FG_RANGE_FLOOR_YFOG {
        return 0.0;
    }
    bundle
        .field_goals
        .success_rate(situation.yards_from_own_goal, situation.in_dome)
        .unwrap_or(0.0)
}

/// Conversion probabilities at which the coach is indifferent between going
/// for it and each kicking alternative, clamped to [0, 1].
///
/// When success and failure carry the same win probability the ratio is
/// undefined; both breakevens fall back to a neutral 0.5 rather than
/// propagating a NaN.
fn breakevens(success_wp: f64, fail_wp: f64, punt_wp: f64, fg_ev: f64) -> (f64, f64) {
    let denom = success_wp - fail_wp;
    if denom.abs() < f64::EPSILON {
        return (NEUTRAL_BREAKEVEN, NEUTRAL_BREAKEVEN);
    }
    let breakeven_punt = ((punt_wp - fail_wp) / denom).clamp(0.0, 1.0);
    let breakeven_fg = ((fg_ev - fail_wp) / denom).clamp(0.0, 1.0);
    (breakeven_punt, breakeven_fg)
}
