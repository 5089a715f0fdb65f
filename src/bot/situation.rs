//! The game-state record the whole engine operates on.
//!
//! A [`Situation`] is built once per decision request from raw inputs, with
//! the derived fields (quarter, quarter × score interaction, kneel-down flag)
//! computed by pure functions at construction. Projected situations created
//! by the outcome simulator are fresh values; nothing here is mutated after
//! construction.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Raw 4th-down game state as collected from the caller, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SituationInput {
    /// Current down, 1–4.
    pub down: i32,
    /// Yards to the line to gain.
    pub yards_to_go: i32,
    /// Field position: yards from the offense's own goal line (100 = opponent's goal).
    pub yards_from_own_goal: i32,
    /// Seconds left in regulation, 0–3600.
    pub seconds_remaining: i32,
    /// Offense score minus defense score.
    pub score_differential: i32,
    pub offense_timeouts: i32,
    pub defense_timeouts: i32,
    /// Point spread from the offense's perspective (negative = offense favored).
    pub point_spread: f64,
    /// Indoor stadium flag; affects field-goal and punt rates.
    pub in_dome: bool,
    /// Optional externally supplied field-goal make probability. When present
    /// it is used verbatim instead of the historical rate tables.
    #[serde(default)]
    pub fg_make_probability: Option<f64>,
}

/// Validated game state plus derived model features.
#[derive(Debug, Clone, Serialize)]
pub struct Situation {
    pub down: i32,
    pub yards_to_go: i32,
    pub yards_from_own_goal: i32,
    pub seconds_remaining: i32,
    pub score_differential: i32,
    pub offense_timeouts: i32,
    pub defense_timeouts: i32,
    /// Spread decayed by time remaining: `raw_spread * seconds_remaining / 3600`.
    pub point_spread: f64,
    pub in_dome: bool,
    pub fg_make_probability: Option<f64>,
    /// Derived from `seconds_remaining`, never set independently.
    pub quarter: i32,
    /// `quarter * score_differential` — emphasizes late-game score gaps.
    pub quarter_score_interaction: i32,
    /// True only when the offense is ahead and can kneel out the clock.
    pub can_kneel: bool,
    /// Probability the offense regains possession before the game ends.
    /// Attached from the final-drives table when the situation is annotated.
    pub possession_probability: Option<f64>,
}

impl Situation {
    /// Validate raw inputs and compute the derived fields.
    ///
    /// The raw point spread is decayed here, so a spread only carries weight
    /// in proportion to the game time it still has to express itself in.
    pub fn from_input(input: SituationInput) -> Result<Self, EngineError> {
        validate(&input)?;

        let quarter = quarter(input.seconds_remaining);
        let spread = input.point_spread * (input.seconds_remaining as f64 / 3600.0);

        Ok(Situation {
            down: input.down,
            yards_to_go: input.yards_to_go,
            yards_from_own_goal: input.yards_from_own_goal,
            seconds_remaining: input.seconds_remaining,
            score_differential: input.score_differential,
            offense_timeouts: input.offense_timeouts,
            defense_timeouts: input.defense_timeouts,
            point_spread: spread,
            in_dome: input.in_dome,
            fg_make_probability: input.fg_make_probability,
            quarter,
            quarter_score_interaction: quarter * input.score_differential,
            can_kneel: can_kneel(
                input.score_differential,
                input.defense_timeouts,
                input.seconds_remaining,
                input.down,
            ),
            possession_probability: None,
        })
    }

    /// Whether the line to gain is at or beyond the goal line, i.e. a
    /// conversion attempt scores a touchdown rather than a first down.
    pub fn is_goal_to_go(&self) -> bool {
        self.yards_to_go + self.yards_from_own_goal >= 100
    }

    /// Extract a model feature by name. Returns `None` for unrecognized
    /// names; the caller decides whether that is fatal.
    pub fn feature_value(&self, name: &str) -> Option<f64> {
        let v = match name {
            "down" => self.down as f64,
            "yards_to_go" => self.yards_to_go as f64,
            "yards_from_own_goal" => self.yards_from_own_goal as f64,
            "seconds_remaining" => self.seconds_remaining as f64,
            "score_differential" => self.score_differential as f64,
            "offense_timeouts" => self.offense_timeouts as f64,
            "defense_timeouts" => self.defense_timeouts as f64,
            "point_spread" => self.point_spread,
            "in_dome" => self.in_dome as i32 as f64,
            "quarter" => self.quarter as f64,
            "quarter_score_interaction" => self.quarter_score_interaction as f64,
            "can_kneel" => self.can_kneel as i32 as f64,
            _ => return None,
        };
        Some(v)
    }
}

fn validate(input: &SituationInput) -> Result<(), EngineError> {
    let fail = |msg: String| Err(EngineError::InvalidSituation(msg));

    if !(1..=4).contains(&input.down) {
        return fail(format!("down must be 1-4, got {}", input.down));
    }
    if input.yards_to_go < 1 {
        return fail(format!("yards_to_go must be >= 1, got {}", input.yards_to_go));
    }
    if !(0..=100).contains(&input.yards_from_own_goal) {
        return fail(format!(
            "yards_from_own_goal must be 0-100, got {}",
            input.yards_from_own_goal
        ));
    }
    if input.yards_to_go + input.yards_from_own_goal > 100 {
        return fail(format!(
            "line to gain is past the goal line ({} + {})",
            input.yards_from_own_goal, input.yards_to_go
        ));
    }
    if !(0..=3600).contains(&input.seconds_remaining) {
        return fail(format!(
            "seconds_remaining must be 0-3600, got {}",
            input.seconds_remaining
        ));
    }
    if !(0..=3).contains(&input.offense_timeouts) {
        return fail(format!("offense_timeouts must be 0-3, got {}", input.offense_timeouts));
    }
    if !(0..=3).contains(&input.defense_timeouts) {
        return fail(format!("defense_timeouts must be 0-3, got {}", input.defense_timeouts));
    }
    if let Some(p) = input.fg_make_probability {
        if !(0.0..=1.0).contains(&p) {
            return fail(format!("fg_make_probability must be in [0,1], got {}", p));
        }
    }
    Ok(())
}

/// Current quarter given the seconds left in regulation.
pub fn quarter(seconds_remaining: i32) -> i32 {
    if seconds_remaining <= 900 {
        4
    } else if seconds_remaining <= 1800 {
        3
    } else if seconds_remaining <= 2700 {
        2
    } else {
        1
    }
}

/// Whether the offense can kneel out the rest of the game.
///
/// A kneel-out is only guaranteed when the offense is ahead and the defense
/// cannot stop the clock often enough. The thresholds are the maximum seconds
/// remaining, per (down, defense timeouts), under which three kneels (or two,
/// or one) plus the play clock run the game out. Never true on 4th down: a
/// kneel there hands the ball back.
pub fn can_kneel(
    score_differential: i32,
    defense_timeouts: i32,
    seconds_remaining: i32,
    down: i32,
) -> bool {
    if score_differential <= 0 || down == 4 {
        return false;
    }

    let max_seconds = match (down, defense_timeouts) {
        (1, 0) => 120,
        (1, 1) => 87,
        (1, 2) => 48,
        (2, 0) => 84,
        (2, 1) => 45,
        (3, 0) => 42,
        _ => return false,
    };

    seconds_remaining <= max_seconds
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn base_input() -> SituationInput {
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

    // ── Kneel-down predicate ─────────────────────────────────────────────────

    #[test]
    fn kneel_requires_a_lead() {
        assert!(!can_kneel(0, 0, 30, 1));
        assert!(!can_kneel(-7, 0, 30, 1));
        assert!(can_kneel(1, 0, 30, 1));
    }

    #[test]
    fn kneel_never_on_fourth_down() {
        assert!(!can_kneel(14, 0, 5, 4));
    }

    #[test]
    fn kneel_thresholds_at_boundary() {
        // (down, defense timeouts, max seconds) from the threshold table;
        // true at the threshold, false one second above.
        let cases = [(1, 0, 120), (1, 1, 87), (1, 2, 48), (2, 0, 84), (2, 1, 45), (3, 0, 42)];
        for (down, timeouts, max_secs) in cases {
            assert!(
                can_kneel(3, timeouts, max_secs, down),
                "down={} timeouts={} at {}s should kneel",
                down,
                timeouts,
                max_secs
            );
            assert!(
                !can_kneel(3, timeouts, max_secs + 1, down),
                "down={} timeouts={} at {}s should not kneel",
                down,
                timeouts,
                max_secs + 1
            );
        }
    }

    #[test]
    fn kneel_combinations_outside_table_are_false() {
        // Defense holding three timeouts can always stop the clock.
        assert!(!can_kneel(3, 3, 10, 1));
        assert!(!can_kneel(3, 2, 10, 2));
        assert!(!can_kneel(3, 1, 10, 3));
    }

    // ── Quarter derivation ───────────────────────────────────────────────────

    #[test]
    fn quarter_breakpoints() {
        assert_eq!(quarter(3600), 1);
        assert_eq!(quarter(2701), 1);
        assert_eq!(quarter(2700), 2);
        assert_eq!(quarter(1801), 2);
        assert_eq!(quarter(1800), 3);
        assert_eq!(quarter(901), 3);
        assert_eq!(quarter(900), 4);
        assert_eq!(quarter(0), 4);
    }

    // ── Construction ─────────────────────────────────────────────────────────

    #[test]
    fn derived_fields_computed_at_construction() {
        let mut input = base_input();
        input.seconds_remaining = 600;
        input.score_differential = -3;
        let sit = Situation::from_input(input).unwrap();
        assert_eq!(sit.quarter, 4);
        assert_eq!(sit.quarter_score_interaction, -12);
        assert!(!sit.can_kneel);
        assert!(sit.possession_probability.is_none());
    }

    #[test]
    fn spread_decays_with_time_remaining() {
        let mut input = base_input();
        input.point_spread = -6.0;
        input.seconds_remaining = 900;
        let sit = Situation::from_input(input).unwrap();
        assert_relative_eq!(sit.point_spread, -1.5, epsilon = 1e-9);
    }

    #[test]
    fn goal_to_go_at_exact_boundary() {
        let mut input = base_input();
        input.yards_from_own_goal = 98;
        input.yards_to_go = 2;
        assert!(Situation::from_input(input).unwrap().is_goal_to_go());

        let mut input = base_input();
        input.yards_from_own_goal = 97;
        input.yards_to_go = 2;
        assert!(!Situation::from_input(input).unwrap().is_goal_to_go());
    }

    #[test]
    fn rejects_out_of_range_fields() {
        let mut input = base_input();
        input.down = 5;
        assert!(matches!(
            Situation::from_input(input),
            Err(EngineError::InvalidSituation(_))
        ));

        let mut input = base_input();
        input.yards_from_own_goal = 101;
        assert!(Situation::from_input(input).is_err());

        let mut input = base_input();
        input.yards_from_own_goal = 99;
        input.yards_to_go = 5;
        assert!(Situation::from_input(input).is_err());

        let mut input = base_input();
        input.offense_timeouts = 4;
        assert!(Situation::from_input(input).is_err());

        let mut input = base_input();
        input.fg_make_probability = Some(1.2);
        assert!(Situation::from_input(input).is_err());
    }

    #[test]
    fn feature_values_by_name() {
        let sit = Situation::from_input(base_input()).unwrap();
        assert_relative_eq!(sit.feature_value("down").unwrap(), 4.0);
        assert_relative_eq!(sit.feature_value("yards_from_own_goal").unwrap(), 45.0);
        assert_relative_eq!(sit.feature_value("can_kneel").unwrap(), 0.0);
        assert!(sit.feature_value("no_such_feature").is_none());
    }
}
