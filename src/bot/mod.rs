pub mod decision;
pub mod engine;
pub mod plays;
pub mod situation;
pub mod win_probability;

pub use engine::{decide, DecisionResponse};
pub use situation::{Situation, SituationInput};
