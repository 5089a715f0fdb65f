use thiserror::Error;

/// Errors surfaced by the decision engine.
///
/// Lookup misses in the rate tables are *not* errors — they are recovered
/// locally with documented defaults. Everything here is either a bad request
/// (`InvalidSituation`) or a build/version mismatch between the training
/// artifacts and the serving code, which is fatal and never retried.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The supplied game state fails a range invariant.
    #[error("invalid situation: {0}")]
    InvalidSituation(String),

    /// The scaler in the model artifact carries no fitted parameters. This
    /// usually means the artifact was produced by a different training build
    /// than the one this binary expects.
    #[error("feature scaler is not fitted; model artifact does not match the serving code")]
    ScalerNotFitted,

    /// The feature vector length disagrees with the scaler's fitted dimension.
    #[error("feature vector has {got} values but the scaler was fitted on {expected}")]
    FeatureLengthMismatch { expected: usize, got: usize },

    /// The model artifact's feature list names a field the engine does not
    /// know how to extract from a situation.
    #[error("unknown feature name in model artifact: {0}")]
    UnknownFeature(String),
}
