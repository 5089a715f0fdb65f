//! Pre-fitted win-probability model artifacts.
//!
//! Training happens offline; this crate only consumes the result. The
//! artifact is a JSON file carrying the ordered feature list, the logistic
//! regression coefficients, and the standard-scaler parameters. All three
//! must come from the same training run — a dimension mismatch is a fatal
//! configuration error, never retried.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Seam for the classifier so tests can substitute a fixed-output stub.
pub trait WinProbabilityModel: Send + Sync {
    /// Win probability, in [0, 1], for the offense described by the scaled
    /// feature vector.
    fn predict_win_probability(&self, features: &[f64]) -> f64;
}

/// Logistic regression over standardized features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl WinProbabilityModel for LogisticModel {
    fn predict_win_probability(&self, features: &[f64]) -> f64 {
        let z = self
            .coefficients
            .iter()
            .zip(features)
            .map(|(c, x)| c * x)
            .sum::<f64>()
            + self.intercept;
        sigmoid(z)
    }
}

/// Per-feature standardization: `(x - mean) / scale`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn transform(&self, features: &[f64]) -> Result<Vec<f64>, EngineError> {
        if self.mean.is_empty() || self.mean.len() != self.scale.len() {
            return Err(EngineError::ScalerNotFitted);
        }
        if features.len() != self.mean.len() {
            return Err(EngineError::FeatureLengthMismatch {
                expected: self.mean.len(),
                got: features.len(),
            });
        }
        Ok(features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| if *s == 0.0 { x - m } else { (x - m) / s })
            .collect())
    }

    /// Identity scaler of the given dimension, for tests and fixtures.
    pub fn identity(dim: usize) -> Self {
        StandardScaler { mean: vec![0.0; dim], scale: vec![1.0; dim] }
    }
}

/// The on-disk model bundle: feature order, classifier, and scaler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub features: Vec<String>,
    pub model: LogisticModel,
    pub scaler: StandardScaler,
}

impl ModelArtifact {
    pub fn load(path: &Path) -> Result<Self> {
        let mut raw = String::new();
        File::open(path)
            .with_context(|| format!("failed to open model artifact {}", path.display()))?
            .read_to_string(&mut raw)
            .with_context(|| format!("failed to read model artifact {}", path.display()))?;
        let artifact: ModelArtifact = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse model artifact {}", path.display()))?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// All three components must agree on the feature dimension.
    pub fn validate(&self) -> Result<()> {
        let dim = self.features.len();
        if dim == 0 {
            anyhow::bail!("model artifact declares no features");
        }
        if self.model.coefficients.len() != dim {
            anyhow::bail!(
                "model has {} coefficients for {} features",
                self.model.coefficients.len(),
                dim
            );
        }
        if self.scaler.mean.len() != dim || self.scaler.scale.len() != dim {
            anyhow::bail!(
                "scaler dimension {}x{} does not match {} features",
                self.scaler.mean.len(),
                self.scaler.scale.len(),
                dim
            );
        }
        Ok(())
    }
}

/// Numerically stable logistic sigmoid.
fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sigmoid_properties() {
        assert_relative_eq!(sigmoid(0.0), 0.5, epsilon = 1e-12);
        assert!(sigmoid(20.0) > 0.999);
        assert!(sigmoid(-20.0) < 0.001);
        assert_relative_eq!(sigmoid(3.0) + sigmoid(-3.0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn logistic_model_scores_linear_combination() {
        let model = LogisticModel { coefficients: vec![1.0, -2.0], intercept: 0.5 };
        let p = model.predict_win_probability(&[2.0, 1.0]);
        // z = 2.0 - 2.0 + 0.5
        assert_relative_eq!(p, sigmoid(0.5), epsilon = 1e-12);
    }

    #[test]
    fn scaler_standardizes() {
        let scaler = StandardScaler { mean: vec![10.0, 0.0], scale: vec![2.0, 1.0] };
        let out = scaler.transform(&[14.0, -3.0]).unwrap();
        assert_relative_eq!(out[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(out[1], -3.0, epsilon = 1e-12);
    }

    #[test]
    fn unfitted_scaler_is_a_configuration_error() {
        let scaler = StandardScaler::default();
        assert!(matches!(
            scaler.transform(&[1.0]),
            Err(EngineError::ScalerNotFitted)
        ));
    }

    #[test]
    fn length_mismatch_is_a_configuration_error() {
        let scaler = StandardScaler::identity(3);
        assert!(matches!(
            scaler.transform(&[1.0, 2.0]),
            Err(EngineError::FeatureLengthMismatch { expected: 3, got: 2 })
        ));
    }

    #[test]
    fn zero_scale_falls_back_to_centering() {
        let scaler = StandardScaler { mean: vec![5.0], scale: vec![0.0] };
        let out = scaler.transform(&[7.0]).unwrap();
        assert_relative_eq!(out[0], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn artifact_round_trips_from_json() {
        let raw = r#"{
            "features": ["down", "score_differential"],
            "model": {"coefficients": [0.1, 0.9], "intercept": -0.05},
            "scaler": {"mean": [2.5, 0.0], "scale": [1.1, 9.8]}
        }"#;
        let artifact: ModelArtifact = serde_json::from_str(raw).unwrap();
        artifact.validate().unwrap();
        assert_eq!(artifact.features.len(), 2);
        assert_relative_eq!(artifact.model.intercept, -0.05);
    }

    #[test]
    fn artifact_rejects_dimension_mismatch() {
        let artifact = ModelArtifact {
            features: vec!["down".into(), "quarter".into()],
            model: LogisticModel { coefficients: vec![0.1], intercept: 0.0 },
            scaler: StandardScaler::identity(2),
        };
        assert!(artifact.validate().is_err());
    }
}
