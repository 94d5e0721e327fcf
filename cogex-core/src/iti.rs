use crate::error::{DesignError, Result};
use cogex_timing::Grid;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Probability model the inter-trial intervals are drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionModel {
    Fixed,
    Uniform,
    Exponential,
}

impl DistributionModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistributionModel::Fixed => "fixed",
            DistributionModel::Uniform => "uniform",
            DistributionModel::Exponential => "exponential",
        }
    }
}

impl fmt::Display for DistributionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistributionModel {
    type Err = DesignError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fixed" => Ok(DistributionModel::Fixed),
            "uniform" => Ok(DistributionModel::Uniform),
            "exponential" => Ok(DistributionModel::Exponential),
            other => Err(DesignError::invalid(format!("'{other}' not known"))),
        }
    }
}

pub const DEFAULT_RESOLUTION: f64 = 0.1;

/// Parameters of an ITI draw. Which of the optional fields are required
/// depends on `model`: fixed needs `mean`, uniform needs `min` and `max`,
/// exponential needs all three. `lam` is the scale of the exponential
/// before truncation; when absent it is solved from the bounds and mean.
///
/// `validate` does not check `min <= mean <= max`. Only the `lam` solve
/// rejects an unreachable mean; with a supplied `lam`, or a uniform draw
/// fitted toward the requested mean, the fit simply ends as close to the
/// mean as the bounds allow, or fails with `ConvergenceFailure` once the
/// repair loop exhausts its picks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionParameters {
    pub model: DistributionModel,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub mean: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub lam: Option<f64>,
    #[serde(default = "default_resolution")]
    pub resolution: f64,
}

fn default_resolution() -> f64 {
    DEFAULT_RESOLUTION
}

impl DistributionParameters {
    pub fn fixed(mean: f64) -> Self {
        Self {
            model: DistributionModel::Fixed,
            min: None,
            mean: Some(mean),
            max: None,
            lam: None,
            resolution: DEFAULT_RESOLUTION,
        }
    }

    pub fn uniform(min: f64, max: f64) -> Self {
        Self {
            model: DistributionModel::Uniform,
            min: Some(min),
            mean: None,
            max: Some(max),
            lam: None,
            resolution: DEFAULT_RESOLUTION,
        }
    }

    pub fn exponential(min: f64, mean: f64, max: f64) -> Self {
        Self {
            model: DistributionModel::Exponential,
            min: Some(min),
            mean: Some(mean),
            max: Some(max),
            lam: None,
            resolution: DEFAULT_RESOLUTION,
        }
    }

    pub fn with_mean(mut self, mean: f64) -> Self {
        self.mean = Some(mean);
        self
    }

    pub fn with_lam(mut self, lam: f64) -> Self {
        self.lam = Some(lam);
        self
    }

    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn require_mean(&self) -> Result<f64> {
        require(self.mean, "mean", self.model)
    }

    /// `(min, max)` for the bounded models, rejecting empty or negative ranges
    pub fn require_bounds(&self) -> Result<(f64, f64)> {
        let min = require(self.min, "min", self.model)?;
        let max = require(self.max, "max", self.model)?;
        if min < 0.0 {
            return Err(DesignError::invalid(format!(
                "min must be non-negative, got {min}"
            )));
        }
        if min >= max {
            return Err(DesignError::invalid(format!(
                "min ({min}) must be smaller than max ({max})"
            )));
        }
        Ok((min, max))
    }

    /// Checks that every field the model needs is present and finite
    pub fn validate(&self) -> Result<()> {
        if !self.resolution.is_finite() || self.resolution <= 0.0 {
            return Err(DesignError::invalid(format!(
                "resolution must be positive, got {}",
                self.resolution
            )));
        }
        if let Some(lam) = self.lam {
            if !lam.is_finite() || lam <= 0.0 {
                return Err(DesignError::invalid(format!(
                    "lam must be positive, got {lam}"
                )));
            }
        }
        match self.model {
            DistributionModel::Fixed => {
                let mean = self.require_mean()?;
                if mean < 0.0 {
                    return Err(DesignError::invalid(format!(
                        "mean must be non-negative, got {mean}"
                    )));
                }
            }
            DistributionModel::Uniform => {
                self.require_bounds()?;
            }
            DistributionModel::Exponential => {
                self.require_bounds()?;
                self.require_mean()?;
            }
        }
        Ok(())
    }
}

fn require(value: Option<f64>, name: &str, model: DistributionModel) -> Result<f64> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        Some(v) => Err(DesignError::invalid(format!("{name} must be finite, got {v}"))),
        None => Err(DesignError::invalid(format!(
            "{name} is required for the {model} model"
        ))),
    }
}

/// Delay before each trial in seconds; the first trial has no delay
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItiSequence(Vec<f64>);

impl ItiSequence {
    /// Prepends the leading zero to the delays of trials `1..ntrials`
    pub fn from_delays(delays: Vec<f64>) -> Self {
        let mut values = Vec::with_capacity(delays.len() + 1);
        values.push(0.0);
        values.extend(delays);
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }

    /// Delays after the leading zero
    pub fn delays(&self) -> &[f64] {
        self.0.get(1..).unwrap_or(&[])
    }

    /// Mean of the delays after the leading zero, `None` for a single trial
    pub fn mean(&self) -> Option<f64> {
        let delays = self.delays();
        if delays.is_empty() {
            None
        } else {
            Some(delays.iter().sum::<f64>() / delays.len() as f64)
        }
    }

    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn to_durations(&self) -> Vec<Duration> {
        self.0.iter().copied().map(Grid::to_duration).collect()
    }
}

impl AsRef<[f64]> for ItiSequence {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_model_names_the_value() {
        let err = "gamma".parse::<DistributionModel>().unwrap_err();
        assert_eq!(err, DesignError::invalid("'gamma' not known"));
    }

    #[test]
    fn exponential_requires_mean() {
        let mut params = DistributionParameters::exponential(0.5, 3.0, 8.0);
        params.mean = None;
        let err = params.validate().unwrap_err();
        assert!(matches!(err, DesignError::InvalidArgument(ref m) if m.contains("mean")));
    }

    #[test]
    fn uniform_rejects_inverted_bounds() {
        let params = DistributionParameters::uniform(4.0, 2.0);
        assert!(params.validate().is_err());
        assert!(DistributionParameters::uniform(2.0, 4.0).validate().is_ok());
    }

    #[test]
    fn fixed_needs_only_mean() {
        assert!(DistributionParameters::fixed(2.0).validate().is_ok());
        let bad = DistributionParameters::fixed(2.0).with_resolution(0.0);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn sequence_statistics_skip_leading_zero() {
        let seq = ItiSequence::from_delays(vec![1.0, 2.0, 3.0]);
        assert_eq!(seq.as_slice(), &[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(seq.mean(), Some(2.0));
        assert_eq!(seq.total(), 6.0);
        assert_eq!(seq.to_durations()[2], Duration::from_secs(2));
        assert_eq!(ItiSequence::from_delays(Vec::new()).mean(), None);
    }

    #[test]
    fn parameters_deserialize_with_default_resolution() {
        let params: DistributionParameters =
            serde_json::from_str(r#"{"model": "uniform", "min": 1.0, "max": 3.0}"#).unwrap();
        assert_eq!(params.resolution, DEFAULT_RESOLUTION);
        assert_eq!(params, DistributionParameters::uniform(1.0, 3.0));
    }
}
