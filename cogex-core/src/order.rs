use crate::error::DesignError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Randomization scheme for the stimulus-condition sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Random,
    Blocked,
    Msequence,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Random => "random",
            OrderType::Blocked => "blocked",
            OrderType::Msequence => "msequence",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderType {
    type Err = DesignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(OrderType::Random),
            "blocked" => Ok(OrderType::Blocked),
            "msequence" => Ok(OrderType::Msequence),
            other => Err(DesignError::invalid(format!("'{other}' not known"))),
        }
    }
}

/// Condition index per trial, every entry in `[0, nstim)`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StimulusOrder(Vec<usize>);

impl StimulusOrder {
    pub fn new(labels: Vec<usize>) -> Self {
        Self(labels)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<usize> {
        self.0
    }

    /// Maximal runs of identical labels as `(label, run_length)` pairs
    pub fn runs(&self) -> Vec<(usize, usize)> {
        let mut runs: Vec<(usize, usize)> = Vec::new();
        for &label in &self.0 {
            match runs.last_mut() {
                Some((last, len)) if *last == label => *len += 1,
                _ => runs.push((label, 1)),
            }
        }
        runs
    }

    /// Number of trials assigned to each of `nstim` conditions
    pub fn counts(&self, nstim: usize) -> Vec<usize> {
        let mut counts = vec![0; nstim];
        for &label in &self.0 {
            if let Some(c) = counts.get_mut(label) {
                *c += 1;
            }
        }
        counts
    }
}

impl AsRef<[usize]> for StimulusOrder {
    fn as_ref(&self) -> &[usize] {
        &self.0
    }
}

impl From<Vec<usize>> for StimulusOrder {
    fn from(labels: Vec<usize>) -> Self {
        Self(labels)
    }
}
