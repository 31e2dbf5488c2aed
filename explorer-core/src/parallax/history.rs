//! Exploration history and its portable form.

use serde::{Deserialize, Serialize};

use crate::model::{ParallaxRequest, ParallaxStep, Seed};
use crate::Result;

/// A committed step together with the seed that was in force when it was
/// committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub step: ParallaxStep,
    pub seed: Seed,
}

/// One breadcrumb. Index -1 is always the seed; index `i` is `history[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Breadcrumb {
    Seed(Seed),
    Step { index: usize, step: ParallaxStep },
}

impl Breadcrumb {
    pub fn index(&self) -> isize {
        match self {
            Self::Seed(_) => -1,
            Self::Step { index, .. } => *index as isize,
        }
    }
}

/// Everything needed to replay an exploration: the seed and the ordered
/// steps.
///
/// Replay is a pure function of the chain, so a chain exported from one
/// session reproduces the same view in another.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReplayChain {
    pub seed: Seed,
    pub steps: Vec<ParallaxStep>,
}

impl ReplayChain {
    pub fn new(seed: Seed, steps: Vec<ParallaxStep>) -> Self {
        Self { seed, steps }
    }

    pub fn request(&self) -> ParallaxRequest {
        ParallaxRequest::new(&self.seed, &self.steps)
    }

    /// History entries for this chain, each recording the chain's seed.
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.steps
            .iter()
            .map(|step| HistoryEntry {
                step: step.clone(),
                seed: self.seed.clone(),
            })
            .collect()
    }

    pub fn to_msgpack(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}
