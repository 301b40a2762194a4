//! Parallel evaluation of independent episodes.
//!
//! Every episode owns its game and random source, so episodes are spread
//! over the rayon pool with no locking. Results come back in seed order.

use crate::fitness::{EpisodeEnd, EpisodeReport, EvalError, FitnessEvaluator};
use crate::policy::ControlPolicy;
use rayon::prelude::*;
use serde::Serialize;

pub fn evaluate_seeds<P>(
    evaluator: &FitnessEvaluator,
    seeds: &[u64],
    policy: &P,
) -> Result<Vec<EpisodeReport>, EvalError>
where
    P: ControlPolicy + Sync + ?Sized,
{
    seeds
        .par_iter()
        .map(|&seed| evaluator.run_episode(seed, policy))
        .collect()
}

/// Mean fitness over `seeds`; 0 for an empty slice.
pub fn mean_fitness<P>(evaluator: &FitnessEvaluator, seeds: &[u64], policy: &P) -> Result<f64, EvalError>
where
    P: ControlPolicy + Sync + ?Sized,
{
    let reports = evaluate_seeds(evaluator, seeds, policy)?;
    Ok(BatchSummary::from_reports(&reports).map_or(0.0, |s| s.mean_fitness))
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BatchSummary {
    pub episodes: usize,
    pub mean_fitness: f64,
    pub best_fitness: f64,
    pub mean_score: f64,
    pub max_score: u32,
    pub collisions: usize,
}

impl BatchSummary {
    pub fn from_reports(reports: &[EpisodeReport]) -> Option<Self> {
        if reports.is_empty() {
            return None;
        }
        let n = reports.len() as f64;
        // Summed in seed order so the result does not depend on scheduling.
        let total: f64 = reports.iter().map(|r| r.fitness).sum();
        let score_total: u64 = reports.iter().map(|r| u64::from(r.score)).sum();
        Some(Self {
            episodes: reports.len(),
            mean_fitness: total / n,
            best_fitness: reports.iter().map(|r| r.fitness).fold(f64::NEG_INFINITY, f64::max),
            mean_score: score_total as f64 / n,
            max_score: reports.iter().map(|r| r.score).max().unwrap_or(0),
            collisions: reports
                .iter()
                .filter(|r| matches!(r.end, EpisodeEnd::Collision(_)))
                .count(),
        })
    }
}
