//! Simple evolutionary search over `FeedForward` policies.
//!
//! Each generation every individual plays the same set of episodes and is
//! scored by its mean fitness. The best individual survives unchanged and
//! the rest of the next population are its mutated copies.

use crate::batch::mean_fitness;
use crate::config::{ConfigError, EvolutionConfig};
use crate::fitness::{EvalError, FitnessEvaluator};
use crate::network::FeedForward;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WinnerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("stored network has inconsistent layer sizes")]
    Malformed,
}

/// Best network found so far and the generation that produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Winner {
    pub generation: usize,
    pub fitness: f64,
    pub network: FeedForward,
}

impl Winner {
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), WinnerError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, WinnerError> {
        let contents = std::fs::read_to_string(path)?;
        let winner: Winner = serde_json::from_str(&contents)?;
        if !winner.network.is_valid() {
            return Err(WinnerError::Malformed);
        }
        Ok(winner)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GenerationSummary {
    pub generation: usize,
    pub best: f64,
    pub mean: f64,
    pub best_ever: f64,
}

pub struct Trainer {
    evaluator: FitnessEvaluator,
    config: EvolutionConfig,
    pop: Vec<FeedForward>,
    generation: usize,
    generation_best: Vec<f64>,
    best: Option<Winner>,
    rng: SmallRng,
}

impl Trainer {
    pub fn new(evaluator: FitnessEvaluator, config: EvolutionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = SmallRng::seed_from_u64(config.seed);
        let pop = (0..config.population)
            .map(|_| FeedForward::for_snake(config.hidden, &mut rng))
            .collect();
        Ok(Self {
            evaluator,
            config,
            pop,
            generation: 0,
            generation_best: Vec::new(),
            best: None,
            rng,
        })
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn population(&self) -> &[FeedForward] {
        &self.pop
    }

    /// Best fitness of each finished generation.
    pub fn history(&self) -> &[f64] {
        &self.generation_best
    }

    pub fn best(&self) -> Option<&Winner> {
        self.best.as_ref()
    }

    pub fn into_best(self) -> Option<Winner> {
        self.best
    }

    /// Evaluate the current population, then replace it with the next one.
    pub fn step_generation(&mut self) -> Result<GenerationSummary, EvalError> {
        let seeds: Vec<u64> = (0..self.config.episodes)
            .map(|_| self.rng.r#gen::<u64>())
            .collect();
        let evaluator = &self.evaluator;
        let scores: Vec<f64> = self
            .pop
            .par_iter()
            .map(|net| mean_fitness(evaluator, &seeds, net))
            .collect::<Result<_, _>>()?;

        let mut best_idx = 0usize;
        for (i, &s) in scores.iter().enumerate() {
            if s > scores[best_idx] {
                best_idx = i;
            }
        }
        let best_score = scores[best_idx];
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        self.generation_best.push(best_score);

        if self.best.as_ref().is_none_or(|w| best_score > w.fitness) {
            self.best = Some(Winner {
                generation: self.generation,
                fitness: best_score,
                network: self.pop[best_idx].clone(),
            });
        }
        let best_ever = self.best.as_ref().map_or(best_score, |w| w.fitness);

        log::info!(
            "generation {}: best {:.2} mean {:.2} best ever {:.2}",
            self.generation,
            best_score,
            mean,
            best_ever
        );

        self.reproduce(best_idx);
        let summary = GenerationSummary {
            generation: self.generation,
            best: best_score,
            mean,
            best_ever,
        };
        self.generation += 1;
        Ok(summary)
    }

    pub fn run(&mut self, generations: usize) -> Result<Vec<GenerationSummary>, EvalError> {
        (0..generations).map(|_| self.step_generation()).collect()
    }

    // Keep the single best parent; fill the rest with its mutated copies.
    fn reproduce(&mut self, best_idx: usize) {
        let parent = self.pop[best_idx].clone();
        let size = self.pop.len();
        let mut next = Vec::with_capacity(size);
        next.push(parent.clone());
        while next.len() < size {
            let mut child = parent.clone();
            child.mutate(&mut self.rng, self.config.mutation_sigma);
            next.push(child);
        }
        self.pop = next;
    }
}
