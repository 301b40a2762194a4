//! Shaped fitness evaluation of a policy over one episode.
//!
//! Each tick: encode the game, ask the policy, steer, step, then score the
//! tick. Moving toward the food pays `scale * approach_reward` per cell,
//! moving away costs `retreat_penalty` per cell, and every tick costs
//! `step_cost`. Eating pays `scale * food_reward`, where
//! `scale = max(1, length_scale * length)`. Revisiting a cell more than
//! `repeat_limit` times within the last `memory_window` ticks costs
//! `loop_penalty` once for that tick. The episode stops on collision
//! (minus `collision_penalty`) or after `max_steps_without_food` ticks
//! without eating.

use crate::config::{BoardConfig, FitnessConfig};
use crate::game::{Collision, Game, GameError, Status, StepOutcome};
use crate::policy::{ControlPolicy, PolicyError, SelectError, select_direction};
use crate::pos::Pos;
use crate::sensor::encode;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error(transparent)]
    Game(#[from] GameError),
    #[error("policy failed at tick {tick}: {source}")]
    Policy {
        tick: u32,
        #[source]
        source: PolicyError,
    },
    #[error("unusable policy output at tick {tick}: {source}")]
    Output {
        tick: u32,
        #[source]
        source: SelectError,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpisodeEnd {
    Collision(Collision),
    /// Ran out of ticks without eating.
    Starved,
    /// Stopped by the caller before either of the above.
    Stopped,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpisodeReport {
    pub seed: u64,
    pub fitness: f64,
    pub score: u32,
    pub length: usize,
    pub ticks: u32,
    pub end: EpisodeEnd,
}

/// Sliding window of recent head positions.
#[derive(Clone, Debug)]
pub struct PositionMemory {
    cells: VecDeque<Pos>,
    capacity: usize,
}

impl PositionMemory {
    pub fn new(capacity: usize) -> Self {
        Self { cells: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn push(&mut self, p: Pos) {
        if self.capacity == 0 {
            return;
        }
        while self.cells.len() >= self.capacity {
            self.cells.pop_front();
        }
        self.cells.push_back(p);
    }

    pub fn occurrences(&self, p: Pos) -> usize {
        self.cells.iter().filter(|&&c| c == p).count()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// One episode in progress. Between `tick` calls the game is always in a
/// consistent state, so a caller may stop at any point and still `finish`.
#[derive(Clone, Debug)]
pub struct Episode {
    config: FitnessConfig,
    seed: u64,
    game: Game,
    fitness: f64,
    ticks: u32,
    steps_without_food: u32,
    memory: PositionMemory,
}

impl Episode {
    pub fn new(board: BoardConfig, config: FitnessConfig, seed: u64) -> Result<Self, EvalError> {
        let game = Game::new(board.width, board.height, seed)?;
        Ok(Self::with_game(game, config, seed))
    }

    /// Start from an already prepared game (scenario replay, tests).
    pub fn with_game(game: Game, config: FitnessConfig, seed: u64) -> Self {
        let memory = PositionMemory::new(config.memory_window);
        Self {
            config,
            seed,
            game,
            fitness: 0.0,
            ticks: 0,
            steps_without_food: 0,
            memory,
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Accumulated fitness, without the collision penalty.
    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn steps_without_food(&self) -> u32 {
        self.steps_without_food
    }

    pub fn is_finished(&self) -> bool {
        self.game.is_terminal() || self.steps_without_food >= self.config.max_steps_without_food
    }

    /// Advance one tick. Returns `None` once the episode is finished. On
    /// error the game has not been stepped.
    pub fn tick<P: ControlPolicy + ?Sized>(
        &mut self,
        policy: &P,
    ) -> Result<Option<StepOutcome>, EvalError> {
        if self.is_finished() {
            return Ok(None);
        }
        let tick = self.ticks;
        let old_distance = self.game.food_distance();
        let old_score = self.game.score();

        let inputs = encode(&self.game.snapshot());
        let outputs = policy
            .activate(&inputs)
            .map_err(|source| EvalError::Policy { tick, source })?;
        let dir = select_direction(&outputs).map_err(|source| EvalError::Output { tick, source })?;

        self.game.request_direction(dir);
        let outcome = self.game.step();
        self.ticks += 1;

        let cfg = &self.config;
        let new_distance = self.game.food_distance();
        let scale = (cfg.length_scale * self.game.snake_len() as f64).max(1.0);

        if old_distance > new_distance {
            self.fitness += scale * cfg.approach_reward * f64::from(old_distance - new_distance);
        } else if new_distance > old_distance {
            self.fitness -= cfg.retreat_penalty * f64::from(new_distance - old_distance);
        }
        self.fitness -= cfg.step_cost;

        if self.game.score() > old_score {
            self.fitness += scale * cfg.food_reward;
            self.steps_without_food = 0;
            self.memory.clear();
        } else {
            self.steps_without_food += 1;
        }

        let head = self.game.head();
        self.memory.push(head);
        if self.memory.occurrences(head) > cfg.repeat_limit {
            self.fitness -= cfg.loop_penalty;
        }

        Ok(Some(outcome))
    }

    pub fn finish(self) -> EpisodeReport {
        let mut fitness = self.fitness;
        let end = match self.game.status() {
            Status::Terminal(kind) => {
                fitness -= self.config.collision_penalty;
                EpisodeEnd::Collision(kind)
            }
            Status::Active if self.steps_without_food >= self.config.max_steps_without_food => {
                EpisodeEnd::Starved
            }
            Status::Active => EpisodeEnd::Stopped,
        };
        EpisodeReport {
            seed: self.seed,
            fitness,
            score: self.game.score(),
            length: self.game.snake_len(),
            ticks: self.ticks,
            end,
        }
    }
}

/// Runs complete episodes on a fixed board with fixed shaping constants.
#[derive(Clone, Debug, Default)]
pub struct FitnessEvaluator {
    board: BoardConfig,
    config: FitnessConfig,
}

impl FitnessEvaluator {
    pub fn new(board: BoardConfig, config: FitnessConfig) -> Self {
        Self { board, config }
    }

    pub fn board(&self) -> BoardConfig {
        self.board
    }

    pub fn config(&self) -> &FitnessConfig {
        &self.config
    }

    pub fn start(&self, seed: u64) -> Result<Episode, EvalError> {
        Episode::new(self.board, self.config.clone(), seed)
    }

    /// A failing policy aborts the episode; no default move is substituted.
    pub fn run_episode<P: ControlPolicy + ?Sized>(
        &self,
        seed: u64,
        policy: &P,
    ) -> Result<EpisodeReport, EvalError> {
        let mut episode = self.start(seed)?;
        while episode.tick(policy)?.is_some() {}
        let report = episode.finish();
        log::trace!(
            "episode seed={} fitness={:.2} score={} ticks={} end={:?}",
            report.seed,
            report.fitness,
            report.score,
            report.ticks,
            report.end
        );
        Ok(report)
    }
}
