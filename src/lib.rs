//! snake-eval: deterministic grid snake for scoring control policies.
//!
//! The crate provides:
//! - `game::Game`, the grid simulation with an owned, seedable random source
//! - `sensor::encode`, the 32 value egocentric sensor vector
//! - `policy::ControlPolicy`, the seam where any decision maker plugs in
//! - `fitness::FitnessEvaluator`, the shaped per-episode fitness protocol
//! - `batch` and `evolve` for running many episodes and a small search loop
//!
//! Quick start:
//! ```
//! use snake_eval::policy::GreedyPolicy;
//!
//! let policy = GreedyPolicy::new(17, 17);
//! let a = snake_eval::run_episode(7, &policy).unwrap();
//! let b = snake_eval::run_episode(7, &policy).unwrap();
//! assert_eq!(a, b);
//! ```

pub mod batch;
pub mod config;
pub mod evolve;
pub mod fitness;
pub mod game;
pub mod network;
pub mod policy;
pub mod pos;
pub mod sensor;

pub use config::{BoardConfig, Config, FitnessConfig};
pub use fitness::{EpisodeReport, EvalError, FitnessEvaluator};
pub use game::{Collision, Dir, Game, GameError, Status, StepOutcome};
pub use policy::ControlPolicy;
pub use pos::Pos;
pub use sensor::SensorVector;

/// Fresh game on `board`, fully determined by `seed`.
pub fn new_episode(board: BoardConfig, seed: u64) -> Result<Game, GameError> {
    Game::new(board.width, board.height, seed)
}

/// Sensor vector for the current state of `game`.
pub fn encode(game: &Game) -> SensorVector {
    sensor::encode(&game.snapshot())
}

/// Request a heading, then advance one tick.
pub fn step(game: &mut Game, dir: Dir) -> StepOutcome {
    game.request_direction(dir);
    game.step()
}

/// Fitness of `policy` over one episode on the default board.
pub fn run_episode<P: ControlPolicy + ?Sized>(seed: u64, policy: &P) -> Result<f64, EvalError> {
    FitnessEvaluator::default()
        .run_episode(seed, policy)
        .map(|report| report.fitness)
}
