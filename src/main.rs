use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use snake_eval::FitnessEvaluator;
use snake_eval::batch::{BatchSummary, evaluate_seeds};
use snake_eval::config::Config;
use snake_eval::evolve::{Trainer, Winner};
use snake_eval::network::FeedForward;
use snake_eval::policy::{ControlPolicy, GreedyPolicy};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "snake-eval")]
#[command(version)]
#[command(about = "Deterministic snake episodes for scoring control policies")]
struct Cli {
    /// Configuration file (JSON); defaults are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration file
    Init {
        #[arg(short, long, default_value = "snake.json")]
        output: PathBuf,
    },

    /// Run episodes and print one JSON report per line
    Eval {
        /// First episode seed; episode i uses seed + i
        #[arg(short, long, default_value = "0")]
        seed: u64,

        #[arg(short, long, default_value = "10")]
        episodes: u64,

        /// Saved winner to evaluate
        #[arg(short, long, conflicts_with = "greedy")]
        winner: Option<PathBuf>,

        /// Use the hand-written baseline instead of a network
        #[arg(long)]
        greedy: bool,
    },

    /// Search for a policy and save the best one
    Train {
        /// Overrides evolution.generations from the config
        #[arg(short, long)]
        generations: Option<usize>,

        #[arg(short, long, default_value = "winner.json")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };

    let env = env_logger::Env::default().default_filter_or(config.logging.level.as_str());
    env_logger::Builder::from_env(env).init();

    match cli.command {
        Commands::Init { output } => {
            Config::default()
                .save(&output)
                .with_context(|| format!("writing {}", output.display()))?;
            log::info!("wrote default config to {}", output.display());
        }
        Commands::Eval { seed, episodes, winner, greedy } => {
            let policy = pick_policy(&config, seed, winner, greedy)?;
            eval(&config, seed, episodes, policy.as_ref())?;
        }
        Commands::Train { generations, output } => {
            train(&config, generations, output)?;
        }
    }
    Ok(())
}

fn pick_policy(
    config: &Config,
    seed: u64,
    winner: Option<PathBuf>,
    greedy: bool,
) -> Result<Box<dyn ControlPolicy + Sync>> {
    if greedy {
        return Ok(Box::new(GreedyPolicy::new(config.board.width, config.board.height)));
    }
    if let Some(path) = winner {
        let w = Winner::load(&path).with_context(|| format!("loading winner {}", path.display()))?;
        log::info!("loaded winner from generation {} (fitness {:.2})", w.generation, w.fitness);
        return Ok(Box::new(w.network));
    }
    let mut rng = StdRng::seed_from_u64(seed);
    log::info!("no winner given, evaluating a random network");
    Ok(Box::new(FeedForward::for_snake(config.evolution.hidden, &mut rng)))
}

fn eval(config: &Config, seed: u64, episodes: u64, policy: &(dyn ControlPolicy + Sync)) -> Result<()> {
    if episodes == 0 {
        bail!("--episodes must be at least 1");
    }
    let evaluator = FitnessEvaluator::new(config.board, config.fitness.clone());
    let seeds: Vec<u64> = (0..episodes).map(|i| seed.wrapping_add(i)).collect();

    let started = Instant::now();
    let reports = evaluate_seeds(&evaluator, &seeds, policy).context("episode aborted")?;
    let elapsed = started.elapsed();

    for report in &reports {
        println!("{}", serde_json::to_string(report)?);
    }
    if let Some(summary) = BatchSummary::from_reports(&reports) {
        log::info!(
            "{} episodes in {:.2?}: mean fitness {:.2}, best {:.2}, max score {}",
            summary.episodes,
            elapsed,
            summary.mean_fitness,
            summary.best_fitness,
            summary.max_score
        );
        println!("{}", serde_json::to_string(&summary)?);
    }
    Ok(())
}

fn train(config: &Config, generations: Option<usize>, output: PathBuf) -> Result<()> {
    let generations = generations.unwrap_or(config.evolution.generations);
    let evaluator = FitnessEvaluator::new(config.board, config.fitness.clone());
    let mut trainer =
        Trainer::new(evaluator, config.evolution.clone()).context("invalid evolution settings")?;

    let started = Instant::now();
    for _ in 0..generations {
        trainer.step_generation().context("evaluating generation")?;
    }
    log::info!("{} generations in {:.2?}", generations, started.elapsed());

    let Some(winner) = trainer.into_best() else {
        bail!("no generation was evaluated; nothing to save");
    };
    winner
        .save(&output)
        .with_context(|| format!("writing {}", output.display()))?;
    log::info!(
        "saved winner from generation {} (fitness {:.2}) to {}",
        winner.generation,
        winner.fitness,
        output.display()
    );
    Ok(())
}
