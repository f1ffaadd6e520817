//! PuzzleBench - chess puzzle benchmark runner for decision-making agents.
//!
//! The `puzzlebench` command evaluates an agent against a puzzle pack and
//! maintains its Glicko-2 rating across runs.
//!
//! ## Commands
//!
//! - `run`: Evaluate an agent over a puzzle pack
//! - `leaderboard`: Show current ratings for all evaluated agents
//! - `incomplete`: List games that never reached a terminal outcome
//! - `validate`: Check a puzzle pack for solution coverage

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;

use puzzlebench_agents::{LlmAgent, OpenRouterProvider, RandomAgent};
use puzzlebench_core::{
    Agent, BatchConfig, BatchOrchestrator, GameStore, PuzzlePack, RatingTriple,
    DEFAULT_MAX_CONCURRENT,
};
use puzzlebench_store::{JsonGameStore, MemoryGameStore};

#[derive(Parser)]
#[command(name = "puzzlebench")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Chess puzzle benchmark for decision-making agents", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AgentKind {
    /// Uniformly random legal play
    Random,

    /// Chat model via OpenRouter
    Llm,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an agent over a puzzle pack
    Run {
        /// Puzzle pack JSON file
        pack: PathBuf,

        /// Agent implementation to evaluate
        #[arg(long, value_enum, default_value = "random")]
        agent: AgentKind,

        /// Model name (required for --agent llm)
        #[arg(long)]
        model: Option<String>,

        /// Flag the model as a reasoning model
        #[arg(long)]
        reasoning: bool,

        /// OpenRouter API key
        #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// RNG seed for the random agent (entropy-seeded if omitted)
        #[arg(long)]
        seed: Option<u64>,

        /// Maximum evaluations running at once
        #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT)]
        concurrency: usize,

        /// Stop early once the rating deviation drops to this value
        #[arg(long)]
        target_deviation: Option<f64>,

        /// Game store file
        #[arg(long, default_value = ".puzzlebench/games.json")]
        store: PathBuf,

        /// Use an in-memory store (nothing persisted across runs)
        #[arg(long)]
        memory: bool,
    },

    /// Show current ratings for all evaluated agents
    Leaderboard {
        /// Game store file
        #[arg(long, default_value = ".puzzlebench/games.json")]
        store: PathBuf,
    },

    /// List games that never reached a terminal outcome
    Incomplete {
        /// Agent name to inspect
        agent: String,

        /// Game store file
        #[arg(long, default_value = ".puzzlebench/games.json")]
        store: PathBuf,
    },

    /// Check a puzzle pack for solution coverage
    Validate {
        /// Puzzle pack JSON file
        pack: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    puzzlebench_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Run {
            pack,
            agent,
            model,
            reasoning,
            api_key,
            seed,
            concurrency,
            target_deviation,
            store,
            memory,
        } => {
            cmd_run(
                &pack,
                agent,
                model.as_deref(),
                reasoning,
                api_key.as_deref(),
                seed,
                concurrency,
                target_deviation,
                &store,
                memory,
            )
            .await
        }
        Commands::Leaderboard { store } => cmd_leaderboard(&store).await,
        Commands::Incomplete { agent, store } => cmd_incomplete(&agent, &store).await,
        Commands::Validate { pack } => cmd_validate(&pack),
    }
}

fn open_store(path: &PathBuf, memory: bool) -> Result<Arc<dyn GameStore>> {
    if memory {
        return Ok(Arc::new(MemoryGameStore::new()));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create store directory {:?}", parent))?;
        }
    }
    let store =
        JsonGameStore::open(path).with_context(|| format!("Failed to open store {:?}", path))?;
    Ok(Arc::new(store))
}

fn build_agent(
    kind: AgentKind,
    model: Option<&str>,
    reasoning: bool,
    api_key: Option<&str>,
    seed: Option<u64>,
) -> Result<Arc<dyn Agent>> {
    match kind {
        AgentKind::Random => {
            let agent = match seed {
                Some(seed) => RandomAgent::with_seed(seed),
                None => RandomAgent::new(),
            };
            Ok(Arc::new(agent))
        }
        AgentKind::Llm => {
            let model = model.context("--model is required with --agent llm")?;
            let api_key = api_key
                .context("--api-key (or OPENROUTER_API_KEY) is required with --agent llm")?;
            let provider = Arc::new(OpenRouterProvider::new(api_key));
            let agent = if reasoning {
                LlmAgent::reasoning(provider, model)
            } else {
                LlmAgent::new(provider, model)
            };
            Ok(Arc::new(agent))
        }
    }
}

/// Resume an agent from its last persisted rating snapshot, if any.
async fn resume_rating(store: &Arc<dyn GameStore>, agent_name: &str) -> Result<Option<RatingTriple>> {
    let snapshot = store.last_snapshot(agent_name).await?;
    Ok(snapshot.map(|s| RatingTriple {
        rating: s.rating,
        deviation: s.deviation,
        volatility: s.volatility,
    }))
}

#[allow(clippy::too_many_arguments)]
async fn cmd_run(
    pack_path: &PathBuf,
    kind: AgentKind,
    model: Option<&str>,
    reasoning: bool,
    api_key: Option<&str>,
    seed: Option<u64>,
    concurrency: usize,
    target_deviation: Option<f64>,
    store_path: &PathBuf,
    memory: bool,
) -> Result<()> {
    let pack = PuzzlePack::load(pack_path)
        .with_context(|| format!("Failed to load puzzle pack {:?}", pack_path))?;
    let oracle = Arc::new(pack.oracle());
    let store = open_store(store_path, memory)?;

    let mut agent = build_agent(kind, model, reasoning, api_key, seed)?;
    if let Some(resumed) = resume_rating(&store, &agent.profile().name).await? {
        println!(
            "Resuming {} at {:.0} (deviation {:.0})",
            agent.profile().name,
            resumed.rating,
            resumed.deviation
        );
        agent = Arc::new(ResumedAgent {
            inner: agent.clone(),
            profile: agent.profile().clone().with_initial_rating(resumed),
        });
    }

    let agent_name = agent.profile().name.clone();
    println!(
        "Evaluating {} over {} puzzles (concurrency {})",
        agent_name,
        pack.puzzles.len(),
        concurrency
    );

    let orchestrator = BatchOrchestrator::with_glicko2(
        agent,
        oracle,
        store,
        BatchConfig {
            max_concurrent: concurrency.max(1),
            target_deviation,
        },
    );
    let report = orchestrator.run(pack.puzzles).await;

    println!();
    println!("Evaluated: {}", report.evaluated);
    println!("  solved:  {}", report.succeeded);
    println!("  failed:  {}", report.failed);
    println!("Aborted:   {}", report.aborted);
    println!("Cancelled: {}", report.cancelled);
    println!();
    println!(
        "{}: {:.0} (deviation {:.0}, volatility {:.4})",
        agent_name,
        report.final_rating.rating,
        report.final_rating.deviation,
        report.final_rating.volatility
    );

    Ok(())
}

/// Wrapper that overrides an agent's starting rating with a resumed triple.
struct ResumedAgent {
    inner: Arc<dyn Agent>,
    profile: puzzlebench_core::AgentProfile,
}

#[async_trait::async_trait]
impl Agent for ResumedAgent {
    fn profile(&self) -> &puzzlebench_core::AgentProfile {
        &self.profile
    }

    async fn propose_move(
        &self,
        fen: &str,
        legal_moves: &[String],
        color: puzzlebench_core::Color,
    ) -> Option<puzzlebench_core::ProposedMove> {
        self.inner.propose_move(fen, legal_moves, color).await
    }

    async fn propose_retry(
        &self,
        rejected: &[String],
        fen: &str,
        legal_moves: &[String],
        color: puzzlebench_core::Color,
    ) -> Option<puzzlebench_core::ProposedMove> {
        self.inner
            .propose_retry(rejected, fen, legal_moves, color)
            .await
    }
}

async fn cmd_leaderboard(store_path: &PathBuf) -> Result<()> {
    let store = open_store(store_path, false)?;
    let standings = store.leaderboard().await?;

    if standings.is_empty() {
        println!("No rated agents yet. Run 'puzzlebench run' first.");
        return Ok(());
    }

    println!(
        "{:<30} {:>7} {:>9} {:>9} {:>7}",
        "agent", "rating", "deviation", "win rate", "games"
    );
    for standing in standings {
        println!(
            "{:<30} {:>7.0} {:>9.0} {:>8.0}% {:>7}",
            standing.name,
            standing.rating,
            standing.deviation,
            standing.win_rate * 100.0,
            standing.games_played
        );
    }

    Ok(())
}

async fn cmd_incomplete(agent_name: &str, store_path: &PathBuf) -> Result<()> {
    let store = open_store(store_path, false)?;
    let games = store.incomplete_games(agent_name).await?;

    if games.is_empty() {
        println!("No incomplete games for {}", agent_name);
        return Ok(());
    }

    for game in &games {
        println!(
            "{}  puzzle {}  {} move(s)  started {}",
            game.id,
            game.puzzle_id,
            game.moves.len(),
            game.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    println!("\n{} incomplete game(s)", games.len());

    Ok(())
}

fn cmd_validate(pack_path: &PathBuf) -> Result<()> {
    let pack = PuzzlePack::load(pack_path)
        .with_context(|| format!("Puzzle pack {:?} failed validation", pack_path))?;

    println!(
        "Pack OK: {} puzzles, {} positions covered",
        pack.puzzles.len(),
        pack.positions.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORK_PACK: &str = r#"{
        "puzzles": [{
            "id": "fork-1",
            "fen": "start w - - 4 4",
            "moves": "f3e5 c6e5",
            "rating": 1200,
            "rating_deviation": 100
        }],
        "positions": {
            "start w - - 4 4": {
                "legal": ["Nxe5"],
                "next": {"f3e5": "mid b - - 0 4", "Nxe5": "mid b - - 0 4"}
            },
            "mid b - - 0 4": {
                "legal": ["Nxe5", "Qe7"],
                "next": {
                    "c6e5": "end w - - 0 5",
                    "Nxe5": "end w - - 0 5",
                    "Qe7": "other w - - 1 5"
                }
            }
        }
    }"#;

    fn write_pack(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("pack.json");
        std::fs::write(&path, FORK_PACK).unwrap();
        path
    }

    #[test]
    fn test_validate_accepts_covered_pack() {
        let dir = tempfile::tempdir().unwrap();
        let pack = write_pack(&dir);
        assert!(cmd_validate(&pack).is_ok());
    }

    #[test]
    fn test_validate_rejects_uncovered_pack() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(
            &path,
            FORK_PACK.replace(r#""mid b - - 0 4": {"#, r#""unreached b - - 0 4": {"#),
        )
        .unwrap();
        assert!(cmd_validate(&path).is_err());
    }

    #[tokio::test]
    async fn test_run_with_random_agent_persists_games() {
        let dir = tempfile::tempdir().unwrap();
        let pack = write_pack(&dir);
        let store_path = dir.path().join("games.json");

        cmd_run(
            &pack,
            AgentKind::Random,
            None,
            false,
            None,
            Some(7),
            2,
            None,
            &store_path,
            false,
        )
        .await
        .unwrap();

        let store = JsonGameStore::open(&store_path).unwrap();
        let games = store.agent_games("Random").await.unwrap();
        assert_eq!(games.len(), 1);
        assert!(games[0].outcome.is_some());
        assert!(store.last_snapshot("Random").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_second_run_resumes_from_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let pack = write_pack(&dir);
        let store_path = dir.path().join("games.json");

        for _ in 0..2 {
            cmd_run(
                &pack,
                AgentKind::Random,
                None,
                false,
                None,
                Some(7),
                1,
                None,
                &store_path,
                false,
            )
            .await
            .unwrap();
        }

        let store = JsonGameStore::open(&store_path).unwrap();
        let games = store.agent_games("Random").await.unwrap();
        assert_eq!(games.len(), 2);
        // The second run started from the first run's snapshot, so its
        // deviation kept shrinking instead of resetting to 350.
        let snapshot = store.last_snapshot("Random").await.unwrap().unwrap();
        assert!(snapshot.deviation < 290.0);
    }

    #[tokio::test]
    async fn test_llm_agent_requires_model_and_key() {
        assert!(build_agent(AgentKind::Llm, None, false, None, None).is_err());
        assert!(build_agent(AgentKind::Llm, Some("gpt-4o-mini"), false, None, None).is_err());
        assert!(
            build_agent(AgentKind::Llm, Some("gpt-4o-mini"), false, Some("key"), None).is_ok()
        );
    }
}
