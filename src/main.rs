use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rdd_thresholds::dataset::{self, GroundTruthTable, ProbabilityTable};
use rdd_thresholds::settings::{AppSettings, DEFAULT_SETTINGS_FILE};
use rdd_thresholds::{run_search, CostModel, DamageClass, EvaluationTable, ThresholdVector};

#[derive(Parser)]
#[command(name = "rdd-thresholds")]
#[command(about = "Tune per-class road damage thresholds against business costs", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Runs `optimize` when no subcommand is given
    #[command(flatten)]
    optimize: OptimizeArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Search for the cheapest threshold vector and write the artifacts
    Optimize(OptimizeArgs),
    /// Print the cost of one threshold vector with per-class outcome counts
    Evaluate(EvaluateArgs),
    /// Build the ground-truth flag table from a directory of label files
    GroundTruth(GroundTruthArgs),
}

#[derive(Args, Clone)]
struct DataArgs {
    /// Settings file (defaults to ./settings.json when present)
    #[arg(long, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Detector output with image and D00_prob..D40_prob columns
    #[arg(long, value_name = "PATH", default_value = "inference_results_with_probs.csv")]
    probabilities: PathBuf,

    /// Ground-truth table with image and D00..D40 flag columns
    #[arg(long, value_name = "PATH", default_value = "ground_truth_flags.csv")]
    ground_truth: PathBuf,

    /// Read ground truth from label files instead of --ground-truth
    #[arg(long, value_name = "DIR", conflicts_with = "ground_truth")]
    labels: Option<PathBuf>,
}

#[derive(Args, Clone)]
struct OptimizeArgs {
    #[command(flatten)]
    data: DataArgs,

    #[arg(long)]
    population: Option<usize>,

    #[arg(long)]
    generations: Option<usize>,

    #[arg(long)]
    mutation_rate: Option<f64>,

    #[arg(long)]
    tournament_size: Option<usize>,

    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Where best_thresholds.json and cost_history.csv go
    #[arg(long, value_name = "DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Score individuals on the calling thread only
    #[arg(long)]
    sequential: bool,
}

#[derive(Args)]
struct EvaluateArgs {
    #[command(flatten)]
    data: DataArgs,

    /// Comma-separated thresholds in D00,D10,D20,D40 order
    #[arg(long, value_delimiter = ',', required = true)]
    thresholds: Vec<f64>,
}

#[derive(Args)]
struct GroundTruthArgs {
    #[arg(long, value_name = "DIR", default_value = "data/labels")]
    labels: PathBuf,

    #[arg(long, value_name = "PATH", default_value = "ground_truth_flags.csv")]
    output: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // configure Rayon's global thread pool once at startup so worker threads get nice names like "rayon-0".
    let _ = rayon::ThreadPoolBuilder::new()
        .thread_name(|i| format!("rayon-{i}"))
        .build_global();

    let cli = Cli::parse();
    match cli.command {
        Some(Command::Optimize(args)) => optimize(&args),
        Some(Command::Evaluate(args)) => evaluate(&args),
        Some(Command::GroundTruth(args)) => ground_truth(&args),
        None => optimize(&cli.optimize),
    }
}

fn optimize(args: &OptimizeArgs) -> Result<()> {
    let settings = load_settings(args.data.settings.as_deref())?;
    let mut cfg = settings.to_search_config();
    if let Some(population) = args.population {
        cfg.population_size = population;
    }
    if let Some(generations) = args.generations {
        cfg.generations = generations;
    }
    if let Some(rate) = args.mutation_rate {
        cfg.mutation_rate = rate;
    }
    if let Some(size) = args.tournament_size {
        cfg.tournament_size = size;
    }
    if args.seed.is_some() {
        cfg.seed = args.seed;
    }
    if args.sequential {
        cfg.parallel_evaluation = false;
    }

    let table = load_table(&args.data)?;
    let artifacts = run_search(cfg, settings.costs, table).context("threshold search failed")?;
    artifacts
        .write_to_dir(&args.out_dir)
        .with_context(|| format!("Failed to write results to {}", args.out_dir.display()))?;

    println!("{}", artifacts.best.to_json()?);
    Ok(())
}

fn evaluate(args: &EvaluateArgs) -> Result<()> {
    let settings = load_settings(args.data.settings.as_deref())?;
    let thresholds = ThresholdVector::from_slice(&args.thresholds)?;
    let table = load_table(&args.data)?;

    let breakdown = CostModel::new(&settings.costs, &table).breakdown(&thresholds);
    println!("Total cost: ${:.2}", breakdown.total() as f64);
    for class in DamageClass::ALL {
        let counts = &breakdown.counts[class.index()];
        println!(
            "{class} (> {:.4}): TP {} | TN {} | FP {} | FN {} | ${:.2}",
            thresholds.get(class),
            counts.tp,
            counts.tn,
            counts.fp,
            counts.fn_,
            breakdown.costs[class.index()] as f64
        );
    }
    Ok(())
}

fn ground_truth(args: &GroundTruthArgs) -> Result<()> {
    let truth = GroundTruthTable::from_label_dir(&args.labels)
        .with_context(|| format!("Failed to read labels from {}", args.labels.display()))?;
    truth
        .write_csv(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    info!(images = truth.len(), path = %args.output.display(), "ground truth saved");
    Ok(())
}

/// an explicit settings path must load; the implicit default may be absent
fn load_settings(path: Option<&Path>) -> Result<AppSettings> {
    match path {
        Some(path) => AppSettings::load_strict(path)
            .with_context(|| format!("Failed to load settings: {}", path.display())),
        None => Ok(AppSettings::load(DEFAULT_SETTINGS_FILE)),
    }
}

fn load_table(data: &DataArgs) -> Result<Arc<EvaluationTable>> {
    let probabilities = ProbabilityTable::read_csv(&data.probabilities)
        .with_context(|| format!("Failed to read probabilities: {}", data.probabilities.display()))?;
    let truth = match &data.labels {
        Some(dir) => GroundTruthTable::from_label_dir(dir)
            .with_context(|| format!("Failed to read labels from {}", dir.display()))?,
        None => GroundTruthTable::read_csv(&data.ground_truth)
            .with_context(|| format!("Failed to read ground truth: {}", data.ground_truth.display()))?,
    };
    let (table, _stats) = dataset::join(&probabilities, &truth).context("Failed to join probabilities with ground truth")?;
    Ok(Arc::new(table))
}
