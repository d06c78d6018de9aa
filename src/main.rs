//! DeepFlow CLI - log runs from shell scripts and inspect the run master.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use deepflow::experiment::{
    clock, ArtefactDir, DeepFlow, RunMaster, RunOptions, RunStatus, ScoreType,
};
use deepflow::report::{self, JourneyRow};
use deepflow::DeepFlowConfig;
use tracing_subscriber::EnvFilter;

/// DeepFlow: track the journey of your ML experiments
#[derive(Parser, Debug)]
#[command(name = "deepflow", version, about, long_about = None)]
struct Cli {
    /// Project root (holds the Artefacts folder and deepflow.toml)
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register a new run and print its ExpID
    Start {
        /// Project name shown in reports
        #[arg(long)]
        project: String,
        /// Short, unique description of what changed
        #[arg(long)]
        description: String,
        /// ExpID this run branches from (required after the first run)
        #[arg(long)]
        parent: Option<u64>,
        /// Benchmark score to beat
        #[arg(long)]
        benchmark: Option<f64>,
        /// Params as key=value (repeatable)
        #[arg(long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,
    },
    /// Log a status change or heartbeat for a running run
    Status {
        /// Experiment ID
        exp_id: u64,
        /// Running, Failed or Completed
        #[arg(long, default_value = "Running")]
        status: String,
        /// Log message
        #[arg(long, default_value = "")]
        message: String,
        /// Error message (for Failed)
        #[arg(long, default_value = "")]
        error: String,
    },
    /// Log the score of a running run
    Score {
        /// Experiment ID
        exp_id: u64,
        /// Error or Accuracy
        score_type: String,
        /// Metric name, e.g. RMSE
        metric: String,
        /// Score value
        score: f64,
        /// Decimal places (defaults to the configured score_decimals)
        #[arg(long)]
        decimals: Option<u32>,
    },
    /// Add or replace a param of a running run
    Param {
        /// Experiment ID
        exp_id: u64,
        /// Param name
        key: String,
        /// Param value
        value: String,
    },
    /// Copy a CSV file into a running run's artefact folder
    Artefact {
        /// Experiment ID
        exp_id: u64,
        /// Artefact name (`importance` for feature importance)
        name: String,
        /// CSV file to copy
        file: PathBuf,
    },
    /// Add an observation to the project, or to one run with --exp
    Observe {
        /// Observation text
        text: String,
        /// Experiment ID
        #[arg(long = "exp")]
        exp_id: Option<u64>,
    },
    /// Add a learning to the project
    Learn {
        /// Learning text
        text: String,
    },
    /// List every run with scores and deltas
    Runs {
        /// Only rank runs with this metric
        #[arg(long)]
        metric: Option<String>,
    },
    /// Show one run: row, params, top features, observations and logs
    Show {
        /// Experiment ID
        exp_id: u64,
    },
    /// Print the road to the best model
    Journey {
        /// Only rank runs with this metric
        #[arg(long)]
        metric: Option<String>,
    },
    /// Print the top features across the best runs
    Features {
        /// Only rank runs with this metric
        #[arg(long)]
        metric: Option<String>,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{s}'"))
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default = match verbose {
        0 if quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let config = DeepFlowConfig::load(&cli.root)
        .with_context(|| format!("loading configuration from {}", cli.root.display()))?;

    match cli.command {
        Commands::Start {
            project,
            description,
            parent,
            benchmark,
            params,
        } => {
            let mut options = RunOptions::new();
            if let Some(parent) = parent {
                options = options.parent(parent);
            }
            if let Some(benchmark) = benchmark {
                options = options.benchmark(benchmark);
            }
            for (key, value) in params {
                options = options.param(key, value);
            }
            let flow = DeepFlow::start(config, project, description, options)
                .context("starting run")?;
            println!("{}", flow.exp_id());
        }
        Commands::Status {
            exp_id,
            status,
            message,
            error,
        } => {
            let status: RunStatus = status.parse()?;
            let mut flow = DeepFlow::resume(config, exp_id)?;
            flow.log_status(status, &message, &error)?;
        }
        Commands::Score {
            exp_id,
            score_type,
            metric,
            score,
            decimals,
        } => {
            let score_type: ScoreType = score_type.parse()?;
            let mut flow = DeepFlow::resume(config, exp_id)?;
            flow.log_score(score_type, &metric, score, decimals)?;
        }
        Commands::Param { exp_id, key, value } => {
            let mut flow = DeepFlow::resume(config, exp_id)?;
            flow.log_param(&key, value)?;
        }
        Commands::Artefact { exp_id, name, file } => {
            let mut flow = DeepFlow::resume(config, exp_id)?;
            let path = flow
                .import_artefact(&name, &file)
                .with_context(|| format!("copying {}", file.display()))?;
            println!("{}", path.display());
        }
        Commands::Observe { text, exp_id } => match exp_id {
            Some(exp_id) => {
                let ledger = RunMaster::open(config.ledger_path())?;
                let run = ledger
                    .get(exp_id)
                    .ok_or(deepflow::Error::RunNotFound(exp_id))?;
                report::artefact_dir_for(&config, run).append_observation(&text)?;
            }
            None => ArtefactDir::new(config.overview_path()).append_observation(&text)?,
        },
        Commands::Learn { text } => {
            ArtefactDir::new(config.overview_path()).append_learning(&text)?;
        }
        Commands::Runs { metric } => {
            let ledger = RunMaster::open(config.ledger_path())?;
            let rows = report::journey(&ledger, metric.as_deref(), config.display_decimals);
            print_runs(&rows);
        }
        Commands::Show { exp_id } => show(&config, exp_id)?,
        Commands::Journey { metric } => {
            let ledger = RunMaster::open(config.ledger_path())?;
            let path = report::chosen_path(&ledger, metric.as_deref());
            if path.is_empty() {
                println!("No scored runs yet.");
            }
            for exp_id in path {
                if let Some(run) = ledger.get(exp_id) {
                    println!(
                        "exp {:>3}  {:<40} {}",
                        exp_id,
                        run.description(),
                        fmt_opt(run.score())
                    );
                }
            }
        }
        Commands::Features { metric } => {
            let ledger = RunMaster::open(config.ledger_path())?;
            let summary = report::top_features(
                &ledger,
                &config,
                config.top_runs,
                config.top_features,
                metric.as_deref(),
            )?;
            println!("Top features across top {} runs", summary.runs_used);
            for feature in summary.features {
                println!(
                    "{:<30} {:>6.2}  (in {} runs)",
                    feature.feature, feature.importance, feature.count
                );
            }
        }
    }

    Ok(())
}

fn show(config: &DeepFlowConfig, exp_id: u64) -> anyhow::Result<()> {
    let ledger = RunMaster::open(config.ledger_path())?;
    let run = ledger
        .get(exp_id)
        .ok_or(deepflow::Error::RunNotFound(exp_id))?;
    let dir = report::artefact_dir_for(config, run);

    println!("Experiment {} : {}", run.exp_id(), run.description());
    println!("  project   {}", run.project_name());
    println!("  parent    {}", run.parent_id().map_or_else(String::new, |p| p.to_string()));
    println!("  status    {}", run.status());
    println!(
        "  started   {}",
        run.start_time().map_or_else(String::new, clock::format_timestamp)
    );
    println!(
        "  duration  {}",
        run.duration().map_or_else(String::new, clock::format_duration)
    );
    println!(
        "  score     {} {} {}",
        run.score_type().map_or_else(String::new, |t| t.to_string()),
        run.metric().unwrap_or_default(),
        fmt_opt(run.score())
    );
    for (key, value) in run.params() {
        println!("  param     {key} = {value}");
    }

    let features = report::run_features(&ledger, config, exp_id, config.top_features)?;
    if !features.is_empty() {
        println!("\nTop {} features", features.len());
        for f in features {
            println!("  {:<30} {:>6.2}", f.feature, f.importance);
        }
    }

    let observations = dir.observations()?;
    if !observations.is_empty() {
        println!("\nObservations");
        for text in observations {
            println!("  - {text}");
        }
    }

    let logs = dir.read_logs()?;
    if !logs.is_empty() {
        println!("\nLog");
        for log in logs {
            println!(
                "  {:<20} {:<10} {} {}",
                log.log_time().map_or_else(String::new, clock::format_timestamp),
                log.status(),
                log.log_message(),
                log.error_message()
            );
        }
    }
    Ok(())
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(String::new, |v| v.to_string())
}

fn print_runs(rows: &[JourneyRow]) {
    println!(
        "{:>5} {:>6} {:<32} {:<10} {:<8} {:>10} {:>10} {:>10} {:>10} {:>10} {:>6}",
        "ExpID",
        "Parent",
        "Description",
        "Status",
        "Metric",
        "Score",
        "Parent",
        "ImpParent",
        "Benchmark",
        "ImpBench",
        "Chosen"
    );
    for row in rows {
        println!(
            "{:>5} {:>6} {:<32} {:<10} {:<8} {:>10} {:>10} {:>10} {:>10} {:>10} {:>6}",
            row.exp_id,
            row.parent_id.map_or_else(String::new, |p| p.to_string()),
            row.description,
            row.status,
            row.metric.as_deref().unwrap_or_default(),
            fmt_opt(row.score),
            fmt_opt(row.parent_score),
            fmt_opt(row.improvement_parent),
            fmt_opt(row.benchmark),
            fmt_opt(row.improvement_benchmark),
            if row.chosen { "yes" } else { "" }
        );
    }
}
