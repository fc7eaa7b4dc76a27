//! Prune a conversation history offline and inspect pruning configs.
//!
//! Histories are JSON arrays of messages in the `cinch-prune` wire format.
//! Log output goes to stderr and is controlled by `RUST_LOG`.
//!
//! # Examples
//!
//! ```sh
//! # Prune with the Anthropic preset, pretending the last call was long ago
//! cinch-prune prune --history session.json --preset anthropic \
//!   --last-call 2026-01-01T00:00:00Z --context-window 200000
//!
//! # Prune with a config file, bypassing the mode gate
//! cinch-prune prune --history session.json --config pruning.json --force
//!
//! # How full is this history?
//! cinch-prune usage --history session.json --context-window 128000
//!
//! # Dump a preset as a starting point for a config file
//! cinch-prune preset openai > pruning.json
//!
//! # JSON Schema for config files
//! cinch-prune schema
//! ```

use chrono::{DateTime, Utc};
use cinch_prune::Message;
use cinch_prune::context::{
    ContextBudget, ContextPruner, DEFAULT_CONTEXT_WINDOW, GateDecision, LastApiCall, Preset,
    PruningConfig,
};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Context pruning for agent conversation histories.
#[derive(Parser)]
#[command(name = "cinch-prune", version)]
struct Cli {
    /// Log pruning decisions at debug level (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Prune a history file and print the result as JSON
    Prune(PruneArgs),
    /// Print the estimated context usage of a history file
    Usage(UsageArgs),
    /// Print a named preset as JSON
    Preset {
        /// anthropic, anthropic-always, openai, gemini, or disabled
        name: String,
    },
    /// Print the JSON Schema of pruning config files
    Schema,
}

#[derive(Args)]
struct BudgetArgs {
    /// Model context window in tokens
    #[arg(long, default_value_t = DEFAULT_CONTEXT_WINDOW)]
    context_window: usize,

    /// Tokens reserved for the model's response
    #[arg(long, default_value_t = 0)]
    output_reserve: usize,
}

impl BudgetArgs {
    fn budget(&self) -> ContextBudget {
        ContextBudget::new(self.context_window).with_output_reserve(self.output_reserve)
    }
}

#[derive(Args)]
struct PruneArgs {
    /// Path to a JSON array of messages
    #[arg(long)]
    history: PathBuf,

    // ── Config source ──────────────────────────────────────────
    /// Path to a JSON pruning config
    #[arg(long, conflicts_with_all = ["preset", "model"])]
    config: Option<PathBuf>,

    /// Named preset
    #[arg(long, conflicts_with = "model")]
    preset: Option<String>,

    /// Pick the preset from a model id (e.g. anthropic/claude-sonnet-4)
    #[arg(long)]
    model: Option<String>,

    #[command(flatten)]
    budget: BudgetArgs,

    // ── Gate ───────────────────────────────────────────────────
    /// Time of the previous model call (RFC 3339), for cache-ttl mode
    #[arg(long)]
    last_call: Option<String>,

    /// Time of this call (RFC 3339); defaults to now
    #[arg(long)]
    now: Option<String>,

    /// Prune regardless of mode and timing
    #[arg(long)]
    force: bool,

    // ── Output ─────────────────────────────────────────────────
    /// Pretty-print the output JSON
    #[arg(long)]
    pretty: bool,
}

#[derive(Args)]
struct UsageArgs {
    /// Path to a JSON array of messages
    #[arg(long)]
    history: PathBuf,

    #[command(flatten)]
    budget: BudgetArgs,
}

// ── Helpers ────────────────────────────────────────────────────────

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_history(path: &Path) -> Result<Vec<Message>, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read history file '{}': {e}", path.display()))?;
    serde_json::from_str(&content)
        .map_err(|e| format!("failed to parse history file '{}': {e}", path.display()))
}

fn resolve_config(
    config: Option<&Path>,
    preset: Option<&str>,
    model: Option<&str>,
) -> Result<PruningConfig, String> {
    if let Some(path) = config {
        return PruningConfig::load(path).map_err(|e| e.to_string());
    }
    if let Some(name) = preset {
        return name.parse::<Preset>().map(|p| p.config());
    }
    if let Some(model) = model {
        let preset = Preset::for_model(model);
        info!("Using preset '{preset}' for model {model}");
        return Ok(preset.config());
    }
    Ok(PruningConfig::default())
}

fn parse_time(value: Option<&str>, flag: &str) -> Result<Option<DateTime<Utc>>, String> {
    value
        .map(|s| {
            DateTime::parse_from_rfc3339(s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| format!("invalid --{flag} '{s}': {e}"))
        })
        .transpose()
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String, String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    json.map_err(|e| format!("failed to serialize output: {e}"))
}

// ── Commands ───────────────────────────────────────────────────────

fn run_prune(args: &PruneArgs) -> Result<String, String> {
    let history = load_history(&args.history)?;
    let config = resolve_config(
        args.config.as_deref(),
        args.preset.as_deref(),
        args.model.as_deref(),
    )?;
    let pruner = ContextPruner::new(config, args.budget.budget())
        .map_err(|e| format!("invalid pruning config: {e}"))?;

    let now = parse_time(args.now.as_deref(), "now")?.unwrap_or_else(Utc::now);
    let last_call = LastApiCall::new();
    if let Some(at) = parse_time(args.last_call.as_deref(), "last-call")? {
        last_call.record(at);
    }

    let decision = if args.force {
        GateDecision::Run
    } else {
        pruner.gate(&last_call, now)
    };

    match decision {
        GateDecision::Run => {
            let outcome = pruner.prune(&history);
            eprintln!("{}", outcome.report.to_log_string());
            to_json(&outcome.messages, args.pretty)
        }
        GateDecision::Skip(reason) => {
            eprintln!("pruning skipped: {reason}");
            to_json(&history, args.pretty)
        }
    }
}

fn run_usage(args: &UsageArgs) -> Result<String, String> {
    let history = load_history(&args.history)?;
    let usage = args.budget.budget().estimate_usage(&history);
    Ok(format!(
        "{} messages, ~{} chars, {}",
        history.len(),
        usage.estimated_chars,
        usage.to_log_string()
    ))
}

fn run(cli: &Cli) -> Result<String, String> {
    match &cli.command {
        Command::Prune(args) => run_prune(args),
        Command::Usage(args) => run_usage(args),
        Command::Preset { name } => {
            let preset: Preset = name.parse()?;
            to_json(&preset.config(), true)
        }
        Command::Schema => to_json(&PruningConfig::json_schema(), true),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
