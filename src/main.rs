//! promptfit CLI
//!
//! Commands:
//!   inspect - Report token totals and budget verdict for a sequence
//!   crop    - Enforce the budget on a sequence and write the result
//!   request - Parse a wire request and summarize it

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use promptfit::{
    enforce_budget, BoundaryMarker, Budget, Config, InferenceRequest, PromptSequence, Segment,
    Token, DEFAULT_PROMPT_PROPORTION,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "promptfit")]
#[command(about = "Token-budget enforcement for multimodal prompts")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.promptfit/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report token totals and whether a sequence fits the budget
    Inspect {
        /// Sequence JSON file
        path: PathBuf,

        /// Context window size in tokens
        #[arg(long)]
        context_window: Option<usize>,

        /// Fraction of the window reserved for the prompt
        #[arg(long)]
        proportion: Option<f64>,
    },

    /// Enforce the budget on a sequence and write the cropped result
    Crop {
        /// Sequence JSON file
        path: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Context window size in tokens
        #[arg(long)]
        context_window: Option<usize>,

        /// Fraction of the window reserved for the prompt
        #[arg(long)]
        proportion: Option<f64>,

        /// Turn-marker tokens, comma separated (e.g. 151644,872)
        #[arg(long)]
        marker: Option<String>,
    },

    /// Parse a wire request and summarize it
    Request {
        /// Request JSON file
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Inspect {
            path,
            context_window,
            proportion,
        } => {
            let sequence = load_sequence(&path)?;
            print_summary(&sequence);

            if let Some(budget) = resolve_budget(context_window, proportion, config.as_ref()) {
                let limit = budget.max_tokens();
                let total = sequence.total_tokens();
                println!(
                    "Budget: {} tokens ({} window x {})",
                    limit, budget.context_window, budget.prompt_proportion
                );
                if total <= limit {
                    println!("{} fits ({} / {})", "✓".green(), total, limit);
                } else {
                    println!(
                        "{} over budget by {} tokens",
                        "✗".red(),
                        total - limit
                    );
                }
            }
        }

        Commands::Crop {
            path,
            output,
            context_window,
            proportion,
            marker,
        } => {
            let sequence = load_sequence(&path)?;
            let budget = resolve_budget(context_window, proportion, config.as_ref())
                .context("No context window configured; pass --context-window or set up the config file")?;
            let marker = resolve_marker(marker.as_deref(), config.as_ref())?;

            let before = sequence.total_tokens();
            let cropped = enforce_budget(sequence, &budget, &marker);
            let after = cropped.total_tokens();

            let json = serde_json::to_string_pretty(&cropped)?;
            match output {
                Some(out_path) => {
                    std::fs::write(&out_path, json)
                        .with_context(|| format!("Failed to write {}", out_path.display()))?;
                    println!("Wrote cropped sequence to {}", out_path.display());
                }
                None => println!("{}", json),
            }

            if after < before {
                println!(
                    "{} cropped {} -> {} tokens (budget {})",
                    "✓".green(),
                    before,
                    after,
                    budget.max_tokens()
                );
            } else {
                println!("{} already within budget ({} tokens)", "✓".green(), before);
            }
        }

        Commands::Request { path } => {
            let body = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let request = InferenceRequest::from_json(&body)?;

            println!("Request id: {}", request.id);
            println!("  Priority: {}", request.priority);
            println!("  Messages: {}", request.messages.len());
            println!("  Media items: {}", request.media_count());
            println!("  Stop: {}", request.stop);
            for (i, part) in request.media.iter().enumerate() {
                let bytes = part.decode()?;
                println!(
                    "  Media {}: {} bytes, weight {} tokens",
                    i,
                    bytes.len(),
                    part.weight
                );
            }
        }
    }

    Ok(())
}

fn load_sequence(path: &Path) -> Result<PromptSequence> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).context("Failed to parse sequence JSON")
}

/// Budget from flags, falling back to the config file.
fn resolve_budget(
    context_window: Option<usize>,
    proportion: Option<f64>,
    config: Option<&Config>,
) -> Option<Budget> {
    let window = context_window.or(config.map(|c| c.context_window))?;
    let proportion = proportion
        .or(config.map(|c| c.prompt_proportion))
        .unwrap_or(DEFAULT_PROMPT_PROPORTION);
    Some(Budget::new(window, proportion))
}

/// Marker from the --marker flag, falling back to the config file.
fn resolve_marker(flag: Option<&str>, config: Option<&Config>) -> Result<BoundaryMarker> {
    let tokens: Vec<Token> = match flag {
        Some(raw) => raw
            .split(',')
            .map(|t| t.trim().parse().context("Invalid marker token"))
            .collect::<Result<_>>()?,
        None => match config {
            Some(c) => c.boundary_marker.clone(),
            None => bail!(
                "No turn marker configured; pass --marker or set up the config file"
            ),
        },
    };
    Ok(BoundaryMarker::new(tokens)?)
}

fn print_summary(sequence: &PromptSequence) {
    let text_tokens: usize = sequence
        .segments()
        .iter()
        .filter(|s| s.is_text())
        .map(Segment::token_count)
        .sum();
    let opaque: Vec<&Segment> = sequence
        .segments()
        .iter()
        .filter(|s| !s.is_text())
        .collect();
    let opaque_tokens: usize = opaque.iter().map(|s| s.token_count()).sum();

    println!("Segments: {}", sequence.len());
    println!("  Text tokens: {}", text_tokens);
    println!(
        "  Media segments: {} ({} tokens)",
        opaque.len(),
        opaque_tokens
    );
    println!("  Total: {}", sequence.total_tokens());
}
