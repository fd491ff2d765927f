//! CLI argument parsing.
//!
//! Each subcommand maps onto one stage of the corpus pipeline. Values given
//! here override the config file for a single run.
use crate::substitute::Strategy;
use clap::builder::RangedU64ValueParser;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "cmdsynth",
    version,
    about = "Synthesize shell commands from flag catalogs and validate them by execution",
    after_help = "Examples:\n  cmdsynth generate --syntax syntax.json --catalog utility_map.json --utility grep --max 50\n  cmdsynth scaled --syntax syntax.json --catalog utility_map.json --reference nl2bash.cm\n  cmdsynth replace --input generated.txt --map replacements.json --out runnable.txt\n  cmdsynth validate --candidates runnable.txt --checkpoint ckpt.txt --out valid.txt\n  cmdsynth validate --candidates runnable.txt --checkpoint ckpt.txt --resume --out valid.txt",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// JSON config file (defaults to the per-user config when present)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Generate(GenerateArgs),
    Scaled(ScaledArgs),
    Replace(ReplaceArgs),
    Validate(ValidateArgs),
    Report(ReportArgs),
    Normalize(NormalizeArgs),
    Ingest(IngestArgs),
}

/// Locations of the template and catalog stores.
#[derive(Args, Debug)]
pub struct StoreArgs {
    /// JSON object of utility name to syntax template
    #[arg(long, value_name = "PATH")]
    pub syntax: PathBuf,

    /// JSON object of utility name to flag catalog
    #[arg(long, value_name = "PATH")]
    pub catalog: PathBuf,
}

#[derive(Parser, Debug)]
#[command(about = "Generate commands for some or all utilities")]
pub struct GenerateArgs {
    #[command(flatten)]
    pub stores: StoreArgs,

    /// Utility to generate for; repeat for several (default: every registered utility)
    #[arg(long = "utility", value_name = "NAME")]
    pub utilities: Vec<String>,

    /// Sample at most this many commands
    #[arg(long, value_name = "N")]
    pub max: Option<usize>,

    /// Flags per combination window
    #[arg(long, value_name = "N", value_parser = positive_usize())]
    pub max_arity: Option<usize>,

    /// Seed for reproducible sampling
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Output file (default: stdout)
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(about = "Generate commands matching a reference corpus's utility distribution")]
pub struct ScaledArgs {
    #[command(flatten)]
    pub stores: StoreArgs,

    /// Newline-delimited reference commands
    #[arg(long, value_name = "PATH")]
    pub reference: PathBuf,

    /// Number of most frequent reference utilities to cover
    #[arg(long, value_name = "N", value_parser = positive_usize())]
    pub top: Option<usize>,

    /// Commands per reference occurrence (derived when omitted)
    #[arg(long, value_name = "N", value_parser = positive_usize())]
    pub multiplier: Option<usize>,

    #[arg(long, value_name = "N", value_parser = positive_usize())]
    pub max_arity: Option<usize>,

    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(about = "Substitute placeholders with concrete values, or back")]
pub struct ReplaceArgs {
    /// Newline-delimited commands
    #[arg(long, value_name = "PATH")]
    pub input: PathBuf,

    /// JSON object of placeholder to replacement
    #[arg(long, value_name = "PATH")]
    pub map: PathBuf,

    #[arg(long, value_enum, default_value_t = Strategy::Token)]
    pub strategy: Strategy,

    /// Apply the map from values back to keys
    #[arg(long)]
    pub reverse: bool,

    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(about = "Execute candidates under a time limit and keep the ones that succeed")]
pub struct ValidateArgs {
    /// Newline-delimited candidate commands
    #[arg(long, value_name = "PATH")]
    pub candidates: PathBuf,

    /// Progress file rewritten every checkpoint interval
    #[arg(long, value_name = "PATH")]
    pub checkpoint: Option<PathBuf>,

    /// Skip candidates before this index
    #[arg(long, value_name = "N", conflicts_with = "resume")]
    pub resume_from: Option<usize>,

    /// Resume at the index saved in the checkpoint file
    #[arg(long, requires = "checkpoint")]
    pub resume: bool,

    /// Prefix each executed command with the configured elevation command
    #[arg(long)]
    pub elevate: bool,

    /// Per-candidate time limit in milliseconds
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_ms: Option<u64>,

    /// Candidates processed between checkpoint writes
    #[arg(long, value_name = "N", value_parser = positive_usize())]
    pub checkpoint_interval: Option<usize>,

    /// Accepted commands (default: stdout)
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(about = "List flags whose argument kind is not recognized")]
pub struct ReportArgs {
    #[command(flatten)]
    pub stores: StoreArgs,
}

#[derive(Parser, Debug)]
#[command(about = "Rewrite raw argument names in the catalog to known kinds")]
pub struct NormalizeArgs {
    #[command(flatten)]
    pub stores: StoreArgs,

    /// Write the normalized catalog here instead of in place
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(about = "Add a utility to the stores from plain-text man page output")]
pub struct IngestArgs {
    #[command(flatten)]
    pub stores: StoreArgs,

    /// Utility the page documents
    #[arg(long, value_name = "NAME")]
    pub utility: String,

    /// Plain-text man page, e.g. `man grep | col -b > grep.txt`
    #[arg(long, value_name = "PATH")]
    pub man: PathBuf,
}

/// Counts that the config also requires to be at least one.
fn positive_usize() -> RangedU64ValueParser<usize> {
    RangedU64ValueParser::<usize>::new().range(1..)
}
