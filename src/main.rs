use anyhow::{Context as _, Result};
use clap::Parser;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod catalog;
mod cli;
mod combine;
mod config;
mod context;
mod exec;
mod ingest;
mod lexicon;
mod persist;
mod substitute;
mod synth;
mod validate;

use crate::catalog::CatalogStore;
use crate::cli::{
    Command, GenerateArgs, IngestArgs, NormalizeArgs, ReplaceArgs, ReportArgs, RootArgs,
    ScaledArgs, ValidateArgs,
};
use crate::context::Context;
use crate::persist::{read_lines, write_lines};
use crate::substitute::ReplacementMap;
use crate::synth::{ScaleOptions, Synthesizer};
use crate::validate::{Checkpoint, ValidationOptions, Validator};

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.verbose);
    let ctx = Context::load(args.config.as_deref())?;

    match args.command {
        Command::Generate(args) => run_generate(&ctx, args),
        Command::Scaled(args) => run_scaled(&ctx, args),
        Command::Replace(args) => run_replace(args),
        Command::Validate(args) => run_validate(&ctx, args),
        Command::Report(args) => run_report(args),
        Command::Normalize(args) => run_normalize(&ctx, args),
        Command::Ingest(args) => run_ingest(&ctx, args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_generate(ctx: &Context, args: GenerateArgs) -> Result<()> {
    let store = CatalogStore::load(&args.stores.syntax, &args.stores.catalog)?;
    let synth = Synthesizer::new(&store, &ctx.lexicon, ctx.combiner(args.max_arity));
    let mut rng = ctx.rng(args.seed);

    let commands = match (args.utilities.as_slice(), args.max) {
        ([], None) => synth.generate_all(),
        ([], max) => {
            let registered = store.registered_utilities(&ctx.lexicon);
            synth.generate_many(&registered, max, &mut rng)
        }
        ([utility], max) => synth.generate(utility, max, &mut rng),
        (utilities, max) => synth.generate_many(utilities, max, &mut rng),
    };
    tracing::info!(count = commands.len(), "generated commands");
    emit(&commands, args.out.as_deref())
}

fn run_scaled(ctx: &Context, args: ScaledArgs) -> Result<()> {
    let store = CatalogStore::load(&args.stores.syntax, &args.stores.catalog)?;
    let reference = read_lines(&args.reference)?;
    let synth = Synthesizer::new(&store, &ctx.lexicon, ctx.combiner(args.max_arity));
    let options = ScaleOptions {
        top_n: args.top.unwrap_or(ctx.config.generation.top_n),
        multiplier: args.multiplier.or(ctx.config.generation.multiplier),
    };

    let output = synth.generate_scaled(&reference, options, &mut ctx.rng(args.seed));
    let shortfalls: Vec<String> = output
        .shortfalls
        .iter()
        .map(|short| format!("{} ({}/{})", short.utility, short.generated, short.requested))
        .collect();
    tracing::info!(
        count = output.commands.len(),
        multiplier = ?output.multiplier,
        shortfalls = %shortfalls.join(", "),
        unsupported = %output.unsupported.join(", "),
        "scaled generation finished"
    );
    emit(&output.commands, args.out.as_deref())
}

fn run_replace(args: ReplaceArgs) -> Result<()> {
    let commands = read_lines(&args.input)?;
    let map = ReplacementMap::load(&args.map)?;
    let replaced = substitute::substitute(&commands, &map, args.strategy, args.reverse);
    emit(&replaced, args.out.as_deref())
}

fn run_validate(ctx: &Context, args: ValidateArgs) -> Result<()> {
    let settings = &ctx.config.validation;
    let candidates = read_lines(&args.candidates)?;

    let resume_from = match (&args.checkpoint, args.resume, args.resume_from) {
        (Some(path), true, _) if path.is_file() => Checkpoint::load(path)?.next_index,
        (Some(path), true, _) => {
            tracing::warn!(path = %path.display(), "no checkpoint yet, starting at 0");
            0
        }
        (_, _, resume_from) => resume_from.unwrap_or(0),
    };
    let elevation = if args.elevate {
        which::which(&settings.elevation_prefix)
            .with_context(|| format!("locate elevation command {}", settings.elevation_prefix))?;
        Some(settings.elevation_prefix.clone())
    } else {
        None
    };

    let executor = ctx.executor()?;
    let timeout_ms = args.timeout_ms.unwrap_or(settings.timeout_ms);
    let options = ValidationOptions {
        timeout: Duration::from_millis(timeout_ms),
        checkpoint_interval: args
            .checkpoint_interval
            .unwrap_or(settings.checkpoint_interval),
        checkpoint: args.checkpoint,
        output: args.out.clone(),
        resume_from,
        excluded_utilities: settings.excluded_utilities.clone(),
        elevation,
    };
    tracing::info!(
        candidates = candidates.len(),
        resume_from,
        timeout_ms,
        "validating"
    );

    let summary = Validator::new(&executor, options).validate(&candidates)?;
    eprintln!("{summary}");
    match &args.out {
        Some(out) => eprintln!("wrote {}", out.display()),
        None => emit(&summary.accepted, None)?,
    }
    Ok(())
}

fn run_report(args: ReportArgs) -> Result<()> {
    let store = CatalogStore::load(&args.stores.syntax, &args.stores.catalog)?;
    let flags = store.non_conforming_flags();
    for flag in &flags {
        println!("{flag}");
    }
    tracing::info!(count = flags.len(), "non-conforming flags");
    Ok(())
}

fn run_normalize(ctx: &Context, args: NormalizeArgs) -> Result<()> {
    let mut store = CatalogStore::load(&args.stores.syntax, &args.stores.catalog)?;
    let changed = store.normalize_kinds(&ctx.lexicon);
    let remaining = store.non_conforming_flags().len();
    let dest = args.out.as_deref().unwrap_or(&args.stores.catalog);
    store.save_catalogs(dest)?;
    tracing::info!(changed, remaining, "normalized argument kinds");
    eprintln!("wrote {}", dest.display());
    Ok(())
}

fn run_ingest(ctx: &Context, args: IngestArgs) -> Result<()> {
    let text = std::fs::read_to_string(&args.man)
        .with_context(|| format!("read man page {}", args.man.display()))?;
    let ingested = ingest::ingest_manpage(&args.utility, &text, &ctx.lexicon);
    if !ctx.lexicon.supports(&ingested.utility) {
        tracing::warn!(utility = %ingested.utility, "utility is not in the configured list");
    }

    let mut store = CatalogStore::load_or_default(&args.stores.syntax, &args.stores.catalog)?;
    store.set_template(&ingested.utility, &ingested.template);
    store.set_catalog(&ingested.utility, ingested.catalog);
    store.save_templates(&args.stores.syntax)?;
    store.save_catalogs(&args.stores.catalog)?;
    eprintln!("wrote {}", args.stores.syntax.display());
    eprintln!("wrote {}", args.stores.catalog.display());
    Ok(())
}

/// Write commands to `out`, or one per line on stdout.
fn emit(commands: &[String], out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => {
            write_lines(path, commands)?;
            eprintln!("wrote {}", path.display());
        }
        None => {
            for command in commands {
                println!("{command}");
            }
        }
    }
    Ok(())
}
