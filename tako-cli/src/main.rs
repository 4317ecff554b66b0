use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};
use clap::Parser;
use tako_core::{Compilation, Config, Context, CoreError, PassStep, compile, render_all};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

mod repl;

/// Extension of tako source files picked up from directories.
const SOURCE_EXTENSION: &str = "tk";

/// An experimental compiler for ergonomic software verification.
#[derive(Parser, Debug)]
#[command(name = "tako", version, about, long_about = None, arg_required_else_help = true)]
struct Cli {
    /// Source files, or directories searched for `.tk` files.
    files: Vec<PathBuf>,

    #[arg(
        short,
        long,
        value_name = "LAST",
        default_value = "final",
        value_parser = parse_step,
        help = "Stop after this step: init, lex, parse, check, final"
    )]
    step: PassStep,

    #[arg(short, long, help = "Run the interactive interpreter after the files")]
    interactive: bool,

    #[arg(long, env = "COLUMNS", default_value_t = 80, help = "Display width for messages")]
    width: usize,

    #[arg(long, env = "LINES", default_value_t = 24, help = "Display height for messages")]
    height: usize,

    #[arg(short, long, help = "Log pipeline progress to stderr")]
    verbose: bool,
}

fn parse_step(text: &str) -> Result<PassStep, CoreError> {
    text.parse()
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    execute(cli)
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .without_time()
        .init();
}

fn execute(cli: Cli) -> Result<()> {
    let config = Config {
        width: cli.width,
        height: cli.height,
    };
    if cli.step != PassStep::Final {
        eprintln!("Up to {}", cli.step);
    }

    let targets = collect_targets(&cli.files)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut failures = 0;
    for path in &targets {
        eprintln!("> {}", path.display());
        let source = match fs::read_to_string(path)
            .with_context(|| format!("failed to read input file {}", path.display()))
        {
            Ok(source) => source,
            Err(err) => {
                eprintln!("{err:#}");
                failures += 1;
                continue;
            }
        };

        let ctx = Context::new(source, &path.display().to_string())
            .with_last_step(cli.step)
            .with_config(config);
        if !report(compile(ctx), &mut out)? {
            failures += 1;
        }
    }

    if cli.interactive {
        repl::banner();
        repl::run(io::stdin().lock(), &mut out, cli.step, config)?;
    }

    if failures > 0 {
        bail!("{failures} of {} file(s) failed to compile", targets.len());
    }
    Ok(())
}

/// Expand directories into the source files below them, sorted by path.
fn collect_targets(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut targets = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .into_iter()
                .filter_map(Result::ok)
                .map(|entry| entry.into_path())
                .filter(|entry| is_source_file(entry))
                .collect();
            found.sort();
            targets.extend(found);
        } else if path.exists() {
            targets.push(path.clone());
        } else {
            bail!("no such file or directory: {}", path.display());
        }
    }
    Ok(targets)
}

fn is_source_file(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == SOURCE_EXTENSION)
}

/// Show the messages of one unit and, on success, the extracted module.
///
/// Returns whether the unit compiled without fatal messages. A crash is
/// reported and counted as a failure; it never aborts the batch.
fn report(result: Result<Compilation, CoreError>, out: &mut impl Write) -> Result<bool> {
    let mut compilation = match result {
        Ok(compilation) => compilation,
        Err(err) => {
            eprintln!("{err}");
            return Ok(false);
        }
    };

    let ok = !compilation.context.done();
    let messages = compilation.context.ctx_mut().finish();
    if !messages.is_empty() {
        eprintln!("{}", render_all(&messages, compilation.context.ctx()));
    }
    if let Some(module) = &compilation.module {
        write!(out, "{module}").context("failed to write module")?;
    }
    Ok(ok)
}
