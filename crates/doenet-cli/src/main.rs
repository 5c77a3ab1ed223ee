use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use doenet::{Core, CoreConfig, create_core};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "doenet")]
#[command(about = "Evaluate DoenetML documents")]
struct Cli {
    /// Variant to render (1-based)
    #[arg(long, global = true)]
    variant: Option<u64>,
    /// Variant to render, by name
    #[arg(long, global = true)]
    variant_name: Option<String>,
    /// JSON file with core configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// More log output (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every component's state and the diagnostics
    Run {
        /// Path to a .doenet file
        file: PathBuf,
    },
    /// Report diagnostics; fails when there are errors
    Check {
        /// Path to a .doenet file
        file: PathBuf,
    },
    /// Print how variants are chosen for a document
    Variants {
        /// Path to a .doenet file
        file: PathBuf,
    },
    /// Like `run`, for inline DoenetML
    Eval {
        /// The DoenetML to evaluate
        doenetml: String,
    },
    /// Run one action and print the resulting state
    Action {
        /// Path to a .doenet file
        file: PathBuf,
        /// Name of the component the action is sent to
        #[arg(long)]
        component: String,
        /// Action name, e.g. `updateValue` or `resample`
        #[arg(long)]
        action: String,
        /// Action arguments as JSON
        #[arg(long, default_value = "{}")]
        args: String,
    },
}

fn log_level(verbose: u8) -> log::LevelFilter {
    match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(log_level(cli.verbose))
        .parse_default_env()
        .init();
    match execute(&cli) {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            eprintln!("Error: {error:#}");
            std::process::exit(1);
        }
    }
}

fn config(cli: &Cli) -> Result<CoreConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let json = read(path)?;
            CoreConfig::from_json(&json).with_context(|| format!("reading config {}", path.display()))?
        }
        None => CoreConfig::default(),
    };
    if let Some(variant) = cli.variant {
        config.requested_variant_index = variant;
    }
    if let Some(name) = &cli.variant_name {
        config.requested_variant_name = Some(name.clone());
    }
    Ok(config)
}

fn read(path: &Path) -> Result<String> {
    log::info!("reading {}", path.display());
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn build(doenetml: &str, config: CoreConfig) -> Result<Core> {
    let core = create_core(doenetml, config)?;
    let variant = core.variant();
    log::info!("rendering variant {} of {}", variant.index, variant.num_variants);
    Ok(core)
}

fn print_state(core: &mut Core) -> Result<()> {
    let output = serde_json::json!({
        "stateVariables": core.snapshot_json(),
        "errorWarnings": core.error_warnings(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn execute(cli: &Cli) -> Result<i32> {
    let config = config(cli)?;
    match &cli.command {
        Commands::Run { file } => {
            let mut core = build(&read(file)?, config)?;
            print_state(&mut core)?;
            Ok(0)
        }
        Commands::Eval { doenetml } => {
            let mut core = build(doenetml, config)?;
            print_state(&mut core)?;
            Ok(0)
        }
        Commands::Check { file } => {
            let source = read(file)?;
            let core = build(&source, config)?;
            let diagnostics = core.error_warnings();
            for report in diagnostics.render(&file.display().to_string(), &source) {
                eprintln!("{report}");
            }
            eprintln!(
                "{}: {} errors, {} warnings",
                file.display(),
                diagnostics.errors.len(),
                diagnostics.warnings.len()
            );
            Ok(if diagnostics.has_errors() { 1 } else { 0 })
        }
        Commands::Variants { file } => {
            let core = build(&read(file)?, config)?;
            println!("{}", serde_json::to_string_pretty(core.variant())?);
            Ok(0)
        }
        Commands::Action { file, component, action, args } => {
            let args: serde_json::Value = serde_json::from_str(args).context("parsing --args")?;
            if !args.is_object() {
                bail!("--args must be a JSON object");
            }
            let mut core = build(&read(file)?, config)?;
            core.call_action(component, action, &args)?;
            print_state(&mut core)?;
            Ok(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_the_log_level() {
        let cli = Cli::parse_from(["doenet", "-vv", "eval", "<text>hi</text>"]);
        assert_eq!(log_level(cli.verbose), log::LevelFilter::Debug);
        let quiet = Cli::parse_from(["doenet", "eval", "<text>hi</text>"]);
        assert_eq!(log_level(quiet.verbose), log::LevelFilter::Warn);
        assert_eq!(log_level(7), log::LevelFilter::Trace);
    }
}
