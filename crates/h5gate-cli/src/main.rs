//! # h5gate-cli
//!
//! Command-line interface for h5gate.
//!
//! `check` loads a specification and summarizes its namespaces; `build`
//! runs a declarative build script through a construction session and
//! prints the validation report.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use h5gate_engine::{Session, SessionOptions};
use h5gate_schema::SchemaLoader;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod script;

use script::BuildScript;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "h5gate")]
#[command(about = "Schema-driven container builder")]
#[command(version)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a specification and list its namespaces
    Check {
        #[command(flatten)]
        spec: SpecArgs,
    },

    /// Run a build script and print the validation report
    Build {
        #[command(flatten)]
        spec: SpecArgs,

        /// Build script (YAML or JSON)
        #[arg(long)]
        script: PathBuf,

        /// Write the file as a directory tree here instead of recording only
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Session options file (YAML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[derive(clap::Args)]
struct SpecArgs {
    /// Specification document(s)
    #[arg(short, long = "spec", required = true)]
    specs: Vec<PathBuf>,

    /// Extension document(s) merged after the specification
    #[arg(short, long = "import")]
    imports: Vec<PathBuf>,

    /// Default namespace
    #[arg(short, long, default_value = "core")]
    namespace: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Check { spec } => check(&spec),
        Commands::Build {
            spec,
            script,
            output,
            config,
            format,
        } => build(&spec, &script, output, config.as_deref(), format),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn check(args: &SpecArgs) -> Result<()> {
    let registry = SchemaLoader::new()
        .load_files(&args.specs, &args.imports, &args.namespace)
        .context("Failed to load specification")?;

    for namespace in registry.namespaces() {
        let marker = if namespace.name == registry.default_namespace() {
            " (default)"
        } else {
            ""
        };
        println!(
            "{}{}: {} structure(s), {} location(s)",
            namespace.name,
            marker,
            namespace.structures.len(),
            namespace.locations.len()
        );
    }
    Ok(())
}

fn build(
    args: &SpecArgs,
    script: &Path,
    output: Option<PathBuf>,
    config: Option<&Path>,
    format: Format,
) -> Result<()> {
    let mut options = match config {
        Some(path) => read_options(path)?,
        None => SessionOptions::default(),
    };
    if let Some(dir) = output {
        options = options.directory(dir);
    }

    let script = BuildScript::read(script)?;
    let registry = SchemaLoader::new()
        .load_files(&args.specs, &args.imports, &args.namespace)
        .context("Failed to load specification")?;

    let mut session = Session::new(registry, options)?;
    script.run(&mut session)?;
    let warnings = session.warnings().to_vec();
    let report = session.close()?;

    match format {
        Format::Text => print!("{report}"),
        Format::Json => {
            let out = serde_json::json!({
                "warnings": warnings,
                "report": report,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}

fn read_options(path: &Path) -> Result<SessionOptions> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let options = if path.extension().is_some_and(|e| e == "json") {
        serde_json::from_str(&content)?
    } else {
        serde_yaml::from_str(&content)?
    };
    Ok(options)
}
