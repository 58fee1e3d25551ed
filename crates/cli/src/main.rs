//! swcache command line.
//!
//! Build-time tooling that produces the manifests the worker reads.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod manifest;

#[derive(Parser)]
#[command(name = "swcache", version, about = "Offline cache tooling for swcache")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a revision manifest for the files under a directory
    Manifest(ManifestArgs),
}

#[derive(clap::Args, Debug, Clone)]
struct ManifestArgs {
    /// Directory the manifest paths are relative to
    #[arg(long)]
    root: PathBuf,

    /// Glob selecting files to include (repeatable)
    #[arg(long = "glob", required = true)]
    globs: Vec<String>,

    /// Skip files larger than this many bytes
    #[arg(long, env = "SWCACHE_MAX_BYTES", default_value_t = manifest::DEFAULT_MAX_BYTES)]
    max_bytes: u64,
}

fn run_manifest(args: &ManifestArgs) -> anyhow::Result<()> {
    let entries = manifest::generate(&args.root, &args.globs, args.max_bytes)?;
    println!("{}", swcache_core::manifest::render_json(&entries)?);
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.cmd {
        Command::Manifest(args) => run_manifest(&args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("fatal: {e:?}");
            ExitCode::from(2)
        }
    }
}
