//! setup-to-shield: CLI tool for rendering SHIELD-HIT12A input files

use anyhow::{Context, Result};
use clap::Parser;
use shield_export::{convert, ExportConfig};
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "setup-to-shield")]
#[command(about = "Translate a simulation setup to SHIELD-HIT12A input files")]
#[command(version)]
struct Args {
    /// Input JSON file (simulation setup)
    #[arg(short, long)]
    input: PathBuf,

    /// Directory receiving beam.dat, mat.dat, geo.dat and detect.dat
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Geometry title for the geo.dat header
    #[arg(long, default_value = "Unnamed geometry")]
    title: String,

    /// Write the identifier mapping snapshot (JSON) to this file
    #[arg(long)]
    context: Option<PathBuf>,

    /// Print the files to stdout instead of writing them
    #[arg(long)]
    stdout: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let json = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read input file: {:?}", args.input))?;

    let config = ExportConfig {
        title: args.title,
        ..ExportConfig::default()
    };

    let (input, context) = convert(&json, &config).context("Export failed")?;

    if args.stdout {
        for (name, text) in input.files() {
            println!("* ==> {} <==", name);
            print!("{}", text);
        }
    } else {
        input
            .write_to_dir(&args.output_dir)
            .with_context(|| format!("Failed to write input files to {:?}", args.output_dir))?;
        eprintln!("Generated SHIELD-HIT12A input: {:?}", args.output_dir);
    }

    if let Some(path) = &args.context {
        let snapshot = serde_json::to_string_pretty(&context.snapshot())
            .context("Failed to serialize context snapshot")?;
        fs::write(path, snapshot)
            .with_context(|| format!("Failed to write context snapshot: {:?}", path))?;
    }

    Ok(())
}
