//! `matseg`: decode MAT-file segments from the command line.
//!
//! ```text
//! matseg [--config PATH] [--json] [--output PATH] FILE...
//! matseg --init-config [--config PATH]
//! ```
//!
//! Logging goes to stderr and honours `RUST_LOG`.

mod settings;

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use matseg_core::{LoaderConfig, Mat5Container, Segment, SegmentLoader};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "matseg=info,matseg_core=info";

const USAGE: &str = "Usage: matseg [--config <file.json>] [--json] [--output <file.json>] <file.mat>...
       matseg --init-config [--config <file.json>]";

#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    json: bool,
    output: Option<PathBuf>,
    init_config: bool,
    files: Vec<PathBuf>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> std::result::Result<Args, String> {
    let mut parsed = Args::default();
    let mut it = args.into_iter();

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => {
                let Some(v) = it.next() else {
                    return Err("missing value for --config".into());
                };
                parsed.config = Some(PathBuf::from(v));
            }
            "--output" | "-o" => {
                let Some(v) = it.next() else {
                    return Err("missing value for --output".into());
                };
                parsed.output = Some(PathBuf::from(v));
            }
            "--json" => parsed.json = true,
            "--init-config" => parsed.init_config = true,
            "--help" | "-h" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other if other.starts_with('-') => {
                return Err(format!("unknown argument: {other}"));
            }
            file => parsed.files.push(PathBuf::from(file)),
        }
    }

    Ok(parsed)
}

fn summary(segment: &Segment) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "source:    {}", segment.source_name());
    let _ = writeln!(out, "channels:  {}", segment.channel_count());
    let _ = writeln!(out, "samples:   {}", segment.sample_count());
    let _ = writeln!(out, "duration:  {:.3} s", segment.duration_seconds());
    let _ = writeln!(out, "rate:      {:.3} Hz", segment.sampling_frequency_hz());

    let implied = (segment.duration_seconds() * segment.sampling_frequency_hz()).round();
    if implied > 0.0 && implied as usize != segment.sample_count() {
        let _ = writeln!(out, "note:      duration x rate implies {implied} samples");
    }
    out
}

fn run(args: Args) -> Result<()> {
    if args.init_config {
        let path = args.config.unwrap_or_else(settings::default_config_path);
        settings::save_config(&path, &LoaderConfig::default())
            .with_context(|| format!("writing config {}", path.display()))?;
        println!("wrote {}", path.display());
        return Ok(());
    }

    if args.files.is_empty() {
        bail!("no input files\n{USAGE}");
    }
    if args.output.is_some() && args.files.len() != 1 {
        bail!("--output takes exactly one input file");
    }

    let config = match &args.config {
        Some(path) => settings::load_config(path)?,
        None => settings::load_config_or_default(&settings::default_config_path()),
    };
    info!(?config, files = args.files.len(), "starting");

    let loader = SegmentLoader::with_config(Mat5Container::new(), config);

    for file in &args.files {
        let source = file
            .to_str()
            .with_context(|| format!("{} is not valid UTF-8", file.display()))?;
        let segment = loader
            .load(source)
            .with_context(|| format!("loading {}", file.display()))?;

        if let Some(output) = &args.output {
            let json = serde_json::to_string(&segment)?;
            std::fs::write(output, json)
                .with_context(|| format!("writing {}", output.display()))?;
            info!(output = %output.display(), "segment written");
        } else if args.json {
            println!("{}", serde_json::to_string(&segment)?);
        } else {
            print!("{}", summary(&segment));
        }
    }

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("matseg: {e}\n{USAGE}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(args) {
        eprintln!("matseg: {e:#}");
        std::process::exit(1);
    }
}
