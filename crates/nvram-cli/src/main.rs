//! nvram - Convert DD-WRT NVRAM backups to editable text and back
//!
//! `nvram dump` turns backup images into `name=value` lines with control and
//! non-ASCII bytes escaped. `nvram build` turns such text back into an image.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use nvram_core::{
    image, text, EscapeMode, ImageWriter, RenderConfig, Renderer, TracingSink, MAX_RECORDS,
};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Convert DD-WRT NVRAM backups to editable text and back
#[derive(Parser, Debug)]
#[command(name = "nvram")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the variables of backup images as name=value lines
    Dump(DumpArgs),
    /// Build a backup image from name=value text files
    Build(BuildArgs),
}

#[derive(Args, Debug)]
struct DumpArgs {
    /// Backup images to dump
    #[arg(required_unless_present = "directory")]
    files: Vec<PathBuf>,

    /// Directory to search recursively for *.bin images (repeatable)
    #[arg(short, long)]
    directory: Vec<PathBuf>,

    /// Show value newlines as real line breaks ending in a backslash
    #[arg(short = 'H', long)]
    human: bool,

    /// Write text here instead of standard output
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Truncate escaped values longer than this many bytes
    #[arg(long)]
    max_value_len: Option<usize>,
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Text files to read, in order; their records are concatenated
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Output image (default: first input with a .bin extension)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    // Dump text may go to stdout, so diagnostics stay on stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Command::Dump(args) => run_dump(args),
        Command::Build(args) => run_build(args),
    }
}

/// Dump every input image, continuing past failed ones
fn run_dump(args: &DumpArgs) -> Result<()> {
    let inputs = collect_inputs(&args.files, &args.directory)?;
    if inputs.is_empty() {
        bail!("No backup images found");
    }

    let mut output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(fs::File::create(path).with_context(|| {
            format!("Failed to create output file: {}", path.display())
        })?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let mut config = RenderConfig::new().mode(if args.human {
        EscapeMode::Human
    } else {
        EscapeMode::Full
    });
    if let Some(limit) = args.max_value_len {
        config = config.value_limit(limit);
    }
    let renderer = Renderer::with_config(config);

    let mut failed = 0;
    for input in &inputs {
        match dump_one(&renderer, input) {
            Ok(text) => output
                .write_all(text.as_bytes())
                .context("Failed to write dump output")?,
            Err(e) => {
                error!("{:#}", e);
                failed += 1;
            }
        }
    }
    output.flush().context("Failed to write dump output")?;

    if failed > 0 {
        bail!("{} of {} input file(s) failed", failed, inputs.len());
    }
    Ok(())
}

fn dump_one(renderer: &Renderer, input: &Path) -> Result<String> {
    let source = input.display().to_string();
    let data = fs::read(input).with_context(|| format!("Failed to read input file: {}", source))?;
    let records = image::read(&data).map_err(|e| {
        let what = if e.is_header_error() {
            "Not a DD-WRT NVRAM backup"
        } else {
            "Failed to parse backup image"
        };
        anyhow::Error::new(e).context(format!("{}: {}", what, source))
    })?;

    let mut sink = TracingSink::new(&source);
    let text = renderer.render(&records, &mut sink);
    info!(
        "{}: {} records, {} escape notes, {} truncation warnings",
        source,
        records.len(),
        sink.infos,
        sink.warnings
    );
    Ok(text)
}

/// Expand the explicit files and the *.bin images found under each directory
fn collect_inputs(files: &[PathBuf], directories: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut inputs = files.to_vec();

    for directory in directories {
        if !directory.is_dir() {
            bail!("Path is not a directory: {}", directory.display());
        }
        info!("Scanning directory: {}", directory.display());

        for entry in WalkDir::new(directory).follow_links(false).sort_by_file_name() {
            match entry {
                Ok(entry) if entry.file_type().is_file() && is_image_name(entry.path()) => {
                    inputs.push(entry.into_path());
                }
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable entry: {}", e),
            }
        }
    }

    Ok(inputs)
}

/// Non-hidden files with a .bin extension
fn is_image_name(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false);
    let bin = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("bin"))
        .unwrap_or(false);
    !hidden && bin
}

/// Build one image from all text inputs, continuing past failed ones
fn run_build(args: &BuildArgs) -> Result<()> {
    let output_path = match &args.output {
        Some(path) => path.clone(),
        None => default_output_path(&args.files[0]),
    };
    if let Some(input) = args.files.iter().find(|input| same_file(input, &output_path)) {
        bail!(
            "Output {} would overwrite input {} (use --output to choose another path)",
            output_path.display(),
            input.display()
        );
    }
    info!("Building {}", output_path.display());

    let file = fs::File::create(&output_path)
        .with_context(|| format!("Failed to create output file: {}", output_path.display()))?;
    let mut writer = ImageWriter::new(BufWriter::new(file))
        .with_context(|| format!("Failed to write header: {}", output_path.display()))?;

    let mut failed = 0;
    for input in &args.files {
        if let Err(e) = build_one(&mut writer, input) {
            error!("{:#}", e);
            failed += 1;
        }
    }

    let count = writer.count();
    writer
        .finish()
        .with_context(|| format!("Failed to update record count: {}", output_path.display()))?;
    info!("Wrote {} records to {}", count, output_path.display());

    if failed > 0 {
        bail!("{} of {} input file(s) failed", failed, args.files.len());
    }
    Ok(())
}

/// Append the records of one text file.
///
/// The file's records are checked up front so a file with an oversized
/// record, or one that would overflow the record count, contributes nothing.
fn build_one<W: Write + io::Seek>(writer: &mut ImageWriter<W>, input: &Path) -> Result<()> {
    let source = input.display().to_string();
    let data = fs::read(input).with_context(|| format!("Failed to read input file: {}", source))?;

    let mut sink = TracingSink::new(&source);
    let records = text::parse(&data, &mut sink);
    for record in &records {
        image::validate_record(record)
            .with_context(|| format!("{}: cannot store record {}", source, record))?;
    }
    if writer.count() + records.len() > MAX_RECORDS {
        bail!(
            "{}: {} records would bring the image past the {} record limit ({} already written)",
            source,
            records.len(),
            MAX_RECORDS,
            writer.count()
        );
    }
    for record in &records {
        writer
            .push(record)
            .with_context(|| format!("{}: failed to write record {}", source, record))?;
    }

    debug!(
        "{}: {} records added, {} lines skipped",
        source,
        records.len(),
        sink.errors
    );
    Ok(())
}

/// Replace the extension of the final path segment with `.bin`, or add one
fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("bin")
}

/// True if both paths name the same file, resolving links when both exist
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
