use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use rayon::prelude::*;
use rootcause::Report;
use rootcause::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use igiunpack::data::res::ResArchive;
use igiunpack::game_data::{ModelSummary, extract_archive, load_model, map_file, read_container};

/// Inspect and unpack Project IGI 2 model files and resource archives
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode .mef models and print a summary of each
    Info {
        /// Model files or glob patterns
        #[clap(required = true)]
        paths: Vec<String>,

        /// Print the summaries as JSON
        #[clap(long)]
        json: bool,
    },
    /// Print the chunk layout of any ILFF container
    Chunks {
        path: PathBuf,

        /// Chunk identifiers are stored byte-reversed (model files)
        #[clap(long)]
        flip: bool,
    },
    /// List the entries of a .res archive
    ResList { path: PathBuf },
    /// Extract every entry of a .res archive
    ResExtract {
        path: PathBuf,

        /// Output directory
        #[clap(short, long)]
        out: PathBuf,
    },
}

/// Expand literal paths and glob patterns into a list of files.
fn expand_paths(patterns: &[String]) -> Result<Vec<PathBuf>, Report> {
    let mut paths = Vec::new();
    for pattern in patterns {
        if Path::new(pattern).is_file() {
            paths.push(PathBuf::from(pattern));
            continue;
        }

        let before = paths.len();
        let entries = glob::glob(pattern)
            .context_with(|| format!("Invalid glob pattern: {pattern}"))?;
        for entry in entries {
            let path = entry.context("Failed to read glob match")?;
            if path.is_file() {
                paths.push(path);
            }
        }
        if paths.len() == before {
            bail!("No files match {pattern}");
        }
    }
    Ok(paths)
}

fn print_summary(summary: &ModelSummary) {
    println!(
        "{}: {} model v{}, {} bones, {} attachments",
        summary.path.display(),
        summary.model_type,
        summary.version,
        summary.bones,
        summary.attachments
    );
    if let (Some(vertices), Some(faces), Some(groups)) = (
        summary.render_vertices,
        summary.render_faces,
        summary.face_groups,
    ) {
        println!("  render: {vertices} vertices, {faces} faces, {groups} face groups");
    }
    if let Some(faces) = summary.collision_faces {
        println!("  collision: {faces} faces");
    }
    if let Some(faces) = summary.shadow_faces {
        println!("  shadow: {faces} faces");
    }
}

fn run_info(patterns: &[String], json: bool) -> Result<(), Report> {
    let paths = expand_paths(patterns)?;
    let total = paths.len();

    let bar = ProgressBar::new(total as u64);
    let style = ProgressStyle::with_template("{spinner} [{elapsed}] {bar:40} {pos}/{len}")
        .context("Invalid progress template")?;
    bar.set_style(style);

    let results: Vec<_> = paths
        .into_par_iter()
        .progress_with(bar.clone())
        .map(|path| {
            let summary = load_model(&path).map(|model| ModelSummary::new(&path, &model));
            (path, summary)
        })
        .collect();
    bar.finish_and_clear();

    let mut summaries = Vec::with_capacity(total);
    for (path, result) in results {
        match result {
            Ok(summary) => summaries.push(summary),
            Err(err) => warn!(path = %path.display(), %err, "skipping model"),
        }
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summaries).context("Failed to serialize summaries")?
        );
    } else {
        summaries.iter().for_each(print_summary);
    }

    let failed = total - summaries.len();
    if failed > 0 {
        bail!("{failed} of {total} models failed to decode");
    }
    Ok(())
}

fn run_chunks(path: &Path, flip: bool) -> Result<(), Report> {
    let summary = read_container(path, flip)
        .context_with(|| format!("Could not read container {}", path.display()))?;
    println!(
        "{}: {} container, {} chunks",
        path.display(),
        summary.container_type,
        summary.chunks.len()
    );
    for header in &summary.chunks {
        println!(
            "  {}  size={:<8} align={:<3} next=0x{:X}",
            header.ident, header.data_size, header.alignment, header.next_offset
        );
    }
    Ok(())
}

fn run_res_list(path: &Path) -> Result<(), Report> {
    let mmap = map_file(path)
        .context_with(|| format!("Could not open {}", path.display()))?;
    let archive = ResArchive::parse(&mmap[..])
        .context_with(|| format!("Could not parse {}", path.display()))?;
    for entry in &archive.entries {
        println!(
            "{:<48} {:?} {}",
            entry.file_name(),
            entry.kind,
            entry.data.len()
        );
    }
    Ok(())
}

fn main() -> Result<(), Report> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    let args = Args::parse();

    match args.command {
        Command::Info { paths, json } => run_info(&paths, json),
        Command::Chunks { path, flip } => run_chunks(&path, flip),
        Command::ResList { path } => run_res_list(&path),
        Command::ResExtract { path, out } => {
            let written = extract_archive(&path, &out)
                .context_with(|| format!("Could not extract {}", path.display()))?;
            info!(written, out = %out.display(), "extracted archive");
            println!("Extracted {written} files to {}", out.display());
            Ok(())
        }
    }
}
