// CLI command implementations
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use glob::glob;
use serde_json::{json, Value};
use tracing::debug;

use chapsplit::id3::FramePayload;
use chapsplit::{read_leading_tag, split, split_file, DirectorySink, DryRunSink, SplitError, SplitOptions, SplitSummary};

use crate::cli::output::{OutputFormatter, ProgressBar};

fn split_options(lenient: bool) -> SplitOptions {
    if lenient {
        SplitOptions::lenient()
    } else {
        SplitOptions::default()
    }
}

/// Split one file
pub fn command_split(
    file: &Path,
    output: Option<&Path>,
    lenient: bool,
    dry_run: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let options = split_options(lenient);
    let reader = File::open(file).with_context(|| format!("Failed to open {}", file.display()))?;

    let summary = if dry_run {
        let mut sink = DryRunSink::default();
        let summary = split(reader, &mut sink, &options)
            .with_context(|| format!("Failed to split {}", file.display()))?;
        for (name, bytes) in &sink.planned {
            formatter.print_info(&format!("{} ({} bytes)", name, bytes));
        }
        summary
    } else {
        let out_dir = output.unwrap_or_else(|| Path::new("."));
        let sink = DirectorySink::new(out_dir)
            .with_context(|| format!("Failed to create {}", out_dir.display()))?;
        split(reader, sink, &options).with_context(|| format!("Failed to split {}", file.display()))?
    };

    report(file, &summary, formatter);
    if !formatter.quiet() {
        formatter.output(&serde_json::to_value(&summary)?, &mut io::stdout().lock())?;
    }
    Ok(())
}

fn report(file: &Path, summary: &SplitSummary, formatter: &OutputFormatter) {
    formatter.print_success(&format!(
        "{}: {} of {} chapters written, {} audio frames",
        file.display(),
        summary.segments,
        summary.chapters,
        summary.audio_frames
    ));
    if summary.truncated {
        formatter.print_error(&format!(
            "{}: input ends inside a frame, the last segment was cut short",
            file.display()
        ));
    }
}

/// List chapters of each file
pub fn command_chapters(files: &[PathBuf], formatter: &OutputFormatter) -> Result<()> {
    if files.is_empty() {
        bail!("No files specified");
    }

    let mut writer = io::stdout().lock();
    let mut error_count = 0;
    for path in files {
        match chapter_records(path) {
            Ok(records) => formatter.output(&Value::Array(records), &mut writer)?,
            Err(e) => {
                formatter.print_error(&format!("{}: {:#}", path.display(), e));
                error_count += 1;
            }
        }
    }

    if error_count > 0 {
        bail!("{} of {} files could not be read", error_count, files.len());
    }
    Ok(())
}

fn chapter_records(path: &Path) -> Result<Vec<Value>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let tag = read_leading_tag(file)?.ok_or_else(|| anyhow!("No ID3v2 tag at start of file"))?;

    let records: Vec<Value> = tag
        .frames
        .iter()
        .filter_map(|frame| match &frame.payload {
            FramePayload::Chapter(chapter) => Some(chapter),
            _ => None,
        })
        .enumerate()
        .map(|(i, chapter)| {
            json!({
                "file": path.display().to_string(),
                "chapter": i + 1,
                "id": chapter.element_id,
                "start_ms": chapter.start_ms,
                "end_ms": chapter.end_ms,
                "title": chapter.title(),
            })
        })
        .collect();

    if records.is_empty() {
        return Err(SplitError::MissingChapters.into());
    }
    Ok(records)
}

/// Batch split a directory
pub fn command_batch(
    directory: &Path,
    pattern: &str,
    output: Option<&Path>,
    lenient: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let show_progress = !formatter.quiet();
    let options = split_options(lenient);
    let out_root = output.unwrap_or(directory);

    // Build glob pattern
    let glob_pattern = if pattern.contains('*') || pattern.contains('?') {
        format!("{}/{}", directory.display(), pattern)
    } else {
        format!("{}/**/{}", directory.display(), pattern)
    };

    // Find matching files
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in glob(&glob_pattern).with_context(|| format!("Invalid glob pattern: {}", glob_pattern))? {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => formatter.print_error(&format!("Error reading path: {}", e)),
        }
    }

    let total = files.len();
    if total == 0 {
        formatter.print_info("No files found matching pattern");
        return Ok(());
    }

    formatter.print_info(&format!("Processing {} files...", total));

    let mut progress = ProgressBar::new(total, show_progress);
    let mut success_count = 0;
    let mut error_count = 0;

    for path in &files {
        let stem = path.file_stem().map(|s| s.to_os_string()).unwrap_or_else(|| "out".into());
        let out_dir = out_root.join(stem);
        debug!(file = %path.display(), out = %out_dir.display(), "batch item");

        match split_file(path, &out_dir, &options) {
            Ok(summary) => {
                success_count += 1;
                if summary.truncated {
                    formatter.print_error(&format!("{}: input ends inside a frame", path.display()));
                }
            }
            Err(e) => {
                formatter.print_error(&format!("{}: {}", path.display(), e));
                error_count += 1;
            }
        }
        progress.increment(&path.display().to_string());
    }

    formatter.print_info(&format!("Completed: {} successful, {} errors", success_count, error_count));

    if error_count > 0 && success_count == 0 {
        bail!("No file could be split");
    }
    Ok(())
}
