use std::collections::HashSet;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::{DirEntry, WalkBuilder};
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, error, info, warn};

pub mod comments;
pub mod config;
pub mod error;
pub mod language;

pub use comments::{Mode, PreservePattern, StripOptions, Stripped, strip_comments};
pub use error::StripError;

use crate::comments::{Warning, lookup};
use crate::language::{language_for_extension, language_for_path};

/// Display name for standard input.
pub const STDIN_NAME: &str = "<stdin>";

/// What to do with each stripped file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Output {
    /// Print with `========== FILE: ... ==========` headers.
    #[default]
    Print,
    /// Print a JSON array of file objects.
    Json,
    /// Rewrite changed files in place.
    Write,
    /// List files that would change.
    Check,
}

/// Configuration passed from the CLI layer (main.rs) into the core logic.
#[derive(Debug)]
pub struct RunConfig {
    /// Files or directories; `-` is standard input.
    pub paths: Vec<PathBuf>,
    /// Lowercase extensions to include. Empty means every supported one.
    pub exts: HashSet<String>,
    /// Language for every input, overriding extension detection.
    pub lang: Option<String>,
    pub options: StripOptions,
    pub follow_symlinks: bool,
    pub no_gitignore: bool,
    pub excludes: Vec<String>,
    /// Regexes matched against display paths.
    pub file_ignore: Vec<Regex>,
    pub max_bytes: Option<u64>,
    pub output: Output,
    pub end_marker: bool,
    /// Treat scanner warnings as failures and leave such files untouched.
    pub strict: bool,
    /// Worker threads; `None` lets rayon decide.
    pub jobs: Option<usize>,
}

/// Totals for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub files: usize,
    pub changed: usize,
    pub removed: usize,
}

#[derive(Debug)]
enum Origin {
    File(PathBuf),
    Stdin(String),
}

#[derive(Debug)]
struct Input {
    display: String,
    origin: Origin,
    language: &'static str,
}

#[derive(Serialize)]
struct FileEntry<'a> {
    path: &'a str,
    file_name: &'a str,
    language: &'a str,
    content: &'a str,
    removed: usize,
    warnings: &'a [Warning],
}

pub fn run_with_config(cfg: RunConfig) -> Result<Summary> {
    let forced = match &cfg.lang {
        Some(id) => Some(lookup(id)?.name),
        None => None,
    };

    let mut had_error = false;
    let inputs = collect_inputs(&cfg, forced, &mut had_error)?;
    debug!(files = inputs.len(), "collected inputs");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cfg.jobs.unwrap_or(0))
        .build()
        .context("Failed to start worker pool")?;
    let results: Vec<Result<(String, Stripped)>> = pool.install(|| {
        inputs
            .par_iter()
            .map(|input| process(input, &cfg.options))
            .collect()
    });

    let mut summary = Summary::default();
    let mut first_entry = true;

    if cfg.output == Output::Json {
        println!("[");
    }

    for (input, result) in inputs.iter().zip(results) {
        let (source, stripped) = match result {
            Ok(done) => done,
            Err(err) => {
                error!("Error processing {}: {:#}", input.display, err);
                had_error = true;
                continue;
            }
        };

        for warning in &stripped.warnings {
            warn!("{}: {}", input.display, warning);
        }
        if cfg.strict && !stripped.warnings.is_empty() {
            error!("Leaving {} untouched: warnings in strict mode", input.display);
            had_error = true;
            continue;
        }

        let changed = stripped.changed(&source);
        summary.files += 1;
        summary.removed += stripped.removed;
        if changed {
            summary.changed += 1;
        }
        debug!(
            file = %input.display,
            language = input.language,
            removed = stripped.removed,
            changed,
            "processed"
        );

        let emitted = match cfg.output {
            Output::Print => {
                print_stripped(input, &stripped.text, cfg.end_marker);
                Ok(())
            }
            Output::Json => {
                if !first_entry {
                    println!(",");
                }
                first_entry = false;
                print_file_json(input, &stripped)
            }
            Output::Write => write_back(input, &stripped, changed),
            Output::Check => {
                if changed {
                    println!("{}", input.display);
                }
                Ok(())
            }
        };
        if let Err(err) = emitted {
            error!("Error writing {}: {:#}", input.display, err);
            had_error = true;
        }
    }

    if cfg.output == Output::Json {
        println!("\n]");
    }

    info!(
        files = summary.files,
        changed = summary.changed,
        removed = summary.removed,
        "done"
    );

    if had_error {
        bail!("One or more files could not be processed. See stderr for details.");
    }

    Ok(summary)
}

fn collect_inputs(
    cfg: &RunConfig,
    forced: Option<&'static str>,
    had_error: &mut bool,
) -> Result<Vec<Input>> {
    let exclude_globset = build_exclude_globset(&cfg.excludes)?;
    let mut inputs = Vec::new();

    for raw_root in &cfg.paths {
        if raw_root.as_os_str() == "-" {
            let Some(language) = forced else {
                bail!("Reading standard input requires --lang");
            };
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read standard input")?;
            inputs.push(Input {
                display: STDIN_NAME.to_string(),
                origin: Origin::Stdin(text),
                language,
            });
            continue;
        }

        // Canonicalise roots so running from arbitrary working dirs is reliable.
        let canon_root = match raw_root.canonicalize() {
            Ok(p) => p,
            Err(e) => {
                warn!("Skipping root {}: {}", raw_root.display(), e);
                *had_error = true;
                continue;
            }
        };

        let mut builder = WalkBuilder::new(&canon_root);
        builder.follow_links(cfg.follow_symlinks);
        builder.current_dir(canon_root.clone());
        builder.sort_by_file_name(|a, b| a.cmp(b));

        if cfg.no_gitignore {
            builder
                .git_ignore(false)
                .git_exclude(false)
                .git_global(false)
                .ignore(false);
        } else {
            builder
                .git_ignore(true)
                .git_exclude(true)
                .git_global(true)
                .ignore(true)
                .require_git(false);
        }

        let root_for_filter = canon_root.clone();
        let exclude_globset = exclude_globset.clone();

        builder.filter_entry(move |entry: &DirEntry| {
            if entry.depth() == 0 {
                return true;
            }

            // User exclude globs, relative to the current root.
            if let Some(ref gs) = exclude_globset {
                let path = entry.path();
                let rel = path.strip_prefix(&root_for_filter).unwrap_or(path);
                let rel_norm = normalize_for_matching(rel);

                if gs.is_match(&rel_norm) {
                    return false;
                }

                // `tests/**` should prune the whole subtree.
                if entry.file_type().is_some_and(|ft| ft.is_dir()) && !rel_norm.ends_with('/') {
                    let rel_dir = format!("{rel_norm}/");
                    if gs.is_match(&rel_dir) {
                        return false;
                    }
                }
            }

            true
        });

        for result in builder.build() {
            let entry = match result {
                Ok(e) => e,
                Err(err) => {
                    warn!("Walk error: {err}");
                    *had_error = true;
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            // Files named on the command line skip the extension filter.
            let path = entry.path();
            let explicit = entry.depth() == 0;
            if !explicit && !wanted_extension(path, &cfg.exts) {
                continue;
            }

            let display_path = make_display_path(&canon_root, path);

            if cfg.file_ignore.iter().any(|re| re.is_match(&display_path)) {
                debug!("Ignoring {display_path} (matches a file ignore pattern)");
                continue;
            }

            if let Some(limit) = cfg.max_bytes
                && let Ok(meta) = fs::metadata(path)
                && meta.len() > limit
            {
                warn!(
                    "Skipping {} (size {} bytes > max {} bytes)",
                    display_path,
                    meta.len(),
                    limit
                );
                continue;
            }

            let Some(language) = forced.or_else(|| language_for_path(path)) else {
                warn!("Skipping {display_path} (unsupported extension, use --lang)");
                continue;
            };

            inputs.push(Input {
                display: display_path,
                origin: Origin::File(path.to_path_buf()),
                language,
            });
        }
    }

    Ok(inputs)
}

fn process(input: &Input, options: &StripOptions) -> Result<(String, Stripped)> {
    let source = match &input.origin {
        Origin::File(path) => {
            let bytes =
                fs::read(path).with_context(|| format!("Failed to read {}", input.display))?;
            String::from_utf8(bytes)
                .with_context(|| format!("{} is not valid UTF-8", input.display))?
        }
        Origin::Stdin(text) => text.clone(),
    };
    let stripped = strip_comments(&source, input.language, options)?;
    Ok((source, stripped))
}

/// Build a GlobSet from the user–provided `--exclude` patterns.
/// Returns `Ok(None)` if there are no patterns.
fn build_exclude_globset(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();

    for pat in patterns {
        let pat = pat.trim();
        if pat.is_empty() {
            continue;
        }

        let glob =
            Glob::new(pat).with_context(|| format!("Invalid --exclude glob pattern: {pat}"))?;
        builder.add(glob);
    }

    let set = builder
        .build()
        .context("Failed to build exclude glob set")?;

    Ok(Some(set))
}

/// Case-insensitive extension filter. An empty set accepts every extension
/// with a known language.
pub fn wanted_extension(path: &Path, exts: &HashSet<String>) -> bool {
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) if exts.is_empty() => language_for_extension(ext).is_some(),
        Some(ext) => exts.contains(&ext.to_ascii_lowercase()),
        None => false,
    }
}

/// Produce a display path relative to `root` (stable regardless of current working directory).
pub fn make_display_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);

    // If root is a file and path == root, rel is empty.
    if rel.as_os_str().is_empty() {
        return path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
    }

    normalize_for_matching(rel)
}

fn print_stripped(input: &Input, text: &str, end_marker: bool) {
    match input.origin {
        Origin::Stdin(_) => print!("{text}"),
        Origin::File(_) => print_file(&input.display, text, end_marker),
    }
}

/// Print one file's stripped text with a header (and optional end marker).
pub fn print_file(display_path: &str, text: &str, end_marker: bool) {
    println!("========== FILE: {} ==========", display_path);
    print!("{text}");

    // Ensure there is a trailing newline before the separator between files.
    if !text.ends_with('\n') {
        println!();
    }

    if end_marker {
        println!("========== END FILE: {} ==========\n", display_path);
    } else {
        println!();
    }
}

fn print_file_json(input: &Input, stripped: &Stripped) -> Result<()> {
    let file_name = match &input.origin {
        Origin::File(path) => path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned(),
        Origin::Stdin(_) => STDIN_NAME.to_string(),
    };

    let entry = FileEntry {
        path: &input.display,
        file_name: &file_name,
        language: input.language,
        content: &stripped.text,
        removed: stripped.removed,
        warnings: &stripped.warnings,
    };

    let json = serde_json::to_string(&entry)?;
    print!("{}", json);

    Ok(())
}

fn write_back(input: &Input, stripped: &Stripped, changed: bool) -> Result<()> {
    match &input.origin {
        Origin::Stdin(_) => print!("{}", stripped.text),
        Origin::File(path) if changed => {
            fs::write(path, &stripped.text)
                .with_context(|| format!("Failed to write {}", input.display))?;
            info!(
                "Removed {} comment(s) from {}",
                stripped.removed, input.display
            );
        }
        Origin::File(_) => debug!("{} unchanged", input.display),
    }
    Ok(())
}

/// Convert paths to a stable, slash-separated form for matching/printing.
fn normalize_for_matching(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
