use std::collections::HashSet;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use decomment::config::{self, PatternList};
use decomment::language::{language_for_extension, supported_extensions};
use decomment::{Mode, Output, PreservePattern, RunConfig, StripOptions, run_with_config};
use regex::Regex;
use tracing_subscriber::EnvFilter;

/// decomment - strip comments from source files.
///
/// Removes comments from C#, Kotlin, PHP, Swift, JavaScript, TypeScript and
/// JSX/TSX sources while leaving code, string contents and compiler
/// directives byte-for-byte intact.
#[derive(Parser, Debug)]
#[command(
    name = "decomment",
    author,
    version,
    about = "Strip comments from source files without touching code, strings or directives",
    long_about = r#"Strip comments from C#, Kotlin, PHP, Swift, JavaScript, TypeScript
and JSX/TSX sources.

By default it:
  • respects .gitignore / .ignore / git exclude files
  • removes line comments and keeps block and doc comments (--mode light)
  • keeps directives (#pragma, #region, #if, shebangs) and tool markers
    such as @ts-ignore, eslint-disable or swiftlint:
  • prints the stripped files with path headers

Typical usage:
  decomment src
  decomment -m aggressive -t ts,tsx --write src
  decomment --check .
  cat Foo.cs | decomment -l csharp -
"#
)]
struct Args {
    /// Paths to process (files or directories). `-` reads standard input.
    #[arg(value_name = "PATH", default_value = ".")]
    paths: Vec<PathBuf>,

    /// File extensions to include (e.g. ts, cs). Defaults to every supported one.
    ///
    /// Can be repeated or comma-separated:
    ///   decomment -t ts,tsx
    ///   decomment -t kt -t kts
    #[arg(
        short = 't',
        long = "type",
        alias = "ext",
        value_name = "EXT",
        action = ArgAction::Append,
        value_delimiter = ','
    )]
    exts: Vec<String>,

    /// Language for every input (csharp, kotlin, php, swift, javascript,
    /// typescript, jsx, tsx or an alias such as cs, kt, js, ts).
    ///
    /// Required when reading standard input.
    #[arg(short = 'l', long = "lang", value_name = "LANG")]
    lang: Option<String>,

    /// light: remove line comments only. aggressive: also block and doc comments.
    ///
    /// Defaults to the configured mode, else light.
    #[arg(short = 'm', long = "mode", value_name = "MODE")]
    mode: Option<Mode>,

    /// Keep comments containing TEXT.
    #[arg(
        short = 'p',
        long = "preserve",
        value_name = "TEXT",
        action = ArgAction::Append,
        value_delimiter = ','
    )]
    preserve: Vec<String>,

    /// Keep comments whose raw text starts with PREFIX (e.g. `// keep`).
    #[arg(
        long = "preserve-prefix",
        value_name = "PREFIX",
        action = ArgAction::Append,
        value_delimiter = ','
    )]
    preserve_prefix: Vec<String>,

    /// Keep comments matching the regular expression RE. Repeat for several.
    #[arg(long = "preserve-regex", value_name = "RE", action = ArgAction::Append)]
    preserve_regex: Vec<String>,

    /// Do not keep the built-in tool markers (@ts-ignore, eslint-disable, ...).
    ///
    /// Directive lines are always kept.
    #[arg(long = "no-builtin-preserve")]
    no_builtin_preserve: bool,

    /// Additional glob patterns to exclude (files or directories).
    ///
    /// Patterns are evaluated relative to each PATH root, e.g.:
    ///
    ///   decomment --exclude 'vendor/**,*.min.js'
    #[arg(
        long = "exclude",
        short = 'E',
        value_name = "GLOB",
        action = ArgAction::Append,
        value_delimiter = ','
    )]
    excludes: Vec<String>,

    /// Disable reading .gitignore / .ignore / git exclude files.
    #[arg(long = "no-gitignore")]
    no_gitignore: bool,

    /// Follow symbolic links during traversal.
    #[arg(long = "follow-symlinks")]
    follow_symlinks: bool,

    /// Maximum file size to process, in bytes (skip larger files).
    #[arg(long = "max-bytes", value_name = "N")]
    max_bytes: Option<u64>,

    /// Rewrite changed files in place instead of printing them.
    #[arg(short = 'w', long = "write", conflicts_with_all = ["check", "json"])]
    write: bool,

    /// List files that would change and exit with status 1 if there are any.
    #[arg(long = "check", conflicts_with = "json")]
    check: bool,

    /// Output as a JSON array of objects { "path": "...", "content": "..." }.
    #[arg(long = "json")]
    json: bool,

    /// Print an explicit END marker after each file.
    #[arg(long = "end-marker")]
    end_marker: bool,

    /// Treat scanner warnings (unterminated strings, comments, ...) as errors.
    ///
    /// Affected files are left untouched and the run fails.
    #[arg(long = "strict")]
    strict: bool,

    /// Number of worker threads.
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    jobs: Option<usize>,

    /// More log output on stderr (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    /// Add a preserve regex to ./.decomment.json and exit.
    #[arg(long = "add-preserve", value_name = "RE")]
    add_preserve: Option<String>,

    /// Add a preserve regex to the global config and exit.
    #[arg(long = "add-preserve-global", value_name = "RE")]
    add_preserve_global: Option<String>,

    /// Add a file ignore regex to ./.decomment.json and exit.
    #[arg(long = "add-ignore-file", value_name = "RE")]
    add_ignore_file: Option<String>,

    /// Add a file ignore regex to the global config and exit.
    #[arg(long = "add-ignore-file-global", value_name = "RE")]
    add_ignore_file_global: Option<String>,
}

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            std::process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when `--check` found files that would change.
fn run() -> Result<bool> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    let local = config::local_path(&cwd);
    let global = config::global_path();

    if add_patterns(&args, &local, global.as_deref())? {
        return Ok(true);
    }

    let settings = config::load_layered(global.as_deref(), &local)?.compile()?;

    // Normalise extensions to lowercase, no leading dot.
    let mut ext_set = HashSet::new();
    for e in &args.exts {
        let norm = e.trim().trim_start_matches('.').to_ascii_lowercase();
        if norm.is_empty() {
            continue;
        }
        if args.lang.is_none() && language_for_extension(&norm).is_none() {
            let known: Vec<&str> = supported_extensions().collect();
            bail!(
                "Unsupported extension '{norm}' (supported: {}; use --lang to force a language)",
                known.join(", ")
            );
        }
        ext_set.insert(norm);
    }

    if !args.exts.is_empty() && ext_set.is_empty() {
        bail!("No valid extensions provided (after normalisation).");
    }

    let mut preserve = settings.preserve.clone();
    preserve.extend(args.preserve.iter().map(|s| PreservePattern::Contains(s.clone())));
    preserve.extend(
        args.preserve_prefix
            .iter()
            .map(|s| PreservePattern::Prefix(s.clone())),
    );
    for re in &args.preserve_regex {
        let compiled =
            Regex::new(re).with_context(|| format!("Invalid --preserve-regex pattern: {re}"))?;
        preserve.push(PreservePattern::Regex(compiled));
    }

    let output = if args.write {
        Output::Write
    } else if args.check {
        Output::Check
    } else if args.json {
        Output::Json
    } else {
        Output::Print
    };

    let cfg = RunConfig {
        paths: args.paths,
        exts: ext_set,
        lang: args.lang,
        options: StripOptions {
            mode: args.mode.or(settings.mode).unwrap_or_default(),
            preserve,
            builtin_preserve: !args.no_builtin_preserve,
        },
        follow_symlinks: args.follow_symlinks,
        no_gitignore: args.no_gitignore,
        excludes: args.excludes,
        file_ignore: settings.file_ignore,
        max_bytes: args.max_bytes,
        output,
        end_marker: args.end_marker,
        strict: args.strict,
        jobs: args.jobs,
    };

    let summary = run_with_config(cfg)?;

    if output == Output::Check && summary.changed > 0 {
        eprintln!("{} file(s) would change", summary.changed);
        return Ok(false);
    }
    Ok(true)
}

/// Handle the `--add-*` flags. Returns whether any were given.
fn add_patterns(args: &Args, local: &Path, global: Option<&Path>) -> Result<bool> {
    let requests = [
        (&args.add_preserve, PatternList::Preserve, false),
        (&args.add_preserve_global, PatternList::Preserve, true),
        (&args.add_ignore_file, PatternList::FileIgnore, false),
        (&args.add_ignore_file_global, PatternList::FileIgnore, true),
    ];

    let mut any = false;
    for (pattern, list, is_global) in requests {
        let Some(pattern) = pattern else {
            continue;
        };
        any = true;
        let path = if is_global {
            global.context("Could not determine the home directory for the global config")?
        } else {
            local
        };
        let what = match list {
            PatternList::Preserve => "preserve",
            PatternList::FileIgnore => "file ignore",
        };
        if config::add_pattern(path, list, pattern)? {
            println!("Added {what} pattern '{pattern}' to {}", path.display());
        } else {
            println!("{what} pattern '{pattern}' already present in {}", path.display());
        }
    }
    Ok(any)
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
}
