use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::BaseDirs;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::comments::{Mode, PreservePattern};

pub const LOCAL_FILE: &str = ".decomment.json";
const GLOBAL_DIR: &str = ".decomment";
const GLOBAL_FILE: &str = "config.json";
/// Environment variable overriding the global config location.
pub const GLOBAL_ENV: &str = "DECOMMENT_CONFIG";

/// On-disk shape of a configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileConfig {
    /// Regexes; a comment matching any of them is kept.
    pub preserve_patterns: Vec<String>,
    /// Regexes matched against display paths; matching files are skipped.
    pub file_ignore_patterns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
}

/// Which list an `add` operation appends to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternList {
    Preserve,
    FileIgnore,
}

/// Compiled form of the merged configuration.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub preserve: Vec<PreservePattern>,
    pub file_ignore: Vec<Regex>,
    pub mode: Option<Mode>,
}

impl FileConfig {
    /// Read `path`; a missing file is an empty configuration.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to read config {}", path.display()));
            }
        };
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let mut json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        json.push('\n');
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Append `other` after `self`; `other`'s mode wins when set.
    pub fn merge(&mut self, other: FileConfig) {
        extend_unique(&mut self.preserve_patterns, other.preserve_patterns);
        extend_unique(&mut self.file_ignore_patterns, other.file_ignore_patterns);
        if other.mode.is_some() {
            self.mode = other.mode;
        }
    }

    pub fn compile(&self) -> Result<Settings> {
        let preserve = self
            .preserve_patterns
            .iter()
            .map(|p| compile_regex(p, "preserve").map(PreservePattern::Regex))
            .collect::<Result<Vec<_>>>()?;
        let file_ignore = self
            .file_ignore_patterns
            .iter()
            .map(|p| compile_regex(p, "file ignore"))
            .collect::<Result<Vec<_>>>()?;
        Ok(Settings {
            preserve,
            file_ignore,
            mode: self.mode,
        })
    }

    fn list_mut(&mut self, list: PatternList) -> &mut Vec<String> {
        match list {
            PatternList::Preserve => &mut self.preserve_patterns,
            PatternList::FileIgnore => &mut self.file_ignore_patterns,
        }
    }
}

/// `$DECOMMENT_CONFIG`, else `~/.decomment/config.json` if a home directory
/// can be determined.
pub fn global_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(GLOBAL_ENV).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    BaseDirs::new().map(|dirs| dirs.home_dir().join(GLOBAL_DIR).join(GLOBAL_FILE))
}

pub fn local_path(dir: &Path) -> PathBuf {
    dir.join(LOCAL_FILE)
}

/// Global then local configuration, merged.
pub fn load_layered(global: Option<&Path>, local: &Path) -> Result<FileConfig> {
    let mut config = match global {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    config.merge(FileConfig::load(local)?);
    Ok(config)
}

/// Validate `pattern` and append it to `list` in the file at `path`.
///
/// Returns `false` when the pattern was already present.
pub fn add_pattern(path: &Path, list: PatternList, pattern: &str) -> Result<bool> {
    let label = match list {
        PatternList::Preserve => "preserve",
        PatternList::FileIgnore => "file ignore",
    };
    compile_regex(pattern, label)?;

    let mut config = FileConfig::load(path)?;
    let entries = config.list_mut(list);
    if entries.iter().any(|p| p == pattern) {
        return Ok(false);
    }
    entries.push(pattern.to_string());
    config.save(path)?;
    Ok(true)
}

fn compile_regex(pattern: &str, label: &str) -> Result<Regex> {
    Regex::new(pattern).with_context(|| format!("Invalid {label} pattern: {pattern}"))
}

fn extend_unique(into: &mut Vec<String>, from: Vec<String>) {
    for item in from {
        if !into.contains(&item) {
            into.push(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;

    fn temp_dir() -> TempDir {
        TempDir::new().expect("create temp dir")
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = temp_dir();
        let config = FileConfig::load(&dir.path().join("nope.json")).expect("load");
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn parses_camel_case_fields() {
        let config: FileConfig = serde_json::from_str(
            r#"{"preservePatterns": ["TODO"], "fileIgnorePatterns": ["\\.min\\.js$"], "mode": "aggressive"}"#,
        )
        .expect("parse");
        assert_eq!(config.preserve_patterns, ["TODO"]);
        assert_eq!(config.file_ignore_patterns, ["\\.min\\.js$"]);
        assert_eq!(config.mode, Some(Mode::Aggressive));
    }

    #[test]
    fn malformed_file_names_the_path() {
        let dir = temp_dir();
        let path = dir.path().join(LOCAL_FILE);
        fs::write(&path, "{ not json").expect("write");
        let err = FileConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains(LOCAL_FILE));
    }

    #[test]
    fn local_extends_global() {
        let dir = temp_dir();
        let global = dir.path().join("global.json");
        let local = dir.path().join(LOCAL_FILE);
        fs::write(&global, r#"{"preservePatterns": ["a", "b"], "mode": "light"}"#).expect("write");
        fs::write(&local, r#"{"preservePatterns": ["b", "c"], "mode": "aggressive"}"#).expect("write");

        let merged = load_layered(Some(global.as_path()), &local).expect("load");
        assert_eq!(merged.preserve_patterns, ["a", "b", "c"]);
        assert_eq!(merged.mode, Some(Mode::Aggressive));
    }

    #[test]
    fn invalid_regex_is_reported() {
        let config = FileConfig {
            file_ignore_patterns: vec!["(".into()],
            ..FileConfig::default()
        };
        let err = config.compile().unwrap_err();
        assert!(format!("{err:#}").contains("Invalid file ignore pattern: ("));
    }

    #[test]
    fn add_pattern_dedups_and_creates_parents() {
        let dir = temp_dir();
        let path = dir.path().join("nested").join("config.json");

        assert!(add_pattern(&path, PatternList::Preserve, "KEEP").expect("add"));
        assert!(!add_pattern(&path, PatternList::Preserve, "KEEP").expect("add again"));
        assert!(add_pattern(&path, PatternList::FileIgnore, r"^vendor/").expect("add ignore"));
        assert!(add_pattern(&path, PatternList::Preserve, "[").is_err());

        let saved = FileConfig::load(&path).expect("reload");
        assert_eq!(saved.preserve_patterns, ["KEEP"]);
        assert_eq!(saved.file_ignore_patterns, ["^vendor/"]);
        let text = fs::read_to_string(&path).expect("read");
        assert!(text.contains("\"preservePatterns\""));
        assert!(!text.contains("\"mode\""));
    }

    #[test]
    fn compiled_settings_keep_order_and_mode() {
        let settings = FileConfig {
            preserve_patterns: vec!["^// KEEP".into()],
            file_ignore_patterns: vec![r"\.min\.js$".into()],
            mode: Some(Mode::Aggressive),
        }
        .compile()
        .expect("compile");
        assert!(settings.preserve[0].matches("// KEEP this"));
        assert!(settings.file_ignore[0].is_match("dist/app.min.js"));
        assert!(!settings.file_ignore[0].is_match("src/app.js"));
        assert_eq!(settings.mode, Some(Mode::Aggressive));
    }
}
