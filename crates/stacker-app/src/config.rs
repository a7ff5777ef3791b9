// Configuration loading and parsing (optimizer.toml, contests.toml).

use serde::Deserialize;
use stacker_core::{ReportOptions, RosterSlotSpec, SearchLimits};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub optimizer: OptimizerConfig,
    pub contests: Vec<ContestConfig>,
}

// ---------------------------------------------------------------------------
// optimizer.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire optimizer.toml file.
#[derive(Debug, Clone, Deserialize)]
struct OptimizerFile {
    search: SearchSection,
    #[serde(default)]
    report: ReportOptions,
    #[serde(default)]
    logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct SearchSection {
    iteration_budget: u64,
    #[serde(default)]
    time_limit_ms: Option<u64>,
    #[serde(default = "default_exact_max_open_slots")]
    exact_max_open_slots: usize,
}

fn default_exact_max_open_slots() -> usize {
    SearchLimits::default().exact_max_open_slots
}

/// The public optimizer config assembled from the optimizer.toml sections.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    pub limits: SearchLimits,
    pub report: ReportOptions,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_filter() -> String {
    "stacker=info,stacker_app=info,stacker_core=info,warn".into()
}

fn default_log_file() -> String {
    "logs/stacker.log".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            filter: default_log_filter(),
            file: default_log_file(),
        }
    }
}

// ---------------------------------------------------------------------------
// contests.toml structs
// ---------------------------------------------------------------------------

/// Wrapper for the `[[contest]]` array in contests.toml.
#[derive(Debug, Clone, Deserialize)]
struct ContestsFile {
    #[serde(default)]
    contest: Vec<ContestConfig>,
}

/// One contest to optimize: where its data lives and its roster rules.
#[derive(Debug, Clone, Deserialize)]
pub struct ContestConfig {
    pub name: String,
    /// Players CSV, relative to the base directory.
    pub players: String,
    /// Synergy CSV, relative to the base directory.
    #[serde(default)]
    pub synergies: Option<String>,
    /// Salary cap. Omit for season-long formats.
    #[serde(default)]
    pub budget: Option<u64>,
    #[serde(default)]
    pub roster_size: Option<usize>,
    #[serde(default)]
    pub locked: Vec<String>,
    #[serde(default)]
    pub banned: Vec<String>,
    #[serde(rename = "slot", default)]
    pub slots: Vec<SlotConfig>,
}

/// A `[[contest.slot]]` entry. Either `count`, or both `min` and `max`.
#[derive(Debug, Clone, Deserialize)]
pub struct SlotConfig {
    pub label: String,
    pub positions: Vec<String>,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub min: Option<usize>,
    #[serde(default)]
    pub max: Option<usize>,
}

impl SlotConfig {
    /// Convert a validated slot entry into the optimizer's slot spec.
    pub fn to_spec(&self) -> RosterSlotSpec {
        let (min, max) = match self.count {
            Some(count) => (count, count),
            None => (self.min.unwrap_or(0), self.max.unwrap_or(0)),
        };
        RosterSlotSpec {
            label: self.label.clone(),
            min,
            max,
            positions: self.positions.clone(),
        }
    }
}

impl ContestConfig {
    pub fn slot_specs(&self) -> Vec<RosterSlotSpec> {
        self.slots.iter().map(SlotConfig::to_spec).collect()
    }

    pub fn players_path(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.players)
    }

    pub fn synergies_path(&self, base_dir: &Path) -> Option<PathBuf> {
        self.synergies.as_ref().map(|s| base_dir.join(s))
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/optimizer.toml` and
/// `config/contests.toml`, both relative to the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- optimizer.toml (required) ---
    let optimizer_path = config_dir.join("optimizer.toml");
    let optimizer_text = read_file(&optimizer_path)?;
    let optimizer_file: OptimizerFile =
        toml::from_str(&optimizer_text).map_err(|e| ConfigError::ParseError {
            path: optimizer_path.clone(),
            source: e,
        })?;

    let optimizer = OptimizerConfig {
        limits: SearchLimits {
            iteration_budget: optimizer_file.search.iteration_budget,
            time_limit: optimizer_file.search.time_limit_ms.map(Duration::from_millis),
            exact_max_open_slots: optimizer_file.search.exact_max_open_slots,
        },
        report: optimizer_file.report,
        logging: optimizer_file.logging,
    };

    // --- contests.toml (required) ---
    let contests_path = config_dir.join("contests.toml");
    let contests_text = read_file(&contests_path)?;
    let contests_file: ContestsFile =
        toml::from_str(&contests_text).map_err(|e| ConfigError::ParseError {
            path: contests_path.clone(),
            source: e,
        })?;

    let config = Config {
        optimizer,
        contests: contests_file.contest,
    };

    validate(&config, optimizer_file.search.time_limit_ms)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // Keep the user's edited copy.
            }
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config, time_limit_ms: Option<u64>) -> Result<(), ConfigError> {
    if config.optimizer.limits.iteration_budget == 0 {
        return Err(invalid("search.iteration_budget", "must be greater than 0"));
    }
    if time_limit_ms == Some(0) {
        return Err(invalid("search.time_limit_ms", "must be greater than 0 when set"));
    }
    if config.optimizer.logging.filter.trim().is_empty() {
        return Err(invalid("logging.filter", "must not be empty"));
    }

    if config.contests.is_empty() {
        return Err(invalid("contest", "at least one [[contest]] is required"));
    }

    let mut names = HashSet::new();
    for (i, contest) in config.contests.iter().enumerate() {
        let name = contest.name.trim();
        if name.is_empty() {
            return Err(invalid(format!("contest[{i}].name"), "must not be empty"));
        }
        if !names.insert(name) {
            return Err(invalid(
                format!("contest[{i}].name"),
                format!("duplicate contest name `{name}`"),
            ));
        }
        if contest.players.trim().is_empty() {
            return Err(invalid(format!("{name}.players"), "must not be empty"));
        }
        if contest.slots.is_empty() {
            return Err(invalid(
                format!("{name}.slot"),
                "at least one [[contest.slot]] is required",
            ));
        }

        for slot in &contest.slots {
            let field = format!("{name}.slot.{}", slot.label);
            if slot.positions.iter().all(|p| p.trim().is_empty()) {
                return Err(invalid(field, "positions must not be empty"));
            }
            match (slot.count, slot.min, slot.max) {
                (Some(_), None, None) => {}
                (None, Some(min), Some(max)) => {
                    if min > max {
                        return Err(invalid(field, format!("min {min} is greater than max {max}")));
                    }
                }
                _ => {
                    return Err(invalid(field, "set either `count` or both `min` and `max`"));
                }
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    /// Helper: returns the path to the stacker-app crate root
    /// (works whether `cargo test` runs from the crate root or repo root).
    fn project_root() -> PathBuf {
        let cwd = std::env::current_dir().unwrap();
        if cwd.join("defaults").exists() {
            cwd
        } else if cwd.join("crates/stacker-app/defaults").exists() {
            cwd.join("crates/stacker-app")
        } else {
            panic!("Cannot locate defaults/ directory from CWD {:?}", cwd);
        }
    }

    /// Temp dir with the default optimizer.toml and the given contests.toml.
    fn temp_config(name: &str, contests_toml: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let config_dir = tmp.join("config");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&config_dir).unwrap();

        let root = project_root();
        fs::copy(
            root.join("defaults/optimizer.toml"),
            config_dir.join("optimizer.toml"),
        )
        .unwrap();
        fs::write(config_dir.join("contests.toml"), contests_toml).unwrap();
        tmp
    }

    fn expect_field(err: ConfigError, expected: &str) {
        match &err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, expected),
            other => panic!("expected ValidationError, got: {other}"),
        }
    }

    #[test]
    fn load_valid_config_from_project_files() {
        let tmp = std::env::temp_dir().join("stacker_config_defaults");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        let root = project_root();
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        for file in ["optimizer.toml", "contests.toml"] {
            fs::copy(root.join("defaults").join(file), tmp.join("defaults").join(file)).unwrap();
        }

        let copied = ensure_config_files(&tmp).expect("should copy default configs");
        assert_eq!(copied.len(), 2);
        let config = load_config_from(&tmp).expect("should load valid config");

        assert_eq!(config.optimizer.limits.iteration_budget, 200_000);
        assert_eq!(config.optimizer.limits.time_limit, Some(Duration::from_millis(2_000)));
        assert_eq!(config.optimizer.limits.exact_max_open_slots, 4);
        assert_eq!(config.optimizer.report.max_stack_partners, 5);
        assert_eq!(config.optimizer.report.max_realized_edges, 10);
        assert_eq!(config.optimizer.logging.file, "logs/stacker.log");

        assert_eq!(config.contests.len(), 2);
        let classic = &config.contests[0];
        assert_eq!(classic.name, "main-slate-classic");
        assert_eq!(classic.budget, Some(50_000));
        assert_eq!(classic.slots.len(), 5);
        let flex = classic.slot_specs().pop().unwrap();
        assert_eq!(flex.label, "FLEX");
        assert_eq!((flex.min, flex.max), (1, 1));

        let season = &config.contests[1];
        assert_eq!(season.budget, None);
        assert_eq!(season.roster_size, Some(6));
        let bench = season.slot_specs().pop().unwrap();
        assert_eq!((bench.min, bench.max), (0, 2));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_keeps_existing_copies() {
        let tmp = std::env::temp_dir().join("stacker_config_keep_existing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("defaults/optimizer.toml"), "default").unwrap();
        fs::write(tmp.join("defaults/local.toml.example"), "example").unwrap();
        fs::write(tmp.join("config/optimizer.toml"), "edited").unwrap();

        let copied = ensure_config_files(&tmp).unwrap();
        assert!(copied.is_empty());
        assert_eq!(
            fs::read_to_string(tmp.join("config/optimizer.toml")).unwrap(),
            "edited"
        );
        assert!(!tmp.join("config/local.toml.example").exists());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_contests_file_is_not_found() {
        let tmp = std::env::temp_dir().join("stacker_config_no_contests");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::copy(
            project_root().join("defaults/optimizer.toml"),
            tmp.join("config/optimizer.toml"),
        )
        .unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_iteration_budget() {
        let tmp = temp_config(
            "stacker_config_zero_budget",
            r#"
[[contest]]
name = "c"
players = "players.csv"

[[contest.slot]]
label = "QB"
positions = ["QB"]
count = 1
"#,
        );
        let optimizer = tmp.join("config/optimizer.toml");
        let text = fs::read_to_string(&optimizer).unwrap();
        fs::write(
            &optimizer,
            text.replace("iteration_budget = 200000", "iteration_budget = 0"),
        )
        .unwrap();

        expect_field(load_config_from(&tmp).unwrap_err(), "search.iteration_budget");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_slot_with_count_and_range() {
        let tmp = temp_config(
            "stacker_config_count_and_range",
            r#"
[[contest]]
name = "c"
players = "players.csv"

[[contest.slot]]
label = "FLEX"
positions = ["RB", "WR"]
count = 1
min = 0
max = 1
"#,
        );
        expect_field(load_config_from(&tmp).unwrap_err(), "c.slot.FLEX");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_min_above_max() {
        let tmp = temp_config(
            "stacker_config_min_above_max",
            r#"
[[contest]]
name = "c"
players = "players.csv"

[[contest.slot]]
label = "BN"
positions = ["QB"]
min = 3
max = 1
"#,
        );
        expect_field(load_config_from(&tmp).unwrap_err(), "c.slot.BN");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_duplicate_contest_names() {
        let tmp = temp_config(
            "stacker_config_duplicate_names",
            r#"
[[contest]]
name = "same"
players = "a.csv"
[[contest.slot]]
label = "QB"
positions = ["QB"]
count = 1

[[contest]]
name = "same"
players = "b.csv"
[[contest.slot]]
label = "QB"
positions = ["QB"]
count = 1
"#,
        );
        expect_field(load_config_from(&tmp).unwrap_err(), "contest[1].name");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_contest_without_slots() {
        let tmp = temp_config(
            "stacker_config_no_slots",
            r#"
[[contest]]
name = "empty"
players = "players.csv"
"#,
        );
        expect_field(load_config_from(&tmp).unwrap_err(), "empty.slot");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let tmp = temp_config("stacker_config_malformed", "[[contest]\nname = ");
        let err = load_config_from(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        let _ = fs::remove_dir_all(&tmp);
    }
}
