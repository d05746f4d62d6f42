use anyhow::Context;
use config::{Config, File, FileFormat};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::actions::PATTERN_NAMES;

pub const DEFAULT_CONFIG_FILE: &str = "gacha-pilot.toml";
pub const DEFAULT_THRESHOLD: f32 = 0.7;
pub const DEFAULT_TIMEOUT_SECS: f64 = 3.0;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Everything the bot reads from outside the binary.
///
/// Values are handed to each component explicitly; nothing reads this from
/// global state.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// 0 captures every monitor as one virtual desktop, n >= 1 the n-th monitor.
    pub monitor: usize,
    pub threshold: f32,
    pub timeout_secs: f64,
    pub poll_interval_ms: u64,
    pub pattern_dir: PathBuf,
    pub debug_dir: PathBuf,
    /// pattern name -> image file. Relative paths resolve against `pattern_dir`.
    pub patterns: BTreeMap<String, PathBuf>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            monitor: 0,
            threshold: DEFAULT_THRESHOLD,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            pattern_dir: PathBuf::from("img"),
            debug_dir: PathBuf::from("debugging-imgs"),
            patterns: default_patterns(),
        }
    }
}

fn default_patterns() -> BTreeMap<String, PathBuf> {
    PATTERN_NAMES
        .iter()
        .map(|name| (name.to_string(), PathBuf::from(format!("{name}.png"))))
        .collect()
}

/// Negative and NaN durations become zero.
pub fn secs_to_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
}

impl BotConfig {
    /// Reads `path` as TOML on top of the built-in defaults.
    ///
    /// A missing file is only an error when `required` is set. Pattern entries
    /// in the file are merged into the default pattern table.
    pub fn load(path: &Path, required: bool) -> anyhow::Result<Self> {
        let source = File::new(&path.to_string_lossy(), FileFormat::Toml).required(required);
        let mut loaded: BotConfig = Config::builder()
            .add_source(source)
            .build()
            .with_context(|| format!("failed to read config '{}'", path.display()))?
            .try_deserialize()
            .with_context(|| format!("invalid config '{}'", path.display()))?;

        let mut patterns = default_patterns();
        patterns.append(&mut loaded.patterns);
        loaded.patterns = patterns;
        Ok(loaded)
    }

    pub fn timeout(&self) -> Duration {
        secs_to_duration(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn pattern_path(&self, name: &str) -> Option<PathBuf> {
        self.patterns.get(name).map(|path| {
            if path.is_absolute() {
                path.clone()
            } else {
                self.pattern_dir.join(path)
            }
        })
    }

    pub fn pattern_names(&self) -> impl Iterator<Item = &str> {
        self.patterns.keys().map(String::as_str)
    }
}
