use image::GrayImage;
use log::debug;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::BotConfig;
use crate::error::PatternError;

/// A reference image of one button or icon, kept in grayscale for matching.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub name: String,
    pub path: PathBuf,
    pub image: GrayImage,
}

impl Pattern {
    pub fn from_file(name: &str, path: &Path) -> Result<Self, PatternError> {
        let image = image::open(path)
            .map_err(|source| PatternError::Load {
                name: name.to_string(),
                path: path.to_path_buf(),
                source,
            })?
            .into_luma8();
        if image.width() == 0 || image.height() == 0 {
            return Err(PatternError::Empty {
                name: name.to_string(),
            });
        }
        debug!(
            "Loaded pattern '{}' ({}x{}) from '{}'",
            name,
            image.width(),
            image.height(),
            path.display()
        );
        Ok(Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            image,
        })
    }
}

/// Patterns loaded once at startup and reused for every search.
#[derive(Debug, Default)]
pub struct PatternSet {
    patterns: BTreeMap<String, Pattern>,
}

impl PatternSet {
    /// Loads the named patterns from the paths in `config`.
    ///
    /// Stops at the first name that is not configured or fails to decode.
    pub fn load<'a>(
        config: &BotConfig,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, PatternError> {
        let mut set = Self::default();
        for name in names {
            if set.patterns.contains_key(name) {
                continue;
            }
            let path = config
                .pattern_path(name)
                .ok_or_else(|| PatternError::Unknown(name.to_string()))?;
            set.insert(Pattern::from_file(name, &path)?);
        }
        Ok(set)
    }

    pub fn insert(&mut self, pattern: Pattern) {
        self.patterns.insert(pattern.name.clone(), pattern);
    }

    pub fn get(&self, name: &str) -> Result<&Pattern, PatternError> {
        self.patterns
            .get(name)
            .ok_or_else(|| PatternError::Unknown(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
