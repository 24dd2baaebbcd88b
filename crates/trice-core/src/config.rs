//! Run configuration
//!
//! A [`Config`] is built once by the caller (the CLI) and passed by reference
//! into every reconciliation entry point. Nothing here is read from process
//! state.

use crate::alloc::SearchMethod;
use crate::id::IdRange;
use crate::reconcile::Policy;
use std::path::PathBuf;
use tracing::warn;

/// Default name of the ID list file
pub const DEFAULT_ID_LIST: &str = "til.json";
pub const DEFAULT_ID_MIN: u32 = 1000;
pub const DEFAULT_ID_MAX: u32 = 7999;
pub const DEFAULT_ID_MIN_SHORT: u32 = 10;
pub const DEFAULT_ID_MAX_SHORT: u32 = 999;
/// Root scanned when no source root is configured
pub const DEFAULT_ROOT: &str = "./";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid ID range [{min}, {max}]: min is greater than max")]
    InvertedRange { min: u32, max: u32 },
    #[error("invalid ID range [{min}, {max}]: 0 is reserved for unassigned IDs")]
    ZeroInRange { min: u32, max: u32 },
    #[error("no source tree root specified")]
    MissingRoot,
}

/// Immutable settings for one command invocation
#[derive(Debug, Clone)]
pub struct Config {
    /// The ID list file (JSON)
    pub id_list: PathBuf,
    /// Range for normal trices (`TRICE...`, `trice...`)
    pub normal: IdRange,
    /// Range for short trices (`Trice...`)
    pub short: IdRange,
    pub method: SearchMethod,
    /// Give bare occurrences with an equal format the same ID
    pub shared_ids: bool,
    /// Extend macro names without `_<n>` by their format specifier count
    pub add_param_count: bool,
    /// Compute and report everything, write nothing
    pub dry_run: bool,
    /// Source directories or files, scanned in order
    pub roots: Vec<PathBuf>,
    /// Glob patterns, relative to each root, of files to skip
    pub exclude: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            id_list: PathBuf::from(DEFAULT_ID_LIST),
            normal: IdRange::NORMAL,
            short: IdRange::SHORT,
            method: SearchMethod::default(),
            shared_ids: false,
            add_param_count: false,
            dry_run: false,
            roots: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

impl Config {
    /// Configured roots, or `./` when none were given
    pub fn roots(&self) -> Vec<PathBuf> {
        if self.roots.is_empty() {
            vec![PathBuf::from(DEFAULT_ROOT)]
        } else {
            self.roots.clone()
        }
    }

    /// ID range new IDs for a macro of the given class are drawn from
    pub fn range_for(&self, short: bool) -> IdRange {
        if short { self.short } else { self.normal }
    }

    /// Check the configuration before any scan starts. Ranges are valid by
    /// construction; overlapping ones are only warned about.
    ///
    /// `zero` rewrites sources without a list to fall back on, so it refuses
    /// to run on the implicit `./` root.
    pub fn validate(&self, policy: Policy) -> Result<(), ConfigError> {
        if self.normal.overlaps(&self.short) {
            warn!(
                normal = %self.normal,
                short = %self.short,
                "normal and short ID ranges overlap"
            );
        }
        if policy == Policy::Zero && self.roots.is_empty() {
            return Err(ConfigError::MissingRoot);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roots() {
        let config = Config::default();
        assert_eq!(config.roots(), vec![PathBuf::from("./")]);

        let config = Config {
            roots: vec!["src".into(), "lib/trice.h".into()],
            ..Config::default()
        };
        assert_eq!(
            config.roots(),
            vec![PathBuf::from("src"), PathBuf::from("lib/trice.h")]
        );
    }

    #[test]
    fn test_zero_requires_root() {
        let config = Config::default();
        assert_eq!(
            config.validate(Policy::Zero),
            Err(ConfigError::MissingRoot)
        );
        assert_eq!(config.validate(Policy::Update), Ok(()));
    }

    #[test]
    fn test_default_ranges() {
        let config = Config::default();
        assert_eq!(config.normal, IdRange::new(DEFAULT_ID_MIN, DEFAULT_ID_MAX).unwrap());
        assert_eq!(
            config.short,
            IdRange::new(DEFAULT_ID_MIN_SHORT, DEFAULT_ID_MAX_SHORT).unwrap()
        );
    }

    #[test]
    fn test_overlapping_ranges_are_accepted() {
        let config = Config {
            normal: IdRange::new(10, 500).unwrap(),
            short: IdRange::new(100, 200).unwrap(),
            ..Config::default()
        };
        assert_eq!(config.validate(Policy::Update), Ok(()));
    }

    #[test]
    fn test_range_for_class() {
        let config = Config::default();
        assert_eq!(config.range_for(true), config.short);
        assert_eq!(config.range_for(false), config.normal);
    }
}
