//! Content factory for loading combat data from a directory.

use std::path::{Path, PathBuf};

use combat_core::CombatConfig;

use crate::loaders::{ConfigLoader, LoadResult, SpellCatalog, SpellLoader};

/// Content factory that loads all combat content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── config.toml
/// └── spells.ron
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    /// Creates a new content factory pointing to a data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Load combat configuration from `config.toml`.
    pub fn load_config(&self) -> LoadResult<CombatConfig> {
        let path = self.data_dir.join("config.toml");
        ConfigLoader::load(&path)
    }

    /// Load the spell catalog from `spells.ron`.
    pub fn load_spells(&self) -> LoadResult<SpellCatalog> {
        let path = self.data_dir.join("spells.ron");
        SpellLoader::load(&path)
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn bundled() -> ContentFactory {
        ContentFactory::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("data"))
    }

    #[test]
    fn test_factory_paths() {
        let factory = ContentFactory::new("/tmp/data");
        assert_eq!(factory.data_dir(), Path::new("/tmp/data"));
    }

    #[test]
    fn bundled_content_loads() {
        let factory = bundled();
        let config = factory.load_config().unwrap();
        assert_eq!(config.dr_reset_ms, CombatConfig::DEFAULT_DR_RESET_MS);

        let catalog = factory.load_spells().unwrap();
        assert!(!catalog.spells.is_empty());
        assert!(!catalog.groups.is_empty());
    }

    #[test]
    fn empty_directory_reports_missing_files() {
        let dir = TempDir::new().unwrap();
        let factory = ContentFactory::new(dir.path());
        assert!(factory.load_config().is_err());
        assert!(factory.load_spells().is_err());
    }

    #[test]
    fn overrides_from_written_config() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.toml"), "cast_pushback_ms = 250\n").unwrap();
        let config = ContentFactory::new(dir.path()).load_config().unwrap();
        assert_eq!(config.cast_pushback_ms, 250);
        assert_eq!(config.max_cast_pushbacks, CombatConfig::DEFAULT_MAX_CAST_PUSHBACKS);
    }
}
