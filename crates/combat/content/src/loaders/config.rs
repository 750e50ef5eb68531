//! Combat configuration loader.

use std::path::Path;

use anyhow::ensure;
use combat_core::CombatConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for combat configuration from TOML files.
///
/// Missing keys keep their [`CombatConfig::default`] values.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config data from a TOML file.
    pub fn load(path: &Path) -> LoadResult<CombatConfig> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    /// Parse and validate config data already in memory.
    pub fn parse(content: &str) -> LoadResult<CombatConfig> {
        let config: CombatConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?;
        Self::validate(&config)?;

        tracing::debug!(
            target: "content::config",
            dr_reset_ms = config.dr_reset_ms,
            max_proc_chain_depth = config.max_proc_chain_depth,
            "loaded combat config"
        );
        Ok(config)
    }

    fn validate(config: &CombatConfig) -> LoadResult<()> {
        ensure!(
            config.max_proc_chain_depth > 0,
            "max_proc_chain_depth must be at least 1"
        );
        ensure!(
            (0.0..=100.0).contains(&config.channel_delay_pct),
            "channel_delay_pct must be within 0..=100, got {}",
            config.channel_delay_pct
        );
        ensure!(
            config.health_low_pct < config.health_mid_pct
                && config.health_mid_pct < config.health_high_pct
                && config.health_high_pct <= 100,
            "health thresholds must be increasing and at most 100 ({} / {} / {})",
            config.health_low_pct,
            config.health_mid_pct,
            config.health_high_pct
        );
        ensure!(
            config.dr_pvp_duration_limit_ms >= 0,
            "dr_pvp_duration_limit_ms must not be negative"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = ConfigLoader::parse("dr_reset_ms = 15000\n").unwrap();
        assert_eq!(config.dr_reset_ms, 15_000);
        assert_eq!(config.max_proc_chain_depth, CombatConfig::DEFAULT_MAX_PROC_CHAIN_DEPTH);
        assert_eq!(config.health_low_pct, 20);
    }

    #[test]
    fn inverted_health_thresholds_are_rejected() {
        let err = ConfigLoader::parse("health_low_pct = 50\nhealth_mid_pct = 35\n").unwrap_err();
        assert!(err.to_string().contains("health thresholds"));
    }

    #[test]
    fn zero_proc_depth_is_rejected() {
        assert!(ConfigLoader::parse("max_proc_chain_depth = 0\n").is_err());
    }

    #[test]
    fn malformed_toml_reports_parse_failure() {
        let err = ConfigLoader::parse("dr_reset_ms = \"soon\"\n").unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse config TOML"));
    }
}
