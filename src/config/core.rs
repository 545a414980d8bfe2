use super::DepsConfig;
use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::path::Path;

// Embed the default config at compile time
const DEFAULT_CONFIG: &str = include_str!("../../default-config.toml");

/// Project-level config file, looked up in the base directory.
pub const PROJECT_CONFIG: &str = "depsync.toml";

impl DepsConfig {
    /// Configuration chain, lowest priority first:
    /// defaults, user config, project config, `custom_config`, environment.
    pub fn figment(basedir: &Path, custom_config: Option<&Path>) -> Figment {
        let mut figment = Figment::new()
            .merge(Toml::string(DEFAULT_CONFIG))
            .merge(Toml::file(Self::user_config_path()))
            .merge(Toml::file(basedir.join(PROJECT_CONFIG)));

        if let Some(path) = custom_config {
            figment = figment.merge(Toml::file(path));
        }

        // Environment variables always have highest priority
        figment.merge(Env::prefixed("DEPSYNC_").split("__"))
    }

    pub fn load(basedir: &Path, custom_config: Option<&Path>) -> Result<Self> {
        if let Some(path) = custom_config
            && !path.is_file()
        {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        tracing::trace!("CONFIG LOAD: Starting in {}", basedir.display());
        let config: DepsConfig = Self::figment(basedir, custom_config)
            .extract()
            .context("Failed to load configuration")?;
        config.validate()?;

        tracing::debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    fn user_config_path() -> String {
        match std::env::var("HOME") {
            Ok(home) => format!("{home}/.config/depsync/config.toml"),
            Err(_) => "~/.config/depsync/config.toml".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_embedded_defaults_match_struct_defaults() {
        let embedded: DepsConfig = Figment::new()
            .merge(Toml::string(DEFAULT_CONFIG))
            .extract()
            .unwrap();
        assert_eq!(embedded, DepsConfig::default());
    }

    #[test]
    fn test_project_config_overrides_defaults() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(PROJECT_CONFIG),
            "[checkout]\nmax_threads = 3\n\n[manifest]\nprefix = \"Depfile\"\n",
        )
        .unwrap();

        let config = DepsConfig::load(temp.path(), None).unwrap();
        assert_eq!(config.checkout.max_threads, 3);
        assert_eq!(config.manifest.prefix, "Depfile");
        assert_eq!(config.cache.root, PathBuf::from(".depsync_cache"));
    }

    #[test]
    fn test_custom_config_and_environment() {
        let temp = TempDir::new().unwrap();
        let custom = temp.path().join("custom.toml");
        std::fs::write(&custom, "[general]\nverbose = false\n\n[changelog]\nfile = \"NEWS\"\n").unwrap();

        unsafe { std::env::set_var("DEPSYNC_GENERAL__VERBOSE", "true") };
        let config = DepsConfig::load(temp.path(), Some(custom.as_path())).unwrap();
        unsafe { std::env::remove_var("DEPSYNC_GENERAL__VERBOSE") };

        assert!(config.general.verbose);
        assert_eq!(config.changelog.file, PathBuf::from("NEWS"));
    }

    #[test]
    fn test_missing_custom_config_is_an_error() {
        let temp = TempDir::new().unwrap();
        assert!(DepsConfig::load(temp.path(), Some(temp.path().join("nope.toml").as_path())).is_err());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(PROJECT_CONFIG), "[checkout]\nthread_percentage = 0\n").unwrap();

        assert!(DepsConfig::load(temp.path(), None).is_err());
    }
}
