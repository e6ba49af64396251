//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/fathom/config.toml)
//! 3. Project config (.fathom/config.toml)
//! 4. Environment variables (FATHOM_* prefix)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{FathomError, Result};

/// Default configuration written by `config init`
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# fathom configuration

[research]
breadth = 3
depth = 2
max_duration_minutes = 30

[llm]
provider = "openai"
# model = "gpt-4o"
# api_key falls back to the OPENAI_API_KEY env var when unset
timeout_secs = 120
temperature = 0.0
max_tokens = 4096

[search]
# api_key falls back to the FIRECRAWL_API_KEY env var when unset
timeout_secs = 15
result_limit = 5

[synthesis]
# api_key falls back to the ANTHROPIC_API_KEY env var when unset
model = "claude-sonnet-4-20250514"
timeout_secs = 300
"#;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        let project_path = Self::project_config_path();
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        // e.g. FATHOM_RESEARCH_BREADTH -> research.breadth
        figment = figment.merge(Env::prefixed("FATHOM_").split('_').lowercase(true));

        let config: Config = figment
            .extract()
            .map_err(|e| FathomError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| FathomError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/fathom/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join("fathom"))
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(".fathom/config.toml")
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Initialize a config file (global or project) from the default
    /// template. Refuses to overwrite an existing file unless `force`.
    pub fn init_config(global: bool, force: bool) -> Result<PathBuf> {
        let path = if global {
            Self::global_config_path().ok_or_else(|| {
                FathomError::Config("no home directory for global config".to_string())
            })?
        } else {
            Self::project_config_path()
        };

        Self::write_default_config(&path, force)?;
        info!("wrote default config to {}", path.display());
        Ok(path)
    }

    /// Write the default config template to `path`, creating parent
    /// directories as needed.
    pub fn write_default_config(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            return Err(FathomError::Config(format!(
                "{} already exists (use --force to overwrite)",
                path.display()
            )));
        }
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, DEFAULT_CONFIG_TEMPLATE)?;
        Ok(())
    }

    /// Show config file paths on stdout
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Show current effective configuration
    pub fn show_config(as_json: bool) -> Result<()> {
        let config = Self::load()?;

        if as_json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            println!("research.breadth = {}", config.research.breadth);
            println!("research.depth = {}", config.research.depth);
            println!(
                "research.max_duration_minutes = {}",
                config.research.max_duration_minutes
            );
            println!("llm.provider = {}", config.llm.provider);
            println!(
                "llm.model = {}",
                config.llm.model.as_deref().unwrap_or("(default)")
            );
            println!(
                "llm.api_key = {}",
                if config.llm.api_key.is_some() {
                    "[set]"
                } else {
                    "[unset]"
                }
            );
            println!(
                "search.api_key = {}",
                if config.search.api_key.is_some() {
                    "[set]"
                } else {
                    "[unset]"
                }
            );
            println!(
                "synthesis.api_key = {}",
                if config.synthesis.api_key.is_some() {
                    "[set]"
                } else {
                    "[unset]"
                }
            );
        }

        Ok(())
    }
}
