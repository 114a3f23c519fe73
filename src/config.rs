//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.prfigures.toml` files.

use crate::report::theme::{Rgb, GRAY};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILE: &str = ".prfigures.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Dataset location settings.
    #[serde(default)]
    pub data: DataConfig,

    /// Image output settings.
    #[serde(default)]
    pub render: RenderConfig,

    /// Agent ordering and colors for per-agent figures.
    #[serde(default)]
    pub agents: AgentsConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory figures are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            verbose: false,
        }
    }
}

fn default_output_dir() -> String {
    "figures_individual".to_string()
}

/// Where the dataset tables live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory holding one file per table.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// File stem overrides keyed by table (e.g. `pull_requests = "prs"`).
    #[serde(default)]
    pub sources: BTreeMap<String, String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            sources: BTreeMap::new(),
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

/// Image output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Dots per inch; figure pixel size is inches times DPI.
    #[serde(default = "default_dpi")]
    pub dpi: u32,

    /// Font family for all text.
    #[serde(default = "default_font_family")]
    pub font_family: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            dpi: default_dpi(),
            font_family: default_font_family(),
        }
    }
}

fn default_dpi() -> u32 {
    300
}

fn default_font_family() -> String {
    "sans-serif".to_string()
}

/// Agent ordering and colors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    /// Agents shown in per-agent figures, in axis order.
    #[serde(default = "default_agent_order")]
    pub order: Vec<String>,

    /// Color per agent.
    #[serde(default = "default_agent_colors")]
    pub colors: BTreeMap<String, Rgb>,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            order: default_agent_order(),
            colors: default_agent_colors(),
        }
    }
}

fn default_agent_order() -> Vec<String> {
    vec!["Claude_Code", "Cursor", "Copilot", "Devin", "OpenAI_Codex"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_agent_colors() -> BTreeMap<String, Rgb> {
    [
        ("Claude_Code", Rgb(0xFF, 0x6B, 0x6B)),
        ("Cursor", Rgb(0x4E, 0xCD, 0xC4)),
        ("Copilot", Rgb(0x45, 0xB7, 0xD1)),
        ("Devin", Rgb(0xFF, 0xA0, 0x7A)),
        ("OpenAI_Codex", Rgb(0x98, 0xD8, 0xC8)),
    ]
    .into_iter()
    .map(|(name, color)| (name.to_string(), color))
    .collect()
}

impl AgentsConfig {
    /// Color for `agent`; agents without a configured color are gray.
    pub fn color_for(&self, agent: &str) -> Rgb {
        self.colors.get(agent).copied().unwrap_or(GRAY)
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when the CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref data_dir) = args.data_dir {
            self.data.data_dir = data_dir.display().to_string();
        }
        if let Some(ref output_dir) = args.output_dir {
            self.general.output_dir = output_dir.display().to_string();
        }
        if let Some(dpi) = args.dpi {
            self.render.dpi = dpi;
        }
    }

    /// Reject settings that would make every figure fail.
    pub fn validate(&self) -> Result<()> {
        if self.render.dpi == 0 {
            anyhow::bail!("render.dpi must be at least 1");
        }
        if self.agents.order.is_empty() {
            anyhow::bail!("agents.order must name at least one agent");
        }
        for key in self.data.sources.keys() {
            let known = crate::models::TableKind::ALL
                .iter()
                .any(|kind| kind.config_key() == key);
            if !known {
                anyhow::bail!("Unknown table '{}' in [data.sources]", key);
            }
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.output_dir, "figures_individual");
        assert_eq!(config.render.dpi, 300);
        assert_eq!(config.agents.order.len(), 5);
        assert_eq!(config.agents.color_for("Cursor"), Rgb(0x4E, 0xCD, 0xC4));
        assert_eq!(config.agents.color_for("Unknown"), GRAY);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r##"
[general]
output_dir = "out"
verbose = true

[data]
data_dir = "datasets"

[data.sources]
pull_requests = "prs"

[render]
dpi = 100

[agents]
order = ["Cursor", "Devin"]

[agents.colors]
Cursor = "#000000"
"##;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output_dir, "out");
        assert!(config.general.verbose);
        assert_eq!(config.data.data_dir, "datasets");
        assert_eq!(config.data.sources.get("pull_requests").map(String::as_str), Some("prs"));
        assert_eq!(config.render.dpi, 100);
        assert_eq!(config.render.font_family, "sans-serif");
        assert_eq!(config.agents.order, vec!["Cursor", "Devin"]);
        assert_eq!(config.agents.color_for("Cursor"), Rgb(0, 0, 0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_color_rejected() {
        let toml_content = r##"
[agents.colors]
Cursor = "teal"
"##;
        assert!(toml::from_str::<Config>(toml_content).is_err());
    }

    #[test]
    fn test_unknown_source_rejected() {
        let mut config = Config::default();
        config
            .data
            .sources
            .insert("pulls".to_string(), "x".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[render]"));
        assert!(toml_str.contains("[agents"));
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.agents.order, Config::default().agents.order);
    }
}
