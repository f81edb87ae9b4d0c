//! Application configuration for TagTrace.
//!
//! User config lives at `~/.tagtrace/tagtrace.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TagTraceError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "tagtrace.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".tagtrace";

/// Distance (page points) under which two same-page occurrences of one tag
/// are the same detection. Unverified domain assumption, hence configurable.
pub const DEFAULT_DEDUP_THRESHOLD_PT: f64 = 50.0;

/// Highest contact sequence number accepted in `[contacts]` suffixes.
pub const MAX_CONTACT_INDEX: u32 = 99;

// ---------------------------------------------------------------------------
// Config structs (matching tagtrace.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub matching: MatchingSection,

    #[serde(default)]
    pub classifier: ClassifierSection,

    #[serde(default)]
    pub extraction: ExtractionSection,

    #[serde(default)]
    pub contacts: ContactsSection,

    #[serde(default)]
    pub routing: RoutingSection,
}

/// `[matching]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingSection {
    /// Same-page clustering distance in points.
    #[serde(default = "default_dedup_threshold")]
    pub dedup_threshold_pt: f64,

    /// Include non-schematic pages when matching.
    #[serde(default)]
    pub search_all_pages: bool,
}

impl Default for MatchingSection {
    fn default() -> Self {
        Self {
            dedup_threshold_pt: default_dedup_threshold(),
            search_all_pages: false,
        }
    }
}

fn default_dedup_threshold() -> f64 {
    DEFAULT_DEDUP_THRESHOLD_PT
}

/// `[classifier]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierSection {
    /// Keyword locales tried against the title block, in order.
    #[serde(default = "default_locales")]
    pub locales: Vec<String>,

    /// Height of the title-block band as a fraction of the page height.
    #[serde(default = "default_title_block_height_ratio")]
    pub title_block_height_ratio: f64,

    /// Width of the (horizontally centred) title-block band as a fraction of the page width.
    #[serde(default = "default_title_block_width_ratio")]
    pub title_block_width_ratio: f64,

    /// Minimum share of runs that must be tags for a page to count as a schematic.
    #[serde(default = "default_min_tag_density")]
    pub min_tag_density: f64,

    /// Minimum number of tag runs for a page to count as a schematic.
    #[serde(default = "default_min_tag_runs")]
    pub min_tag_runs: usize,

    /// Minimum number of aligned cable-number rows for a cable table.
    #[serde(default = "default_min_cable_rows")]
    pub min_cable_rows: usize,
}

impl Default for ClassifierSection {
    fn default() -> Self {
        Self {
            locales: default_locales(),
            title_block_height_ratio: default_title_block_height_ratio(),
            title_block_width_ratio: default_title_block_width_ratio(),
            min_tag_density: default_min_tag_density(),
            min_tag_runs: default_min_tag_runs(),
            min_cable_rows: default_min_cable_rows(),
        }
    }
}

fn default_locales() -> Vec<String> {
    vec!["en".into(), "de".into()]
}
fn default_title_block_height_ratio() -> f64 {
    0.15
}
fn default_title_block_width_ratio() -> f64 {
    0.6
}
fn default_min_tag_density() -> f64 {
    0.05
}
fn default_min_tag_runs() -> usize {
    3
}
fn default_min_cable_rows() -> usize {
    4
}

/// `[extraction]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionSection {
    /// Worker count for per-page scanning; 0 means one per available core.
    #[serde(default)]
    pub workers: usize,
}

/// `[contacts]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactsSection {
    /// Contact suffixes looked up for a base tag, in order.
    #[serde(default = "default_contact_suffixes")]
    pub suffixes: Vec<String>,

    /// Suffixes whose contact pair is normally closed (n1-n2) instead of
    /// normally open (n3-n4).
    #[serde(default)]
    pub normally_closed: Vec<String>,
}

impl Default for ContactsSection {
    fn default() -> Self {
        Self {
            suffixes: default_contact_suffixes(),
            normally_closed: Vec::new(),
        }
    }
}

fn default_contact_suffixes() -> Vec<String> {
    vec![".1".into(), ".2".into(), ".3".into(), ".4".into()]
}

/// `[routing]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingSection {
    /// Inset of edge terminals from the bbox edge, in points.
    #[serde(default = "default_edge_inset")]
    pub edge_inset_pt: f64,

    /// Vertical pitch between the two power terminals of a sensor, in points.
    #[serde(default = "default_sensor_pitch")]
    pub sensor_pitch_pt: f64,

    /// Channel count assumed for PLC I/O modules that do not declare one.
    #[serde(default = "default_plc_channels")]
    pub default_plc_channels: u32,

    /// Upper bound on a PLC module's channel count; larger declared counts
    /// are clamped.
    #[serde(default = "default_max_plc_channels")]
    pub max_plc_channels: u32,
}

impl Default for RoutingSection {
    fn default() -> Self {
        Self {
            edge_inset_pt: default_edge_inset(),
            sensor_pitch_pt: default_sensor_pitch(),
            default_plc_channels: default_plc_channels(),
            max_plc_channels: default_max_plc_channels(),
        }
    }
}

fn default_edge_inset() -> f64 {
    5.0
}
fn default_sensor_pitch() -> f64 {
    10.0
}
fn default_plc_channels() -> u32 {
    8
}
fn default_max_plc_channels() -> u32 {
    256
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime matching configuration.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    pub dedup_threshold_pt: f64,
    pub search_all_pages: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for MatchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            dedup_threshold_pt: config.matching.dedup_threshold_pt,
            search_all_pages: config.matching.search_all_pages,
        }
    }
}

/// Runtime classifier configuration.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub locales: Vec<String>,
    pub title_block_height_ratio: f64,
    pub title_block_width_ratio: f64,
    pub min_tag_density: f64,
    pub min_tag_runs: usize,
    pub min_cable_rows: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ClassifierConfig {
    fn from(config: &AppConfig) -> Self {
        let c = &config.classifier;
        Self {
            locales: c.locales.clone(),
            title_block_height_ratio: c.title_block_height_ratio,
            title_block_width_ratio: c.title_block_width_ratio,
            min_tag_density: c.min_tag_density,
            min_tag_runs: c.min_tag_runs,
            min_cable_rows: c.min_cable_rows,
        }
    }
}

/// Runtime scan configuration: everything needed to turn a document into
/// classified, tagged pages.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Worker count; 0 means one per available core.
    pub workers: usize,
    pub classifier: ClassifierConfig,
    pub matching: MatchConfig,
    pub contacts: ContactConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ScanConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            workers: config.extraction.workers,
            classifier: ClassifierConfig::from(config),
            matching: MatchConfig::from(config),
            contacts: ContactConfig::from(config),
        }
    }
}

impl ScanConfig {
    /// Resolved worker count (never zero).
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

/// Runtime contact-suffix configuration.
#[derive(Debug, Clone)]
pub struct ContactConfig {
    pub suffixes: Vec<String>,
    pub normally_closed: Vec<String>,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ContactConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            suffixes: config.contacts.suffixes.clone(),
            normally_closed: config.contacts.normally_closed.clone(),
        }
    }
}

/// Runtime terminal-layout configuration.
#[derive(Debug, Clone)]
pub struct RoutingConfig {
    pub edge_inset_pt: f64,
    pub sensor_pitch_pt: f64,
    pub default_plc_channels: u32,
    pub max_plc_channels: u32,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for RoutingConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            edge_inset_pt: config.routing.edge_inset_pt,
            sensor_pitch_pt: config.routing.sensor_pitch_pt,
            default_plc_channels: config.routing.default_plc_channels,
            max_plc_channels: config.routing.max_plc_channels,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.tagtrace/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TagTraceError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.tagtrace/tagtrace.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TagTraceError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        TagTraceError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| TagTraceError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| TagTraceError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TagTraceError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject values the pipeline cannot work with.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let threshold = config.matching.dedup_threshold_pt;
    if !threshold.is_finite() || threshold <= 0.0 {
        return Err(TagTraceError::config(format!(
            "matching.dedup_threshold_pt must be a positive number, got {threshold}"
        )));
    }

    let c = &config.classifier;
    for (name, ratio) in [
        ("title_block_height_ratio", c.title_block_height_ratio),
        ("title_block_width_ratio", c.title_block_width_ratio),
    ] {
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(TagTraceError::config(format!(
                "classifier.{name} must be in (0, 1], got {ratio}"
            )));
        }
    }

    for suffix in config
        .contacts
        .suffixes
        .iter()
        .chain(&config.contacts.normally_closed)
    {
        let index = suffix.strip_prefix('.').and_then(|n| n.parse::<u32>().ok());
        if !matches!(index, Some(1..=MAX_CONTACT_INDEX)) {
            return Err(TagTraceError::config(format!(
                "contacts entry {suffix:?} must be \".1\" to \".{MAX_CONTACT_INDEX}\""
            )));
        }
    }

    let r = &config.routing;
    if r.max_plc_channels == 0 || r.default_plc_channels > r.max_plc_channels {
        return Err(TagTraceError::config(format!(
            "routing.default_plc_channels ({}) must not exceed routing.max_plc_channels ({}), which must be positive",
            r.default_plc_channels, r.max_plc_channels
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("dedup_threshold_pt"));
        assert!(toml_str.contains("title_block_height_ratio"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.matching.dedup_threshold_pt, 50.0);
        assert_eq!(parsed.contacts.suffixes, vec![".1", ".2", ".3", ".4"]);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let toml_str = r#"
[matching]
search_all_pages = true

[contacts]
normally_closed = [".2"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert!(config.matching.search_all_pages);
        assert_eq!(config.matching.dedup_threshold_pt, 50.0);
        assert_eq!(config.contacts.normally_closed, vec![".2"]);
        assert_eq!(config.routing.default_plc_channels, 8);
    }

    #[test]
    fn runtime_configs_from_app_config() {
        let app = AppConfig::default();
        let scan = ScanConfig::from(&app);
        assert_eq!(scan.workers, 0);
        assert!(scan.effective_workers() >= 1);
        assert_eq!(scan.classifier.locales, vec!["en", "de"]);
        let routing = RoutingConfig::from(&app);
        assert_eq!(routing.edge_inset_pt, 5.0);
    }

    #[test]
    fn invalid_threshold_rejected() {
        let mut config = AppConfig::default();
        config.matching.dedup_threshold_pt = 0.0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("dedup_threshold_pt"));

        let mut config = AppConfig::default();
        config.contacts.suffixes = vec!["1".into()];
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn contact_index_out_of_range_rejected() {
        for bad in [".0", ".100", ".999999999", ".x"] {
            let mut config = AppConfig::default();
            config.contacts.suffixes = vec![bad.into()];
            assert!(validate_config(&config).is_err(), "{bad} accepted");
        }

        let mut config = AppConfig::default();
        config.contacts.normally_closed = vec![".4294967295".into()];
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.contacts.suffixes = vec![".1".into(), ".99".into()];
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn plc_channel_bounds() {
        let app = AppConfig::default();
        assert_eq!(RoutingConfig::from(&app).max_plc_channels, 256);

        let mut config = AppConfig::default();
        config.routing.default_plc_channels = 300;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("max_plc_channels"));

        let mut config = AppConfig::default();
        config.routing.max_plc_channels = 0;
        assert!(validate_config(&config).is_err());
    }
}
