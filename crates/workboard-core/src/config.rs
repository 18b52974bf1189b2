use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::model::board::MAX_WORK_ITEMS;
use crate::model::item::{MAX_CHILDREN, ParseEnumError};

/// Per-board settings. Every section falls back to defaults when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub links: LinkConfig,
}

/// Capacity limits. These may lower the built-in bounds but never raise them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_work_items")]
    pub max_work_items: usize,
    #[serde(default = "default_max_children")]
    pub max_children: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_work_items: default_max_work_items(),
            max_children: default_max_children(),
        }
    }
}

/// What to do when a link would make an item its own ancestor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclePolicy {
    Allow,
    #[default]
    Warn,
    Reject,
}

impl CyclePolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Warn => "warn",
            Self::Reject => "reject",
        }
    }
}

impl fmt::Display for CyclePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CyclePolicy {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow" => Ok(Self::Allow),
            "warn" => Ok(Self::Warn),
            "reject" => Ok(Self::Reject),
            _ => Err(ParseEnumError {
                expected: "cycle policy",
                got: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    #[serde(default)]
    pub cycles: CyclePolicy,
}

impl BoardConfig {
    /// Check limits stay within the built-in bounds.
    ///
    /// # Errors
    ///
    /// Returns an error if a limit is zero or above its hard maximum.
    pub fn validate(&self) -> Result<()> {
        let limits = &self.limits;
        if limits.max_work_items == 0 || limits.max_work_items > MAX_WORK_ITEMS {
            bail!(
                "limits.max_work_items must be in 1..={MAX_WORK_ITEMS} (got {})",
                limits.max_work_items
            );
        }
        if limits.max_children == 0 || limits.max_children > MAX_CHILDREN {
            bail!(
                "limits.max_children must be in 1..={MAX_CHILDREN} (got {})",
                limits.max_children
            );
        }
        Ok(())
    }
}

/// Parse and validate a config document.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or a limit is out of range.
pub fn parse_board_config(content: &str) -> Result<BoardConfig> {
    let config = toml::from_str::<BoardConfig>(content)?;
    config.validate()?;
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<BoardConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    parse_board_config(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Path of the user-level config file, if the platform has a config dir.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("workboard/config.toml"))
}

/// Load `.workboard/config.toml` under `project_root`, then the user-level
/// config, then defaults. The first file found wins.
///
/// # Errors
///
/// Returns an error if a config file exists but cannot be read, parsed or
/// validated.
pub fn load_board_config(project_root: &Path) -> Result<BoardConfig> {
    load_board_config_from(project_root, user_config_path().as_deref())
}

fn load_board_config_from(project_root: &Path, user_path: Option<&Path>) -> Result<BoardConfig> {
    let project_path = project_root.join(".workboard/config.toml");
    if project_path.exists() {
        tracing::debug!(path = %project_path.display(), "loading project board config");
        return read_config_file(&project_path);
    }

    if let Some(path) = user_path.filter(|p| p.exists()) {
        tracing::debug!(path = %path.display(), "loading user board config");
        return read_config_file(path);
    }

    Ok(BoardConfig::default())
}

const fn default_max_work_items() -> usize {
    MAX_WORK_ITEMS
}

const fn default_max_children() -> usize {
    MAX_CHILDREN
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_project_config(root: &Path, content: &str) {
        let dir = root.join(".workboard");
        std::fs::create_dir_all(&dir).expect("create .workboard");
        std::fs::write(dir.join("config.toml"), content).expect("write config");
    }

    #[test]
    fn missing_config_uses_defaults() {
        let root = tempfile::tempdir().expect("temp dir");
        let cfg = load_board_config_from(root.path(), None).expect("load should succeed");
        assert_eq!(cfg.limits.max_work_items, 5000);
        assert_eq!(cfg.limits.max_children, 100);
        assert_eq!(cfg.links.cycles, CyclePolicy::Warn);
    }

    #[test]
    fn partial_sections_fill_in_defaults() {
        let cfg = parse_board_config("[limits]\nmax_children = 12\n").expect("parse");
        assert_eq!(cfg.limits.max_children, 12);
        assert_eq!(cfg.limits.max_work_items, 5000);
        assert_eq!(cfg.links.cycles, CyclePolicy::Warn);
    }

    #[test]
    fn cycle_policy_parses_lowercase() {
        let cfg = parse_board_config("[links]\ncycles = \"reject\"\n").expect("parse");
        assert_eq!(cfg.links.cycles, CyclePolicy::Reject);
        assert!(parse_board_config("[links]\ncycles = \"explode\"\n").is_err());
    }

    #[test]
    fn limits_cannot_exceed_hard_bounds() {
        assert!(parse_board_config("[limits]\nmax_work_items = 5001\n").is_err());
        assert!(parse_board_config("[limits]\nmax_children = 101\n").is_err());
        assert!(parse_board_config("[limits]\nmax_children = 0\n").is_err());
        assert!(parse_board_config("[limits]\nmax_work_items = 1\n").is_ok());
    }

    #[test]
    fn project_config_wins_over_user_config() {
        let root = tempfile::tempdir().expect("temp dir");
        write_project_config(root.path(), "[links]\ncycles = \"allow\"\n");

        let user_dir = tempfile::tempdir().expect("temp dir");
        let user_path = user_dir.path().join("config.toml");
        std::fs::write(&user_path, "[links]\ncycles = \"reject\"\n").expect("write user config");

        let cfg = load_board_config_from(root.path(), Some(&user_path)).expect("load");
        assert_eq!(cfg.links.cycles, CyclePolicy::Allow);
    }

    #[test]
    fn user_config_used_when_project_config_missing() {
        let root = tempfile::tempdir().expect("temp dir");
        let user_dir = tempfile::tempdir().expect("temp dir");
        let user_path = user_dir.path().join("config.toml");
        std::fs::write(&user_path, "[limits]\nmax_work_items = 50\n").expect("write user config");

        let cfg = load_board_config_from(root.path(), Some(&user_path)).expect("load");
        assert_eq!(cfg.limits.max_work_items, 50);
    }

    #[test]
    fn parse_error_names_the_file() {
        let root = tempfile::tempdir().expect("temp dir");
        write_project_config(root.path(), "[limits\n");

        let err = load_board_config_from(root.path(), None).unwrap_err();
        assert!(format!("{err}").contains("config.toml"), "got: {err}");
    }

    #[test]
    fn cycle_policy_parses_like_the_config_file() {
        assert_eq!("allow".parse::<CyclePolicy>(), Ok(CyclePolicy::Allow));
        assert_eq!(" Warn ".parse::<CyclePolicy>(), Ok(CyclePolicy::Warn));
        assert_eq!("REJECT".parse::<CyclePolicy>(), Ok(CyclePolicy::Reject));
        for policy in [CyclePolicy::Allow, CyclePolicy::Warn, CyclePolicy::Reject] {
            assert_eq!(policy.to_string().parse::<CyclePolicy>(), Ok(policy));
        }
    }

    #[test]
    fn cycle_policy_rejects_unknown_values() {
        let err = "forbid".parse::<CyclePolicy>().unwrap_err();
        assert_eq!(err.expected, "cycle policy");
        assert_eq!(err.got, "forbid");
        assert_eq!(err.code(), crate::error::ErrorCode::InvalidEnumValue);
        assert_eq!(err.to_string(), "invalid cycle policy: 'forbid'");
    }
}
