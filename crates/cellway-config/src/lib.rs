//! Deployment configuration for cellway.
//!
//! TOML file + `CELLWAY_*` environment overrides, validation, and
//! translation into [`cellway_core::CellConfig`]. The core never reads
//! disk or env — the hosting application loads a [`Config`] here and
//! hands the translated result into each component's constructor.
//! Writing settings back to disk is the host's business, not ours.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use cellway_core::{CellConfig, ZoneSpec};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level deployment configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub backend: Backend,

    #[serde(default)]
    pub robot: Robot,

    /// Storage zones of the cell, in display order.
    #[serde(default = "default_zones")]
    pub zones: Vec<ZoneEntry>,

    #[serde(default)]
    pub cameras: Cameras,

    #[serde(default)]
    pub limits: Limits,
}

// Hand-written so the seeded defaults carry the reference zone layout —
// a derived impl would seed an empty zone list, which never validates.
impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            robot: Robot::default(),
            zones: default_zones(),
            cameras: Cameras::default(),
            limits: Limits::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Backend {
    /// Event-bus endpoint, e.g. `ws://127.0.0.1:5000/ws`.
    #[serde(default = "default_bus_url")]
    pub bus_url: String,
}

impl Default for Backend {
    fn default() -> Self {
        Self {
            bus_url: default_bus_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Robot {
    /// Robot `host[:port]`. Absent ⇒ robot operations disabled.
    pub address: Option<String>,

    /// Per-call timeout in milliseconds.
    #[serde(default = "default_robot_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for Robot {
    fn default() -> Self {
        Self {
            address: None,
            timeout_ms: default_robot_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ZoneEntry {
    pub name: String,
    pub capacity: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Cameras {
    /// Capture device indexes of the station cameras.
    #[serde(default = "default_camera_indexes")]
    pub indexes: Vec<u32>,
}

impl Default for Cameras {
    fn default() -> Self {
        Self {
            indexes: default_camera_indexes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Limits {
    #[serde(default = "default_history_limit")]
    pub history: usize,

    #[serde(default = "default_journal_raw_limit")]
    pub journal_raw: usize,

    #[serde(default = "default_journal_view_limit")]
    pub journal_view: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            history: default_history_limit(),
            journal_raw: default_journal_raw_limit(),
            journal_view: default_journal_view_limit(),
        }
    }
}

fn default_bus_url() -> String {
    "ws://127.0.0.1:5000/ws".into()
}
fn default_robot_timeout_ms() -> u64 {
    1500
}
fn default_zones() -> Vec<ZoneEntry> {
    ["A", "B", "C", "D"]
        .into_iter()
        .map(|name| ZoneEntry {
            name: name.into(),
            capacity: 4,
        })
        .collect()
}
fn default_camera_indexes() -> Vec<u32> {
    vec![0, 1, 2]
}
fn default_history_limit() -> usize {
    500
}
fn default_journal_raw_limit() -> usize {
    1000
}
fn default_journal_view_limit() -> usize {
    500
}

// ── Loading ─────────────────────────────────────────────────────────

/// Default config file location
/// (e.g. `~/.config/cellway/config.toml` on Linux).
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("io", "cellway", "cellway")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load configuration: defaults < TOML file < `CELLWAY_*` env.
///
/// Env keys nest with `__`, e.g. `CELLWAY_ROBOT__ADDRESS=10.0.0.7:80`.
/// A missing file is fine (defaults apply); a malformed one is an error.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    if let Some(path) = path {
        figment = figment.merge(Toml::file(path));
    } else if let Some(default_path) = default_config_path() {
        figment = figment.merge(Toml::file(default_path));
    }

    let config: Config = figment
        .merge(Env::prefixed("CELLWAY_").split("__"))
        .extract()?;
    config.validate()?;
    Ok(config)
}

// ── Validation and translation ──────────────────────────────────────

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.backend.bus_url).map_err(|e| ConfigError::Validation {
            field: "backend.bus_url".into(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ConfigError::Validation {
                field: "backend.bus_url".into(),
                reason: format!("scheme must be ws or wss, got '{}'", url.scheme()),
            });
        }

        if self.zones.is_empty() {
            return Err(ConfigError::Validation {
                field: "zones".into(),
                reason: "at least one zone is required".into(),
            });
        }
        for (i, zone) in self.zones.iter().enumerate() {
            if zone.name.trim().is_empty() {
                return Err(ConfigError::Validation {
                    field: format!("zones[{i}].name"),
                    reason: "zone name must not be empty".into(),
                });
            }
            if zone.capacity == 0 {
                return Err(ConfigError::Validation {
                    field: format!("zones[{i}].capacity"),
                    reason: "capacity must be at least 1".into(),
                });
            }
            if self.zones[..i].iter().any(|z| z.name == zone.name) {
                return Err(ConfigError::Validation {
                    field: format!("zones[{i}].name"),
                    reason: format!("duplicate zone '{}'", zone.name),
                });
            }
        }

        if self.robot.timeout_ms == 0 {
            return Err(ConfigError::Validation {
                field: "robot.timeout_ms".into(),
                reason: "timeout must be positive".into(),
            });
        }

        Ok(())
    }

    /// Translate into the core's runtime configuration.
    pub fn to_cell_config(&self) -> Result<CellConfig, ConfigError> {
        self.validate()?;
        let bus_url = Url::parse(&self.backend.bus_url).map_err(|e| ConfigError::Validation {
            field: "backend.bus_url".into(),
            reason: e.to_string(),
        })?;

        Ok(CellConfig {
            bus_url,
            robot_address: self
                .robot
                .address
                .clone()
                .filter(|a| !a.trim().is_empty()),
            robot_timeout: Duration::from_millis(self.robot.timeout_ms),
            zones: self
                .zones
                .iter()
                .map(|z| ZoneSpec::new(z.name.clone(), z.capacity))
                .collect(),
            history_limit: self.limits.history,
            journal_raw_limit: self.limits.journal_raw,
            journal_view_limit: self.limits.journal_view,
            camera_indexes: self.cameras.indexes.clone(),
        })
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_describe_the_reference_cell() {
        let config = Config::default();
        config.validate().expect("defaults must validate");

        let cell = config.to_cell_config().expect("translate");
        assert_eq!(cell.zones.len(), 4);
        assert_eq!(cell.zones[0], ZoneSpec::new("A", 4));
        assert_eq!(cell.robot_timeout, Duration::from_millis(1500));
        assert!(cell.robot_address.is_none());
        assert_eq!(cell.camera_indexes, vec![0, 1, 2]);
        assert_eq!(cell.history_limit, 500);
        assert_eq!(cell.journal_raw_limit, 1000);
    }

    #[test]
    fn toml_file_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "cellway.toml",
                r#"
                [backend]
                bus_url = "ws://10.0.0.5:5000/ws"

                [robot]
                address = "10.0.0.7:80"
                timeout_ms = 800

                [[zones]]
                name = "A"
                capacity = 6

                [[zones]]
                name = "B"
                capacity = 2
                "#,
            )?;

            let config = load(Some(Path::new("cellway.toml"))).expect("load");
            assert_eq!(config.backend.bus_url, "ws://10.0.0.5:5000/ws");
            assert_eq!(config.robot.address.as_deref(), Some("10.0.0.7:80"));
            assert_eq!(config.robot.timeout_ms, 800);
            assert_eq!(config.zones.len(), 2);
            assert_eq!(config.zones[0].capacity, 6);
            Ok(())
        });
    }

    #[test]
    fn env_overrides_the_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "cellway.toml",
                r#"
                [robot]
                address = "10.0.0.7:80"
                "#,
            )?;
            jail.set_env("CELLWAY_ROBOT__ADDRESS", "10.0.0.99:80");

            let config = load(Some(Path::new("cellway.toml"))).expect("load");
            assert_eq!(config.robot.address.as_deref(), Some("10.0.0.99:80"));
            Ok(())
        });
    }

    #[test]
    fn rejects_non_websocket_bus_url() {
        let config = Config {
            backend: Backend {
                bus_url: "http://127.0.0.1:5000".into(),
            },
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { field, .. }) if field == "backend.bus_url"
        ));
    }

    #[test]
    fn rejects_zero_capacity_zone() {
        let config = Config {
            zones: vec![ZoneEntry {
                name: "A".into(),
                capacity: 0,
            }],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_duplicate_zone_names() {
        let config = Config {
            zones: vec![
                ZoneEntry {
                    name: "A".into(),
                    capacity: 4,
                },
                ZoneEntry {
                    name: "A".into(),
                    capacity: 4,
                },
            ],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_robot_address_disables_the_link() {
        let config = Config {
            robot: Robot {
                address: Some("   ".into()),
                timeout_ms: 1500,
            },
            ..Config::default()
        };
        let cell = config.to_cell_config().expect("translate");
        assert!(cell.robot_address.is_none());
    }
}
