use std::env;
use std::io::IsTerminal;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use lineage_core::{DEFAULT_PARALLELISM, PagerSettings};
use lineage_store::default_db_path;
use lineage_types::{RenderOptions, TimeZoneSetting};

use crate::args::GlobalArgs;

/// Contents of `~/.lineage/config.toml`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct LineageConfig {
    pub store: Option<StoreConfig>,
    pub log: Option<LogConfig>,
    pub pager: Option<PagerConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StoreConfig {
    pub path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogConfig {
    pub parallelism: Option<usize>,
    pub color: Option<bool>,
    pub timezone: Option<String>,
    pub max_nodes: Option<i64>,
    pub max_value_lines: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PagerConfig {
    pub command: Option<String>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".lineage").join("config.toml"))
}

/// Replace `${VAR}` with the variable's value (empty if unset). An unclosed
/// `${` is kept literally.
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let var = &after[..end];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

/// Expand `${VAR}` and a leading `~/`.
fn expand_path(raw: &str) -> PathBuf {
    let expanded = expand_env_vars(raw);
    if let Some(rest) = expanded.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(expanded)
}

impl LineageConfig {
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path).map(Some),
            _ => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Effective settings: command-line flags over config file over defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    pub db_path: PathBuf,
    pub parallelism: NonZeroUsize,
    pub color: bool,
    pub time_zone: TimeZoneSetting,
    pub max_nodes: Option<i64>,
    pub max_value_lines: usize,
    pub pager: PagerSettings,
}

impl Settings {
    pub fn resolve(config: &LineageConfig, args: &GlobalArgs) -> Self {
        let log = config.log.as_ref();

        let db_path = args
            .db
            .clone()
            .or_else(|| {
                config
                    .store
                    .as_ref()
                    .and_then(|store| store.path.as_deref())
                    .map(expand_path)
            })
            .or_else(default_db_path)
            .unwrap_or_else(|| PathBuf::from(".lineage").join("lineage.db"));

        let parallelism = args
            .parallelism
            .or_else(|| log.and_then(|l| l.parallelism).and_then(NonZeroUsize::new))
            .unwrap_or(DEFAULT_PARALLELISM);

        let color = !args.no_color
            && env::var_os("NO_COLOR").is_none()
            && log
                .and_then(|l| l.color)
                .unwrap_or_else(|| std::io::stdout().is_terminal());

        let time_zone = args.tz.unwrap_or_else(|| {
            log.and_then(|l| l.timezone.as_deref())
                .map(expand_env_vars)
                .and_then(|raw| match raw.parse::<TimeZoneSetting>() {
                    Ok(tz) => Some(tz),
                    Err(err) => {
                        tracing::warn!(error = %err, "Ignoring configured time zone");
                        None
                    }
                })
                .unwrap_or_default()
        });

        let pager_config = config.pager.as_ref();
        let pager = PagerSettings {
            enabled: !args.no_pager && pager_config.and_then(|p| p.enabled).unwrap_or(true),
            command: pager_config
                .and_then(|p| p.command.as_deref())
                .map(expand_env_vars),
        };

        Self {
            db_path,
            parallelism,
            color,
            time_zone,
            max_nodes: log.and_then(|l| l.max_nodes),
            max_value_lines: log.and_then(|l| l.max_value_lines).unwrap_or(0),
            pager,
        }
    }

    /// Base render options for `log`; commands adjust layout and path.
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            use_color: self.color,
            time_zone: self.time_zone,
            max_nodes: self.max_nodes,
            max_value_lines: self.max_value_lines,
            ..RenderOptions::default()
        }
    }
}
