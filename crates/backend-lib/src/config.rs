// ============================
// codecollab-backend/src/config.rs
// ============================
//! Configuration management.
use crate::error::AppError;
use crate::room::RoomSeed;
use crate::tree::{self, PathTree};
use codecollab_common::TreeNode;
use figment::{
    providers::{Env, Format, Json, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;

/// Env var prefix; nested keys use `__`, e.g. `CODECOLLAB_LIMITS__MAX_PATH_LEN`
pub const ENV_PREFIX: &str = "CODECOLLAB_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Log level, used when `RUST_LOG` is not set
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
    /// Allow any origin
    pub cors_permissive: bool,
    /// Input size limits
    pub limits: Limits,
    /// Seed for newly created rooms
    pub room: RoomDefaults,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Input size limits enforced before an intent reaches a room
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Limits {
    pub max_room_id_len: usize,
    pub max_path_len: usize,
    pub max_content_bytes: usize,
}

/// Room seed as written in config files: flat `path -> content` pairs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RoomDefaults {
    pub language: String,
    pub selected_file: Option<String>,
    pub files: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            cors_permissive: true,
            limits: Limits::default(),
            room: RoomDefaults::default(),
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_room_id_len: 128,
            max_path_len: 1024,
            max_content_bytes: 1024 * 1024, // 1 MiB
        }
    }
}

impl Default for RoomDefaults {
    fn default() -> Self {
        let seed = RoomSeed::default();
        let files = seed
            .tree
            .file_paths()
            .into_iter()
            .filter_map(|path| {
                let content = seed.tree.read_file(&path).ok()?.to_string();
                Some((path, content))
            })
            .collect();

        Self {
            language: seed.language,
            selected_file: seed.selected_file,
            files,
        }
    }
}

impl RoomDefaults {
    /// Build the seed tree
    pub fn to_seed(&self) -> Result<RoomSeed, AppError> {
        if self.files.is_empty() {
            return Err(AppError::Config("room seed has no files".to_string()));
        }

        let mut seed_tree = PathTree::new();
        for (path, content) in &self.files {
            seed_tree
                .set(path, TreeNode::File(content.clone()))
                .map_err(|e| AppError::Config(format!("room seed file '{path}': {e}")))?;
        }

        let selected_file = self.selected_file.as_deref().map(tree::normalize);
        if let Some(selected) = &selected_file {
            if !seed_tree.is_file(selected) {
                return Err(AppError::Config(format!(
                    "selected seed file '{selected}' is not one of the seed files"
                )));
            }
        }

        Ok(RoomSeed {
            tree: seed_tree,
            language: self.language.clone(),
            selected_file,
        })
    }
}

impl Settings {
    /// Load settings from the default sources
    pub fn load() -> Result<Self, AppError> {
        Self::extract(Self::figment(None))
    }

    /// Load settings with an extra config file layered over the defaults
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AppError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        Self::extract(Self::figment(Some(path)))
    }

    /// Defaults, then `codecollab.toml`, then `codecollab.json`, then `extra`, then env
    fn figment(extra: Option<&Path>) -> Figment {
        let mut figment = Figment::new()
            .merge(Toml::file("codecollab.toml"))
            .merge(Json::file("codecollab.json"));

        if let Some(path) = extra {
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("json") => figment.merge(Json::file(path)),
                _ => figment.merge(Toml::file(path)),
            };
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn extract(figment: Figment) -> Result<Self, AppError> {
        let settings: Settings = figment
            .extract()
            .map_err(|e| AppError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check the settings are usable
    pub fn validate(&self) -> Result<(), AppError> {
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(AppError::Config(format!(
                "invalid log level '{}'",
                self.log_level
            )));
        }

        let limits = &self.limits;
        if limits.max_room_id_len == 0 || limits.max_path_len == 0 || limits.max_content_bytes == 0
        {
            return Err(AppError::Config("limits must be greater than zero".to_string()));
        }

        if self.room.language.is_empty() {
            return Err(AppError::Config("room seed language is empty".to_string()));
        }

        self.room.to_seed().map(|_| ())
    }
}
