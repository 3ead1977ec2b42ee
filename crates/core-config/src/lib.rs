//! Configuration loading and parsing.
//!
//! Parses `notecore.toml` (or an override path supplied by the embedder):
//!
//! ```toml
//! [coalescer]
//! debounce_ms = 400
//! [history]
//! capacity = 50
//! [viewport]
//! fallback_width = 1000
//! fallback_height = 1000
//! [images]
//! storage_dir = "/var/lib/notes/images"
//! ```
//!
//! Every field is optional. Unknown fields are ignored so older builds accept
//! newer files. A file that fails to parse falls back to defaults with a
//! warning; a missing file falls back silently.
//!
//! Raw parsed values are retained; `Config::apply_context` derives the
//! effective (clamped) values and the effective viewport, and can be re-run
//! whenever the embedder learns a new viewport size.

use anyhow::Result;
use core_text::Viewport;
use serde::Deserialize;
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

/// Longest debounce window accepted from configuration.
pub const MAX_DEBOUNCE_MS: u64 = 10_000;

/// Runtime facts the effective configuration depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfigContext {
    /// Current viewport, when the embedder has measured it.
    pub viewport: Option<Viewport>,
}

impl ConfigContext {
    pub fn new(viewport: Option<Viewport>) -> Self {
        Self { viewport }
    }

    pub fn with_viewport(width: u32, height: u32) -> Self {
        Self::new(Some(Viewport::new(width, height)))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CoalescerConfig {
    #[serde(default = "CoalescerConfig::default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for CoalescerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: Self::default_debounce_ms(),
        }
    }
}

impl CoalescerConfig {
    const fn default_debounce_ms() -> u64 {
        400
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "HistoryConfig::default_capacity")]
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: Self::default_capacity(),
        }
    }
}

impl HistoryConfig {
    const fn default_capacity() -> usize {
        50
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ViewportConfig {
    #[serde(default = "ViewportConfig::default_extent")]
    pub fallback_width: u32,
    #[serde(default = "ViewportConfig::default_extent")]
    pub fallback_height: u32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            fallback_width: Self::default_extent(),
            fallback_height: Self::default_extent(),
        }
    }
}

impl ViewportConfig {
    const fn default_extent() -> u32 {
        1000
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ImagesConfig {
    /// Durable directory inserted images are copied into. Unset keeps the
    /// references exactly as picked.
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub coalescer: CoalescerConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub viewport: ViewportConfig,
    #[serde(default)]
    pub images: ImagesConfig,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub raw: Option<String>, // original file string (optional)
    pub file: ConfigFile,    // parsed (or default) data
    pub effective_debounce_ms: u64,
    pub effective_history_capacity: usize,
    pub effective_viewport: Viewport,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_file(None, ConfigFile::default())
    }
}

/// Best-effort config path: local working directory first, then the platform
/// config dir (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    let local = PathBuf::from("notecore.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("notecore").join("notecore.toml");
    }
    PathBuf::from("notecore.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => {
            info!(target: "config", path = %path.display(), "config_loaded");
            Ok(Config::from_file(Some(content), file))
        }
        Err(err) => {
            warn!(target: "config", path = %path.display(), %err, "config_parse_failed");
            Ok(Config::default())
        }
    }
}

impl Config {
    fn from_file(raw: Option<String>, file: ConfigFile) -> Self {
        let mut cfg = Self {
            raw,
            file,
            effective_debounce_ms: 0,
            effective_history_capacity: 0,
            effective_viewport: Viewport::new(0, 0),
        };
        cfg.apply_context(ConfigContext::default());
        cfg
    }

    /// Clamp raw values and resolve the effective viewport. A missing or
    /// zero-sized viewport resolves to the configured fallback.
    pub fn apply_context(&mut self, ctx: ConfigContext) -> Viewport {
        let raw_debounce = self.file.coalescer.debounce_ms;
        let debounce = raw_debounce.min(MAX_DEBOUNCE_MS);
        if debounce != raw_debounce {
            info!(target: "config", raw = raw_debounce, clamped = debounce, "debounce_ms_clamped");
        }
        self.effective_debounce_ms = debounce;

        let raw_capacity = self.file.history.capacity;
        let capacity = raw_capacity.max(1);
        if capacity != raw_capacity {
            info!(target: "config", raw = raw_capacity, clamped = capacity, "history_capacity_clamped");
        }
        self.effective_history_capacity = capacity;

        let fallback = &self.file.viewport;
        let viewport = match ctx.viewport {
            Some(v) => Viewport::new(
                if v.width == 0 { fallback.fallback_width } else { v.width },
                if v.height == 0 { fallback.fallback_height } else { v.height },
            ),
            None => Viewport::new(fallback.fallback_width, fallback.fallback_height),
        };
        self.effective_viewport = viewport;
        viewport
    }

    /// Re-resolve after a viewport change. Returns `Some(viewport)` when the
    /// effective viewport changed, else `None`.
    pub fn recompute_with_context(&mut self, ctx: ConfigContext) -> Option<Viewport> {
        let prev = self.effective_viewport;
        let current = self.apply_context(ctx);
        if current != prev { Some(current) } else { None }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.effective_debounce_ms)
    }

    pub fn history_capacity(&self) -> usize {
        self.effective_history_capacity
    }

    pub fn storage_dir(&self) -> Option<&PathBuf> {
        self.file.images.storage_dir.as_ref()
    }
}
