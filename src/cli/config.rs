use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::scrape::model::WalkLimits;
use crate::session::engine::EngineConfig;

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "ui-scrape",
    version,
    about = "Scrape UI trees into a deduplicated, hierarchy-aware element store"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// SQLite database path (overrides the config file)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Path to config file (default: ui-scrape.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scrape one UI tree dump (JSON) as a screen of an app
    Scrape {
        /// Path to the JSON tree dump
        #[arg(long)]
        tree: String,

        /// App (package) identifier
        #[arg(long)]
        app: String,

        /// Window / activity identifier
        #[arg(long)]
        activity: String,

        /// Window title
        #[arg(long)]
        title: Option<String>,

        /// Observation time in epoch milliseconds (default: now)
        #[arg(long)]
        at_ms: Option<i64>,
    },

    /// Replay a recorded sequence of screen events through one session
    Replay {
        /// JSON array of { "event": ..., "tree": ... } entries
        #[arg(long)]
        events: String,
    },

    /// Show element, edge and screen counts for an app
    Stats {
        #[arg(long)]
        app: String,
    },

    /// Print the persisted element hierarchy of an app
    Hierarchy {
        #[arg(long)]
        app: String,
    },

    /// List screens recorded for an app
    Screens {
        #[arg(long)]
        app: String,
    },

    /// List screen transitions recorded for an app
    Transitions {
        #[arg(long)]
        app: String,
    },

    /// Delete an app and everything it owns
    DeleteApp {
        #[arg(long)]
        app: String,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `ui-scrape.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub walker: WalkerConfig,
    #[serde(default)]
    pub screen: ScreenConfig,
    #[serde(default)]
    pub persist: PersistConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkerConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_nodes: default_max_nodes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenConfig {
    #[serde(default = "default_top_elements")]
    pub top_elements: usize,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            top_elements: default_top_elements(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistConfig {
    #[serde(default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            wait_timeout_ms: default_wait_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// JSONL trace file; tracing is off when unset.
    pub trace_path: Option<String>,

    #[serde(default = "default_alert_threshold")]
    pub integrity_alert_threshold: u32,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            trace_path: None,
            integrity_alert_threshold: default_alert_threshold(),
        }
    }
}

// Serde default helpers
fn default_db_path() -> String { "ui-scrape.db".to_string() }
fn default_max_depth() -> u32 { 50 }
fn default_max_nodes() -> usize { 2000 }
fn default_top_elements() -> usize { 10 }
fn default_wait_timeout_ms() -> u64 { 5000 }
fn default_alert_threshold() -> u32 { 3 }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or("ui-scrape.yaml");
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = config_path, error = %e, "malformed config, using defaults");
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}

// ============================================================================
// Config Builders (merge CLI args with config file)
// ============================================================================

impl AppConfig {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            limits: WalkLimits {
                max_depth: self.walker.max_depth,
                max_nodes: self.walker.max_nodes,
            },
            top_elements: self.screen.top_elements,
            integrity_alert_threshold: self.diagnostics.integrity_alert_threshold,
        }
    }

    /// CLI `--db` > config file > default.
    pub fn db_path(&self, cli_db: Option<&str>) -> PathBuf {
        PathBuf::from(cli_db.unwrap_or(&self.store.path))
    }
}
