//! Host-side settings consumed by the checker.

use std::collections::HashSet;
use std::fs;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Preferences owned by the host application. The checker only reads them;
/// persisting changes (and flipping `first_run` off after the initial
/// launch) stays with the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// True until the host has completed one launch. No network call is made
    /// on the first run.
    #[serde(default = "default_true")]
    pub first_run: bool,
    /// Master switch for remote checks.
    #[serde(default = "default_true")]
    pub allow_check: bool,
    /// Identity signatures of updates the user has dismissed.
    #[serde(default)]
    pub ignored_updates: HashSet<String>,
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            first_run: true,
            allow_check: true,
            ignored_updates: HashSet::new(),
        }
    }
}

impl Settings {
    pub fn from_file(path: &str) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading settings file {path}"))?;
        serde_json::from_str(&raw).context("parsing settings JSON")
    }
}
