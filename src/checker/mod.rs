//! The two-stage check pipeline: read the local version document, then
//! fetch the publisher's remote copy and compare the two.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{watch, RwLock};
use tracing::{info, warn};

use crate::addon::{AddonInfo, Version};
use crate::connectors;
use crate::settings::Settings;
use crate::transport;

/// Snapshot of a session's progress. Flags only ever move from false to
/// true; each descriptor is written by the pipeline task before the
/// corresponding ready flag.
#[derive(Debug, Clone, Default)]
pub struct CheckState {
    pub local: Option<AddonInfo>,
    pub remote: Option<AddonInfo>,
    pub local_ready: bool,
    pub remote_ready: bool,
    pub complete: bool,
    pub errored: bool,
}

impl CheckState {
    /// Combined identity of both descriptors, matched against the
    /// dismissed-updates set. Defined only once both descriptors exist.
    pub fn ignored_signature(&self) -> Option<String> {
        match (&self.local, &self.remote) {
            (Some(local), Some(remote)) => {
                Some(format!("{}{}", local.identity(), remote.identity()))
            }
            _ => None,
        }
    }

    fn update_available(&self, game_version: Version) -> bool {
        if !self.complete || self.errored {
            return false;
        }
        match (&self.local, &self.remote) {
            (Some(local), Some(remote)) => match (local.version, remote.version) {
                (Some(local_version), Some(remote_version)) => {
                    remote_version > local_version
                        && remote.is_compatible(game_version)
                        && remote.is_github_release_compatible()
                }
                _ => false,
            },
            _ => false,
        }
    }
}

/// One asynchronous update check for a single add-on. Construction spawns
/// the pipeline immediately and returns; the session then runs to its
/// terminal state on its own. There is no cancellation.
#[derive(Debug)]
pub struct CheckSession {
    state: Arc<RwLock<CheckState>>,
    done: watch::Receiver<bool>,
    settings: Arc<Settings>,
    game_version: Version,
}

impl CheckSession {
    /// Begin checking the version document at `path`. Requires a running
    /// Tokio runtime; progress is observable through the query methods.
    pub fn start(
        path: impl Into<PathBuf>,
        settings: Arc<Settings>,
        game_version: Version,
    ) -> Self {
        let path = path.into();
        let state = Arc::new(RwLock::new(CheckState::default()));
        let (done_tx, done_rx) = watch::channel(false);

        let task_state = Arc::clone(&state);
        let task_settings = Arc::clone(&settings);
        tokio::spawn(async move {
            run_pipeline(&path, &task_settings, game_version, &task_state).await;
            let _ = done_tx.send(true);
        });

        Self {
            state,
            done: done_rx,
            settings,
            game_version,
        }
    }

    /// Resolves once the pipeline has reached its terminal state.
    pub async fn completed(&self) {
        let mut done = self.done.clone();
        let _ = done.wait_for(|finished| *finished).await;
    }

    pub async fn snapshot(&self) -> CheckState {
        self.state.read().await.clone()
    }

    pub async fn is_local_ready(&self) -> bool {
        self.state.read().await.local_ready
    }

    pub async fn is_remote_ready(&self) -> bool {
        self.state.read().await.remote_ready
    }

    pub async fn is_processing_complete(&self) -> bool {
        self.state.read().await.complete
    }

    pub async fn has_error(&self) -> bool {
        self.state.read().await.errored
    }

    /// Name declared by the local document, once it has been read.
    pub async fn name(&self) -> Option<String> {
        self.state
            .read()
            .await
            .local
            .as_ref()
            .map(|info| info.name.clone())
    }

    pub async fn local_info(&self) -> Option<AddonInfo> {
        self.state.read().await.local.clone()
    }

    pub async fn remote_info(&self) -> Option<AddonInfo> {
        self.state.read().await.remote.clone()
    }

    /// True only when the check finished cleanly and the remote document
    /// declares a strictly newer version that is compatible with the running
    /// game version (and with its published GitHub release, when it names
    /// one).
    pub async fn is_update_available(&self) -> bool {
        self.state.read().await.update_available(self.game_version)
    }

    /// True once the local document is read and its constraints accept the
    /// running game version.
    pub async fn is_compatible(&self) -> bool {
        let state = self.state.read().await;
        state.local_ready
            && state
                .local
                .as_ref()
                .map_or(false, |local| local.is_compatible(self.game_version))
    }

    /// True when the user has already dismissed this exact local/remote
    /// pair.
    pub async fn is_ignored(&self) -> bool {
        self.state
            .read()
            .await
            .ignored_signature()
            .map_or(false, |signature| {
                self.settings.ignored_updates.contains(&signature)
            })
    }

    /// Combined identity of the pair, for the host to record when the user
    /// dismisses the update.
    pub async fn ignored_signature(&self) -> Option<String> {
        self.state.read().await.ignored_signature()
    }
}

async fn run_pipeline(
    path: &Path,
    settings: &Settings,
    game_version: Version,
    state: &RwLock<CheckState>,
) {
    let local = match read_local(path).await {
        Ok(local) => local,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "local version document unavailable");
            let mut state = state.write().await;
            state.errored = true;
            state.complete = true;
            return;
        }
    };

    {
        let mut state = state.write().await;
        state.local = Some(local.clone());
        state.local_ready = true;
        if local.parse_error {
            state.errored = true;
            state.complete = true;
        }
    }

    // The remote stage still runs after a local parse error; with no URL to
    // follow it settles into the local-only fallback.
    run_remote_stage(&local, settings, game_version, state).await;
}

async fn run_remote_stage(
    local: &AddonInfo,
    settings: &Settings,
    game_version: Version,
    state: &RwLock<CheckState>,
) {
    if settings.first_run {
        info!(name = %local.name, "first run, remote version check skipped");
        set_local_only(local, state).await;
        return;
    }

    let url = match &local.url {
        Some(url) if settings.allow_check => url,
        _ => {
            set_local_only(local, state).await;
            return;
        }
    };

    match fetch_remote(url).await {
        Ok(remote) => set_remote(local, remote, game_version, state).await,
        Err(err) => {
            warn!(url = %url, error = %err, "remote version check failed, using local info only");
            set_local_only(local, state).await;
        }
    }
}

async fn read_local(path: &Path) -> Result<AddonInfo> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading version document {}", path.display()))?;
    Ok(AddonInfo::parse(path.display().to_string(), &text))
}

async fn fetch_remote(url: &str) -> Result<AddonInfo> {
    let text = transport::fetch_text(url).await?;
    let mut remote = AddonInfo::parse(url, &text);

    if let Some(github) = &remote.github {
        match connectors::latest_release_version(github).await {
            Ok(release) => remote.github_release = release,
            Err(err) => {
                warn!(
                    username = %github.username,
                    repository = %github.repository,
                    error = %err,
                    "github release lookup failed"
                );
            }
        }
    }

    Ok(remote)
}

async fn set_remote(
    local: &AddonInfo,
    remote: AddonInfo,
    game_version: Version,
    state: &RwLock<CheckState>,
) {
    let name = remote.name.clone();
    let mut state = state.write().await;

    // A remote copy at the same version may still carry fresher metadata,
    // so it becomes authoritative for the local side as well.
    if local.version == remote.version {
        info!(source = %remote.source, "identical remote version, adopting remote document");
        state.local = Some(remote.clone());
    }

    state.remote = Some(remote);
    state.remote_ready = true;
    state.complete = true;

    info!(
        name = %name,
        update_available = state.update_available(game_version),
        "remote version check complete"
    );
}

async fn set_local_only(local: &AddonInfo, state: &RwLock<CheckState>) {
    let mut state = state.write().await;
    state.remote = Some(local.clone());
    state.remote_ready = true;
    state.complete = true;
}
