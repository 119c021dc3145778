//! GitHub Releases lookups for add-ons that publish through GitHub.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::addon::{GithubInfo, Version};

const GITHUB_API_ROOT: &str = "https://api.github.com";

/// One entry of the releases listing; only the members we read.
#[derive(Debug, Deserialize)]
struct ReleaseEntry {
    tag_name: String,
    #[serde(default)]
    prerelease: bool,
}

/// Resolve the latest release published for the add-on's repository,
/// skipping pre-releases unless the document allows them. `Ok(None)` when
/// the repository has no matching release or its tag is not a version
/// number.
pub async fn latest_release_version(github: &GithubInfo) -> Result<Option<Version>> {
    let api_root =
        std::env::var("GITHUB_API_ROOT").unwrap_or_else(|_| GITHUB_API_ROOT.to_string());
    latest_release_from(&api_root, github).await
}

async fn latest_release_from(api_root: &str, github: &GithubInfo) -> Result<Option<Version>> {
    let url = format!(
        "{}/repos/{}/{}/releases",
        api_root.trim_end_matches('/'),
        github.username,
        github.repository
    );

    debug!(url = %url, "querying github releases");

    // GitHub rejects requests without a User-Agent header.
    let response = reqwest::Client::builder()
        .user_agent(format!("addon-check/{}", crate::VERSION))
        .build()
        .context("building github client")?
        .get(&url)
        .send()
        .await
        .context("requesting github releases")?;

    let status = response.status();
    if !status.is_success() {
        bail!("github releases request returned status {status}");
    }

    let releases: Vec<ReleaseEntry> = response
        .json()
        .await
        .context("parsing github releases listing")?;

    let tag = releases
        .iter()
        .find(|release| github.allow_pre_release || !release.prerelease)
        .map(|release| release.tag_name.as_str());

    // Release tags conventionally carry a leading `v` that the version
    // syntax itself does not accept.
    Ok(tag.and_then(|tag| {
        let tag = tag.trim();
        tag.strip_prefix('v').unwrap_or(tag).parse().ok()
    }))
}
