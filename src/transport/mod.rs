//! HTTP fetch for remote version documents.

use anyhow::{bail, Context, Result};
use tracing::debug;

/// Fetch the body of `url` as text. A non-success status is an error; the
/// caller decides whether that is fatal.
pub async fn fetch_text(url: &str) -> Result<String> {
    debug!(url = %url, "fetching remote version document");

    let response = reqwest::Client::new()
        .get(url)
        .send()
        .await
        .context("requesting version document")?;

    let status = response.status();
    if !status.is_success() {
        bail!("version document request returned status {status}");
    }

    response.text().await.context("reading version document body")
}
