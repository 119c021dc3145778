use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::addon::Version;

/// Parsed version document, either the local copy shipped with the add-on or
/// the publisher's remote copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AddonInfo {
    /// Path or URL the document text came from.
    pub source: String,
    pub name: String,
    pub version: Option<Version>,
    /// Exact game version the add-on targets, consulted only when no range
    /// bound is declared.
    pub game_version: Option<Version>,
    pub game_version_min: Option<Version>,
    pub game_version_max: Option<Version>,
    /// Location of the remote copy of this document.
    pub url: Option<String>,
    /// Where the user can fetch the update.
    pub download: Option<String>,
    pub github: Option<GithubInfo>,
    /// Latest release published on GitHub, resolved during the remote stage.
    pub github_release: Option<Version>,
    /// Set when the document text was unparsable; all other members are then
    /// in their default state.
    pub parse_error: bool,
}

/// GITHUB block of a version document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GithubInfo {
    #[serde(rename = "USERNAME")]
    pub username: String,
    #[serde(rename = "REPOSITORY")]
    pub repository: String,
    #[serde(rename = "ALLOW_PRE_RELEASE", default)]
    pub allow_pre_release: bool,
}

#[derive(Deserialize)]
struct Document {
    #[serde(rename = "NAME", default)]
    name: Option<String>,
    #[serde(rename = "VERSION", default, deserialize_with = "lenient")]
    version: Option<Version>,
    #[serde(rename = "GAME_VERSION", default, deserialize_with = "lenient")]
    game_version: Option<Version>,
    #[serde(rename = "GAME_VERSION_MIN", default, deserialize_with = "lenient")]
    game_version_min: Option<Version>,
    #[serde(rename = "GAME_VERSION_MAX", default, deserialize_with = "lenient")]
    game_version_max: Option<Version>,
    #[serde(rename = "URL", default)]
    url: Option<String>,
    #[serde(rename = "DOWNLOAD", default)]
    download: Option<String>,
    #[serde(rename = "GITHUB", default, deserialize_with = "lenient")]
    github: Option<GithubInfo>,
}

impl AddonInfo {
    /// Parse a version document. Never fails: unparsable text yields a
    /// descriptor in default state with `parse_error` set.
    pub fn parse(source: impl Into<String>, text: &str) -> Self {
        let source = source.into();
        let document: Document = match serde_json::from_str(text) {
            Ok(document) => document,
            Err(err) => {
                warn!(source = %source, error = %err, "unparsable version document");
                return Self {
                    source,
                    parse_error: true,
                    ..Self::default()
                };
            }
        };

        Self {
            source,
            name: document.name.unwrap_or_default(),
            version: document.version,
            game_version: document.game_version,
            game_version_min: document.game_version_min,
            game_version_max: document.game_version_max,
            url: normalize_url(document.url),
            download: normalize_url(document.download),
            github: document.github,
            github_release: None,
            parse_error: false,
        }
    }

    /// Compatibility with the given game version: inside the declared
    /// min/max range when any bound is present, otherwise an exact match of
    /// the declared game version. A document that declares nothing is
    /// compatible with everything.
    pub fn is_compatible(&self, game: Version) -> bool {
        match (self.game_version_min, self.game_version_max) {
            (None, None) => self.game_version.map_or(true, |declared| declared == game),
            (min, max) => {
                min.map_or(true, |min| min <= game) && max.map_or(true, |max| game <= max)
            }
        }
    }

    /// True when the declared version matches the release actually published
    /// on GitHub. Vacuously true without a GITHUB block or when the lookup
    /// never resolved a release.
    pub fn is_github_release_compatible(&self) -> bool {
        if self.github.is_none() {
            return true;
        }
        match (self.github_release, self.version) {
            (Some(release), Some(declared)) => release == declared,
            _ => true,
        }
    }

    /// Identity token for the dismissed-updates set: base64 of the name
    /// followed by the displayed version.
    pub fn identity(&self) -> String {
        let version = self.version.map(|v| v.to_string()).unwrap_or_default();
        STANDARD.encode(format!("{}{}", self.name, version))
    }
}

fn normalize_url(url: Option<String>) -> Option<String> {
    url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())
}

/// Decode an optional document member, degrading to `None` when the member
/// is present but malformed instead of failing the whole document.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}
