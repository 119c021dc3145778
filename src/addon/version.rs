use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Four-component add-on version number. Components omitted in the source
/// text are zero, so `1.2` and `1.2.0.0` are the same version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "VersionRepr")]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub build: u64,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64, build: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            build,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.patch, self.build
        )
    }
}

impl FromStr for Version {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            bail!("empty version string");
        }

        let split: Vec<&str> = s.split('.').collect();
        if split.len() > 4 {
            bail!("too many components in version '{s}'");
        }

        let mut components = [0u64; 4];
        for (slot, part) in components.iter_mut().zip(&split) {
            *slot = part
                .trim()
                .parse()
                .with_context(|| format!("invalid version component '{part}'"))?;
        }

        Ok(Self {
            major: components[0],
            minor: components[1],
            patch: components[2],
            build: components[3],
        })
    }
}

impl Serialize for Version {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Wire forms accepted for a version member: a dotted string or an object
/// with uppercase component members.
#[derive(Deserialize)]
#[serde(untagged)]
enum VersionRepr {
    Text(String),
    Components {
        #[serde(rename = "MAJOR", default)]
        major: u64,
        #[serde(rename = "MINOR", default)]
        minor: u64,
        #[serde(rename = "PATCH", default)]
        patch: u64,
        #[serde(rename = "BUILD", default)]
        build: u64,
    },
}

impl TryFrom<VersionRepr> for Version {
    type Error = anyhow::Error;

    fn try_from(repr: VersionRepr) -> Result<Self> {
        match repr {
            VersionRepr::Text(text) => text.parse(),
            VersionRepr::Components {
                major,
                minor,
                patch,
                build,
            } => Ok(Self {
                major,
                minor,
                patch,
                build,
            }),
        }
    }
}
