//! Version documents and their parsed descriptors.

pub mod info;
pub mod version;

pub use info::{AddonInfo, GithubInfo};
pub use version::Version;
