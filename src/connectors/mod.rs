//! Connectors for external services
//!
//! API clients for the third-party services a version document can point
//! the checker at (currently only GitHub Releases).

pub mod github;

pub use github::latest_release_version;
