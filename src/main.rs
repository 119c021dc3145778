use std::path::PathBuf;
use std::sync::Arc;

use addon_checker::addon::Version;
use addon_checker::checker::CheckSession;
use addon_checker::settings::Settings;
use addon_checker::utils;
use anyhow::Result;
use clap::Parser;
use serde_json::json;

#[derive(Parser)]
#[command(name = "addon-check", version, about = "Update checker for game add-ons")]
struct AppCli {
    /// Path to the local version document
    path: PathBuf,

    /// Game version to test compatibility against
    #[arg(short, long, value_name = "VERSION")]
    game_version: Version,

    /// Settings file path (JSON); without one, remote checks are allowed
    /// and nothing is ignored
    #[arg(short, long)]
    settings: Option<String>,

    /// Skip the remote check and only read the local document
    #[arg(long)]
    offline: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    utils::logging::init();

    let args = AppCli::parse();

    let mut settings = match &args.settings {
        Some(path) => Settings::from_file(path)?,
        None => Settings {
            first_run: false,
            ..Settings::default()
        },
    };
    if args.offline {
        settings.allow_check = false;
    }

    let session = CheckSession::start(args.path, Arc::new(settings), args.game_version);
    session.completed().await;

    let state = session.snapshot().await;
    let summary = json!({
        "name": session.name().await,
        "local": state.local,
        "remote": state.remote,
        "compatible": session.is_compatible().await,
        "update_available": session.is_update_available().await,
        "ignored": session.is_ignored().await,
        "error": state.errored,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if state.errored {
        anyhow::bail!("version check failed, see log output");
    }

    Ok(())
}
