//! Harness entry point: discover project scripts, load settings and play
//! the sequence on a hub.
//!
//! The evaluator providing the `script-eval` role is supplied by the
//! embedding runtime; a hub without one leaves the first dispatched script
//! unanswered (the send is dropped as undeliverable, logged at debug).

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use harness::hub::Hub;
use harness::io::projects::find_scripts;
use harness::io::settings::load_settings;
use harness::logging;
use harness::player::ScriptPlayer;

#[derive(Parser)]
#[command(
    name = "harness",
    version,
    about = "Sequential script playback over a component hub"
)]
struct Cli {
    /// Directory containing one subdirectory per project.
    /// Falls back to the `projects-dir` setting, then to `projects`.
    #[arg(long)]
    projects: Option<PathBuf>,

    /// Settings file applied at startup.
    #[arg(long, default_value = "config/harness.toml")]
    config: PathBuf,
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli.config)?;
    debug!(count = settings.len(), "settings loaded");

    let projects = cli
        .projects
        .or_else(|| settings.get("projects-dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("projects"));
    let scripts = find_scripts(&projects)?;
    if scripts.is_empty() {
        eprintln!("No projects found - exiting harness.");
        return Ok(());
    }

    Hub::builder()
        .root("player", ScriptPlayer::new(scripts))
        .build()?
        .run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults() {
        let cli = Cli::parse_from(["harness"]);
        assert!(cli.projects.is_none());
        assert_eq!(cli.config, PathBuf::from("config/harness.toml"));
    }

    #[test]
    fn parse_projects_flag() {
        let cli = Cli::parse_from(["harness", "--projects", "demos"]);
        assert_eq!(cli.projects, Some(PathBuf::from("demos")));
    }
}
