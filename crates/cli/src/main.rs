//! draftwork binary.
//!
//! Replays scripted edits against a form session and prints what the
//! session did, one timestamped line per action or autosave event.

mod cli;
mod replay;
mod script;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command};
use draftwork_config::Config;
use script::Script;
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	let subscriber = tracing_subscriber::fmt()
		.with_max_level(if cli.verbose {
			tracing::Level::DEBUG
		} else {
			tracing::Level::INFO
		})
		.with_writer(std::io::stderr)
		.finish();
	tracing::subscriber::set_global_default(subscriber)?;

	match cli.command {
		Command::Replay { script, config } => {
			info!(script = %script.display(), "Loading replay script");
			let script = Script::load(&script)?;
			let config = match config {
				Some(path) => Config::load(&path).with_context(|| format!("loading config {}", path.display()))?,
				None => script.config.clone().unwrap_or_default(),
			};

			let (transcript, store) = replay::run(&script, &config).await?;
			for line in transcript.lines() {
				println!("{line}");
			}
			for (field, value) in store.saved() {
				println!("saved {field} = {value}");
			}
		}
	}

	Ok(())
}
