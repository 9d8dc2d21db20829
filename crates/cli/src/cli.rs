use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "draftwork")]
#[command(about = "Drive a form session from a scripted timeline")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// Verbose logging
	#[arg(short, long, global = true)]
	pub verbose: bool,

	/// Subcommand to execute.
	#[command(subcommand)]
	pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
	/// Replay a script of timed edits and submits against an in-memory record
	Replay {
		/// Script file (TOML)
		#[arg(value_name = "SCRIPT")]
		script: PathBuf,

		/// Session configuration; overrides the script's `[config]` table
		#[arg(short, long, value_name = "PATH")]
		config: Option<PathBuf>,
	},
}

#[cfg(test)]
mod tests {
	use clap::CommandFactory;

	use super::*;

	#[test]
	fn cli_definition_is_consistent() {
		Cli::command().debug_assert();
	}

	#[test]
	fn replay_takes_script_and_config() {
		let cli = Cli::parse_from(["draftwork", "replay", "run.toml", "--config", "form.toml", "-v"]);
		assert!(cli.verbose);
		let Command::Replay { script, config } = cli.command;
		assert_eq!(script, PathBuf::from("run.toml"));
		assert_eq!(config, Some(PathBuf::from("form.toml")));
	}
}
