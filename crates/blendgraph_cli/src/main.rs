#![allow(missing_docs)]

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "blendgraph", about = "Blender .blend schema and scene graph inspection")]
struct Cli {
	/// Raise log verbosity (-v info, -vv debug, -vvv trace). `RUST_LOG` wins when set.
	#[arg(short, long, action = ArgAction::Count, global = true)]
	verbose: u8,
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// Print header fields and block statistics.
	Info(cmd::info::Args),
	/// Print the schema summary or one structure's field layout.
	Dna(cmd::dna::Args),
	/// Dump the first block with a given code through the schema.
	Decode(cmd::decode::Args),
	/// Extract the scene graph and list its objects and meshes.
	Scene(cmd::scene::Args),
}

fn main() {
	let cli = Cli::parse();
	init_tracing(cli.verbose);

	if let Err(err) = run(cli.command) {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run(command: Commands) -> blendgraph::blend::Result<()> {
	match command {
		Commands::Info(args) => cmd::info::run(args),
		Commands::Dna(args) => cmd::dna::run(args),
		Commands::Decode(args) => cmd::decode::run(args),
		Commands::Scene(args) => cmd::scene::run(args),
	}
}

fn init_tracing(verbose: u8) {
	let default = match verbose {
		0 => "warn",
		1 => "info",
		2 => "debug",
		_ => "trace",
	};
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).init();
}
