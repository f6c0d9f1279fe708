use std::path::PathBuf;

use blendgraph::blend::{BlendFile, Result};

use crate::cmd::util::emit_json;

#[derive(clap::Args)]
pub struct Args {
	pub path: PathBuf,
	/// Emit machine-readable JSON.
	#[arg(long)]
	pub json: bool,
	/// Number of most frequent block codes to list.
	#[arg(long, default_value_t = 12)]
	pub top: usize,
}

/// Print header fields and block statistics.
pub fn run(args: Args) -> Result<()> {
	let Args { path, json, top } = args;

	let blend = BlendFile::open(&path)?;
	let header = blend.header();
	let stats = blend.block_stats();

	let mut entries: Vec<_> = stats.codes.into_iter().collect();
	entries.sort_by(|left, right| right.1.cmp(&left.1).then_with(|| left.0.cmp(&right.0)));
	entries.truncate(top);

	if json {
		let payload = InfoJson {
			path: path.display().to_string(),
			compression: blend.compression.as_str(),
			header_size: header.header_size,
			format_version: header.format_version,
			version: header.version,
			chunk_layout: header.chunk_layout().as_str(),
			endianness: header.endianness.as_str(),
			pointer_size: header.pointer_size,
			block_count: stats.block_count,
			has_endb: stats.has_endb,
			unknown_sdna: stats.unknown_sdna,
			structures: blend.schema().file_structure_count(),
			top_codes: entries.into_iter().map(|(code, count)| CodeCountJson { code, count }).collect(),
		};
		emit_json(&payload);
		return Ok(());
	}

	println!("path: {}", path.display());
	println!("compression: {}", blend.compression.as_str());
	println!("header_size: {}", header.header_size);
	println!("format_version: {}", header.format_version);
	println!("version: {}", header.version);
	println!("chunk_layout: {}", header.chunk_layout().as_str());
	println!("endianness: {}", header.endianness.as_str());
	println!("pointer_size: {}", header.pointer_size);
	println!("block_count: {}", stats.block_count);
	println!("has_endb: {}", stats.has_endb);
	println!("unknown_sdna: {}", stats.unknown_sdna);
	println!("structures: {}", blend.schema().file_structure_count());
	println!("top_codes:");
	for (code, count) in entries {
		println!("  {code}: {count}");
	}

	Ok(())
}

#[derive(serde::Serialize)]
struct InfoJson {
	path: String,
	compression: &'static str,
	header_size: usize,
	format_version: u16,
	version: u16,
	chunk_layout: &'static str,
	endianness: &'static str,
	pointer_size: usize,
	block_count: usize,
	has_endb: bool,
	unknown_sdna: usize,
	structures: usize,
	top_codes: Vec<CodeCountJson>,
}

#[derive(serde::Serialize)]
struct CodeCountJson {
	code: String,
	count: usize,
}
