use std::path::PathBuf;

use blendgraph::blend::{BlendFile, Result};

use crate::cmd::util::emit_json;

#[derive(clap::Args)]
pub struct Args {
	pub path: PathBuf,
	/// Print the field layout of this structure.
	#[arg(long = "struct")]
	pub struct_name: Option<String>,
	/// Emit machine-readable JSON.
	#[arg(long)]
	pub json: bool,
}

/// Print schema table sizes and, optionally, one structure's layout.
pub fn run(args: Args) -> Result<()> {
	let Args { path, struct_name, json } = args;

	let blend = BlendFile::open(&path)?;
	let schema = blend.schema();

	let layout = match struct_name.as_deref() {
		Some(name) => {
			let sdna_index = schema.structure_index(name);
			let item = schema.require(name)?;
			Some(StructJson {
				name: item.name.to_string(),
				sdna_index,
				size: item.size,
				fields: item
					.fields
					.iter()
					.map(|field| FieldJson {
						decl: field.decl_label(),
						name: field.name.to_string(),
						offset: field.offset,
						size: field.size,
						pointer: field.is_pointer,
					})
					.collect(),
			})
		}
		None => None,
	};

	if json {
		let payload = DnaJson {
			path: path.display().to_string(),
			version: blend.header().version,
			names: schema.names.len(),
			types: schema.types.len(),
			structures: schema.file_structure_count(),
			pointer_size: schema.pointer_size(),
			structure: layout,
		};
		emit_json(&payload);
		return Ok(());
	}

	println!("path: {}", path.display());
	println!("compression: {}", blend.compression.as_str());
	println!("version: {}", blend.header().version);
	println!("dna_names: {}", schema.names.len());
	println!("dna_types: {}", schema.types.len());
	println!("dna_structs: {}", schema.file_structure_count());

	if let Some(layout) = layout {
		println!("struct: {}", layout.name);
		if let Some(idx) = layout.sdna_index {
			println!("sdna_index: {idx}");
		}
		println!("size: {}", layout.size);
		println!("field_count: {}", layout.fields.len());
		for field in &layout.fields {
			println!("  {:>6} {:>6}  {}", field.offset, field.size, field.decl);
		}
	}

	Ok(())
}

#[derive(serde::Serialize)]
struct DnaJson {
	path: String,
	version: u16,
	names: usize,
	types: usize,
	structures: usize,
	pointer_size: usize,
	#[serde(skip_serializing_if = "Option::is_none")]
	structure: Option<StructJson>,
}

#[derive(serde::Serialize)]
struct StructJson {
	name: String,
	sdna_index: Option<u32>,
	size: usize,
	fields: Vec<FieldJson>,
}

#[derive(serde::Serialize)]
struct FieldJson {
	decl: String,
	name: String,
	offset: usize,
	size: usize,
	pointer: bool,
}
