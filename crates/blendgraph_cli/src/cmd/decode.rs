use std::path::PathBuf;

use blendgraph::blend::{BlendFile, InspectOptions, Result, Value, code_label, inspect_block};

use crate::cmd::util::{emit_json, parse_block_code, ptr_hex};

#[derive(clap::Args)]
pub struct Args {
	pub path: PathBuf,
	/// Block code to decode, up to four ASCII characters (`SC`, `OB`, `DATA`).
	#[arg(long)]
	pub code: String,
	/// Maximum nested struct depth.
	#[arg(long)]
	pub max_depth: Option<u32>,
	/// Maximum element count of one array or block run.
	#[arg(long)]
	pub max_array: Option<usize>,
	/// Keep padding fields (`pad`, `_pad1`, ...).
	#[arg(long)]
	pub include_padding: bool,
	/// Print `char` arrays as integers instead of strings.
	#[arg(long)]
	pub raw_chars: bool,
	/// Fail when a record's bytes differ from its declared size.
	#[arg(long)]
	pub strict: bool,
	/// Emit machine-readable JSON.
	#[arg(long)]
	pub json: bool,
}

/// Output truncation and formatting limits for decoded values.
#[derive(Debug, Clone, Copy)]
pub struct PrintOptions {
	/// Maximum number of fields printed for a single struct.
	pub max_fields_per_struct: usize,
	/// Maximum number of Unicode scalar values printed for strings.
	pub max_string_len: usize,
	/// Maximum number of elements printed for arrays.
	pub max_array_items: usize,
	/// Maximum recursive print depth for nested arrays/structs.
	pub max_print_depth: u32,
}

impl Default for PrintOptions {
	fn default() -> Self {
		Self {
			max_fields_per_struct: 80,
			max_string_len: 200,
			max_array_items: 16,
			max_print_depth: 6,
		}
	}
}

impl Args {
	fn inspect_options(&self) -> InspectOptions {
		let mut options = InspectOptions::default();
		if let Some(depth) = self.max_depth {
			options.max_depth = depth;
		}
		if let Some(max) = self.max_array {
			options.max_array_elems = max;
		}
		options.include_padding = self.include_padding;
		options.decode_char_arrays_as_string = !self.raw_chars;
		options.strict_layout = self.strict;
		options
	}
}

/// Decode and print the first block matching `--code`.
pub fn run(args: Args) -> Result<()> {
	let code = parse_block_code(&args.code)?;
	let options = args.inspect_options();

	let blend = BlendFile::open(&args.path)?;
	let block = *blend.find_first_block_by_code(code)?;
	let structure = blend.schema().structure_by_sdna(block.sdna_nr).map(|item| item.name.to_string());
	let value = inspect_block(&blend, &block, &options)?;

	if args.json {
		let payload = DecodeJson {
			path: args.path.display().to_string(),
			code: code_label(code),
			address: ptr_hex(block.address),
			sdna_nr: block.sdna_nr,
			structure,
			count: block.count,
			len: block.len,
			value: value_to_json(&value),
		};
		emit_json(&payload);
		return Ok(());
	}

	println!("path: {}", args.path.display());
	println!("code: {}", code_label(code));
	println!("address: {}", ptr_hex(block.address));
	println!("sdna_nr: {}", block.sdna_nr);
	println!("structure: {}", structure.as_deref().unwrap_or("-"));
	println!("nr: {}", block.count);
	println!("len: {}", block.len);
	println!("decoded:");
	print_value(&value, 0, 0, PrintOptions::default());

	Ok(())
}

fn print_value(value: &Value, indent: usize, depth: u32, options: PrintOptions) {
	let pad = " ".repeat(indent);
	match value {
		Value::Null => println!("{pad}null"),
		Value::I64(v) => println!("{pad}{v}"),
		Value::U64(v) => println!("{pad}{v}"),
		Value::F32(v) => println!("{pad}{v}"),
		Value::F64(v) => println!("{pad}{v}"),
		Value::Bytes(v) => println!("{pad}bytes[{}]", v.len()),
		Value::String(v) => println!("{pad}\"{}\"", truncate(v, options.max_string_len)),
		Value::Ptr(v) => println!("{pad}{}", ptr_hex(*v)),
		Value::Array(items) => {
			if depth >= options.max_print_depth {
				println!("{pad}[... {} items]", items.len());
				return;
			}
			println!("{pad}[");
			for item in items.iter().take(options.max_array_items) {
				print_value(item, indent + 2, depth + 1, options);
			}
			if items.len() > options.max_array_items {
				println!("{pad}  ... {} more", items.len() - options.max_array_items);
			}
			println!("{pad}]");
		}
		Value::Struct(item) => {
			if depth >= options.max_print_depth {
				println!("{pad}{} {{ ... }}", item.type_name);
				return;
			}
			println!("{pad}{} {{", item.type_name);
			for field in item.fields.iter().take(options.max_fields_per_struct) {
				print!("{pad}  {} = ", field.name);
				if matches!(field.value, Value::Struct(_) | Value::Array(_)) {
					println!();
					print_value(&field.value, indent + 4, depth + 1, options);
				} else {
					print_value(&field.value, 0, depth + 1, options);
				}
			}
			if item.fields.len() > options.max_fields_per_struct {
				println!("{pad}  ... {} more fields", item.fields.len() - options.max_fields_per_struct);
			}
			println!("{pad}}}");
		}
	}
}

fn truncate(input: &str, max_len: usize) -> String {
	if input.chars().count() <= max_len {
		return input.to_owned();
	}
	let out: String = input.chars().take(max_len).collect();
	format!("{out}...")
}

/// Convert a decoded value into JSON; structs become `{ "type", "fields" }` objects.
pub(crate) fn value_to_json(value: &Value) -> serde_json::Value {
	use serde_json::{Map, Value as JsonValue};

	match value {
		Value::Null => JsonValue::Null,
		Value::I64(v) => serde_json::json!(v),
		Value::U64(v) => serde_json::json!(v),
		Value::F32(v) => serde_json::json!(v),
		Value::F64(v) => serde_json::json!(v),
		Value::Bytes(v) => JsonValue::Array(v.iter().map(|item| serde_json::json!(item)).collect()),
		Value::String(v) => serde_json::json!(v),
		Value::Ptr(v) => serde_json::json!(ptr_hex(*v)),
		Value::Array(items) => JsonValue::Array(items.iter().map(value_to_json).collect()),
		Value::Struct(item) => {
			let fields: Map<String, JsonValue> = item.fields.iter().map(|field| (field.name.to_string(), value_to_json(&field.value))).collect();

			let mut out = Map::new();
			out.insert("type".to_owned(), serde_json::json!(item.type_name.as_ref()));
			out.insert("fields".to_owned(), JsonValue::Object(fields));
			JsonValue::Object(out)
		}
	}
}

#[derive(serde::Serialize)]
struct DecodeJson {
	path: String,
	code: String,
	address: String,
	sdna_nr: u32,
	structure: Option<String>,
	count: u64,
	len: usize,
	value: serde_json::Value,
}
