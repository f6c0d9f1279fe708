use crate::blend::bytes::Cursor;
use crate::blend::value::{FieldValue, StructValue, Value};
use crate::blend::{Address, BlendError, BlendFile, Endianness, FieldDescriptor, RawBlock, RawScalar, Result, Schema, StructureDescriptor};

/// Limits and switches for generic block inspection.
#[derive(Debug, Clone)]
pub struct InspectOptions {
	/// Maximum nested struct depth.
	pub max_depth: u32,
	/// Maximum element count of one array or block run.
	pub max_array_elems: usize,
	/// Keep padding-like fields instead of skipping them.
	pub include_padding: bool,
	/// Convert `char[N]` fields to strings.
	pub decode_char_arrays_as_string: bool,
	/// Error when a record's bytes differ from its declared size.
	pub strict_layout: bool,
}

impl Default for InspectOptions {
	fn default() -> Self {
		Self {
			max_depth: 16,
			max_array_elems: 4096,
			include_padding: false,
			decode_char_arrays_as_string: true,
			strict_layout: false,
		}
	}
}

impl InspectOptions {
	/// Preset for short console dumps.
	pub fn for_summary() -> Self {
		Self {
			max_depth: 4,
			max_array_elems: 64,
			..Self::default()
		}
	}
}

/// Decode every element of a block into dynamic values.
///
/// A single-element block yields the struct itself, otherwise an array.
pub fn inspect_block(file: &BlendFile, block: &RawBlock, opt: &InspectOptions) -> Result<Value> {
	let schema = file.schema();
	let structure = schema.structure_by_sdna(block.sdna_nr).ok_or(BlendError::MissingSdna { sdna_nr: block.sdna_nr })?;
	let payload = file.payload(block);

	let count = usize::try_from(block.count).unwrap_or(usize::MAX);
	if count > opt.max_array_elems {
		return Err(BlendError::DecodeArrayTooLarge {
			count,
			max: opt.max_array_elems,
		});
	}
	let need = count.saturating_mul(structure.size);
	if need > payload.len() {
		return Err(BlendError::DecodePayloadTooSmall { need, have: payload.len() });
	}

	let order = file.header.endianness;
	let mut values = Vec::with_capacity(count);
	for idx in 0..count {
		let start = idx * structure.size;
		let bytes = &payload[start..start + structure.size];
		values.push(Value::Struct(inspect_struct(schema, order, structure, bytes, opt)?));
	}

	if count == 1 {
		Ok(values.pop().unwrap_or(Value::Null))
	} else {
		Ok(Value::Array(values))
	}
}

/// Decode one record of `structure` from `bytes`.
pub fn inspect_struct(schema: &Schema, order: Endianness, structure: &StructureDescriptor, bytes: &[u8], opt: &InspectOptions) -> Result<StructValue> {
	inspect_struct_impl(schema, order, structure, bytes, opt, 0)
}

fn inspect_struct_impl(schema: &Schema, order: Endianness, structure: &StructureDescriptor, bytes: &[u8], opt: &InspectOptions, depth: u32) -> Result<StructValue> {
	if depth >= opt.max_depth {
		return Err(BlendError::DecodeDepthExceeded { max_depth: opt.max_depth });
	}

	if bytes.len() < structure.size || (opt.strict_layout && bytes.len() != structure.size) {
		return Err(BlendError::DecodeLayoutMismatch {
			type_name: structure.name.to_string(),
			leftover: bytes.len().abs_diff(structure.size),
		});
	}

	let mut fields = Vec::with_capacity(structure.fields.len());
	for field in &structure.fields {
		if !opt.include_padding && is_padding_field(field) {
			continue;
		}

		let raw = &bytes[field.offset..field.offset + field.size];
		let value = inspect_field(schema, order, field, raw, opt, depth + 1)?;
		fields.push(FieldValue {
			name: field.name.clone(),
			value,
		});
	}

	Ok(StructValue {
		type_name: structure.name.clone(),
		fields,
	})
}

fn inspect_field(schema: &Schema, order: Endianness, field: &FieldDescriptor, raw: &[u8], opt: &InspectOptions, depth: u32) -> Result<Value> {
	let count = field.element_count();
	if count == 0 {
		return Ok(Value::Array(Vec::new()));
	}
	if count > opt.max_array_elems {
		return Err(BlendError::DecodeArrayTooLarge {
			count,
			max: opt.max_array_elems,
		});
	}

	let mut cursor = Cursor::new(raw, order);
	let mut values = Vec::with_capacity(count);

	if field.is_pointer {
		for _ in 0..count {
			values.push(Value::Ptr(Address(cursor.read_ptr(field.element_size)?)));
		}
	} else if let Some(index) = field.structure {
		let nested = schema.structure_by_sdna(index).ok_or(BlendError::MissingSdna { sdna_nr: index })?;
		for _ in 0..count {
			let bytes = cursor.read_exact(nested.size)?;
			values.push(Value::Struct(inspect_struct_impl(schema, order, nested, bytes, opt, depth)?));
		}
	} else if opt.decode_char_arrays_as_string && field.is_char_array() && count > 1 {
		let end = raw.iter().position(|byte| *byte == 0).unwrap_or(raw.len());
		return Ok(Value::String(String::from_utf8_lossy(&raw[..end]).into_owned().into_boxed_str()));
	} else if let Some(kind) = field.scalar {
		for _ in 0..count {
			values.push(match kind.read(&mut cursor)? {
				RawScalar::Int(value) => Value::I64(value),
				RawScalar::UInt(value) => Value::U64(value),
				RawScalar::Float(value) if field.element_size == 4 => Value::F32(value as f32),
				RawScalar::Float(value) => Value::F64(value),
			});
		}
	} else {
		return Ok(Value::Bytes(raw.to_vec()));
	}

	if field.is_array {
		Ok(Value::Array(values))
	} else {
		Ok(values.pop().unwrap_or(Value::Null))
	}
}

fn is_padding_field(field: &FieldDescriptor) -> bool {
	(field.name.starts_with("_pad") || field.name.starts_with("pad")) && field.is_array && matches!(&*field.type_name, "char" | "uchar" | "uint8_t")
}
