//! Synthetic `.blend` container builder shared by workspace tests.
//!
//! Layouts are computed from the declared fields for the chosen pointer width,
//! so one test body can emit the same logical data as 4- or 8-byte, little- or
//! big-endian containers.

use std::collections::HashMap;

/// Byte order of the emitted container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
	/// `v` header marker.
	Little,
	/// `V` header marker.
	Big,
}

impl ByteOrder {
	fn put_u16(self, out: &mut Vec<u8>, value: u16) {
		match self {
			Self::Little => out.extend_from_slice(&value.to_le_bytes()),
			Self::Big => out.extend_from_slice(&value.to_be_bytes()),
		}
	}

	fn put_u32(self, out: &mut Vec<u8>, value: u32) {
		match self {
			Self::Little => out.extend_from_slice(&value.to_le_bytes()),
			Self::Big => out.extend_from_slice(&value.to_be_bytes()),
		}
	}

	fn put_u64(self, out: &mut Vec<u8>, value: u64) {
		match self {
			Self::Little => out.extend_from_slice(&value.to_le_bytes()),
			Self::Big => out.extend_from_slice(&value.to_be_bytes()),
		}
	}

	/// Encode the low `width` bytes of `value`.
	fn int_bytes(self, value: u64, width: usize) -> Vec<u8> {
		let le = value.to_le_bytes();
		let mut out = le[..width].to_vec();
		if self == Self::Big {
			out.reverse();
		}
		out
	}
}

/// Chunk header layout of the emitted container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStyle {
	/// `BLENDER-v300` header with `code len old sdna nr` chunks.
	Legacy,
	/// `BLENDER17-01v0500` header with wide chunk headers; always 8-byte pointers.
	Large,
}

#[derive(Debug, Clone)]
struct StructDef {
	name: String,
	fields: Vec<(String, String)>,
	size_override: Option<u16>,
}

/// Declarative schema description encoded into a `DNA1` chunk.
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
	primitives: Vec<(String, u16)>,
	structs: Vec<StructDef>,
}

impl Default for SchemaBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl SchemaBuilder {
	/// Create a schema with the usual Blender primitive types.
	pub fn new() -> Self {
		let primitives = [
			("char", 1),
			("uchar", 1),
			("short", 2),
			("ushort", 2),
			("int", 4),
			("uint", 4),
			("float", 4),
			("double", 8),
			("int64_t", 8),
			("uint64_t", 8),
			("void", 0),
		];
		Self {
			primitives: primitives.iter().map(|(name, size)| ((*name).to_owned(), *size)).collect(),
			structs: Vec::new(),
		}
	}

	/// Add an extra primitive type.
	pub fn primitive(mut self, name: &str, size: u16) -> Self {
		self.primitives.push((name.to_owned(), size));
		self
	}

	/// Declare a structure from `(type, declarator)` pairs. Nested value fields must name earlier structures.
	pub fn structure(mut self, name: &str, fields: &[(&str, &str)]) -> Self {
		self.structs.push(StructDef {
			name: name.to_owned(),
			fields: fields.iter().map(|(ty, decl)| ((*ty).to_owned(), (*decl).to_owned())).collect(),
			size_override: None,
		});
		self
	}

	/// Declare a structure whose `TLEN` entry is forced to `size`.
	pub fn structure_with_size(mut self, name: &str, size: u16, fields: &[(&str, &str)]) -> Self {
		self = self.structure(name, fields);
		if let Some(last) = self.structs.last_mut() {
			last.size_override = Some(size);
		}
		self
	}

	/// Compute field offsets for every structure at `pointer_size`.
	pub fn layouts(&self, pointer_size: usize) -> HashMap<String, Layout> {
		let mut sizes: HashMap<String, usize> = self.primitives.iter().map(|(name, size)| (name.clone(), usize::from(*size))).collect();
		let mut layouts = HashMap::new();

		for def in &self.structs {
			let mut offset = 0;
			let mut fields = Vec::with_capacity(def.fields.len());
			for (ty, decl) in &def.fields {
				let shape = DeclShape::parse(decl);
				let elem_size = if shape.pointer {
					pointer_size
				} else {
					sizes.get(ty.as_str()).copied().unwrap_or(0)
				};
				let size = elem_size * shape.count;
				fields.push(FieldLayout {
					name: shape.ident.clone(),
					type_name: ty.clone(),
					offset,
					elem_size,
					count: shape.count,
					pointer: shape.pointer,
				});
				offset += size;
			}
			sizes.insert(def.name.clone(), offset);
			layouts.insert(def.name.clone(), Layout { size: offset, fields });
		}

		layouts
	}

	/// Schema structure index of `name`, matching file order.
	pub fn sdna_index(&self, name: &str) -> Option<u32> {
		self.structs.iter().position(|def| def.name == name).map(|idx| idx as u32)
	}

	/// Encode the `DNA1` payload.
	pub fn encode(&self, pointer_size: usize, order: ByteOrder) -> Vec<u8> {
		let layouts = self.layouts(pointer_size);

		let mut types: Vec<(String, u16)> = self.primitives.clone();
		let mut type_index: HashMap<String, u16> = types.iter().enumerate().map(|(idx, (name, _))| (name.clone(), idx as u16)).collect();
		let mut intern_type = |types: &mut Vec<(String, u16)>, name: &str, size: u16| -> u16 {
			if let Some(idx) = type_index.get(name) {
				if size > 0 {
					types[usize::from(*idx)].1 = size;
				}
				return *idx;
			}
			let idx = types.len() as u16;
			types.push((name.to_owned(), size));
			type_index.insert(name.to_owned(), idx);
			idx
		};

		for def in &self.structs {
			let size = def.size_override.unwrap_or_else(|| layouts.get(&def.name).map_or(0, |layout| layout.size as u16));
			intern_type(&mut types, &def.name, size);
		}

		let mut names: Vec<String> = Vec::new();
		let mut name_index: HashMap<String, u16> = HashMap::new();
		let mut structs = Vec::new();
		for def in &self.structs {
			let struct_type = intern_type(&mut types, &def.name, 0);
			let mut fields = Vec::new();
			for (ty, decl) in &def.fields {
				let field_type = intern_type(&mut types, ty, 0);
				let field_name = *name_index.entry(decl.clone()).or_insert_with(|| {
					names.push(decl.clone());
					(names.len() - 1) as u16
				});
				fields.push((field_type, field_name));
			}
			structs.push((struct_type, fields));
		}

		let mut out = Vec::new();
		out.extend_from_slice(b"SDNA");
		out.extend_from_slice(b"NAME");
		order.put_u32(&mut out, names.len() as u32);
		for name in &names {
			out.extend_from_slice(name.as_bytes());
			out.push(0);
		}
		pad4(&mut out);

		out.extend_from_slice(b"TYPE");
		order.put_u32(&mut out, types.len() as u32);
		for (name, _) in &types {
			out.extend_from_slice(name.as_bytes());
			out.push(0);
		}
		pad4(&mut out);

		out.extend_from_slice(b"TLEN");
		for (_, size) in &types {
			order.put_u16(&mut out, *size);
		}
		pad4(&mut out);

		out.extend_from_slice(b"STRC");
		order.put_u32(&mut out, structs.len() as u32);
		for (struct_type, fields) in &structs {
			order.put_u16(&mut out, *struct_type);
			order.put_u16(&mut out, fields.len() as u16);
			for (field_type, field_name) in fields {
				order.put_u16(&mut out, *field_type);
				order.put_u16(&mut out, *field_name);
			}
		}

		out
	}
}

fn pad4(out: &mut Vec<u8>) {
	while out.len() % 4 != 0 {
		out.push(0);
	}
}

struct DeclShape {
	ident: String,
	pointer: bool,
	count: usize,
}

impl DeclShape {
	fn parse(decl: &str) -> Self {
		let pointer = decl.starts_with('*') || decl.starts_with("(*");
		let ident: String = decl
			.trim_start_matches(['*', '('])
			.chars()
			.take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
			.collect();
		let mut count = 1;
		let mut rest = decl;
		while let Some(start) = rest.find('[') {
			let Some(end) = rest[start..].find(']') else {
				break;
			};
			count *= rest[start + 1..start + end].parse::<usize>().unwrap_or(1);
			rest = &rest[start + end + 1..];
		}
		Self { ident, pointer, count }
	}
}

/// Computed layout of one structure.
#[derive(Debug, Clone)]
pub struct Layout {
	/// Total structure size.
	pub size: usize,
	fields: Vec<FieldLayout>,
}

impl Layout {
	/// Byte offset of field `name`.
	pub fn offset_of(&self, name: &str) -> Option<usize> {
		self.field(name).map(|field| field.offset)
	}

	fn field(&self, name: &str) -> Option<&FieldLayout> {
		self.fields.iter().find(|field| field.name == name)
	}
}

#[derive(Debug, Clone)]
struct FieldLayout {
	name: String,
	type_name: String,
	offset: usize,
	elem_size: usize,
	count: usize,
	pointer: bool,
}

/// One chunk queued for emission.
#[derive(Debug, Clone)]
struct Chunk {
	code: [u8; 4],
	sdna: u32,
	address: u64,
	count: u64,
	payload: Vec<u8>,
}

/// Builder for a complete container: header, chunks, `DNA1`, `ENDB`.
#[derive(Debug, Clone)]
pub struct BlendBuilder {
	schema: SchemaBuilder,
	layouts: HashMap<String, Layout>,
	pointer_size: usize,
	order: ByteOrder,
	style: ChunkStyle,
	chunks: Vec<Chunk>,
	emit_dna: bool,
	emit_endb: bool,
}

impl BlendBuilder {
	/// Start a little-endian, 8-byte-pointer legacy container.
	pub fn new(schema: SchemaBuilder) -> Self {
		let layouts = schema.layouts(8);
		Self {
			schema,
			layouts,
			pointer_size: 8,
			order: ByteOrder::Little,
			style: ChunkStyle::Legacy,
			chunks: Vec::new(),
			emit_dna: true,
			emit_endb: true,
		}
	}

	/// Select the pointer width (4 or 8). Must be called before adding records.
	pub fn pointer_size(mut self, pointer_size: usize) -> Self {
		self.pointer_size = pointer_size;
		self.layouts = self.schema.layouts(pointer_size);
		self
	}

	/// Select the byte order. Must be called before adding records.
	pub fn byte_order(mut self, order: ByteOrder) -> Self {
		self.order = order;
		self
	}

	/// Emit a Blender 5 style header with wide chunk headers.
	pub fn large_chunks(mut self) -> Self {
		self.style = ChunkStyle::Large;
		self.pointer_size(8)
	}

	/// Omit the `DNA1` chunk.
	pub fn without_dna(mut self) -> Self {
		self.emit_dna = false;
		self
	}

	/// Omit the trailing `ENDB` chunk.
	pub fn without_endb(mut self) -> Self {
		self.emit_endb = false;
		self
	}

	/// Layout of structure `name` at the selected pointer width.
	pub fn layout(&self, name: &str) -> &Layout {
		self.layouts.get(name).unwrap_or_else(|| panic!("structure {name} is not declared"))
	}

	/// Start a zero-filled record of structure `name`.
	pub fn record(&self, name: &str) -> RecordWriter<'_> {
		let layout = self.layout(name);
		RecordWriter {
			layout,
			pointer_size: self.pointer_size,
			order: self.order,
			bytes: vec![0; layout.size],
		}
	}

	/// Append a chunk holding `records` of structure `structure` at `address`.
	pub fn chunk(&mut self, code: &[u8], structure: &str, address: u64, records: impl IntoIterator<Item = Vec<u8>>) -> &mut Self {
		let sdna = self.schema.sdna_index(structure).unwrap_or_else(|| panic!("structure {structure} is not declared"));
		let mut payload = Vec::new();
		let mut count = 0;
		for record in records {
			payload.extend_from_slice(&record);
			count += 1;
		}
		self.raw_chunk(code, sdna, address, count, payload)
	}

	/// Append a chunk with an explicit structure index, count, and payload.
	pub fn raw_chunk(&mut self, code: &[u8], sdna: u32, address: u64, count: u64, payload: Vec<u8>) -> &mut Self {
		self.chunks.push(Chunk {
			code: code4(code),
			sdna,
			address,
			count,
			payload,
		});
		self
	}

	/// Encode the container bytes.
	pub fn build(&self) -> Vec<u8> {
		let mut out = Vec::new();
		let endian = match self.order {
			ByteOrder::Little => b'v',
			ByteOrder::Big => b'V',
		};
		match self.style {
			ChunkStyle::Legacy => {
				out.extend_from_slice(b"BLENDER");
				out.push(if self.pointer_size == 4 { b'_' } else { b'-' });
				out.push(endian);
				out.extend_from_slice(b"300");
			}
			ChunkStyle::Large => {
				out.extend_from_slice(b"BLENDER17-01");
				out.push(endian);
				out.extend_from_slice(b"0500");
			}
		}

		for chunk in &self.chunks {
			self.put_chunk(&mut out, chunk);
		}
		if self.emit_dna {
			let dna = Chunk {
				code: *b"DNA1",
				sdna: 0,
				address: 0,
				count: 1,
				payload: self.schema.encode(self.pointer_size, self.order),
			};
			self.put_chunk(&mut out, &dna);
		}
		if self.emit_endb {
			let endb = Chunk {
				code: *b"ENDB",
				sdna: 0,
				address: 0,
				count: 0,
				payload: Vec::new(),
			};
			self.put_chunk(&mut out, &endb);
		}
		out
	}

	fn put_chunk(&self, out: &mut Vec<u8>, chunk: &Chunk) {
		out.extend_from_slice(&chunk.code);
		match self.style {
			ChunkStyle::Legacy => {
				self.order.put_u32(out, chunk.payload.len() as u32);
				out.extend_from_slice(&self.order.int_bytes(chunk.address, self.pointer_size));
				self.order.put_u32(out, chunk.sdna);
				self.order.put_u32(out, chunk.count as u32);
			}
			ChunkStyle::Large => {
				self.order.put_u32(out, chunk.sdna);
				self.order.put_u64(out, chunk.address);
				self.order.put_u64(out, chunk.payload.len() as u64);
				self.order.put_u64(out, chunk.count);
			}
		}
		out.extend_from_slice(&chunk.payload);
	}
}

fn code4(code: &[u8]) -> [u8; 4] {
	let mut out = [0_u8; 4];
	for (slot, byte) in out.iter_mut().zip(code) {
		*slot = *byte;
	}
	out
}

/// Fills one structure record by field name.
#[derive(Debug)]
pub struct RecordWriter<'a> {
	layout: &'a Layout,
	pointer_size: usize,
	order: ByteOrder,
	bytes: Vec<u8>,
}

impl RecordWriter<'_> {
	fn field(&self, name: &str) -> &FieldLayout {
		self.layout.field(name).unwrap_or_else(|| panic!("field {name} is not declared"))
	}

	fn put(&mut self, at: usize, raw: &[u8]) {
		self.bytes[at..at + raw.len()].copy_from_slice(raw);
	}

	/// Set an integer field (or its first element) using the declared width.
	pub fn int(self, name: &str, value: i64) -> Self {
		self.ints(name, &[value])
	}

	/// Set leading elements of an integer array field.
	pub fn ints(mut self, name: &str, values: &[i64]) -> Self {
		let field = self.field(name).clone();
		for (idx, value) in values.iter().take(field.count).enumerate() {
			let raw = self.order.int_bytes(*value as u64, field.elem_size);
			self.put(field.offset + idx * field.elem_size, &raw);
		}
		self
	}

	/// Set a float field (or its first element) as `float` or `double` per the declared type.
	pub fn float(self, name: &str, value: f64) -> Self {
		self.floats(name, &[value])
	}

	/// Set leading elements of a float array field.
	pub fn floats(mut self, name: &str, values: &[f64]) -> Self {
		let field = self.field(name).clone();
		for (idx, value) in values.iter().take(field.count).enumerate() {
			let raw = if field.type_name == "double" {
				self.order.int_bytes(value.to_bits(), 8)
			} else {
				self.order.int_bytes(u64::from((*value as f32).to_bits()), 4)
			};
			self.put(field.offset + idx * field.elem_size, &raw);
		}
		self
	}

	/// Set a pointer field (or its first element).
	pub fn ptr(self, name: &str, address: u64) -> Self {
		self.ptrs(name, &[address])
	}

	/// Set leading elements of a pointer array field.
	pub fn ptrs(mut self, name: &str, addresses: &[u64]) -> Self {
		let field = self.field(name).clone();
		assert!(field.pointer, "field {name} is not a pointer");
		for (idx, address) in addresses.iter().take(field.count).enumerate() {
			let raw = self.order.int_bytes(*address, self.pointer_size);
			self.put(field.offset + idx * self.pointer_size, &raw);
		}
		self
	}

	/// Write a NUL-terminated string into a char array field.
	pub fn string(mut self, name: &str, value: &str) -> Self {
		let field = self.field(name).clone();
		let len = value.len().min(field.count.saturating_sub(1));
		self.put(field.offset, &value.as_bytes()[..len]);
		self
	}

	/// Copy an encoded nested record into a structure-typed field.
	pub fn nested(mut self, name: &str, record: Vec<u8>) -> Self {
		let offset = self.field(name).offset;
		self.put(offset, &record);
		self
	}

	/// Finish the record.
	pub fn finish(self) -> Vec<u8> {
		self.bytes
	}
}

/// Encode `values` as consecutive primitives of `width` bytes.
pub fn encode_ints(order: ByteOrder, width: usize, values: &[i64]) -> Vec<u8> {
	values.iter().flat_map(|value| order.int_bytes(*value as u64, width)).collect()
}

/// Encode `values` as consecutive IEEE `float`s.
pub fn encode_f32s(order: ByteOrder, values: &[f32]) -> Vec<u8> {
	values.iter().flat_map(|value| order.int_bytes(u64::from(value.to_bits()), 4)).collect()
}

#[cfg(test)]
mod tests {
	use super::{BlendBuilder, SchemaBuilder};

	#[test]
	fn layouts_follow_pointer_width() {
		let schema = SchemaBuilder::new().structure("Node", &[("Node", "*next"), ("int", "value"), ("float", "co[3]")]);
		assert_eq!(schema.layouts(8)["Node"].size, 8 + 4 + 12);
		assert_eq!(schema.layouts(4)["Node"].size, 4 + 4 + 12);
		assert_eq!(schema.layouts(4)["Node"].offset_of("co"), Some(8));
	}

	#[test]
	fn legacy_header_encodes_width_and_order() {
		let blend = BlendBuilder::new(SchemaBuilder::new()).pointer_size(4).build();
		assert_eq!(&blend[..12], b"BLENDER_v300");
	}
}
