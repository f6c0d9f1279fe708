use std::collections::HashMap;

use crate::blend::bytes::Cursor;
use crate::blend::decl::parse_field_decl;
use crate::blend::scalar::ScalarKind;
use crate::blend::{BlendError, Endianness, Result};

/// Primitive types exposed as field-less structures so they can be decoded by name.
const PRIMITIVES: [&str; 5] = ["int", "short", "char", "float", "double"];

/// One entry of the `TYPE`/`TLEN` tables.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
	/// Type name.
	pub name: Box<str>,
	/// Declared size in bytes.
	pub size: usize,
}

/// One declared field with its resolved layout.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
	/// Declared type name (pointee type for pointers).
	pub type_name: Box<str>,
	/// Index into the type table.
	pub type_index: u16,
	/// Field name with pointer, call, and array markers removed.
	pub name: Box<str>,
	/// Raw declarator text from the `NAME` table.
	pub decl: Box<str>,
	/// Byte offset from the start of the owning structure.
	pub offset: usize,
	/// Total byte size of the field.
	pub size: usize,
	/// Size of one element (pointer width for pointers).
	pub element_size: usize,
	/// Pointer nesting depth; function pointers count as one.
	pub ptr_depth: u8,
	/// Whether the field stores addresses.
	pub is_pointer: bool,
	/// Whether the declarator carries `[n]` suffixes.
	pub is_array: bool,
	/// Array dimensions, `[1, 1]` for plain fields.
	pub dims: [usize; 2],
	/// Primitive representation when the field holds inline scalars.
	pub scalar: Option<ScalarKind>,
	/// Structure index when the field holds inline nested structures.
	pub structure: Option<u32>,
}

impl FieldDescriptor {
	/// Inline element count.
	pub fn element_count(&self) -> usize {
		self.dims[0].saturating_mul(self.dims[1])
	}

	/// Declared type and declarator, as written in the schema (`float co[3]`).
	pub fn decl_label(&self) -> String {
		format!("{} {}", self.type_name, self.decl)
	}

	/// Whether the field is a `char` array, usually a NUL-terminated string.
	pub fn is_char_array(&self) -> bool {
		self.is_array && !self.is_pointer && matches!(&*self.type_name, "char" | "uchar")
	}
}

/// One on-disk record layout.
#[derive(Debug, Clone)]
pub struct StructureDescriptor {
	/// Structure name.
	pub name: Box<str>,
	/// Index into the type table.
	pub type_index: u16,
	/// Total size in bytes.
	pub size: usize,
	/// Fields in declaration order.
	pub fields: Vec<FieldDescriptor>,
	/// Primitive scalar kind when this is a synthesized primitive.
	pub primitive: Option<ScalarKind>,
	index: HashMap<Box<str>, usize>,
}

impl StructureDescriptor {
	/// Look up a field by name.
	pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
		self.index.get(name).map(|idx| &self.fields[*idx])
	}

	/// Position of field `name` in declaration order.
	pub fn field_index(&self, name: &str) -> Option<usize> {
		self.index.get(name).copied()
	}

	/// Whether this structure was synthesized for a primitive type.
	pub fn is_primitive(&self) -> bool {
		self.primitive.is_some()
	}
}

/// The embedded type system of one container.
#[derive(Debug)]
pub struct Schema {
	/// Field declarator strings from `NAME`.
	pub names: Vec<Box<str>>,
	/// Types from `TYPE` and `TLEN`.
	pub types: Vec<TypeDescriptor>,
	structures: Vec<StructureDescriptor>,
	file_structures: usize,
	by_name: HashMap<Box<str>, u32>,
	struct_for_type: Vec<Option<u32>>,
	pointer_size: usize,
}

impl Schema {
	/// Parse a `DNA1` payload using the file's byte order and pointer width.
	pub fn parse(payload: &[u8], order: Endianness, pointer_size: usize) -> Result<Self> {
		if pointer_size != 4 && pointer_size != 8 {
			return Err(BlendError::UnsupportedPointerSize { size: pointer_size });
		}

		let mut cursor = Cursor::new(payload, order);

		expect_tag(&mut cursor, *b"SDNA")?;
		expect_tag(&mut cursor, *b"NAME")?;
		let names = read_string_table(&mut cursor)?;
		cursor.align4()?;

		expect_tag(&mut cursor, *b"TYPE")?;
		let type_names = read_string_table(&mut cursor)?;
		cursor.align4()?;

		expect_tag(&mut cursor, *b"TLEN")?;
		let mut types = Vec::with_capacity(type_names.len());
		for name in type_names {
			let size = usize::from(cursor.read_u16()?);
			types.push(TypeDescriptor { name, size });
		}
		cursor.align4()?;

		expect_tag(&mut cursor, *b"STRC")?;
		let struct_count = cursor.read_u32()? as usize;
		let mut raw_structs = Vec::with_capacity(struct_count.min(cursor.remaining() / 4));
		for _ in 0..struct_count {
			let type_idx = cursor.read_u16()?;
			check_index("struct.type_idx", u32::from(type_idx), types.len())?;

			let field_count = usize::from(cursor.read_u16()?);
			let mut fields = Vec::with_capacity(field_count);
			for _ in 0..field_count {
				let field_type = cursor.read_u16()?;
				let field_name = cursor.read_u16()?;
				check_index("field.type_idx", u32::from(field_type), types.len())?;
				check_index("field.name_idx", u32::from(field_name), names.len())?;
				fields.push((field_type, field_name));
			}
			raw_structs.push((type_idx, fields));
		}

		let mut struct_for_type = vec![None; types.len()];
		for (idx, (type_idx, _)) in raw_structs.iter().enumerate() {
			let slot = &mut struct_for_type[usize::from(*type_idx)];
			if let Some(first) = *slot {
				return Err(BlendError::DnaDuplicateStructType {
					type_idx: *type_idx,
					first,
					second: idx as u32,
				});
			}
			*slot = Some(idx as u32);
		}

		let mut structures = Vec::with_capacity(raw_structs.len() + PRIMITIVES.len());
		for (type_idx, raw_fields) in &raw_structs {
			let ty = &types[usize::from(*type_idx)];
			let mut fields = Vec::with_capacity(raw_fields.len());
			let mut index = HashMap::with_capacity(raw_fields.len());
			let mut offset = 0_usize;

			for (field_type, field_name) in raw_fields {
				let field_ty = &types[usize::from(*field_type)];
				let decl_text = &names[usize::from(*field_name)];
				let decl = parse_field_decl(decl_text);
				let is_pointer = decl.is_pointer();

				let element_size = if is_pointer { pointer_size } else { field_ty.size };
				let size = element_size.saturating_mul(decl.element_count());
				let nested = if is_pointer { None } else { struct_for_type[usize::from(*field_type)] };
				let scalar = if is_pointer || nested.is_some() {
					None
				} else {
					ScalarKind::classify(&field_ty.name, field_ty.size)
				};

				index.entry(Box::from(decl.ident)).or_insert(fields.len());
				fields.push(FieldDescriptor {
					type_name: field_ty.name.clone(),
					type_index: *field_type,
					name: Box::from(decl.ident),
					decl: decl_text.clone(),
					offset,
					size,
					element_size,
					ptr_depth: decl.ptr_depth,
					is_pointer,
					is_array: decl.is_array,
					dims: decl.dims,
					scalar,
					structure: nested,
				});
				offset = offset.saturating_add(size);
			}

			if offset != ty.size {
				return Err(BlendError::DnaStructSizeMismatch {
					name: ty.name.to_string(),
					declared: ty.size,
					computed: offset,
				});
			}

			structures.push(StructureDescriptor {
				name: ty.name.clone(),
				type_index: *type_idx,
				size: ty.size,
				fields,
				primitive: None,
				index,
			});
		}

		let file_structures = structures.len();
		let mut by_name: HashMap<Box<str>, u32> = structures.iter().enumerate().map(|(idx, item)| (item.name.clone(), idx as u32)).collect();

		for primitive in PRIMITIVES {
			if by_name.contains_key(primitive) {
				continue;
			}
			let Some((type_idx, ty)) = types.iter().enumerate().find(|(_, ty)| &*ty.name == primitive) else {
				continue;
			};
			by_name.insert(Box::from(primitive), structures.len() as u32);
			structures.push(StructureDescriptor {
				name: ty.name.clone(),
				type_index: type_idx as u16,
				size: ty.size,
				fields: Vec::new(),
				primitive: ScalarKind::classify(primitive, ty.size),
				index: HashMap::new(),
			});
		}

		Ok(Self {
			names,
			types,
			structures,
			file_structures,
			by_name,
			struct_for_type,
			pointer_size,
		})
	}

	/// Pointer width used for pointer-typed fields.
	pub fn pointer_size(&self) -> usize {
		self.pointer_size
	}

	/// All structures, file-declared first, then synthesized primitives.
	pub fn structures(&self) -> &[StructureDescriptor] {
		&self.structures
	}

	/// Number of structures declared by the file's `STRC` section.
	pub fn file_structure_count(&self) -> usize {
		self.file_structures
	}

	/// Look up a structure by a block's schema index.
	///
	/// Only `STRC` entries are addressable here; synthesized primitives have no on-disk index.
	pub fn structure_by_sdna(&self, sdna_nr: u32) -> Option<&StructureDescriptor> {
		self.structures[..self.file_structures].get(sdna_nr as usize)
	}

	/// Look up any structure, primitives included, by the index `structure_index` returns.
	pub fn structure_at(&self, index: u32) -> Option<&StructureDescriptor> {
		self.structures.get(index as usize)
	}

	/// Look up a structure by name.
	pub fn structure(&self, name: &str) -> Option<&StructureDescriptor> {
		self.structure_index(name).and_then(|idx| self.structure_at(idx))
	}

	/// Structure index for `name`.
	pub fn structure_index(&self, name: &str) -> Option<u32> {
		self.by_name.get(name).copied()
	}

	/// Look up a structure by name, failing with a usage error.
	pub fn require(&self, name: &str) -> Result<&StructureDescriptor> {
		self.structure(name).ok_or_else(|| BlendError::DnaStructNotFound { name: name.to_owned() })
	}

	/// Structure declared for a type index, if the type is a structure.
	pub fn structure_for_type(&self, type_idx: u16) -> Option<&StructureDescriptor> {
		self.struct_for_type
			.get(usize::from(type_idx))
			.and_then(|slot| slot.and_then(|idx| self.structures.get(idx as usize)))
	}

	/// Declared size of a type.
	pub fn type_size(&self, type_idx: u16) -> Option<usize> {
		self.types.get(usize::from(type_idx)).map(|ty| ty.size)
	}
}

fn expect_tag(cursor: &mut Cursor<'_>, expected: [u8; 4]) -> Result<()> {
	let at = cursor.pos();
	let got = cursor.read_code4()?;
	if got != expected {
		return Err(BlendError::DnaBadTag { expected, got, at });
	}
	Ok(())
}

fn read_string_table(cursor: &mut Cursor<'_>) -> Result<Vec<Box<str>>> {
	let count = cursor.read_u32()? as usize;
	let mut out = Vec::with_capacity(count.min(cursor.remaining()));
	for _ in 0..count {
		let bytes = cursor.read_cstring_bytes()?;
		out.push(String::from_utf8_lossy(bytes).into_owned().into_boxed_str());
	}
	Ok(out)
}

fn check_index(kind: &'static str, idx: u32, len: usize) -> Result<()> {
	if (idx as usize) >= len {
		return Err(BlendError::DnaIndexOutOfRange {
			kind,
			idx,
			max: len.saturating_sub(1) as u32,
		});
	}
	Ok(())
}
