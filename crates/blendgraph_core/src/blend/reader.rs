use tracing::trace;

use crate::blend::bytes::Cursor;
use crate::blend::scalar::ScalarKind;
use crate::blend::session::check_count;
use crate::blend::{Address, BlendError, Convert, FieldDescriptor, ObjectId, Result, Scalar, Schema, Session, StructureDescriptor};

/// Name-based field access over one record, handed to converters.
///
/// Fields absent from the file's layout read as zero values and are counted
/// as missing; the reader never depends on field order or position.
pub struct StructReader<'s, 'a, N> {
	session: &'s mut Session<'a, N>,
	structure: &'a StructureDescriptor,
	payload: &'a [u8],
	base: usize,
	limit: usize,
	code: [u8; 4],
	depth: u32,
}

impl<'s, 'a, N> StructReader<'s, 'a, N> {
	pub(crate) fn new(
		session: &'s mut Session<'a, N>,
		structure: &'a StructureDescriptor,
		payload: &'a [u8],
		base: usize,
		limit: usize,
		code: [u8; 4],
		depth: u32,
	) -> Self {
		Self {
			session,
			structure,
			payload,
			base,
			limit,
			code,
			depth,
		}
	}

	/// Layout of the record being read.
	pub fn structure(&self) -> &'a StructureDescriptor {
		self.structure
	}

	/// Name of the record's structure.
	pub fn structure_name(&self) -> &'a str {
		&self.structure.name
	}

	/// Schema of the file being decoded.
	pub fn schema(&self) -> &'a Schema {
		self.session.schema()
	}

	/// Code of the block holding the record.
	pub fn code(&self) -> [u8; 4] {
		self.code
	}

	/// Return whether the file's layout declares field `name`.
	pub fn has_field(&self, name: &str) -> bool {
		self.structure.field(name).is_some()
	}

	/// Read a primitive field, converting with `as` semantics. Array fields yield their first element.
	pub fn read<T: Scalar>(&mut self, name: &str) -> Result<T> {
		let mut out = [T::default()];
		self.read_into(name, &mut out)?;
		Ok(out[0])
	}

	/// Read a fixed-size primitive array; extra declared elements are dropped and missing ones stay zero.
	pub fn read_array<T: Scalar, const K: usize>(&mut self, name: &str) -> Result<[T; K]> {
		let mut out = [T::default(); K];
		self.read_into(name, &mut out)?;
		Ok(out)
	}

	/// Read a row-major matrix field such as `float obmat[4][4]`.
	pub fn read_matrix<T: Scalar, const R: usize, const C: usize>(&mut self, name: &str) -> Result<[[T; C]; R]> {
		let mut out = [[T::default(); C]; R];
		self.read_into(name, out.as_flattened_mut())?;
		Ok(out)
	}

	/// Fill `out` from a primitive field and return how many elements were copied.
	pub fn read_into<T: Scalar>(&mut self, name: &str, out: &mut [T]) -> Result<usize> {
		let Some(field) = self.field(name) else {
			return Ok(0);
		};
		let Some(kind) = field.scalar else {
			return Err(self.mismatch(field, "scalar"));
		};

		let count = field.element_count().min(out.len());
		let mut cursor = self.cursor(field, name)?;
		for slot in out.iter_mut().take(count) {
			let raw = kind.read(&mut cursor).map_err(|err| err.in_field(self.code, &self.structure.name, name))?;
			*slot = T::from_raw(raw);
		}
		Ok(count)
	}

	/// Read a `char` array as a NUL-terminated string, replacing invalid UTF-8.
	pub fn read_string(&mut self, name: &str) -> Result<String> {
		let Some(field) = self.field(name) else {
			return Ok(String::new());
		};
		if field.is_pointer || field.element_size != 1 || field.structure.is_some() {
			return Err(self.mismatch(field, "char array"));
		}

		let bytes = self.cursor(field, name)?.read_exact(field.size).map_err(|err| err.in_field(self.code, &self.structure.name, name))?;
		let end = bytes.iter().position(|byte| *byte == 0).unwrap_or(bytes.len());
		Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
	}

	/// Decode an inline nested structure field.
	pub fn read_struct<T: Convert<N>>(&mut self, name: &str) -> Result<T> {
		let Some(field) = self.field(name) else {
			return Ok(T::default());
		};
		let structure = self.nested_structure(field)?;
		let base = self.base + field.offset;
		self.decode_one(structure, self.payload, base, base + structure.size, self.depth + 1)
			.map_err(|err| err.in_field(self.code, &self.structure.name, name))
	}

	/// Decode every element of an inline structure array field.
	pub fn read_struct_array<T: Convert<N>>(&mut self, name: &str) -> Result<Vec<T>> {
		let Some(field) = self.field(name) else {
			return Ok(Vec::new());
		};
		let structure = self.nested_structure(field)?;
		let start = self.base + field.offset;
		self.decode_run(structure, self.payload, start, field.element_count(), self.depth + 1)
			.map_err(|err| err.in_field(self.code, &self.structure.name, name))
	}

	/// Read a pointer field's raw address.
	pub fn read_address(&mut self, name: &str) -> Result<Address> {
		match self.field(name) {
			Some(field) => self.address_in(field, name),
			None => Ok(Address::NULL),
		}
	}

	/// Resolve a pointer field through the session's cache and registry.
	///
	/// Null, dangling, and unregistered targets yield `None`.
	pub fn read_ptr(&mut self, name: &str) -> Result<Option<ObjectId>> {
		let address = self.read_address(name)?;
		self.resolve(address).map_err(|err| err.in_field(self.code, &self.structure.name, name))
	}

	/// Resolve a pointer whose target element structure is selected by `tag`.
	pub fn read_ptr_tagged(&mut self, name: &str, tag: i32) -> Result<Option<ObjectId>> {
		let address = self.read_address(name)?;
		self.session
			.enqueue_tagged(address, tag)
			.map_err(|err| err.in_field(self.code, &self.structure.name, name))
	}

	/// Resolve every entry of an inline pointer array field such as `*mtex[18]`.
	pub fn read_ptrs(&mut self, name: &str) -> Result<Vec<Option<ObjectId>>> {
		let Some(field) = self.field(name) else {
			return Ok(Vec::new());
		};
		if !field.is_pointer {
			return Err(self.mismatch(field, "pointer array"));
		}

		let mut cursor = self.cursor(field, name)?;
		let mut out = Vec::with_capacity(field.element_count());
		for _ in 0..field.element_count() {
			let address = cursor
				.read_ptr(field.element_size)
				.map(Address)
				.map_err(|err| err.in_field(self.code, &self.structure.name, name))?;
			out.push(self.resolve(address).map_err(|err| err.in_field(self.code, &self.structure.name, name))?);
		}
		Ok(out)
	}

	/// Decode the elements a pointer field points at as inline values (`MVert *mvert`).
	pub fn read_ptr_array<T: Convert<N>>(&mut self, name: &str) -> Result<Vec<T>> {
		let Some(field) = self.field(name) else {
			return Ok(Vec::new());
		};
		let address = self.address_in(field, name)?;
		let Some(block) = self.session.locate(address) else {
			return Ok(Vec::new());
		};

		let structure = match self.session.schema().structure_for_type(field.type_index) {
			Some(structure) => structure,
			None => self.session.structure(block.sdna_nr)?,
		};
		let start = (address.0 - block.address.0) as usize;
		let own = self.session.structure(block.sdna_nr).ok();
		let end = if own.is_some_and(|own| own.name == structure.name) {
			check_count(&block, structure.size).map_err(|err| err.in_field(self.code, &self.structure.name, name))?;
			block.count as usize * structure.size
		} else {
			block.len
		};

		let payload = block.payload(self.session.file().bytes());
		let count = run_length(end, start, structure.size);
		trace!(field = name, structure = %structure.name, count, "decoding pointed-to element run");
		self.decode_run(structure, payload, start, count, self.depth + 1)
			.map_err(|err| err.in_field(self.code, &self.structure.name, name))
	}

	/// Resolve each address of a pointer-to-pointer array field (`Material **mat`).
	pub fn read_ptr_list(&mut self, name: &str) -> Result<Vec<Option<ObjectId>>> {
		let Some(field) = self.field(name) else {
			return Ok(Vec::new());
		};
		if field.ptr_depth < 2 {
			return Err(self.mismatch(field, "pointer list"));
		}
		let address = self.address_in(field, name)?;
		let Some(block) = self.session.locate(address) else {
			return Ok(Vec::new());
		};

		let pointer_size = field.element_size;
		let payload = block.payload(self.session.file().bytes());
		let start = (address.0 - block.address.0) as usize;
		let count = payload.len().saturating_sub(start) / pointer_size;
		self.check_array(count, name)?;

		let mut cursor = Cursor::new(&payload[start..], self.session.order());
		let mut out = Vec::with_capacity(count);
		for _ in 0..count {
			let entry = Address(cursor.read_ptr(pointer_size)?);
			out.push(self.resolve(entry).map_err(|err| err.in_field(self.code, &self.structure.name, name))?);
		}
		Ok(out)
	}

	/// Decode primitives a pointer field points at (`float *data`).
	pub fn read_ptr_scalars<T: Scalar>(&mut self, name: &str) -> Result<Vec<T>> {
		let Some(field) = self.field(name) else {
			return Ok(Vec::new());
		};
		let size = self.session.schema().type_size(field.type_index).unwrap_or(0);
		let Some(kind) = ScalarKind::classify(&field.type_name, size).filter(|_| field.is_pointer) else {
			return Err(self.mismatch(field, "pointer to primitives"));
		};
		let address = self.address_in(field, name)?;
		let Some(block) = self.session.locate(address) else {
			return Ok(Vec::new());
		};

		let payload = block.payload(self.session.file().bytes());
		let start = (address.0 - block.address.0) as usize;
		let count = payload.len().saturating_sub(start) / kind.width();
		self.check_array(count, name)?;

		let mut cursor = Cursor::new(&payload[start..], self.session.order());
		let mut out = Vec::with_capacity(count);
		for _ in 0..count {
			out.push(T::from_raw(kind.read(&mut cursor)?));
		}
		Ok(out)
	}

	/// Decode this record and every following element of the same run.
	pub fn read_elements<T: Convert<N>>(&mut self) -> Result<Vec<T>> {
		let size = self.structure.size;
		let count = if size == 0 { 0 } else { self.limit.saturating_sub(self.base) / size };
		self.decode_run(self.structure, self.payload, self.base, count, self.depth)
	}

	/// Resolve a raw address read by the converter.
	pub fn resolve(&mut self, address: Address) -> Result<Option<ObjectId>> {
		self.session.enqueue(address)
	}

	fn field(&mut self, name: &str) -> Option<&'a FieldDescriptor> {
		match self.structure.field(name) {
			Some(field) => {
				self.session.stats.fields_read += 1;
				Some(field)
			}
			None => {
				self.session.stats.fields_missing += 1;
				trace!(structure = %self.structure.name, field = name, "field missing from layout; using zero value");
				None
			}
		}
	}

	fn address_in(&self, field: &FieldDescriptor, name: &str) -> Result<Address> {
		if !field.is_pointer {
			return Err(self.mismatch(field, "pointer"));
		}
		let mut cursor = self.cursor(field, name)?;
		cursor
			.read_ptr(field.element_size)
			.map(Address)
			.map_err(|err| err.in_field(self.code, &self.structure.name, name))
	}

	fn cursor(&self, field: &FieldDescriptor, name: &str) -> Result<Cursor<'a>> {
		let start = self.base + field.offset;
		let end = start + field.size;
		if end > self.payload.len() {
			let err = BlendError::DecodePayloadTooSmall {
				need: end,
				have: self.payload.len(),
			};
			return Err(err.in_field(self.code, &self.structure.name, name));
		}
		Ok(Cursor::new(&self.payload[start..end], self.session.order()))
	}

	fn mismatch(&self, field: &FieldDescriptor, requested: &'static str) -> BlendError {
		BlendError::FieldTypeMismatch {
			field: field.name.to_string(),
			declared: field.decl_label(),
			requested,
		}
		.in_field(self.code, &self.structure.name, &field.name)
	}

	fn nested_structure(&self, field: &FieldDescriptor) -> Result<&'a StructureDescriptor> {
		let Some(index) = field.structure else {
			return Err(self.mismatch(field, "structure"));
		};
		self.session.structure(index)
	}

	fn check_array(&self, count: usize, name: &str) -> Result<()> {
		let max = self.session.options().max_array_elems;
		if count > max {
			let err = BlendError::DecodeArrayTooLarge { count, max };
			return Err(err.in_field(self.code, &self.structure.name, name));
		}
		Ok(())
	}

	fn decode_one<T: Convert<N>>(&mut self, structure: &'a StructureDescriptor, payload: &'a [u8], base: usize, limit: usize, depth: u32) -> Result<T> {
		let max_depth = self.session.options().max_depth;
		if depth > max_depth {
			return Err(BlendError::DecodeDepthExceeded { max_depth });
		}

		let mut value = T::default();
		let mut child = StructReader::new(&mut *self.session, structure, payload, base, limit, self.code, depth);
		value.convert(&mut child)?;
		Ok(value)
	}

	fn decode_run<T: Convert<N>>(&mut self, structure: &'a StructureDescriptor, payload: &'a [u8], start: usize, count: usize, depth: u32) -> Result<Vec<T>> {
		self.check_array(count, &structure.name)?;
		let end = start.saturating_add(count.saturating_mul(structure.size));
		if end > payload.len() {
			return Err(BlendError::DecodePayloadTooSmall { need: end, have: payload.len() });
		}

		let mut out = Vec::with_capacity(count);
		for idx in 0..count {
			let base = start + idx * structure.size;
			out.push(self.decode_one(structure, payload, base, end, depth)?);
		}
		Ok(out)
	}
}

/// Whole elements of `size` bytes between `start` and `end`.
fn run_length(end: usize, start: usize, size: usize) -> usize {
	if size == 0 {
		return 0;
	}
	end.saturating_sub(start) / size
}

#[cfg(test)]
mod tests;
