use crate::blend::Address;

/// Dynamic value produced by schema-driven inspection.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	/// Explicit null marker.
	Null,
	/// Signed integer scalar.
	I64(i64),
	/// Unsigned integer scalar.
	U64(u64),
	/// 32-bit float scalar.
	F32(f32),
	/// 64-bit float scalar.
	F64(f64),
	/// Opaque byte payload.
	Bytes(Vec<u8>),
	/// NUL-terminated `char` array, UTF-8 lossy decoded.
	String(Box<str>),
	/// Raw pointer value.
	Ptr(Address),
	/// Fixed-size array or element run.
	Array(Vec<Value>),
	/// Struct-shaped decoded value.
	Struct(StructValue),
}

impl Value {
	/// Borrow the nested struct value, if any.
	pub fn as_struct(&self) -> Option<&StructValue> {
		match self {
			Self::Struct(value) => Some(value),
			_ => None,
		}
	}
}

/// Decoded struct value with field names preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct StructValue {
	/// Structure name from the schema.
	pub type_name: Box<str>,
	/// Decoded field values in declaration order.
	pub fields: Vec<FieldValue>,
}

impl StructValue {
	/// Look up a decoded field by name.
	pub fn field(&self, name: &str) -> Option<&Value> {
		self.fields.iter().find(|field| &*field.name == name).map(|field| &field.value)
	}
}

/// Named decoded field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
	/// Field identifier.
	pub name: Box<str>,
	/// Decoded field payload.
	pub value: Value,
}
