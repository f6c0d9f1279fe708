use crate::blend::Result;
use crate::blend::bytes::Cursor;

/// On-disk representation of a primitive field element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
	/// Two's-complement integer of the given byte width.
	Signed(u8),
	/// Unsigned integer of the given byte width.
	Unsigned(u8),
	/// IEEE `float`.
	F32,
	/// IEEE `double`.
	F64,
}

impl ScalarKind {
	/// Classify a schema type by name and byte size.
	///
	/// `u`-prefixed names (`uchar`, `ushort`, `uint64_t`) are unsigned; `float`
	/// and `double` are IEEE; any other 1/2/4/8-byte type is a signed integer.
	pub fn classify(type_name: &str, size: usize) -> Option<Self> {
		match (type_name, size) {
			("float", 4) => return Some(Self::F32),
			("double", 8) => return Some(Self::F64),
			("float" | "double", _) => return None,
			_ => {}
		}

		let width = match size {
			1 | 2 | 4 | 8 => size as u8,
			_ => return None,
		};
		if type_name.starts_with('u') {
			Some(Self::Unsigned(width))
		} else {
			Some(Self::Signed(width))
		}
	}

	/// Element size in bytes.
	pub fn width(self) -> usize {
		match self {
			Self::Signed(width) | Self::Unsigned(width) => usize::from(width),
			Self::F32 => 4,
			Self::F64 => 8,
		}
	}

	/// Decode one element at the cursor.
	pub fn read(self, cursor: &mut Cursor<'_>) -> Result<RawScalar> {
		Ok(match self {
			Self::Signed(1) => RawScalar::Int(i64::from(cursor.read_u8()? as i8)),
			Self::Signed(2) => RawScalar::Int(i64::from(cursor.read_i16()?)),
			Self::Signed(4) => RawScalar::Int(i64::from(cursor.read_i32()?)),
			Self::Signed(_) => RawScalar::Int(cursor.read_i64()?),
			Self::Unsigned(1) => RawScalar::UInt(u64::from(cursor.read_u8()?)),
			Self::Unsigned(2) => RawScalar::UInt(u64::from(cursor.read_u16()?)),
			Self::Unsigned(4) => RawScalar::UInt(u64::from(cursor.read_u32()?)),
			Self::Unsigned(_) => RawScalar::UInt(cursor.read_u64()?),
			Self::F32 => RawScalar::Float(f64::from(cursor.read_f32()?)),
			Self::F64 => RawScalar::Float(cursor.read_f64()?),
		})
	}
}

/// One primitive element widened to its lossless carrier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawScalar {
	/// Signed integer.
	Int(i64),
	/// Unsigned integer.
	UInt(u64),
	/// `float` or `double`.
	Float(f64),
}

/// Rust types a primitive field can be read into.
///
/// Conversion is a plain `as` cast from the on-disk value: integers narrow by
/// truncation, floats convert to integers by saturation toward zero, and
/// `double` rounds to nearest when read as `f32`.
pub trait Scalar: Copy + Default + 'static {
	/// Convert from the on-disk value.
	fn from_raw(raw: RawScalar) -> Self;
}

macro_rules! impl_scalar {
	($($ty:ty),* $(,)?) => {
		$(
			impl Scalar for $ty {
				fn from_raw(raw: RawScalar) -> Self {
					match raw {
						RawScalar::Int(value) => value as $ty,
						RawScalar::UInt(value) => value as $ty,
						RawScalar::Float(value) => value as $ty,
					}
				}
			}
		)*
	};
}

impl_scalar!(i8, u8, i16, u16, i32, u32, i64, u64, f32, f64);

impl Scalar for bool {
	fn from_raw(raw: RawScalar) -> Self {
		match raw {
			RawScalar::Int(value) => value != 0,
			RawScalar::UInt(value) => value != 0,
			RawScalar::Float(value) => value != 0.0,
		}
	}
}
