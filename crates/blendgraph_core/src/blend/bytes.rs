use crate::blend::{BlendError, Endianness, Result};

/// Bounded cursor over an immutable byte slice that decodes in one fixed byte order.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
	bytes: &'a [u8],
	pos: usize,
	order: Endianness,
}

macro_rules! read_int {
	($name:ident, $ty:ty, $n:expr) => {
		#[doc = concat!("Read one `", stringify!($ty), "` in the cursor byte order.")]
		pub fn $name(&mut self) -> Result<$ty> {
			let raw = self.read_array::<$n>()?;
			Ok(match self.order {
				Endianness::Little => <$ty>::from_le_bytes(raw),
				Endianness::Big => <$ty>::from_be_bytes(raw),
			})
		}
	};
}

impl<'a> Cursor<'a> {
	/// Create a cursor at position 0.
	pub fn new(bytes: &'a [u8], order: Endianness) -> Self {
		Self { bytes, pos: 0, order }
	}

	/// Return current byte offset.
	pub fn pos(&self) -> usize {
		self.pos
	}

	/// Return byte order used for multi-byte reads.
	pub fn order(&self) -> Endianness {
		self.order
	}

	/// Return remaining unread bytes.
	pub fn remaining(&self) -> usize {
		self.bytes.len().saturating_sub(self.pos)
	}

	/// Move to an absolute offset within the underlying slice.
	pub fn seek(&mut self, pos: usize) -> Result<()> {
		if pos > self.bytes.len() {
			return Err(BlendError::UnexpectedEof {
				at: self.pos,
				need: pos - self.pos.min(pos),
				rem: self.remaining(),
			});
		}
		self.pos = pos;
		Ok(())
	}

	/// Skip `n` bytes.
	pub fn skip(&mut self, n: usize) -> Result<()> {
		self.read_exact(n).map(|_| ())
	}

	/// Read exactly `n` bytes and advance cursor.
	pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8]> {
		if n > self.remaining() {
			return Err(BlendError::UnexpectedEof {
				at: self.pos,
				need: n,
				rem: self.remaining(),
			});
		}

		let start = self.pos;
		self.pos += n;
		Ok(&self.bytes[start..self.pos])
	}

	fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
		let raw = self.read_exact(N)?;
		let mut out = [0_u8; N];
		out.copy_from_slice(raw);
		Ok(out)
	}

	/// Read a four-byte code.
	pub fn read_code4(&mut self) -> Result<[u8; 4]> {
		self.read_array::<4>()
	}

	/// Read one byte.
	pub fn read_u8(&mut self) -> Result<u8> {
		Ok(self.read_array::<1>()?[0])
	}

	read_int!(read_u16, u16, 2);
	read_int!(read_i16, i16, 2);
	read_int!(read_u32, u32, 4);
	read_int!(read_i32, i32, 4);
	read_int!(read_u64, u64, 8);
	read_int!(read_i64, i64, 8);
	read_int!(read_f32, f32, 4);
	read_int!(read_f64, f64, 8);

	/// Read a pointer-sized unsigned integer and widen to `u64`.
	pub fn read_ptr(&mut self, pointer_size: usize) -> Result<u64> {
		match pointer_size {
			4 => Ok(u64::from(self.read_u32()?)),
			8 => self.read_u64(),
			_ => Err(BlendError::UnsupportedPointerSize { size: pointer_size }),
		}
	}

	/// Advance to the next 4-byte aligned position.
	pub fn align4(&mut self) -> Result<()> {
		let aligned = (self.pos + 3) & !3;
		self.skip(aligned - self.pos)
	}

	/// Read a zero-terminated byte string without the terminator.
	pub fn read_cstring_bytes(&mut self) -> Result<&'a [u8]> {
		let start = self.pos;
		let rem = self.bytes.get(self.pos..).unwrap_or(&[]);
		let Some(rel_end) = rem.iter().position(|byte| *byte == 0) else {
			return Err(BlendError::UnexpectedEof {
				at: self.pos,
				need: 1,
				rem: self.remaining(),
			});
		};

		let end = start + rel_end;
		self.pos = end + 1;
		Ok(&self.bytes[start..end])
	}
}
