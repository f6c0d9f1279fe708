use crate::blend::bytes::Cursor;
use crate::blend::{BlendError, BlendHeader, ChunkLayout, Result};

/// Parsed chunk header preceding every block payload.
#[derive(Debug, Clone, Copy)]
pub struct BHead {
	/// Four-byte block code, NUL padded for two-letter ID codes.
	pub code: [u8; 4],
	/// Schema structure index describing the payload elements.
	pub sdna_nr: u32,
	/// Original in-memory address of the payload when the file was written.
	pub old: u64,
	/// Payload byte length.
	pub len: u64,
	/// Number of structure instances stored in the payload.
	pub nr: u64,
}

impl BHead {
	/// Parse a chunk header at the cursor position using the layout the file header selects.
	pub fn parse(cursor: &mut Cursor<'_>, header: BlendHeader) -> Result<Self> {
		match header.chunk_layout() {
			ChunkLayout::Legacy => Self::parse_legacy(cursor, header.pointer_size),
			ChunkLayout::Large => Self::parse_large(cursor),
		}
	}

	/// Encoded size of one chunk header for `header`.
	pub fn encoded_size(header: BlendHeader) -> usize {
		match header.chunk_layout() {
			ChunkLayout::Legacy => 16 + header.pointer_size,
			ChunkLayout::Large => 32,
		}
	}

	fn parse_large(cursor: &mut Cursor<'_>) -> Result<Self> {
		let code = cursor.read_code4()?;
		let sdna_nr = cursor.read_u32()?;
		let old = cursor.read_u64()?;

		let len = cursor.read_i64()?;
		if len < 0 {
			return Err(BlendError::NegativeBlockLength { len });
		}

		let nr = cursor.read_i64()?;
		if nr < 0 {
			return Err(BlendError::NegativeBlockCount { nr });
		}

		Ok(Self {
			code,
			sdna_nr,
			old,
			len: len as u64,
			nr: nr as u64,
		})
	}

	fn parse_legacy(cursor: &mut Cursor<'_>, pointer_size: usize) -> Result<Self> {
		let code = cursor.read_code4()?;
		let len = i64::from(cursor.read_i32()?);
		if len < 0 {
			return Err(BlendError::NegativeBlockLength { len });
		}

		let old = cursor.read_ptr(pointer_size)?;
		let sdna_nr = cursor.read_u32()?;
		let nr = i64::from(cursor.read_i32()?);
		if nr < 0 {
			return Err(BlendError::NegativeBlockCount { nr });
		}

		Ok(Self {
			code,
			sdna_nr,
			old,
			len: len as u64,
			nr: nr as u64,
		})
	}

	/// Return `true` when this is the terminal `ENDB` block.
	pub fn is_endb(&self) -> bool {
		self.code == *b"ENDB"
	}

	/// Return `true` when this block carries the embedded schema.
	pub fn is_dna(&self) -> bool {
		self.code == *b"DNA1"
	}
}

#[cfg(test)]
mod tests;
