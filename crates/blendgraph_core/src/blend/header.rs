use crate::blend::{BlendError, Result};

/// Byte endianness marker stored in blend headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
	/// Little-endian byte order (`v` marker).
	Little,
	/// Big-endian byte order (`V` marker).
	Big,
}

impl Endianness {
	/// Stable lowercase label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Little => "little",
			Self::Big => "big",
		}
	}
}

/// On-disk layout of chunk headers following the file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkLayout {
	/// `code len old[ptr] sdna nr` with 32-bit length and count.
	Legacy,
	/// `code sdna old[u64] len[i64] nr[i64]` used by Blender 5 files.
	Large,
}

impl ChunkLayout {
	/// Stable lowercase label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Legacy => "legacy",
			Self::Large => "large_bhead8",
		}
	}
}

/// Parsed blend file header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendHeader {
	/// Total file header size in bytes.
	pub header_size: usize,
	/// Container format version (`0` for legacy headers, `1` for v1 headers).
	pub format_version: u16,
	/// Blender version encoded as decimal digits (for example `500` or `279`).
	pub version: u16,
	/// Width of every pointer-typed field in this file.
	pub pointer_size: usize,
	/// File byte order.
	pub endianness: Endianness,
}

impl BlendHeader {
	/// Exact size of v1 headers (`BLENDER17-01v0500`).
	pub const V1_SIZE: usize = 17;
	/// Exact size of legacy headers (`BLENDER-v279` style).
	pub const LEGACY_SIZE: usize = 12;
	/// Synthetic format marker for legacy headers.
	pub const LEGACY_FORMAT_VERSION: u16 = 0;
	/// Modern v1 format marker.
	pub const V1_FORMAT_VERSION: u16 = 1;

	/// Parse a blend header from the beginning of `bytes`.
	pub fn parse(bytes: &[u8]) -> Result<Self> {
		let prefix = bytes.get(0..7).ok_or(BlendError::InvalidHeader)?;
		if prefix != b"BLENDER" {
			return Err(BlendError::InvalidHeader);
		}

		let kind = bytes.get(7).copied().ok_or(BlendError::InvalidHeader)?;
		if kind.is_ascii_digit() {
			return Self::parse_v1(bytes);
		}

		Self::parse_legacy(bytes)
	}

	/// Return the chunk header layout implied by this file header.
	pub fn chunk_layout(self) -> ChunkLayout {
		if self.format_version == Self::LEGACY_FORMAT_VERSION {
			ChunkLayout::Legacy
		} else {
			ChunkLayout::Large
		}
	}

	fn parse_v1(bytes: &[u8]) -> Result<Self> {
		let header = bytes.get(0..Self::V1_SIZE).ok_or(BlendError::InvalidHeader)?;

		let header_size = parse_digits(&header[7..9]).ok_or(BlendError::InvalidHeader)? as usize;
		if header_size != Self::V1_SIZE {
			return Err(BlendError::InvalidHeader);
		}
		if header[9] != b'-' {
			return Err(BlendError::InvalidHeader);
		}

		let format_version = parse_digits(&header[10..12]).ok_or(BlendError::InvalidHeader)?;
		if format_version != Self::V1_FORMAT_VERSION {
			return Err(BlendError::UnsupportedFormatVersion { version: format_version });
		}

		let endianness = parse_endianness_marker(header[12]).ok_or(BlendError::InvalidHeader)?;
		let version = parse_digits(&header[13..17]).ok_or(BlendError::InvalidHeader)?;

		Ok(Self {
			header_size,
			format_version,
			version,
			pointer_size: 8,
			endianness,
		})
	}

	fn parse_legacy(bytes: &[u8]) -> Result<Self> {
		let header = bytes.get(0..Self::LEGACY_SIZE).ok_or(BlendError::InvalidHeader)?;
		let pointer_size = match header[7] {
			b'_' => 4,
			b'-' => 8,
			_ => return Err(BlendError::InvalidHeader),
		};
		let endianness = parse_endianness_marker(header[8]).ok_or(BlendError::InvalidHeader)?;
		let version = parse_digits(&header[9..12]).ok_or(BlendError::InvalidHeader)?;

		Ok(Self {
			header_size: Self::LEGACY_SIZE,
			format_version: Self::LEGACY_FORMAT_VERSION,
			version,
			pointer_size,
			endianness,
		})
	}
}

fn parse_endianness_marker(byte: u8) -> Option<Endianness> {
	match byte {
		b'v' => Some(Endianness::Little),
		b'V' => Some(Endianness::Big),
		_ => None,
	}
}

fn parse_digits(bytes: &[u8]) -> Option<u16> {
	if bytes.is_empty() {
		return None;
	}

	let mut value = 0_u16;
	for byte in bytes {
		if !byte.is_ascii_digit() {
			return None;
		}
		value = value * 10 + u16::from(*byte - b'0');
	}
	Some(value)
}
