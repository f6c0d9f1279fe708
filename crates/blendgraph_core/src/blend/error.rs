use thiserror::Error;

/// Crate-local result type.
pub type Result<T> = std::result::Result<T, BlendError>;

/// Coarse classification of a [`BlendError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	/// Filesystem or stream IO failure.
	Io,
	/// Container-level damage: magic, chunk headers, block bounds.
	Format,
	/// Malformed or inconsistent embedded schema.
	Schema,
	/// No registered converter for a required structure.
	UnknownType,
	/// A configured decode budget was exhausted.
	Limit,
	/// Invalid caller input (CLI arguments, lookups by name).
	Usage,
}

/// Errors produced while scanning, parsing, and decoding `.blend` data.
#[derive(Debug, Error)]
pub enum BlendError {
	/// Filesystem or stream IO failure.
	#[error("io: {0}")]
	Io(#[from] std::io::Error),
	/// Unknown leading file magic.
	#[error("unsupported compression or not a .blend (magic={magic:?})")]
	UnknownMagic {
		/// First up-to-4 bytes of the stream.
		magic: [u8; 4],
	},
	/// Decompressed stream did not start with `BLENDER`.
	#[error("decompressed data does not start with BLENDER magic")]
	NotBlendAfterDecompress,
	/// Decompression output exceeded configured safety limit.
	#[error("decompressed output exceeded limit {limit} bytes")]
	DecompressedTooLarge {
		/// Maximum allowed output bytes.
		limit: usize,
	},
	/// Invalid or malformed file header.
	#[error("invalid header")]
	InvalidHeader,
	/// Unsupported container format version.
	#[error("unsupported file format version {version} (expected 0 or 1)")]
	UnsupportedFormatVersion {
		/// Parsed format version.
		version: u16,
	},
	/// Pointer width other than 4 or 8 bytes.
	#[error("unsupported pointer size {size}")]
	UnsupportedPointerSize {
		/// Requested pointer width.
		size: usize,
	},
	/// Not enough bytes remained for a requested read.
	#[error("unexpected eof at offset {at}, need {need} bytes, remaining {rem}")]
	UnexpectedEof {
		/// Byte offset where the read was attempted.
		at: usize,
		/// Requested bytes.
		need: usize,
		/// Bytes still available.
		rem: usize,
	},
	/// Chunk payload length was negative.
	#[error("negative block length {len}")]
	NegativeBlockLength {
		/// Parsed signed length.
		len: i64,
	},
	/// Chunk element count was negative.
	#[error("negative block count {nr}")]
	NegativeBlockCount {
		/// Parsed signed element count.
		nr: i64,
	},
	/// Chunk payload would exceed remaining file data.
	#[error("block length {len} at offset {at} exceeds remaining {rem}")]
	BlockLenOutOfRange {
		/// Chunk header file offset.
		at: usize,
		/// Declared payload length.
		len: u64,
		/// Remaining bytes after the chunk header.
		rem: usize,
	},
	/// Declared element count times structure size overruns the payload.
	#[error("block at 0x{address:x} declares {count} x {size} bytes but holds {len}")]
	BlockCountOverrun {
		/// Original address of the block.
		address: u64,
		/// Declared element count.
		count: u64,
		/// Structure size in bytes.
		size: usize,
		/// Actual payload length.
		len: usize,
	},
	/// No `DNA1` chunk was found.
	#[error("DNA1 block not found")]
	DnaNotFound,
	/// Unexpected schema section tag.
	#[error("DNA tag mismatch at {at}: expected {expected:?}, got {got:?}")]
	DnaBadTag {
		/// Expected section tag.
		expected: [u8; 4],
		/// Actual section tag.
		got: [u8; 4],
		/// Cursor offset of the tag read.
		at: usize,
	},
	/// Out-of-range index inside schema tables.
	#[error("DNA index out of range for {kind}: idx={idx}, max={max}")]
	DnaIndexOutOfRange {
		/// Logical index kind being validated.
		kind: &'static str,
		/// Offending index value.
		idx: u32,
		/// Maximum valid index.
		max: u32,
	},
	/// Duplicate type->structure mapping in the `STRC` section.
	#[error("DNA duplicate struct type index {type_idx}: first={first}, second={second}")]
	DnaDuplicateStructType {
		/// Duplicate type index.
		type_idx: u16,
		/// First structure index observed.
		first: u32,
		/// Second structure index observed.
		second: u32,
	},
	/// Sum of field sizes differs from the declared structure size.
	#[error("DNA struct {name} declares {declared} bytes but fields sum to {computed}")]
	DnaStructSizeMismatch {
		/// Structure name.
		name: String,
		/// Size from the `TLEN` table.
		declared: usize,
		/// Running sum of field sizes.
		computed: usize,
	},
	/// Requested schema structure name was not found.
	#[error("DNA struct not found: {name}")]
	DnaStructNotFound {
		/// Requested structure name.
		name: String,
	},
	/// Block references a structure index the schema does not have.
	#[error("missing SDNA struct index {sdna_nr}")]
	MissingSdna {
		/// Missing structure index.
		sdna_nr: u32,
	},
	/// Requested block code was not found.
	#[error("block not found: {code:?}")]
	BlockNotFound {
		/// Requested 4-byte block code.
		code: [u8; 4],
	},
	/// No block stores an instance of the requested root structure.
	#[error("no block holds a {name} record")]
	RootBlockNotFound {
		/// Structure name of the requested root.
		name: String,
	},
	/// CLI block code argument was invalid.
	#[error("invalid block code: {code}")]
	InvalidBlockCode {
		/// User-provided code string.
		code: String,
	},
	/// No converter is registered for a structure that must be decoded.
	#[error("no converter registered for {name}")]
	UnknownType {
		/// Structure name or tag label.
		name: String,
	},
	/// A field was read with a shape its on-disk declaration does not have.
	#[error("field {field} has type {declared}, cannot read it as {requested}")]
	FieldTypeMismatch {
		/// Field name.
		field: String,
		/// Declared on-disk type.
		declared: String,
		/// Requested shape.
		requested: &'static str,
	},
	/// Decoded object was not of the type the caller expected.
	#[error("expected object of type {expected}, found {got}")]
	ObjectTypeMismatch {
		/// Expected structure name.
		expected: &'static str,
		/// Structure name the object was decoded from.
		got: String,
	},
	/// Nested structure depth exceeded configured limit.
	#[error("decode depth exceeded (max={max_depth})")]
	DecodeDepthExceeded {
		/// Configured depth ceiling.
		max_depth: u32,
	},
	/// Requested array length exceeded configured limit.
	#[error("decode array too large: count={count}, max={max}")]
	DecodeArrayTooLarge {
		/// Requested array length.
		count: usize,
		/// Maximum permitted array length.
		max: usize,
	},
	/// Number of materialized objects exceeded configured budget.
	#[error("decode object budget exceeded (max={max_objects})")]
	ObjectBudgetExceeded {
		/// Configured object ceiling.
		max_objects: usize,
	},
	/// Block payload was too short for requested decode size.
	#[error("decode payload too small: need={need}, have={have}")]
	DecodePayloadTooSmall {
		/// Required number of bytes.
		need: usize,
		/// Available bytes.
		have: usize,
	},
	/// Strict layout mode detected trailing undecoded bytes.
	#[error("decode layout mismatch in {type_name}: leftover={leftover}")]
	DecodeLayoutMismatch {
		/// Structure name being decoded.
		type_name: String,
		/// Unconsumed bytes.
		leftover: usize,
	},
	/// Pointer value could not be parsed from user input.
	#[error("invalid pointer literal: {value}")]
	InvalidPointerLiteral {
		/// User-provided value.
		value: String,
	},
	/// Fatal error annotated with the chunk, structure, and field in progress.
	#[error("in block {code} ({structure}.{field}): {source}")]
	Decode {
		/// Printable chunk tag.
		code: String,
		/// Structure being decoded.
		structure: String,
		/// Field being read.
		field: String,
		/// Underlying failure.
		#[source]
		source: Box<BlendError>,
	},
}

impl BlendError {
	/// Classify this error, looking through [`BlendError::Decode`] context.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Io(_) => ErrorKind::Io,
			Self::UnknownMagic { .. }
			| Self::NotBlendAfterDecompress
			| Self::InvalidHeader
			| Self::UnsupportedFormatVersion { .. }
			| Self::UnsupportedPointerSize { .. }
			| Self::UnexpectedEof { .. }
			| Self::NegativeBlockLength { .. }
			| Self::NegativeBlockCount { .. }
			| Self::BlockLenOutOfRange { .. }
			| Self::BlockCountOverrun { .. }
			| Self::DnaNotFound
			| Self::DecodePayloadTooSmall { .. }
			| Self::RootBlockNotFound { .. } => ErrorKind::Format,
			Self::DnaBadTag { .. }
			| Self::DnaIndexOutOfRange { .. }
			| Self::DnaDuplicateStructType { .. }
			| Self::DnaStructSizeMismatch { .. }
			| Self::MissingSdna { .. }
			| Self::FieldTypeMismatch { .. }
			| Self::DecodeLayoutMismatch { .. } => ErrorKind::Schema,
			Self::UnknownType { .. } | Self::ObjectTypeMismatch { .. } => ErrorKind::UnknownType,
			Self::DecompressedTooLarge { .. } | Self::DecodeDepthExceeded { .. } | Self::DecodeArrayTooLarge { .. } | Self::ObjectBudgetExceeded { .. } => {
				ErrorKind::Limit
			}
			Self::DnaStructNotFound { .. } | Self::BlockNotFound { .. } | Self::InvalidBlockCode { .. } | Self::InvalidPointerLiteral { .. } => ErrorKind::Usage,
			Self::Decode { source, .. } => source.kind(),
		}
	}

	/// Attach chunk/structure/field context unless an inner frame already did.
	pub(crate) fn in_field(self, code: [u8; 4], structure: &str, field: &str) -> Self {
		if matches!(self, Self::Decode { .. }) {
			return self;
		}
		Self::Decode {
			code: code_label(code),
			structure: structure.to_owned(),
			field: field.to_owned(),
			source: Box::new(self),
		}
	}
}

/// Render a chunk tag as printable text, dropping trailing NUL padding.
pub fn code_label(code: [u8; 4]) -> String {
	let mut out = String::new();
	for byte in code {
		if byte == 0 {
			continue;
		}
		if byte.is_ascii_graphic() || byte == b' ' {
			out.push(char::from(byte));
		} else {
			out.push('.');
		}
	}
	if out.is_empty() { "....".to_owned() } else { out }
}
