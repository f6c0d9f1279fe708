use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::blend::block::scan_container;
use crate::blend::compression::decode_bytes;
use crate::blend::{BlendError, BlendHeader, BlockDirectory, BlockIter, Compression, RawBlock, Result, Schema, code_label};

/// Opened container: decoded bytes, header, block directory, and parsed schema.
pub struct BlendFile {
	/// Parsed file header.
	pub header: BlendHeader,
	/// Compression envelope detected for the source bytes.
	pub compression: Compression,
	bytes: Vec<u8>,
	directory: BlockDirectory,
	dna: RawBlock,
	schema: Schema,
	saw_endb: bool,
}

impl BlendFile {
	/// Read, decompress, scan, and parse a container from disk.
	pub fn open(path: impl AsRef<Path>) -> Result<Self> {
		let raw = fs::read(path)?;
		Self::from_bytes(raw)
	}

	/// Decompress if needed, then scan chunks and parse the schema.
	pub fn from_bytes(raw: Vec<u8>) -> Result<Self> {
		let (compression, bytes) = decode_bytes(raw)?;
		let header = BlendHeader::parse(&bytes)?;
		if header.header_size > bytes.len() {
			return Err(BlendError::InvalidHeader);
		}

		let scan = scan_container(&bytes, header)?;
		let dna = scan.dna.ok_or(BlendError::DnaNotFound)?;
		let schema = Schema::parse(dna.payload(&bytes), header.endianness, header.pointer_size)?;
		debug!(
			version = header.version,
			pointer_size = header.pointer_size,
			endianness = header.endianness.as_str(),
			blocks = scan.directory.len(),
			structures = schema.file_structure_count(),
			saw_endb = scan.saw_endb,
			"scanned container"
		);

		Ok(Self {
			header,
			compression,
			bytes,
			directory: scan.directory,
			dna,
			schema,
			saw_endb: scan.saw_endb,
		})
	}

	/// Parsed file header.
	pub fn header(&self) -> BlendHeader {
		self.header
	}

	/// Decoded bytes backing this file.
	pub fn bytes(&self) -> &[u8] {
		&self.bytes
	}

	/// Ordinary and unknown blocks, sorted by address for lookup.
	pub fn directory(&self) -> &BlockDirectory {
		&self.directory
	}

	/// Embedded schema.
	pub fn schema(&self) -> &Schema {
		&self.schema
	}

	/// Directory entry of the schema chunk.
	pub fn dna_block(&self) -> &RawBlock {
		&self.dna
	}

	/// Whether the chunk stream ended with `ENDB`.
	pub fn saw_endb(&self) -> bool {
		self.saw_endb
	}

	/// Borrow a block's payload.
	pub fn payload(&self, block: &RawBlock) -> &[u8] {
		block.payload(&self.bytes)
	}

	/// Iterate raw chunks in file order, including `DNA1` and `ENDB`.
	pub fn blocks(&self) -> BlockIter<'_> {
		BlockIter::new(&self.bytes, self.header.header_size, self.header)
	}

	/// First directory block with `code`.
	pub fn find_first_block_by_code(&self, code: [u8; 4]) -> Result<&RawBlock> {
		self.directory.first_with_code(code).ok_or(BlendError::BlockNotFound { code })
	}

	/// Block distribution statistics for reporting.
	pub fn block_stats(&self) -> BlockStats {
		let mut codes = BTreeMap::new();
		let mut unknown_sdna = 0;
		for block in self.directory.blocks() {
			*codes.entry(code_label(block.code)).or_insert(0) += 1;
			if self.schema.structure_by_sdna(block.sdna_nr).is_none() {
				unknown_sdna += 1;
			}
		}

		BlockStats {
			block_count: self.directory.len(),
			has_endb: self.saw_endb,
			unknown_sdna,
			codes,
		}
	}
}

/// Aggregate block-level counts over the directory.
#[derive(Debug, Clone)]
pub struct BlockStats {
	/// Number of directory blocks (excluding `DNA1` and `ENDB`).
	pub block_count: usize,
	/// Whether an `ENDB` terminator was seen.
	pub has_endb: bool,
	/// Blocks whose schema index is out of range.
	pub unknown_sdna: usize,
	/// Frequency table by printable block code.
	pub codes: BTreeMap<String, usize>,
}

#[cfg(test)]
mod tests;
