use crate::blend::bytes::Cursor;
use crate::blend::{Address, BHead, BlendError, BlendHeader, Result};

/// One chunk borrowed from the container bytes.
#[derive(Debug, Clone, Copy)]
pub struct Block<'a> {
	/// Parsed chunk header.
	pub head: BHead,
	/// Payload bytes following the header.
	pub payload: &'a [u8],
	/// File offset of the chunk header.
	pub file_offset: usize,
}

/// Forward iterator over the chunks of a container.
pub struct BlockIter<'a> {
	cursor: Cursor<'a>,
	header: BlendHeader,
	offset_base: usize,
	done: bool,
}

impl<'a> BlockIter<'a> {
	/// Start iterating chunk headers at `offset` (usually right after the file header).
	pub fn new(bytes: &'a [u8], offset: usize, header: BlendHeader) -> Self {
		let slice = bytes.get(offset..).unwrap_or(&[]);
		Self {
			cursor: Cursor::new(slice, header.endianness),
			header,
			offset_base: offset,
			done: false,
		}
	}
}

impl<'a> Iterator for BlockIter<'a> {
	type Item = Result<Block<'a>>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.done {
			return None;
		}

		if self.cursor.remaining() == 0 {
			self.done = true;
			return None;
		}

		let file_offset = self.offset_base + self.cursor.pos();
		let head = match BHead::parse(&mut self.cursor, self.header) {
			Ok(value) => value,
			Err(err) => {
				self.done = true;
				return Some(Err(err));
			}
		};

		let rem = self.cursor.remaining();
		let payload_len = match usize::try_from(head.len) {
			Ok(value) if value <= rem => value,
			_ => {
				self.done = true;
				return Some(Err(BlendError::BlockLenOutOfRange { at: file_offset, len: head.len, rem }));
			}
		};

		let payload = match self.cursor.read_exact(payload_len) {
			Ok(value) => value,
			Err(err) => {
				self.done = true;
				return Some(Err(err));
			}
		};

		if head.is_endb() {
			self.done = true;
		}

		Some(Ok(Block { head, payload, file_offset }))
	}
}

/// Directory entry for one scanned chunk; payload bytes stay in the container buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawBlock {
	/// Four-byte block code.
	pub code: [u8; 4],
	/// Schema structure index for payload elements.
	pub sdna_nr: u32,
	/// Original address of the payload.
	pub address: Address,
	/// Payload length in bytes.
	pub len: usize,
	/// Declared element count.
	pub count: u64,
	/// Absolute offset of the payload within the container bytes.
	pub payload_offset: usize,
	/// Absolute offset of the chunk header.
	pub file_offset: usize,
}

impl RawBlock {
	fn from_block(block: &Block<'_>, head_len: usize) -> Self {
		Self {
			code: block.head.code,
			sdna_nr: block.head.sdna_nr,
			address: Address(block.head.old),
			len: block.payload.len(),
			count: block.head.nr,
			payload_offset: block.file_offset + head_len,
			file_offset: block.file_offset,
		}
	}

	/// Exclusive end of the address range covered by the payload.
	pub fn end_address(&self) -> u64 {
		self.address.0.saturating_add(self.len as u64)
	}

	/// Return whether `address` falls inside this block's payload range.
	pub fn contains(&self, address: Address) -> bool {
		!self.address.is_null() && address.0 >= self.address.0 && address.0 < self.end_address()
	}

	/// Borrow this block's payload from the container bytes.
	pub fn payload<'a>(&self, bytes: &'a [u8]) -> &'a [u8] {
		bytes.get(self.payload_offset..self.payload_offset + self.len).unwrap_or(&[])
	}
}

/// Address-sorted directory of every ordinary chunk in a container.
#[derive(Debug, Default)]
pub struct BlockDirectory {
	blocks: Vec<RawBlock>,
	by_address: Vec<usize>,
	starts: Vec<u64>,
}

impl BlockDirectory {
	/// Build a directory from blocks in file order.
	pub fn new(blocks: Vec<RawBlock>) -> Self {
		let mut by_address: Vec<usize> = (0..blocks.len()).filter(|idx| !blocks[*idx].address.is_null()).collect();
		by_address.sort_by_key(|idx| blocks[*idx].address);
		let starts = by_address.iter().map(|idx| blocks[*idx].address.0).collect();
		Self { blocks, by_address, starts }
	}

	/// Blocks in file order.
	pub fn blocks(&self) -> &[RawBlock] {
		&self.blocks
	}

	/// Blocks with a non-null address, sorted by address.
	pub fn by_address(&self) -> impl Iterator<Item = &RawBlock> + '_ {
		self.by_address.iter().map(|idx| &self.blocks[*idx])
	}

	/// Number of directory entries.
	pub fn len(&self) -> usize {
		self.blocks.len()
	}

	/// Return whether the directory is empty.
	pub fn is_empty(&self) -> bool {
		self.blocks.is_empty()
	}

	/// Find the block whose payload range contains `address`.
	pub fn find(&self, address: Address) -> Option<&RawBlock> {
		if address.is_null() {
			return None;
		}

		let idx = self.starts.partition_point(|start| *start <= address.0);
		if idx == 0 {
			return None;
		}

		let block = &self.blocks[self.by_address[idx - 1]];
		block.contains(address).then_some(block)
	}

	/// First block in file order with the given code.
	pub fn first_with_code(&self, code: [u8; 4]) -> Option<&RawBlock> {
		self.blocks.iter().find(|block| block.code == code)
	}

	/// First block in file order whose elements use schema structure `sdna_nr`.
	pub fn first_with_sdna(&self, sdna_nr: u32) -> Option<&RawBlock> {
		self.blocks.iter().find(|block| block.sdna_nr == sdna_nr)
	}
}

/// Result of one forward pass over the container.
#[derive(Debug)]
pub struct ContainerScan {
	/// Ordinary and unknown chunks, in file order.
	pub directory: BlockDirectory,
	/// The schema chunk, routed aside from the directory.
	pub dna: Option<RawBlock>,
	/// Whether the `ENDB` sentinel was reached.
	pub saw_endb: bool,
}

/// Walk the chunk sequence after the file header and build the block directory.
pub fn scan_container(bytes: &[u8], header: BlendHeader) -> Result<ContainerScan> {
	let mut blocks = Vec::new();
	let mut dna = None;
	let mut saw_endb = false;
	let head_len = BHead::encoded_size(header);

	for block in BlockIter::new(bytes, header.header_size, header) {
		let block = block?;
		let raw = RawBlock::from_block(&block, head_len);

		if block.head.is_endb() {
			saw_endb = true;
			break;
		}
		if block.head.is_dna() {
			dna = Some(raw);
			continue;
		}
		blocks.push(raw);
	}

	Ok(ContainerScan {
		directory: BlockDirectory::new(blocks),
		dna,
		saw_endb,
	})
}
