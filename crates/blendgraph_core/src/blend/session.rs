use std::collections::VecDeque;

use tracing::{debug, trace, warn};

use crate::blend::pointer::PointerCache;
use crate::blend::{
	Address, BlendError, BlendFile, Converter, Endianness, ObjectGraph, ObjectId, RawBlock, Registry, Result, Schema, StructReader, StructureDescriptor, code_label,
};

/// Budgets applied while decoding a graph.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
	/// Maximum nesting depth of inline structures and pointed-to element runs.
	pub max_depth: u32,
	/// Maximum number of objects materialized by one session.
	pub max_objects: usize,
	/// Maximum element count of one array read.
	pub max_array_elems: usize,
}

impl Default for DecodeOptions {
	fn default() -> Self {
		Self {
			max_depth: 16,
			max_objects: 1 << 20,
			max_array_elems: 1 << 24,
		}
	}
}

/// Counters accumulated by a decode session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DecodeStats {
	/// Fields found in the schema and read.
	pub fields_read: usize,
	/// Fields requested by a converter but absent from the schema.
	pub fields_missing: usize,
	/// Non-null pointers that yielded a handle.
	pub pointers_resolved: usize,
	/// Pointer resolutions served by an existing cache entry.
	pub cache_hits: usize,
	/// Objects materialized.
	pub cached_objects: usize,
	/// Non-null pointers not covered by any block.
	pub dangling_pointers: usize,
	/// Pointers skipped because no converter matched their target.
	pub unknown_types: usize,
}

struct Job<N> {
	id: ObjectId,
	block: RawBlock,
	structure: u32,
	base: usize,
	limit: usize,
	converter: Converter<N>,
}

/// One decode pass over a container: schema, registry, pointer cache, and worklist.
///
/// Resolving a pointer allocates and caches the target immediately and queues
/// its payload; the queue is drained iteratively after the requesting record
/// finishes, so reference chains of any length never grow the call stack.
pub struct Session<'a, N> {
	file: &'a BlendFile,
	schema: &'a Schema,
	registry: &'a Registry<N>,
	options: DecodeOptions,
	cache: PointerCache<N>,
	pending: VecDeque<Job<N>>,
	pub(crate) stats: DecodeStats,
}

impl<'a, N> Session<'a, N> {
	/// Start a session over `file` dispatching through `registry`.
	pub fn new(file: &'a BlendFile, registry: &'a Registry<N>) -> Self {
		Self {
			file,
			schema: file.schema(),
			registry,
			options: DecodeOptions::default(),
			cache: PointerCache::default(),
			pending: VecDeque::new(),
			stats: DecodeStats::default(),
		}
	}

	/// Replace the decode budgets.
	pub fn with_options(mut self, options: DecodeOptions) -> Self {
		self.options = options;
		self
	}

	/// Active decode budgets.
	pub fn options(&self) -> &DecodeOptions {
		&self.options
	}

	/// Schema of the underlying file.
	pub fn schema(&self) -> &'a Schema {
		self.schema
	}

	/// Underlying file.
	pub fn file(&self) -> &'a BlendFile {
		self.file
	}

	pub(crate) fn order(&self) -> Endianness {
		self.file.header().endianness
	}

	/// Snapshot of the counters so far.
	pub fn stats(&self) -> DecodeStats {
		DecodeStats {
			cached_objects: self.cache.len(),
			..self.stats
		}
	}

	/// Decode the first block whose elements use structure `name` as the root object.
	///
	/// A missing structure, block, or converter is fatal here, unlike pointer targets.
	pub fn decode_root(&mut self, name: &str) -> Result<ObjectId> {
		let index = self.schema.structure_index(name).ok_or_else(|| BlendError::DnaStructNotFound { name: name.to_owned() })?;
		let converter = self.registry.lookup(name).ok_or_else(|| BlendError::UnknownType { name: name.to_owned() })?;
		let block = *self
			.file
			.directory()
			.first_with_sdna(index)
			.ok_or_else(|| BlendError::RootBlockNotFound { name: name.to_owned() })?;

		if let Some(id) = self.cache.get(block.address) {
			return Ok(id);
		}

		let structure = self.structure_at(index)?;
		debug!(root = name, address = %block.address, code = %code_label(block.code), "decoding root");
		let limit = element_limit(&block, structure.size);
		let id = self.schedule(block, index, structure, 0, limit, converter)?;
		self.drain()?;
		Ok(id)
	}

	/// Resolve `address` to an object and decode everything it reaches.
	pub fn resolve(&mut self, address: Address) -> Result<Option<ObjectId>> {
		let id = self.enqueue(address)?;
		self.drain()?;
		Ok(id)
	}

	/// Resolve `address` as a run of elements chosen by runtime `tag`.
	pub fn resolve_tagged(&mut self, address: Address, tag: i32) -> Result<Option<ObjectId>> {
		let id = self.enqueue_tagged(address, tag)?;
		self.drain()?;
		Ok(id)
	}

	/// Consume the session, yielding the object graph and final counters.
	pub fn finish(self) -> (ObjectGraph<N>, DecodeStats) {
		let stats = self.stats();
		(self.cache.into_graph(), stats)
	}

	/// Find the block covering `address`, recording a dangling pointer on a miss.
	pub(crate) fn locate(&mut self, address: Address) -> Option<RawBlock> {
		if address.is_null() {
			return None;
		}
		match self.file.directory().find(address) {
			Some(block) => Some(*block),
			None => {
				self.stats.dangling_pointers += 1;
				warn!(address = %address, "dangling pointer: no block covers address");
				None
			}
		}
	}

	/// Resolve without draining: cache probe, block lookup, dispatch, allocation.
	pub(crate) fn enqueue(&mut self, address: Address) -> Result<Option<ObjectId>> {
		if address.is_null() {
			return Ok(None);
		}
		if let Some(id) = self.hit(address) {
			return Ok(Some(id));
		}

		let Some(block) = self.locate(address) else {
			return Ok(None);
		};
		let structure = self.structure(block.sdna_nr)?;
		let Some(converter) = self.registry.lookup_structure(structure) else {
			self.stats.unknown_types += 1;
			warn!(address = %address, structure = %structure.name, "no converter registered; pointer skipped");
			return Ok(None);
		};

		check_count(&block, structure.size)?;
		let base = element_base(&block, address, structure.size);
		let canonical = Address(block.address.0 + base as u64);
		if let Some(id) = self.hit(canonical) {
			return Ok(Some(id));
		}

		let limit = element_limit(&block, structure.size);
		let id = self.schedule(block, block.sdna_nr, structure, base, limit, converter)?;
		self.stats.pointers_resolved += 1;
		Ok(Some(id))
	}

	/// Resolve a pointer whose element structure is chosen by a registered tag.
	pub(crate) fn enqueue_tagged(&mut self, address: Address, tag: i32) -> Result<Option<ObjectId>> {
		if address.is_null() {
			return Ok(None);
		}
		if let Some(id) = self.hit(address) {
			return Ok(Some(id));
		}

		let Some(entry) = self.registry.lookup_tag(tag) else {
			self.stats.unknown_types += 1;
			warn!(address = %address, tag, "no converter registered for tag; pointer skipped");
			return Ok(None);
		};
		let Some(index) = self.schema.structure_index(entry.structure) else {
			self.stats.unknown_types += 1;
			warn!(address = %address, tag, structure = entry.structure, "tagged structure missing from schema; pointer skipped");
			return Ok(None);
		};
		let Some(block) = self.locate(address) else {
			return Ok(None);
		};

		let structure = self.structure_at(index)?;
		let limit = if block.sdna_nr == index {
			check_count(&block, structure.size)?;
			element_limit(&block, structure.size)
		} else {
			block.len
		};
		let base = (address.0 - block.address.0) as usize;
		let id = self.schedule(block, index, structure, base, limit, entry.converter)?;
		self.stats.pointers_resolved += 1;
		Ok(Some(id))
	}

	fn hit(&mut self, address: Address) -> Option<ObjectId> {
		let id = self.cache.get(address)?;
		self.stats.cache_hits += 1;
		self.stats.pointers_resolved += 1;
		trace!(address = %address, id = id.index(), "pointer cache hit");
		Some(id)
	}

	/// Layout of a block's `sdna_nr`; indices past the file's own structures are missing.
	pub(crate) fn structure(&self, sdna_nr: u32) -> Result<&'a StructureDescriptor> {
		self.schema.structure_by_sdna(sdna_nr).ok_or(BlendError::MissingSdna { sdna_nr })
	}

	fn structure_at(&self, index: u32) -> Result<&'a StructureDescriptor> {
		self.schema.structure_at(index).ok_or(BlendError::MissingSdna { sdna_nr: index })
	}

	fn schedule(&mut self, block: RawBlock, index: u32, structure: &StructureDescriptor, base: usize, limit: usize, converter: Converter<N>) -> Result<ObjectId> {
		if self.cache.len() >= self.options.max_objects {
			return Err(BlendError::ObjectBudgetExceeded {
				max_objects: self.options.max_objects,
			});
		}

		let address = Address(block.address.0 + base as u64);
		let id = self.cache.insert(address, &structure.name, (converter.create)());
		trace!(address = %address, structure = %structure.name, id = id.index(), "allocated object");

		self.pending.push_back(Job {
			id,
			block,
			structure: index,
			base,
			limit: limit.max(base.saturating_add(structure.size)).min(block.len),
			converter,
		});
		Ok(id)
	}

	fn drain(&mut self) -> Result<()> {
		while let Some(job) = self.pending.pop_front() {
			self.run(job)?;
		}
		Ok(())
	}

	fn run(&mut self, job: Job<N>) -> Result<()> {
		let Some(mut node) = self.cache.take(job.id) else {
			return Ok(());
		};
		let structure = self.structure_at(job.structure)?;
		let payload = job.block.payload(self.file.bytes());

		let mut reader = StructReader::new(self, structure, payload, job.base, job.limit, job.block.code, 0);
		let result = (job.converter.convert)(&mut node, &mut reader);
		self.cache.restore(job.id, node);
		result.map_err(|err| err.in_field(job.block.code, &structure.name, "(record)"))
	}
}

/// Enforce `count * size <= len` for a block decoded as `size`-byte elements.
pub(crate) fn check_count(block: &RawBlock, size: usize) -> Result<()> {
	let need = block.count.checked_mul(size as u64);
	if need.is_none_or(|need| need > block.len as u64) {
		return Err(BlendError::BlockCountOverrun {
			address: block.address.0,
			count: block.count,
			size,
			len: block.len,
		});
	}
	Ok(())
}

/// Payload offset of the element containing `address`.
fn element_base(block: &RawBlock, address: Address, size: usize) -> usize {
	let offset = (address.0 - block.address.0) as usize;
	if size == 0 { 0 } else { offset - offset % size }
}

/// End of the element run declared by the block header.
fn element_limit(block: &RawBlock, size: usize) -> usize {
	usize::try_from(block.count).map_or(block.len, |count| count.saturating_mul(size).min(block.len))
}

#[cfg(test)]
mod tests;
