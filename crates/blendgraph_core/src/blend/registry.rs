use std::collections::HashMap;

use crate::blend::{BlendError, Result, StructReader, StructureDescriptor};

/// Decodes one schema record into `Self` through name-based field reads.
pub trait Convert<N>: Default {
	/// Fill `self` from the record under `reader`.
	fn convert(&mut self, reader: &mut StructReader<'_, '_, N>) -> Result<()>;
}

impl<N, T: Convert<N>> Convert<N> for Box<T> {
	fn convert(&mut self, reader: &mut StructReader<'_, '_, N>) -> Result<()> {
		(**self).convert(reader)
	}
}

/// Typed view of one variant of a caller-chosen node enum `N`.
pub trait Member<N>: Sized {
	/// Wrap a value into the node enum.
	fn wrap(self) -> N;
	/// Borrow the value when `node` holds this variant.
	fn peek(node: &N) -> Option<&Self>;
	/// Mutably borrow the value when `node` holds this variant.
	fn peek_mut(node: &mut N) -> Option<&mut Self>;
}

/// Factory and decode function pair for one registered type.
pub struct Converter<N> {
	/// Allocate a default node of the registered type.
	pub create: fn() -> N,
	/// Decode a record into a node allocated by `create`.
	pub convert: fn(&mut N, &mut StructReader<'_, '_, N>) -> Result<()>,
}

impl<N> Clone for Converter<N> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<N> Copy for Converter<N> {}

impl<N> std::fmt::Debug for Converter<N> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Converter").finish_non_exhaustive()
	}
}

/// Tagged entry: element structure plus a converter that decodes a whole element run.
#[derive(Debug)]
pub struct TagEntry<N> {
	/// Schema structure name of each element.
	pub structure: &'static str,
	/// Converter that fills a node from every element of the target block.
	pub converter: Converter<N>,
}

impl<N> Clone for TagEntry<N> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<N> Copy for TagEntry<N> {}

/// Converter for structures with no name registration whose layout passes `accepts`.
///
/// Lets a family of records sharing an embedded header (modifiers, constraints)
/// decode that header even when the concrete structure is unknown.
#[derive(Debug)]
pub struct Fallback<N> {
	/// Layout test run against the unregistered structure.
	pub accepts: fn(&StructureDescriptor) -> bool,
	/// Converter used when `accepts` holds.
	pub converter: Converter<N>,
}

impl<N> Clone for Fallback<N> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<N> Copy for Fallback<N> {}

/// Explicit name and tag dispatch tables passed into a decode session.
#[derive(Debug)]
pub struct Registry<N> {
	by_name: HashMap<&'static str, Converter<N>>,
	by_tag: HashMap<i32, TagEntry<N>>,
	fallbacks: Vec<Fallback<N>>,
}

impl<N> Default for Registry<N> {
	fn default() -> Self {
		Self::new()
	}
}

fn create_node<N, T: Convert<N> + Member<N>>() -> N {
	T::default().wrap()
}

fn convert_node<N, T: Convert<N> + Member<N>>(node: &mut N, reader: &mut StructReader<'_, '_, N>) -> Result<()> {
	match T::peek_mut(node) {
		Some(value) => value.convert(reader),
		None => Err(BlendError::ObjectTypeMismatch {
			expected: std::any::type_name::<T>(),
			got: reader.structure_name().to_owned(),
		}),
	}
}

fn create_elements<N, T>() -> N
where
	Vec<T>: Member<N>,
{
	Vec::<T>::new().wrap()
}

fn convert_elements<N, T>(node: &mut N, reader: &mut StructReader<'_, '_, N>) -> Result<()>
where
	T: Convert<N>,
	Vec<T>: Member<N>,
{
	let elements = reader.read_elements::<T>()?;
	match Vec::<T>::peek_mut(node) {
		Some(value) => {
			*value = elements;
			Ok(())
		}
		None => Err(BlendError::ObjectTypeMismatch {
			expected: std::any::type_name::<Vec<T>>(),
			got: reader.structure_name().to_owned(),
		}),
	}
}

impl<N> Registry<N> {
	/// Create an empty registry.
	pub fn new() -> Self {
		Self {
			by_name: HashMap::new(),
			by_tag: HashMap::new(),
			fallbacks: Vec::new(),
		}
	}

	/// Register `T` as the decoder for schema structure `name`. A later registration replaces an earlier one.
	pub fn register<T: Convert<N> + Member<N>>(&mut self, name: &'static str) -> &mut Self {
		self.by_name.insert(
			name,
			Converter {
				create: create_node::<N, T>,
				convert: convert_node::<N, T>,
			},
		);
		self
	}

	/// Register a raw converter pair for `name`.
	pub fn register_converter(&mut self, name: &'static str, converter: Converter<N>) -> &mut Self {
		self.by_name.insert(name, converter);
		self
	}

	/// Map runtime tag `tag` to a run of `structure` elements decoded as `Vec<T>`.
	pub fn register_tag<T>(&mut self, tag: i32, structure: &'static str) -> &mut Self
	where
		T: Convert<N>,
		Vec<T>: Member<N>,
	{
		self.by_tag.insert(
			tag,
			TagEntry {
				structure,
				converter: Converter {
					create: create_elements::<N, T>,
					convert: convert_elements::<N, T>,
				},
			},
		);
		self
	}

	/// Register `T` for every unregistered structure whose layout passes `accepts`.
	///
	/// Fallbacks are tried in registration order after the name lookup misses.
	pub fn register_fallback<T: Convert<N> + Member<N>>(&mut self, accepts: fn(&StructureDescriptor) -> bool) -> &mut Self {
		self.fallbacks.push(Fallback {
			accepts,
			converter: Converter {
				create: create_node::<N, T>,
				convert: convert_node::<N, T>,
			},
		});
		self
	}

	/// Converter registered for structure `name`.
	pub fn lookup(&self, name: &str) -> Option<Converter<N>> {
		self.by_name.get(name).copied()
	}

	/// Converter for `structure`: its name registration, else the first accepting fallback.
	pub fn lookup_structure(&self, structure: &StructureDescriptor) -> Option<Converter<N>> {
		self.lookup(&structure.name).or_else(|| {
			self.fallbacks
				.iter()
				.find(|fallback| (fallback.accepts)(structure))
				.map(|fallback| fallback.converter)
		})
	}

	/// Entry registered for runtime tag `tag`.
	pub fn lookup_tag(&self, tag: i32) -> Option<TagEntry<N>> {
		self.by_tag.get(&tag).copied()
	}

	/// Number of name registrations.
	pub fn len(&self) -> usize {
		self.by_name.len()
	}

	/// Return whether nothing is registered by name.
	pub fn is_empty(&self) -> bool {
		self.by_name.is_empty()
	}
}
