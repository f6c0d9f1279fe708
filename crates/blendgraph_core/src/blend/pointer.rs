use std::collections::HashMap;
use std::fmt;

use crate::blend::{BlendError, Member, Result};

/// Original-process address stored in pointer fields and chunk headers.
///
/// Only ever compared and range-searched; never dereferenced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub u64);

impl Address {
	/// The canonical null address.
	pub const NULL: Self = Self(0);

	/// Return whether this is the null address.
	pub fn is_null(self) -> bool {
		self.0 == 0
	}

	/// Parse `0x`-prefixed hex or decimal text.
	pub fn parse(value: &str) -> Result<Self> {
		let trimmed = value.trim();
		let parsed = if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
			u64::from_str_radix(hex, 16)
		} else {
			trimmed.parse::<u64>()
		};
		parsed.map(Self).map_err(|_| BlendError::InvalidPointerLiteral { value: value.to_owned() })
	}
}

impl fmt::Display for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{:x}", self.0)
	}
}

/// Handle to one decoded object inside an [`ObjectGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u32);

impl ObjectId {
	/// Position of the object in allocation order.
	pub fn index(self) -> usize {
		self.0 as usize
	}
}

#[derive(Debug)]
pub(crate) struct Slot<N> {
	pub address: Address,
	pub structure: Box<str>,
	pub node: Option<N>,
}

/// Address-keyed arena of decoded objects.
///
/// A slot is inserted before its payload is decoded; its node is taken out
/// while the decoder runs, so references back into an object under
/// construction observe the handle but never the partial value.
#[derive(Debug)]
pub(crate) struct PointerCache<N> {
	pub slots: Vec<Slot<N>>,
	by_address: HashMap<Address, ObjectId>,
}

impl<N> Default for PointerCache<N> {
	fn default() -> Self {
		Self {
			slots: Vec::new(),
			by_address: HashMap::new(),
		}
	}
}

impl<N> PointerCache<N> {
	pub fn get(&self, address: Address) -> Option<ObjectId> {
		self.by_address.get(&address).copied()
	}

	pub fn len(&self) -> usize {
		self.slots.len()
	}

	/// Allocate a slot; non-null addresses become cache keys.
	pub fn insert(&mut self, address: Address, structure: &str, node: N) -> ObjectId {
		let id = ObjectId(self.slots.len() as u32);
		self.slots.push(Slot {
			address,
			structure: Box::from(structure),
			node: Some(node),
		});
		if !address.is_null() {
			self.by_address.insert(address, id);
		}
		id
	}

	pub fn take(&mut self, id: ObjectId) -> Option<N> {
		self.slots.get_mut(id.index()).and_then(|slot| slot.node.take())
	}

	pub fn restore(&mut self, id: ObjectId, node: N) {
		if let Some(slot) = self.slots.get_mut(id.index()) {
			slot.node = Some(node);
		}
	}

	pub fn into_graph(self) -> ObjectGraph<N> {
		ObjectGraph {
			slots: self.slots,
			by_address: self.by_address,
		}
	}
}

/// Finished, identity-preserving object graph returned by a decode session.
#[derive(Debug)]
pub struct ObjectGraph<N> {
	slots: Vec<Slot<N>>,
	by_address: HashMap<Address, ObjectId>,
}

impl<N> ObjectGraph<N> {
	/// Number of decoded objects.
	pub fn len(&self) -> usize {
		self.slots.len()
	}

	/// Return whether no object was decoded.
	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}

	/// Borrow a node by handle.
	pub fn get(&self, id: ObjectId) -> Option<&N> {
		self.slots.get(id.index()).and_then(|slot| slot.node.as_ref())
	}

	/// Borrow a node as concrete type `T`, `None` when absent or of another type.
	pub fn get_as<T: Member<N>>(&self, id: ObjectId) -> Option<&T> {
		self.get(id).and_then(T::peek)
	}

	/// Borrow a node as `T`, failing with a type mismatch otherwise.
	pub fn expect_as<T: Member<N>>(&self, id: ObjectId) -> Result<&T> {
		self.get_as(id).ok_or_else(|| BlendError::ObjectTypeMismatch {
			expected: std::any::type_name::<T>(),
			got: self.structure_of(id).unwrap_or("<none>").to_owned(),
		})
	}

	/// Follow an optional handle to a concrete type.
	pub fn follow<T: Member<N>>(&self, id: Option<ObjectId>) -> Option<&T> {
		id.and_then(|id| self.get_as(id))
	}

	/// Source address of an object.
	pub fn address_of(&self, id: ObjectId) -> Option<Address> {
		self.slots.get(id.index()).map(|slot| slot.address)
	}

	/// Schema structure name an object was decoded from.
	pub fn structure_of(&self, id: ObjectId) -> Option<&str> {
		self.slots.get(id.index()).map(|slot| &*slot.structure)
	}

	/// Handle for the object decoded from `address`.
	pub fn id_at(&self, address: Address) -> Option<ObjectId> {
		self.by_address.get(&address).copied()
	}

	/// Iterate handles and nodes in allocation order.
	pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &N)> + '_ {
		self.slots
			.iter()
			.enumerate()
			.filter_map(|(idx, slot)| slot.node.as_ref().map(|node| (ObjectId(idx as u32), node)))
	}
}

#[cfg(test)]
mod tests;
