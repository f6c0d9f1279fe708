use super::PointerCache;
use crate::blend::{Address, BlendError};

#[test]
fn address_parses_hex_and_decimal() {
	assert_eq!(Address::parse("0x1000").expect("hex"), Address(0x1000));
	assert_eq!(Address::parse("4096").expect("decimal"), Address(4096));
	assert!(matches!(Address::parse("0xZZ"), Err(BlendError::InvalidPointerLiteral { .. })));
}

#[test]
fn address_displays_as_hex() {
	assert_eq!(Address(0xdead_beef).to_string(), "0xdeadbeef");
	assert!(Address::NULL.is_null());
}

#[test]
fn null_address_never_becomes_a_cache_key() {
	let mut cache = PointerCache::<u8>::default();
	let id = cache.insert(Address::NULL, "Root", 1);
	assert_eq!(cache.len(), 1);
	assert_eq!(cache.get(Address::NULL), None);

	let graph = cache.into_graph();
	assert_eq!(graph.get(id), Some(&1));
	assert_eq!(graph.id_at(Address::NULL), None);
}

#[test]
fn taken_node_is_invisible_until_restored() {
	let mut cache = PointerCache::<u8>::default();
	let id = cache.insert(Address(0x10), "Pair", 7);
	assert_eq!(cache.get(Address(0x10)), Some(id));

	let node = cache.take(id).expect("node present");
	assert_eq!(cache.take(id), None);
	cache.restore(id, node + 1);

	let graph = cache.into_graph();
	assert_eq!(graph.get(id), Some(&8));
	assert_eq!(graph.structure_of(id), Some("Pair"));
	assert_eq!(graph.address_of(id), Some(Address(0x10)));
	assert_eq!(graph.iter().count(), 1);
}
