#![allow(missing_docs)]

use blendgraph::blend::{Address, BlendFile, Convert, DecodeStats, Member, ObjectGraph, ObjectId, Registry, Result, Session, StructReader};
use blendgraph_testkit::{BlendBuilder, ByteOrder, SchemaBuilder};
use proptest::prelude::*;

#[derive(Debug, Clone, PartialEq)]
enum Node {
	Pair(Pair),
	Holder(Holder),
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Pair {
	a: i32,
	b: i32,
	w: f32,
	next: Option<ObjectId>,
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Holder {
	pair: Option<ObjectId>,
	again: Option<ObjectId>,
}

impl Convert<Node> for Pair {
	fn convert(&mut self, reader: &mut StructReader<'_, '_, Node>) -> Result<()> {
		self.a = reader.read("a")?;
		self.b = reader.read("b")?;
		self.w = reader.read("w")?;
		self.next = reader.read_ptr("next")?;
		Ok(())
	}
}

impl Convert<Node> for Holder {
	fn convert(&mut self, reader: &mut StructReader<'_, '_, Node>) -> Result<()> {
		self.pair = reader.read_ptr("pair")?;
		self.again = reader.read_ptr("again")?;
		Ok(())
	}
}

impl Member<Node> for Pair {
	fn wrap(self) -> Node {
		Node::Pair(self)
	}

	fn peek(node: &Node) -> Option<&Self> {
		match node {
			Node::Pair(pair) => Some(pair),
			Node::Holder(_) => None,
		}
	}

	fn peek_mut(node: &mut Node) -> Option<&mut Self> {
		match node {
			Node::Pair(pair) => Some(pair),
			Node::Holder(_) => None,
		}
	}
}

impl Member<Node> for Holder {
	fn wrap(self) -> Node {
		Node::Holder(self)
	}

	fn peek(node: &Node) -> Option<&Self> {
		match node {
			Node::Holder(holder) => Some(holder),
			Node::Pair(_) => None,
		}
	}

	fn peek_mut(node: &mut Node) -> Option<&mut Self> {
		match node {
			Node::Holder(holder) => Some(holder),
			Node::Pair(_) => None,
		}
	}
}

const PAIR_FIELDS: [(&str, &str); 4] = [("int", "a"), ("int", "b"), ("float", "w"), ("Pair", "*next")];

#[derive(Debug, Clone, Copy)]
struct PairValues {
	a: i32,
	b: i32,
	w: f32,
}

struct Layout<'f> {
	fields: &'f [(&'f str, &'f str)],
	pointer_size: usize,
	order: ByteOrder,
}

impl Default for Layout<'static> {
	fn default() -> Self {
		Self {
			fields: &PAIR_FIELDS,
			pointer_size: 8,
			order: ByteOrder::Little,
		}
	}
}

fn registry() -> Registry<Node> {
	let mut registry = Registry::new();
	registry.register::<Pair>("Pair").register::<Holder>("Holder");
	registry
}

/// Holder at `0x100` pointing twice at a Pair at `0x1000`, whose `next` points at a second Pair at `0x2000`,
/// whose `next` points back at the first.
fn cycle_builder(layout: &Layout<'_>, values: PairValues) -> BlendBuilder {
	let schema = SchemaBuilder::new()
		.structure("Pair", layout.fields)
		.structure("Holder", &[("Pair", "*pair"), ("Pair", "*again")]);
	let mut blend = BlendBuilder::new(schema).pointer_size(layout.pointer_size).byte_order(layout.order);

	let pair = |next: u64| {
		blend
			.record("Pair")
			.int("a", i64::from(values.a))
			.int("b", i64::from(values.b))
			.float("w", f64::from(values.w))
			.ptr("next", next)
			.finish()
	};
	let first = pair(0x2000);
	let second = pair(0x1000);
	let holder = blend.record("Holder").ptr("pair", 0x1000).ptr("again", 0x1000).finish();

	blend
		.chunk(b"HO\0\0", "Holder", 0x100, [holder])
		.chunk(b"DATA", "Pair", 0x1000, [first])
		.chunk(b"DATA", "Pair", 0x2000, [second]);
	blend
}

fn decode_root(bytes: Vec<u8>) -> (ObjectGraph<Node>, ObjectId, DecodeStats) {
	let file = BlendFile::from_bytes(bytes).expect("container opens");
	let registry = registry();
	let mut session = Session::new(&file, &registry);
	let root = session.decode_root("Holder").expect("root decodes");
	let (graph, stats) = session.finish();
	(graph, root, stats)
}

fn nodes(graph: &ObjectGraph<Node>) -> Vec<Node> {
	graph.iter().map(|(_, node)| node.clone()).collect()
}

#[test]
fn pair_referenced_by_root_decodes_to_one_object() {
	let schema = SchemaBuilder::new()
		.structure("Pair", &[("int", "a"), ("int", "b")])
		.structure("Holder", &[("Pair", "*pair"), ("Pair", "*again")]);
	let mut blend = BlendBuilder::new(schema);
	let pair = blend.record("Pair").int("a", 7).int("b", 9).finish();
	let holder = blend.record("Holder").ptr("pair", 0x1000).finish();
	blend.chunk(b"HO\0\0", "Holder", 0x100, [holder]).chunk(b"DATA", "Pair", 0x1000, [pair]);

	let (graph, root, stats) = decode_root(blend.build());
	let holder = graph.expect_as::<Holder>(root).expect("holder");
	let pair = graph.follow::<Pair>(holder.pair).expect("pair");

	assert_eq!((pair.a, pair.b), (7, 9));
	assert_eq!(holder.again, None);
	assert_eq!(graph.len(), 2);
	assert_eq!(graph.id_at(Address(0x1000)), holder.pair);
	assert_eq!(stats.dangling_pointers, 0);
	assert_eq!(stats.unknown_types, 0);
}

#[test]
fn cycle_decodes_to_two_objects_with_shared_identity() {
	let values = PairValues { a: 1, b: 2, w: 0.5 };
	let (graph, root, stats) = decode_root(cycle_builder(&Layout::default(), values).build());

	let holder = graph.expect_as::<Holder>(root).expect("holder");
	assert_eq!(holder.pair, holder.again);

	let first = graph.follow::<Pair>(holder.pair).expect("first");
	let second = graph.follow::<Pair>(first.next).expect("second");
	assert_eq!(second.next, holder.pair);
	assert_eq!(graph.len(), 3);
	assert_eq!(stats.cached_objects, 3);
	assert_eq!(stats.cache_hits, 2);
}

#[test]
fn missing_fields_read_as_zero() {
	let layout = Layout {
		fields: &[("int", "a"), ("Pair", "*next")],
		..Layout::default()
	};
	let schema = SchemaBuilder::new()
		.structure("Pair", layout.fields)
		.structure("Holder", &[("Pair", "*pair"), ("Pair", "*again")]);
	let mut blend = BlendBuilder::new(schema);
	let pair = blend.record("Pair").int("a", 3).finish();
	let holder = blend.record("Holder").ptr("pair", 0x1000).finish();
	blend.chunk(b"HO\0\0", "Holder", 0x100, [holder]).chunk(b"DATA", "Pair", 0x1000, [pair]);

	let (graph, root, stats) = decode_root(blend.build());
	let holder = graph.expect_as::<Holder>(root).expect("holder");
	let pair = graph.follow::<Pair>(holder.pair).expect("pair");
	assert_eq!(pair, &Pair { a: 3, ..Pair::default() });
	assert_eq!(stats.fields_missing, 2);
}

#[test]
fn trailing_field_and_unknown_chunks_change_nothing() {
	let values = PairValues { a: -4, b: 11, w: 2.25 };
	let (baseline, _, _) = decode_root(cycle_builder(&Layout::default(), values).build());

	let extended = [PAIR_FIELDS[0], PAIR_FIELDS[1], PAIR_FIELDS[2], PAIR_FIELDS[3], ("double", "added_later")];
	let layout = Layout {
		fields: &extended,
		..Layout::default()
	};
	let mut blend = cycle_builder(&layout, values);
	blend
		.raw_chunk(b"TEST", 0, 0x8000, 1, vec![0xAA; 24])
		.raw_chunk(&[0xFF, 0x01, b'Z', 0], 0, 0x9000, 1, vec![1, 2, 3])
		.raw_chunk(b"REND", 0, 0, 0, Vec::new());
	let (graph, _, stats) = decode_root(blend.build());

	assert_eq!(nodes(&graph), nodes(&baseline));
	assert_eq!(stats.unknown_types, 0);
}

#[test]
fn null_root_pointer_allocates_nothing() {
	let file = BlendFile::from_bytes(cycle_builder(&Layout::default(), PairValues { a: 0, b: 0, w: 0.0 }).build()).expect("container opens");
	let registry = registry();
	let mut session = Session::new(&file, &registry);
	assert_eq!(session.resolve(Address::NULL).expect("null resolves"), None);
	assert_eq!(session.stats(), DecodeStats::default());
}

proptest! {
	#[test]
	fn field_order_does_not_change_values(
		fields in Just(PAIR_FIELDS.to_vec()).prop_shuffle(),
		a in any::<i32>(),
		b in any::<i32>(),
		w in -1.0e6_f32..1.0e6,
	) {
		let values = PairValues { a, b, w };
		let (baseline, _, _) = decode_root(cycle_builder(&Layout::default(), values).build());
		let shuffled = Layout { fields: &fields, ..Layout::default() };
		let (graph, _, _) = decode_root(cycle_builder(&shuffled, values).build());

		prop_assert_eq!(nodes(&graph), nodes(&baseline));
	}

	#[test]
	fn pointer_width_and_byte_order_do_not_change_values(
		a in any::<i32>(),
		b in any::<i32>(),
		w in -1.0e6_f32..1.0e6,
		narrow in any::<bool>(),
		big in any::<bool>(),
	) {
		let values = PairValues { a, b, w };
		let (baseline, _, _) = decode_root(cycle_builder(&Layout::default(), values).build());
		let layout = Layout {
			pointer_size: if narrow { 4 } else { 8 },
			order: if big { ByteOrder::Big } else { ByteOrder::Little },
			..Layout::default()
		};
		let (graph, _, _) = decode_root(cycle_builder(&layout, values).build());

		prop_assert_eq!(nodes(&graph), nodes(&baseline));
	}
}
