use blendgraph_testkit::{BlendBuilder, SchemaBuilder};

use crate::blend::{Address, BlendError, BlendFile, Convert, DecodeOptions, ErrorKind, Member, ObjectId, Registry, Result, Session, StructReader};

#[derive(Debug)]
enum Node {
	Pair(Pair),
	Pairs(Vec<Pair>),
	Link(Link),
}

#[derive(Debug, Default, PartialEq)]
struct Pair {
	a: i32,
	b: i32,
}

#[derive(Debug, Default)]
struct Link {
	value: i32,
	next: Option<ObjectId>,
}

impl Convert<Node> for Pair {
	fn convert(&mut self, reader: &mut StructReader<'_, '_, Node>) -> Result<()> {
		self.a = reader.read("a")?;
		self.b = reader.read("b")?;
		Ok(())
	}
}

impl Member<Node> for Pair {
	fn wrap(self) -> Node {
		Node::Pair(self)
	}

	fn peek(node: &Node) -> Option<&Self> {
		match node {
			Node::Pair(value) => Some(value),
			_ => None,
		}
	}

	fn peek_mut(node: &mut Node) -> Option<&mut Self> {
		match node {
			Node::Pair(value) => Some(value),
			_ => None,
		}
	}
}

impl Member<Node> for Vec<Pair> {
	fn wrap(self) -> Node {
		Node::Pairs(self)
	}

	fn peek(node: &Node) -> Option<&Self> {
		match node {
			Node::Pairs(value) => Some(value),
			_ => None,
		}
	}

	fn peek_mut(node: &mut Node) -> Option<&mut Self> {
		match node {
			Node::Pairs(value) => Some(value),
			_ => None,
		}
	}
}

impl Convert<Node> for Link {
	fn convert(&mut self, reader: &mut StructReader<'_, '_, Node>) -> Result<()> {
		self.value = reader.read("value")?;
		self.next = reader.read_ptr("next")?;
		Ok(())
	}
}

impl Member<Node> for Link {
	fn wrap(self) -> Node {
		Node::Link(self)
	}

	fn peek(node: &Node) -> Option<&Self> {
		match node {
			Node::Link(value) => Some(value),
			_ => None,
		}
	}

	fn peek_mut(node: &mut Node) -> Option<&mut Self> {
		match node {
			Node::Link(value) => Some(value),
			_ => None,
		}
	}
}

fn schema() -> SchemaBuilder {
	SchemaBuilder::new()
		.structure("Pair", &[("int", "a"), ("int", "b")])
		.structure("Link", &[("Link", "*next"), ("int", "value")])
		.structure("Other", &[("int", "x")])
		.structure("Triple", &[("int", "a"), ("int", "b"), ("int", "c")])
}

fn registry() -> Registry<Node> {
	let mut registry = Registry::new();
	registry.register::<Pair>("Pair").register::<Link>("Link");
	registry
}

fn open(builder: &BlendBuilder) -> BlendFile {
	BlendFile::from_bytes(builder.build()).expect("container opens")
}

#[test]
fn pair_referenced_by_root_pointer_decodes_once() {
	let mut builder = BlendBuilder::new(schema());
	let pair = builder.record("Pair").int("a", 7).int("b", 9).finish();
	builder.chunk(b"DATA", "Pair", 0x1000, [pair]);
	let file = open(&builder);
	let registry = registry();

	let mut session = Session::new(&file, &registry);
	let id = session.resolve(Address(0x1000)).expect("resolve").expect("handle");
	let (graph, stats) = session.finish();

	assert_eq!(graph.get_as::<Pair>(id), Some(&Pair { a: 7, b: 9 }));
	assert_eq!(graph.len(), 1);
	assert_eq!(stats.cached_objects, 1);
	assert_eq!(stats.dangling_pointers, 0);
	assert_eq!(graph.address_of(id), Some(Address(0x1000)));
}

#[test]
fn null_address_resolves_to_none_without_lookup() {
	let file = open(&BlendBuilder::new(schema()));
	let registry = registry();
	let mut session = Session::new(&file, &registry);

	assert_eq!(session.resolve(Address::NULL).expect("null resolves"), None);
	assert_eq!(session.stats(), crate::blend::DecodeStats::default());
}

#[test]
fn equal_addresses_share_one_handle() {
	let mut builder = BlendBuilder::new(schema());
	let pair = builder.record("Pair").int("a", 1).finish();
	builder.chunk(b"DATA", "Pair", 0x1000, [pair]);
	let file = open(&builder);
	let registry = registry();

	let mut session = Session::new(&file, &registry);
	let first = session.resolve(Address(0x1000)).expect("first");
	let second = session.resolve(Address(0x1000)).expect("second");
	assert_eq!(first, second);

	let stats = session.stats();
	assert_eq!(stats.cache_hits, 1);
	assert_eq!(stats.pointers_resolved, 2);
	assert_eq!(stats.cached_objects, 1);
}

#[test]
fn two_node_cycle_terminates_with_two_objects() {
	let mut builder = BlendBuilder::new(schema());
	let a = builder.record("Link").ptr("next", 0x2000).int("value", 1).finish();
	let b = builder.record("Link").ptr("next", 0x1000).int("value", 2).finish();
	builder.chunk(b"DATA", "Link", 0x1000, [a]);
	builder.chunk(b"DATA", "Link", 0x2000, [b]);
	let file = open(&builder);
	let registry = registry();

	let mut session = Session::new(&file, &registry);
	let a = session.resolve(Address(0x1000)).expect("resolve").expect("handle");
	let (graph, stats) = session.finish();

	assert_eq!(graph.len(), 2);
	assert_eq!(stats.cached_objects, 2);
	let first = graph.expect_as::<Link>(a).expect("link");
	let b = first.next.expect("a.next");
	let second = graph.expect_as::<Link>(b).expect("link");
	assert_eq!(second.value, 2);
	assert_eq!(second.next, Some(a));
}

#[test]
fn long_chains_decode_without_recursion() {
	const LEN: u64 = 20_000;
	let mut builder = BlendBuilder::new(schema());
	for idx in 0..LEN {
		let next = if idx + 1 == LEN { 0 } else { 0x1000 + (idx + 1) * 0x100 };
		let link = builder.record("Link").ptr("next", next).int("value", idx as i64).finish();
		builder.chunk(b"DATA", "Link", 0x1000 + idx * 0x100, [link]);
	}
	let file = open(&builder);
	let registry = registry();

	let mut session = Session::new(&file, &registry);
	let head = session.resolve(Address(0x1000)).expect("resolve").expect("handle");
	let (graph, _) = session.finish();

	assert_eq!(graph.len(), LEN as usize);
	let mut cursor = Some(head);
	let mut seen = 0;
	while let Some(link) = graph.follow::<Link>(cursor) {
		seen += 1;
		cursor = link.next;
	}
	assert_eq!(seen, LEN as usize);
}

#[test]
fn dangling_pointer_is_recovered_as_none() {
	let mut builder = BlendBuilder::new(schema());
	let link = builder.record("Link").ptr("next", 0xDEAD_0000).int("value", 5).finish();
	builder.chunk(b"DATA", "Link", 0x1000, [link]);
	let file = open(&builder);
	let registry = registry();

	let mut session = Session::new(&file, &registry);
	let id = session.resolve(Address(0x1000)).expect("resolve").expect("handle");
	let (graph, stats) = session.finish();

	assert_eq!(graph.expect_as::<Link>(id).expect("link").next, None);
	assert_eq!(stats.dangling_pointers, 1);
}

#[test]
fn unregistered_pointer_target_is_skipped() {
	let mut builder = BlendBuilder::new(schema());
	let other = builder.record("Other").int("x", 3).finish();
	builder.chunk(b"DATA", "Other", 0x1000, [other]);
	let file = open(&builder);
	let registry = registry();

	let mut session = Session::new(&file, &registry);
	assert_eq!(session.resolve(Address(0x1000)).expect("resolve"), None);
	assert_eq!(session.stats().unknown_types, 1);
}

#[test]
fn unregistered_root_is_fatal() {
	let mut builder = BlendBuilder::new(schema());
	let other = builder.record("Other").finish();
	builder.chunk(b"DATA", "Other", 0x1000, [other]);
	let file = open(&builder);
	let registry = registry();

	let err = Session::new(&file, &registry).decode_root("Other").expect_err("no converter");
	assert_eq!(err.kind(), ErrorKind::UnknownType);
}

#[test]
fn missing_root_block_is_fatal() {
	let file = open(&BlendBuilder::new(schema()));
	let registry = registry();

	let err = Session::new(&file, &registry).decode_root("Pair").expect_err("no Pair block");
	assert!(matches!(err, BlendError::RootBlockNotFound { ref name } if name == "Pair"));
	let err = Session::new(&file, &registry).decode_root("Scene").expect_err("no Scene structure");
	assert!(matches!(err, BlendError::DnaStructNotFound { .. }));
}

#[test]
fn interior_addresses_canonicalize_to_element_start() {
	let mut builder = BlendBuilder::new(schema());
	let first = builder.record("Pair").int("a", 1).finish();
	let second = builder.record("Pair").int("a", 2).finish();
	builder.chunk(b"DATA", "Pair", 0x1000, [first, second]);
	let file = open(&builder);
	let registry = registry();

	let mut session = Session::new(&file, &registry);
	let start = session.resolve(Address(0x1008)).expect("resolve").expect("handle");
	let inside = session.resolve(Address(0x100C)).expect("resolve").expect("handle");
	assert_eq!(start, inside);

	let (graph, _) = session.finish();
	assert_eq!(graph.address_of(start), Some(Address(0x1008)));
	assert_eq!(graph.expect_as::<Pair>(start).expect("pair").a, 2);
}

#[test]
fn count_overrunning_payload_is_fatal() {
	let mut builder = BlendBuilder::new(schema());
	let pair = builder.record("Pair").finish();
	let sdna = schema().sdna_index("Pair").expect("Pair declared");
	builder.raw_chunk(b"DATA", sdna, 0x1000, 3, pair);
	let file = open(&builder);
	let registry = registry();

	let err = Session::new(&file, &registry).resolve(Address(0x1000)).expect_err("3 x 8 > 8");
	assert!(matches!(err, BlendError::BlockCountOverrun { count: 3, size: 8, len: 8, .. }));
	assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn object_budget_is_enforced() {
	let mut builder = BlendBuilder::new(schema());
	let a = builder.record("Link").ptr("next", 0x2000).finish();
	let b = builder.record("Link").finish();
	builder.chunk(b"DATA", "Link", 0x1000, [a]);
	builder.chunk(b"DATA", "Link", 0x2000, [b]);
	let file = open(&builder);
	let registry = registry();

	let options = DecodeOptions {
		max_objects: 1,
		..DecodeOptions::default()
	};
	let err = Session::new(&file, &registry)
		.with_options(options)
		.resolve(Address(0x1000))
		.expect_err("second object exceeds budget");
	assert_eq!(err.kind(), ErrorKind::Limit);
	assert!(matches!(err, BlendError::Decode { ref structure, ref field, .. } if structure == "Link" && field == "next"));
}

#[test]
fn decode_root_uses_first_block_of_structure() {
	let mut builder = BlendBuilder::new(schema());
	let other = builder.record("Other").finish();
	let first = builder.record("Pair").int("a", 11).finish();
	let second = builder.record("Pair").int("a", 22).finish();
	builder.chunk(b"XX\0\0", "Other", 0x500, [other]);
	builder.chunk(b"AA\0\0", "Pair", 0x3000, [first]);
	builder.chunk(b"BB\0\0", "Pair", 0x1000, [second]);
	let file = open(&builder);
	let registry = registry();

	let mut session = Session::new(&file, &registry);
	let root = session.decode_root("Pair").expect("root");
	let (graph, _) = session.finish();
	assert_eq!(graph.expect_as::<Pair>(root).expect("pair").a, 11);
}

#[test]
fn fallback_decodes_unregistered_structure_with_matching_layout() {
	let mut builder = BlendBuilder::new(schema());
	let triple = builder.record("Triple").int("a", 4).int("b", 5).int("c", 6).finish();
	let other = builder.record("Other").int("x", 1).finish();
	builder.chunk(b"DATA", "Triple", 0x1000, [triple]);
	builder.chunk(b"DATA", "Other", 0x2000, [other]);
	let file = open(&builder);
	let mut registry = registry();
	registry.register_fallback::<Pair>(|structure| structure.field("a").is_some() && structure.field("b").is_some());

	let mut session = Session::new(&file, &registry);
	let id = session.resolve(Address(0x1000)).expect("resolve").expect("fallback handle");
	assert_eq!(session.resolve(Address(0x2000)).expect("resolve"), None);
	let (graph, stats) = session.finish();

	assert_eq!(graph.get_as::<Pair>(id), Some(&Pair { a: 4, b: 5 }));
	assert_eq!(graph.structure_of(id), Some("Triple"));
	assert_eq!(stats.unknown_types, 1);
}

#[test]
fn tagged_resolution_decodes_the_whole_element_run() {
	let mut builder = BlendBuilder::new(schema());
	let records: Vec<_> = (1..=3).map(|a| builder.record("Pair").int("a", a).finish()).collect();
	builder.chunk(b"DATA", "Pair", 0x1000, records);
	let file = open(&builder);
	let mut registry = registry();
	registry.register_tag::<Pair>(7, "Pair");

	let mut session = Session::new(&file, &registry);
	let id = session.resolve_tagged(Address(0x1000), 7).expect("resolve").expect("handle");
	assert_eq!(session.resolve_tagged(Address(0x1000), 7).expect("cached"), Some(id));
	assert_eq!(session.resolve_tagged(Address(0x1008), 99).expect("unknown tag"), None);
	let (graph, stats) = session.finish();

	let pairs = graph.get_as::<Vec<Pair>>(id).expect("element run");
	assert_eq!(pairs.iter().map(|pair| pair.a).collect::<Vec<_>>(), [1, 2, 3]);
	assert_eq!(stats.cache_hits, 1);
	assert_eq!(stats.unknown_types, 1);
}

#[test]
fn block_index_past_declared_structures_is_missing_sdna() {
	let mut builder = BlendBuilder::new(schema());
	let file_structures = 4;
	builder.raw_chunk(b"DATA", file_structures, 0x1000, 1, vec![0; 4]);
	let file = open(&builder);
	assert_eq!(file.schema().file_structure_count(), file_structures as usize);
	assert!(file.schema().structure_at(file_structures).is_some_and(|item| item.is_primitive()));
	let registry = registry();

	let err = Session::new(&file, &registry).resolve(Address(0x1000)).expect_err("primitive index is not a block layout");
	assert!(matches!(err, BlendError::MissingSdna { sdna_nr: 4 }));
}
