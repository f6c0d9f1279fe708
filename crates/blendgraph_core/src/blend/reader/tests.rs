use blendgraph_testkit::{BlendBuilder, ByteOrder, SchemaBuilder, encode_f32s};

use crate::blend::{Address, BlendError, BlendFile, Convert, DecodeOptions, ErrorKind, Member, ObjectId, Registry, Result, Session, StructReader};

#[derive(Debug)]
enum Node {
	Probe(Box<Probe>),
	Vert(Vec<Vert>),
	Mat(Mat),
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Vert {
	co: [f32; 3],
	no: [f32; 3],
}

#[derive(Debug, Default, PartialEq)]
struct Mat {
	r: f32,
}

#[derive(Debug, Default)]
struct Probe {
	count: i32,
	missing: i32,
	weight: f32,
	co: [f32; 2],
	wide: [i32; 4],
	obmat: [[f32; 4]; 4],
	name: String,
	inner: Vert,
	verts: Vec<Vert>,
	mats: Vec<Option<ObjectId>>,
	slots: Vec<Option<ObjectId>>,
	weights: Vec<f32>,
	layer: Option<ObjectId>,
	has_extra: bool,
}

impl Convert<Node> for Vert {
	fn convert(&mut self, reader: &mut StructReader<'_, '_, Node>) -> Result<()> {
		self.co = reader.read_array("co")?;
		let no: [i16; 3] = reader.read_array("no")?;
		self.no = no.map(|value| f32::from(value) / 32767.0);
		Ok(())
	}
}

impl Convert<Node> for Mat {
	fn convert(&mut self, reader: &mut StructReader<'_, '_, Node>) -> Result<()> {
		self.r = reader.read("r")?;
		Ok(())
	}
}

impl Convert<Node> for Probe {
	fn convert(&mut self, reader: &mut StructReader<'_, '_, Node>) -> Result<()> {
		self.count = reader.read("count")?;
		self.missing = reader.read("missing")?;
		self.weight = reader.read("weight")?;
		self.co = reader.read_array("co")?;
		self.wide = reader.read_array("wide")?;
		self.obmat = reader.read_matrix("obmat")?;
		self.name = reader.read_string("name")?;
		self.inner = reader.read_struct("inner")?;
		self.verts = reader.read_ptr_array("mvert")?;
		self.mats = reader.read_ptr_list("mat")?;
		self.slots = reader.read_ptrs("slots")?;
		self.weights = reader.read_ptr_scalars("dvert")?;
		let layer_type: i32 = reader.read("layer_type")?;
		self.layer = reader.read_ptr_tagged("layer", layer_type)?;
		self.has_extra = reader.has_field("extra");
		Ok(())
	}
}

macro_rules! member {
	($ty:ty, $variant:ident) => {
		impl Member<Node> for $ty {
			fn wrap(self) -> Node {
				Node::$variant(self)
			}

			fn peek(node: &Node) -> Option<&Self> {
				match node {
					Node::$variant(value) => Some(value),
					_ => None,
				}
			}

			fn peek_mut(node: &mut Node) -> Option<&mut Self> {
				match node {
					Node::$variant(value) => Some(value),
					_ => None,
				}
			}
		}
	};
}

member!(Box<Probe>, Probe);
member!(Vec<Vert>, Vert);
member!(Mat, Mat);

fn registry() -> Registry<Node> {
	let mut registry = Registry::new();
	registry.register::<Box<Probe>>("Probe").register::<Mat>("Mat").register_tag::<Vert>(0, "Vert");
	registry
}

fn probe_fields(extra: bool) -> Vec<(&'static str, &'static str)> {
	let mut fields = vec![
		("char", "name[8]"),
		("Vert", "*mvert"),
		("short", "weight"),
		("float", "co[3]"),
		("int", "wide[2]"),
		("float", "obmat[4][4]"),
		("Vert", "inner"),
		("Mat", "**mat"),
		("Mat", "*slots[4]"),
		("float", "*dvert"),
		("int", "layer_type"),
		("void", "*layer"),
		("int", "count"),
	];
	if extra {
		fields.push(("double", "extra"));
	}
	fields
}

fn builder(extra: bool, pointer_size: usize, order: ByteOrder) -> BlendBuilder {
	let fields = probe_fields(extra);
	let schema = SchemaBuilder::new()
		.structure("Vert", &[("float", "co[3]"), ("short", "no[3]"), ("short", "flag")])
		.structure("Mat", &[("float", "r")])
		.structure("Probe", &fields);
	let mut blend = BlendBuilder::new(schema).pointer_size(pointer_size).byte_order(order);

	let vert = |blend: &BlendBuilder, x: f64| blend.record("Vert").floats("co", &[x, x + 1.0, x + 2.0]).ints("no", &[32767, 0, -32767]).finish();
	let inner = vert(&blend, 10.0);
	let verts = [vert(&blend, 0.0), vert(&blend, 3.0)];
	let mat = blend.record("Mat").float("r", 0.5).finish();

	let mut obmat = [0.0; 16];
	for (idx, value) in obmat.iter_mut().enumerate() {
		*value = idx as f64;
	}
	let probe = blend
		.record("Probe")
		.string("name", "probe")
		.ptr("mvert", 0x2000)
		.int("weight", -2)
		.floats("co", &[1.5, 2.5, 3.5])
		.ints("wide", &[4, 5])
		.floats("obmat", &obmat)
		.nested("inner", inner)
		.ptr("mat", 0x4000)
		.ptrs("slots", &[0x3000, 0, 0xDEAD_0000, 0x3000])
		.ptr("dvert", 0x5000)
		.int("layer_type", 0)
		.ptr("layer", 0x2000)
		.int("count", 42)
		.finish();

	let ptr = |value: u64| -> Vec<u8> {
		let mut bytes = value.to_le_bytes()[..pointer_size].to_vec();
		if order == ByteOrder::Big {
			bytes.reverse();
		}
		bytes
	};
	let mut mat_list = ptr(0x3000);
	mat_list.extend(ptr(0));
	mat_list.extend(ptr(0x3000));

	blend.chunk(b"PR\0\0", "Probe", 0x1000, [probe]);
	blend.chunk(b"DATA", "Vert", 0x2000, verts);
	blend.chunk(b"MA\0\0", "Mat", 0x3000, [mat]);
	blend.raw_chunk(b"DATA", 0, 0x4000, 1, mat_list);
	blend.raw_chunk(b"DATA", 0, 0x5000, 1, encode_f32s(order, &[0.25, 0.75]));
	blend
}

fn decode(builder: &BlendBuilder) -> (crate::blend::ObjectGraph<Node>, ObjectId, crate::blend::DecodeStats) {
	let file = BlendFile::from_bytes(builder.build()).expect("container opens");
	let registry = registry();
	let mut session = Session::new(&file, &registry);
	let root = session.decode_root("Probe").expect("root decodes");
	let (graph, stats) = session.finish();
	(graph, root, stats)
}

#[test]
fn fields_decode_by_name_with_coercion() {
	let (graph, root, stats) = decode(&builder(false, 8, ByteOrder::Little));
	let probe = graph.expect_as::<Box<Probe>>(root).expect("probe");

	assert_eq!(probe.count, 42);
	assert_eq!(probe.name, "probe");
	assert_eq!(probe.weight, -2.0);
	assert_eq!(probe.co, [1.5, 2.5]);
	assert_eq!(probe.wide, [4, 5, 0, 0]);
	assert_eq!(probe.obmat[1], [4.0, 5.0, 6.0, 7.0]);
	assert_eq!(probe.inner.co, [10.0, 11.0, 12.0]);
	assert_eq!(probe.inner.no, [1.0, 0.0, -1.0]);

	assert_eq!(probe.missing, 0);
	assert!(stats.fields_missing >= 1);
}

#[test]
fn pointer_shapes_resolve() {
	let (graph, root, _) = decode(&builder(false, 8, ByteOrder::Little));
	let probe = graph.expect_as::<Box<Probe>>(root).expect("probe");

	assert_eq!(probe.verts.len(), 2);
	assert_eq!(probe.verts[1].co, [3.0, 4.0, 5.0]);

	assert_eq!(probe.mats.len(), 3);
	assert_eq!(probe.mats[0], probe.mats[2]);
	assert_eq!(probe.mats[1], None);
	assert_eq!(graph.follow::<Mat>(probe.mats[0]), Some(&Mat { r: 0.5 }));

	assert_eq!(probe.weights, vec![0.25, 0.75]);

	let layer = graph.follow::<Vec<Vert>>(probe.layer).expect("tagged layer");
	assert_eq!(layer, &probe.verts);
	assert_eq!(graph.structure_of(probe.layer.expect("layer")), Some("Vert"));
}

#[test]
fn inline_pointer_arrays_resolve_every_slot() {
	for (pointer_size, order) in [(8, ByteOrder::Little), (4, ByteOrder::Big)] {
		let (graph, root, stats) = decode(&builder(false, pointer_size, order));
		let probe = graph.expect_as::<Box<Probe>>(root).expect("probe");

		assert_eq!(probe.slots.len(), 4);
		assert_eq!(probe.slots[1], None);
		assert_eq!(probe.slots[2], None);
		assert_eq!(probe.slots[0], probe.slots[3]);
		assert_eq!(probe.slots[0], probe.mats[0]);
		assert_eq!(graph.follow::<Mat>(probe.slots[3]), Some(&Mat { r: 0.5 }));
		assert_eq!(stats.dangling_pointers, 1);
	}
}

#[derive(Debug, Default)]
struct ScalarAsPointers;

impl Convert<Node> for ScalarAsPointers {
	fn convert(&mut self, reader: &mut StructReader<'_, '_, Node>) -> Result<()> {
		reader.read_ptrs("wide")?;
		Ok(())
	}
}

#[test]
fn pointer_array_read_of_scalar_field_is_rejected() {
	let file = BlendFile::from_bytes(builder(false, 8, ByteOrder::Little).build()).expect("container opens");
	let mut registry = Registry::<Node>::new();
	registry.register_converter(
		"Probe",
		crate::blend::Converter {
			create: || Node::Mat(Mat::default()),
			convert: |_, reader| ScalarAsPointers.convert(reader),
		},
	);

	let err = Session::new(&file, &registry).decode_root("Probe").expect_err("not a pointer array");
	assert_eq!(err.kind(), ErrorKind::Schema);
	assert!(matches!(err, BlendError::Decode { ref field, .. } if field == "wide"));
}

#[test]
fn unknown_tag_is_recovered_as_none() {
	let mut blend = builder(false, 8, ByteOrder::Little);
	let probe = blend.record("Probe").int("layer_type", 99).ptr("layer", 0x2000).finish();
	blend.chunk(b"PR\0\0", "Probe", 0x9000, [probe]);
	let file = BlendFile::from_bytes(blend.build()).expect("container opens");
	let registry = registry();

	let mut session = Session::new(&file, &registry);
	let root = session.resolve(Address(0x9000)).expect("resolve").expect("handle");
	let stats = session.stats();
	let (graph, _) = session.finish();
	assert_eq!(graph.expect_as::<Box<Probe>>(root).expect("probe").layer, None);
	assert_eq!(stats.unknown_types, 1);
}

#[test]
fn narrow_big_endian_containers_decode_identically() {
	let (graph, root, _) = decode(&builder(false, 4, ByteOrder::Big));
	let probe = graph.expect_as::<Box<Probe>>(root).expect("probe");

	assert_eq!(probe.count, 42);
	assert_eq!(probe.obmat[3], [12.0, 13.0, 14.0, 15.0]);
	assert_eq!(probe.verts.len(), 2);
	assert_eq!(probe.weights, vec![0.25, 0.75]);
	assert_eq!(graph.follow::<Mat>(probe.mats[2]), Some(&Mat { r: 0.5 }));
}

#[test]
fn extra_trailing_field_changes_nothing() {
	let (graph, root, _) = decode(&builder(true, 8, ByteOrder::Little));
	let probe = graph.expect_as::<Box<Probe>>(root).expect("probe");
	assert!(probe.has_extra);
	assert_eq!(probe.count, 42);
	assert_eq!(probe.verts.len(), 2);
}

#[derive(Debug, Default)]
struct BadRead;

impl Convert<Node> for BadRead {
	fn convert(&mut self, reader: &mut StructReader<'_, '_, Node>) -> Result<()> {
		let _: i32 = reader.read("inner")?;
		Ok(())
	}
}

#[test]
fn scalar_read_of_structure_field_reports_context() {
	let file = BlendFile::from_bytes(builder(false, 8, ByteOrder::Little).build()).expect("container opens");
	let mut registry = Registry::<Node>::new();
	registry.register_converter(
		"Probe",
		crate::blend::Converter {
			create: || Node::Mat(Mat::default()),
			convert: |_, reader| BadRead.convert(reader),
		},
	);

	let err = Session::new(&file, &registry).decode_root("Probe").expect_err("mismatch");
	assert_eq!(err.kind(), ErrorKind::Schema);
	match err {
		BlendError::Decode { code, structure, field, source } => {
			assert_eq!(code, "PR");
			assert_eq!(structure, "Probe");
			assert_eq!(field, "inner");
			assert!(matches!(*source, BlendError::FieldTypeMismatch { requested: "scalar", .. }));
		}
		other => panic!("unexpected error {other:?}"),
	}
}

#[test]
fn nested_depth_budget_is_enforced() {
	let file = BlendFile::from_bytes(builder(false, 8, ByteOrder::Little).build()).expect("container opens");
	let registry = registry();
	let options = DecodeOptions {
		max_depth: 0,
		..DecodeOptions::default()
	};
	let err = Session::new(&file, &registry).with_options(options).decode_root("Probe").expect_err("depth");
	assert_eq!(err.kind(), ErrorKind::Limit);
}
