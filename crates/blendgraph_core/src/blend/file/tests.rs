use blendgraph_testkit::{BlendBuilder, ByteOrder, SchemaBuilder};

use crate::blend::{BlendError, BlendFile, Compression, Endianness, InspectOptions, inspect_block};

fn pair_blend() -> BlendBuilder {
	let mut blend = BlendBuilder::new(SchemaBuilder::new().structure("Pair", &[("int", "a"), ("int", "b")]));
	let pair = blend.record("Pair").int("a", 7).int("b", 9).finish();
	blend.chunk(b"DATA", "Pair", 0x1000, [pair]);
	blend
}

#[test]
fn raw_container_opens_with_schema_and_directory() {
	let blend = BlendFile::from_bytes(pair_blend().build()).expect("container opens");

	assert_eq!(blend.compression, Compression::None);
	assert_eq!(blend.header.version, 300);
	assert!(blend.saw_endb());
	assert_eq!(blend.directory().len(), 1);
	assert_eq!(blend.schema().structure("Pair").expect("Pair").size, 8);
	assert_eq!(&blend.dna_block().code, b"DNA1");

	let stats = blend.block_stats();
	assert_eq!(stats.block_count, 1);
	assert_eq!(stats.codes.get("DATA"), Some(&1));
	assert_eq!(stats.unknown_sdna, 0);
}

#[test]
fn zstd_container_opens() {
	let packed = zstd::encode_all(pair_blend().build().as_slice(), 3).expect("zstd encode");
	let blend = BlendFile::from_bytes(packed).expect("zstd container opens");
	assert_eq!(blend.compression, Compression::Zstd);
	assert_eq!(blend.directory().len(), 1);
}

#[test]
fn big_endian_four_byte_container_opens() {
	let mut builder = BlendBuilder::new(SchemaBuilder::new().structure("Pair", &[("int", "a"), ("int", "b")]))
		.pointer_size(4)
		.byte_order(ByteOrder::Big);
	let pair = builder.record("Pair").int("a", 1).finish();
	builder.chunk(b"DATA", "Pair", 0x20, [pair]);

	let blend = BlendFile::from_bytes(builder.build()).expect("container opens");
	assert_eq!(blend.header.pointer_size, 4);
	assert_eq!(blend.header.endianness, Endianness::Big);
	assert_eq!(blend.payload(&blend.directory().blocks()[0]), &[0, 0, 0, 1, 0, 0, 0, 0]);
}

#[test]
fn missing_schema_is_fatal() {
	let err = BlendFile::from_bytes(pair_blend().without_dna().build()).err().expect("DNA1 required");
	assert!(matches!(err, BlendError::DnaNotFound));
}

#[test]
fn missing_endb_after_complete_chunk_is_accepted() {
	let blend = BlendFile::from_bytes(pair_blend().without_endb().build()).expect("container opens");
	assert!(!blend.saw_endb());
	assert_eq!(blend.directory().len(), 1);
}

#[test]
fn lookup_by_missing_code_is_a_usage_error() {
	let blend = BlendFile::from_bytes(pair_blend().build()).expect("container opens");
	assert!(blend.find_first_block_by_code(*b"DATA").is_ok());
	let err = blend.find_first_block_by_code(*b"OB\0\0").expect_err("no OB block");
	assert!(matches!(err, BlendError::BlockNotFound { .. }));
}

#[test]
fn blocks_indexing_synthesized_primitives_count_as_unknown_sdna() {
	let mut builder = pair_blend();
	builder.raw_chunk(b"DATA", 1, 0x2000, 1, vec![0; 4]);
	builder.raw_chunk(b"DATA", 900, 0x3000, 1, vec![0; 4]);
	let blend = BlendFile::from_bytes(builder.build()).expect("container opens");
	assert_eq!(blend.schema().file_structure_count(), 1);

	assert_eq!(blend.block_stats().unknown_sdna, 2);
	let block = blend.directory().blocks()[1];
	let err = inspect_block(&blend, &block, &InspectOptions::default()).expect_err("index 1 is a primitive");
	assert!(matches!(err, BlendError::MissingSdna { sdna_nr: 1 }));
}
