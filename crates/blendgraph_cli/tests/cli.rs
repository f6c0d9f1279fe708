#![allow(missing_docs)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use blendgraph_testkit::{BlendBuilder, SchemaBuilder};
use serde_json::Value;
use tempfile::TempDir;

const SCENE: u64 = 0x1000;
const BASE: u64 = 0x2000;
const OBJECT: u64 = 0x3000;
const MESH: u64 = 0x4000;
const VERTS: u64 = 0x5000;

fn schema() -> SchemaBuilder {
	SchemaBuilder::new()
		.structure("ID", &[("char", "name[66]"), ("short", "flag")])
		.structure("ListBase", &[("void", "*first"), ("void", "*last")])
		.structure("Scene", &[("ID", "id"), ("Object", "*camera"), ("World", "*world"), ("ListBase", "base")])
		.structure("Base", &[("Base", "*next"), ("Base", "*prev"), ("Object", "*object")])
		.structure(
			"Object",
			&[("ID", "id"), ("short", "type"), ("float", "obmat[4][4]"), ("Object", "*parent"), ("void", "*data"), ("ListBase", "modifiers")],
		)
		.structure("MVert", &[("float", "co[3]"), ("short", "no[3]"), ("char", "flag"), ("char", "bweight")])
		.structure("Mesh", &[("ID", "id"), ("MVert", "*mvert"), ("int", "totvert")])
}

fn scene_builder(pointer_size: usize) -> BlendBuilder {
	let mut blend = BlendBuilder::new(schema()).pointer_size(pointer_size);

	let id = |name: &str| blend.record("ID").string("name", name).finish();
	let scene = blend
		.record("Scene")
		.nested("id", id("SCScene"))
		.nested("base", blend.record("ListBase").ptr("first", BASE).ptr("last", BASE).finish())
		.finish();
	let base = blend.record("Base").ptr("object", OBJECT).finish();
	let object = blend
		.record("Object")
		.nested("id", id("OBCube"))
		.int("type", 1)
		.floats("obmat", &[1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0])
		.ptr("data", MESH)
		.finish();
	let mesh = blend.record("Mesh").nested("id", id("MECube")).ptr("mvert", VERTS).int("totvert", 3).finish();
	let verts: Vec<_> = (0..3).map(|idx| blend.record("MVert").floats("co", &[idx as f64, 0.0, 0.0]).finish()).collect();

	blend
		.chunk(b"SC", "Scene", SCENE, [scene])
		.chunk(b"DATA", "Base", BASE, [base])
		.chunk(b"OB", "Object", OBJECT, [object])
		.chunk(b"ME", "Mesh", MESH, [mesh])
		.chunk(b"DATA", "MVert", VERTS, verts)
		.raw_chunk(b"ZZZZ", 0, 0x9000, 0, vec![0; 4]);
	blend
}

fn write_file(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
	let path = dir.path().join(name);
	std::fs::write(&path, bytes).expect("write container");
	path
}

fn run(args: &[&str], path: &Path) -> Output {
	Command::new(env!("CARGO_BIN_EXE_blendgraph"))
		.args(&args[..1])
		.arg(path)
		.args(&args[1..])
		.output()
		.expect("command executes")
}

fn run_json(args: &[&str], path: &Path) -> Value {
	let output = run(args, path);
	assert!(
		output.status.success(),
		"blendgraph failed with status={}: {}",
		output.status,
		String::from_utf8_lossy(&output.stderr)
	);
	serde_json::from_slice(&output.stdout).expect("stdout should be valid json")
}

#[test]
fn info_reports_header_and_block_counts() {
	let dir = TempDir::new().expect("tempdir");
	let path = write_file(&dir, "scene.blend", &scene_builder(8).build());

	let json = run_json(&["info", "--json"], &path);
	assert_eq!(json["compression"], "none");
	assert_eq!(json["version"], 300);
	assert_eq!(json["format_version"], 0);
	assert_eq!(json["chunk_layout"], "legacy");
	assert_eq!(json["endianness"], "little");
	assert_eq!(json["pointer_size"], 8);
	assert_eq!(json["block_count"], 6);
	assert_eq!(json["has_endb"], true);

	let top = json["top_codes"].as_array().expect("top codes");
	assert_eq!(top[0]["code"], "DATA");
	assert_eq!(top[0]["count"], 2);
	assert!(top.iter().any(|entry| entry["code"] == "ZZZZ"), "unknown chunk codes stay listed");
}

#[test]
fn info_reads_zstd_compressed_containers() {
	let dir = TempDir::new().expect("tempdir");
	let raw = scene_builder(8).large_chunks().build();
	let packed = zstd::encode_all(raw.as_slice(), 3).expect("compress");
	let path = write_file(&dir, "packed.blend", &packed);

	let json = run_json(&["info", "--json"], &path);
	assert_eq!(json["compression"], "zstd");
	assert_eq!(json["chunk_layout"], "large_bhead8");
	assert_eq!(json["version"], 500);
}

#[test]
fn dna_prints_field_offsets_and_sizes() {
	let dir = TempDir::new().expect("tempdir");
	let path = write_file(&dir, "scene.blend", &scene_builder(4).build());

	let json = run_json(&["dna", "--struct", "Object", "--json"], &path);
	assert_eq!(json["pointer_size"], 4);
	let fields = json["structure"]["fields"].as_array().expect("fields");
	let by_name = |name: &str| fields.iter().find(|field| field["name"] == name).cloned().expect("field present");

	assert_eq!(by_name("type")["offset"], 68);
	assert_eq!(by_name("obmat")["size"], 64);
	assert_eq!(by_name("obmat")["decl"], "float obmat[4][4]");
	assert_eq!(by_name("parent")["offset"], 134);
	assert_eq!(by_name("parent")["size"], 4);
	assert_eq!(by_name("parent")["pointer"], true);
	assert_eq!(json["structure"]["size"], 150);
}

#[test]
fn dna_unknown_structure_fails() {
	let dir = TempDir::new().expect("tempdir");
	let path = write_file(&dir, "scene.blend", &scene_builder(8).build());

	let output = run(&["dna", "--struct", "Armature"], &path);
	assert!(!output.status.success());
	assert!(String::from_utf8_lossy(&output.stderr).contains("error:"));
}

#[test]
fn decode_dumps_first_block_by_code() {
	let dir = TempDir::new().expect("tempdir");
	let path = write_file(&dir, "scene.blend", &scene_builder(8).build());

	let json = run_json(&["decode", "--code", "OB", "--json"], &path);
	assert_eq!(json["structure"], "Object");
	assert_eq!(json["address"], "0x0000000000003000");
	assert_eq!(json["value"]["type"], "Object");

	let fields = &json["value"]["fields"];
	assert_eq!(fields["type"], 1);
	assert_eq!(fields["data"], "0x0000000000004000");
	assert_eq!(fields["id"]["fields"]["name"], "OBCube");
}

#[test]
fn decode_rejects_malformed_codes() {
	let dir = TempDir::new().expect("tempdir");
	let path = write_file(&dir, "scene.blend", &scene_builder(8).build());

	let output = run(&["decode", "--code", "TOOLONG"], &path);
	assert!(!output.status.success());
}

#[test]
fn scene_lists_objects_and_meshes() {
	let dir = TempDir::new().expect("tempdir");
	let path = write_file(&dir, "scene.blend", &scene_builder(8).build());

	let json = run_json(&["scene", "--json"], &path);
	assert_eq!(json["scene"], "Scene");
	assert!(json["camera"].is_null());

	let objects = json["objects"].as_array().expect("objects");
	assert_eq!(objects.len(), 1);
	assert_eq!(objects[0]["name"], "Cube");
	assert_eq!(objects[0]["type"], "mesh");
	assert_eq!(objects[0]["data"], "Mesh:Cube");

	let meshes = json["meshes"].as_array().expect("meshes");
	assert_eq!(meshes.len(), 1);
	assert_eq!(meshes[0]["verts"], 3);
	assert_eq!(json["stats"]["dangling_pointers"], 0);
	assert_eq!(json["stats"]["unknown_types"], 0);
}

#[test]
fn scene_without_scene_structure_fails() {
	let dir = TempDir::new().expect("tempdir");
	let mut blend = BlendBuilder::new(SchemaBuilder::new().structure("Base", &[("Base", "*next")]));
	let base = blend.record("Base").finish();
	blend.chunk(b"DATA", "Base", BASE, [base]);
	let path = write_file(&dir, "empty.blend", &blend.build());

	let output = run(&["scene"], &path);
	assert!(!output.status.success());
	assert!(String::from_utf8_lossy(&output.stderr).contains("Scene"));
}

#[test]
fn verbose_flag_enables_scene_statistics_log() {
	let dir = TempDir::new().expect("tempdir");
	let path = write_file(&dir, "scene.blend", &scene_builder(8).build());

	let output = Command::new(env!("CARGO_BIN_EXE_blendgraph"))
		.arg("-v")
		.arg("scene")
		.arg(&path)
		.env_remove("RUST_LOG")
		.output()
		.expect("command executes");
	assert!(output.status.success());
	assert!(String::from_utf8_lossy(&output.stderr).contains("scene extracted"));
}
