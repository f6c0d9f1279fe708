use std::path::PathBuf;

use blendgraph::blend::{BlendFile, DecodeOptions, DecodeStats, ObjectId, Result};
use blendgraph::scene::{CD_MLOOPUV, Id, Mesh, Object, SceneGraph, SceneNode, World, extract_scene_with};

use crate::cmd::util::{emit_json, ptr_hex};

#[derive(clap::Args)]
pub struct Args {
	pub path: PathBuf,
	/// Maximum nesting depth of inline structures.
	#[arg(long)]
	pub max_depth: Option<u32>,
	/// Maximum number of objects decoded.
	#[arg(long)]
	pub max_objects: Option<usize>,
	/// Emit machine-readable JSON.
	#[arg(long)]
	pub json: bool,
}

/// Extract the scene graph and print its objects, meshes, and decode counters.
pub fn run(args: Args) -> Result<()> {
	let Args {
		path,
		max_depth,
		max_objects,
		json,
	} = args;

	let mut options = DecodeOptions::default();
	if let Some(depth) = max_depth {
		options.max_depth = depth;
	}
	if let Some(max) = max_objects {
		options.max_objects = max;
	}

	let blend = BlendFile::open(&path)?;
	let scene = extract_scene_with(&blend, options)?;
	let root = scene.scene()?;

	let payload = SceneJson {
		path: path.display().to_string(),
		scene: root.id.display_name().to_owned(),
		camera: datablock_name(&scene, root.camera),
		world: scene.follow::<Box<World>>(root.world).map(|world| world.id.display_name().to_owned()),
		objects: scene.base_objects()?.into_iter().filter_map(|id| object_row(&scene, id)).collect(),
		meshes: scene.meshes().map(|(id, mesh)| mesh_row(&scene, id, mesh)).collect(),
		stats: StatsJson::from(scene.stats),
	};

	if json {
		emit_json(&payload);
		return Ok(());
	}

	println!("path: {}", payload.path);
	println!("scene: {}", payload.scene);
	println!("camera: {}", payload.camera.as_deref().unwrap_or("-"));
	println!("world: {}", payload.world.as_deref().unwrap_or("-"));

	println!("objects: {}", payload.objects.len());
	println!("  address\ttype\tname\tdata\tparent\tmodifiers");
	for row in &payload.objects {
		println!(
			"  {}\t{}\t{}\t{}\t{}\t{}",
			row.address,
			row.kind,
			row.name,
			row.data.as_deref().unwrap_or("-"),
			row.parent.as_deref().unwrap_or("-"),
			if row.modifiers.is_empty() { "-".to_owned() } else { row.modifiers.join(",") },
		);
	}

	println!("meshes: {}", payload.meshes.len());
	println!("  address\tname\tverts\tedges\tpolys\tloops\tfaces\tuv_layers\tmaterials");
	for row in &payload.meshes {
		println!(
			"  {}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
			row.address, row.name, row.verts, row.edges, row.polys, row.loops, row.faces, row.uv_layers, row.materials
		);
	}

	let stats = &payload.stats;
	println!("stats:");
	println!("  objects: {}", stats.objects);
	println!("  fields_read: {}", stats.fields_read);
	println!("  fields_missing: {}", stats.fields_missing);
	println!("  pointers_resolved: {}", stats.pointers_resolved);
	println!("  cache_hits: {}", stats.cache_hits);
	println!("  dangling_pointers: {}", stats.dangling_pointers);
	println!("  unknown_types: {}", stats.unknown_types);

	Ok(())
}

fn address_of(scene: &SceneGraph, id: ObjectId) -> String {
	scene.graph.address_of(id).map(ptr_hex).unwrap_or_default()
}

fn datablock_name(scene: &SceneGraph, id: Option<ObjectId>) -> Option<String> {
	let node = scene.graph.get(id?)?;
	node.id().map(|header| header.display_name().to_owned())
}

fn object_row(scene: &SceneGraph, id: ObjectId) -> Option<ObjectJson> {
	let object = scene.graph.get_as::<Box<Object>>(id)?;
	Some(ObjectJson {
		address: address_of(scene, id),
		name: object.id.display_name().to_owned(),
		kind: object.kind.as_str(),
		data: data_label(scene, object),
		parent: datablock_name(scene, object.parent),
		modifiers: scene.modifiers(object).into_iter().map(|item| item.name.clone()).collect(),
	})
}

/// `Structure:name` of an object's data, or just the structure when it has no header.
fn data_label(scene: &SceneGraph, object: &Object) -> Option<String> {
	let id = object.data?;
	let structure = scene.graph.structure_of(id)?;
	let name = scene.graph.get(id).and_then(SceneNode::id).map(Id::display_name);
	Some(match name {
		Some(name) => format!("{structure}:{name}"),
		None => structure.to_owned(),
	})
}

fn mesh_row(scene: &SceneGraph, id: ObjectId, mesh: &Mesh) -> MeshJson {
	MeshJson {
		address: address_of(scene, id),
		name: mesh.id.display_name().to_owned(),
		verts: mesh.mvert.len(),
		edges: mesh.medge.len(),
		polys: mesh.mpoly.len(),
		loops: mesh.mloop.len(),
		faces: mesh.mface.len(),
		uv_layers: mesh.ldata.layers_of(CD_MLOOPUV).count(),
		materials: mesh.mat.iter().flatten().count(),
	}
}

#[derive(serde::Serialize)]
struct SceneJson {
	path: String,
	scene: String,
	camera: Option<String>,
	world: Option<String>,
	objects: Vec<ObjectJson>,
	meshes: Vec<MeshJson>,
	stats: StatsJson,
}

#[derive(serde::Serialize)]
struct ObjectJson {
	address: String,
	name: String,
	#[serde(rename = "type")]
	kind: &'static str,
	data: Option<String>,
	parent: Option<String>,
	modifiers: Vec<String>,
}

#[derive(serde::Serialize)]
struct MeshJson {
	address: String,
	name: String,
	verts: usize,
	edges: usize,
	polys: usize,
	loops: usize,
	faces: usize,
	uv_layers: usize,
	materials: usize,
}

#[derive(serde::Serialize)]
struct StatsJson {
	objects: usize,
	fields_read: usize,
	fields_missing: usize,
	pointers_resolved: usize,
	cache_hits: usize,
	dangling_pointers: usize,
	unknown_types: usize,
}

impl From<DecodeStats> for StatsJson {
	fn from(stats: DecodeStats) -> Self {
		Self {
			objects: stats.cached_objects,
			fields_read: stats.fields_read,
			fields_missing: stats.fields_missing,
			pointers_resolved: stats.pointers_resolved,
			cache_hits: stats.cache_hits,
			dangling_pointers: stats.dangling_pointers,
			unknown_types: stats.unknown_types,
		}
	}
}
