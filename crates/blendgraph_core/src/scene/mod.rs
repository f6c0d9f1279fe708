//! Typed converters for the scene structures an importer consumes.
//!
//! [`scene_registry`] wires every converter into a [`Registry`]; [`extract_scene`]
//! decodes the first `Scene` record of a file and everything reachable from it.

use std::collections::HashSet;

use tracing::info;

use crate::blend::{BlendFile, DecodeOptions, DecodeStats, Member, ObjectGraph, ObjectId, Registry, Result, Session};

mod custom_data;
mod modifier;
mod types;

pub use custom_data::{
	CD_MCOL, CD_MDEFORMVERT, CD_MEDGE, CD_MFACE, CD_MLOOP, CD_MLOOPCOL, CD_MLOOPUV, CD_MPOLY, CD_MTEXPOLY, CD_MTFACE, CD_MVERT, CD_NUMTYPES, CustomData, CustomDataLayer,
};
pub use modifier::{MODIFIER_MIRROR, MODIFIER_SUBSURF, MirrorModifierData, ModifierData, OtherModifierData, SubsurfModifierData};
pub use types::{
	Base, Camera, Collection, CollectionChild, CollectionObject, Id, Image, Lamp, Library, ListBase, MCol, MDeformVert, MDeformWeight, MEdge, MFace, MLoop, MLoopCol,
	MLoopUV, MPoly, MTFace, MTex, MTexPoly, MVert, Material, Mesh, Object, ObjectType, PackedFile, Scene, TFace, Tex, World,
};

/// One decoded scene object.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneNode {
	/// `Scene`.
	Scene(Box<Scene>),
	/// `Base`.
	Base(Base),
	/// `Object`.
	Object(Box<Object>),
	/// `Mesh`.
	Mesh(Box<Mesh>),
	/// `Material`.
	Material(Box<Material>),
	/// `Image`.
	Image(Box<Image>),
	/// `PackedFile`.
	PackedFile(PackedFile),
	/// `Tex`.
	Tex(Box<Tex>),
	/// `MTex`.
	MTex(Box<MTex>),
	/// `Library`.
	Library(Box<Library>),
	/// `Camera`.
	Camera(Box<Camera>),
	/// `Lamp`.
	Lamp(Box<Lamp>),
	/// `World`.
	World(Box<World>),
	/// `Collection`.
	Collection(Box<Collection>),
	/// `CollectionObject`.
	CollectionObject(CollectionObject),
	/// `CollectionChild`.
	CollectionChild(CollectionChild),
	/// `SubsurfModifierData`.
	Subsurf(Box<SubsurfModifierData>),
	/// `MirrorModifierData`.
	Mirror(Box<MirrorModifierData>),
	/// Any other structure embedding a `ModifierData` header.
	OtherModifier(Box<OtherModifierData>),
	/// `CD_MVERT` layer elements.
	Verts(Vec<MVert>),
	/// `CD_MDEFORMVERT` layer elements.
	DeformVerts(Vec<MDeformVert>),
	/// `CD_MEDGE` layer elements.
	Edges(Vec<MEdge>),
	/// `CD_MFACE` layer elements.
	Faces(Vec<MFace>),
	/// `CD_MTFACE` layer elements.
	TexFaces(Vec<MTFace>),
	/// `CD_MCOL` layer elements.
	FaceColors(Vec<MCol>),
	/// `CD_MTEXPOLY` layer elements.
	TexPolys(Vec<MTexPoly>),
	/// `CD_MLOOPUV` layer elements.
	LoopUvs(Vec<MLoopUV>),
	/// `CD_MLOOPCOL` layer elements.
	LoopColors(Vec<MLoopCol>),
	/// `CD_MPOLY` layer elements.
	Polys(Vec<MPoly>),
	/// `CD_MLOOP` layer elements.
	Loops(Vec<MLoop>),
}

macro_rules! scene_member {
	($($ty:ty => $variant:ident),* $(,)?) => {
		$(
			impl Member<SceneNode> for $ty {
				fn wrap(self) -> SceneNode {
					SceneNode::$variant(self)
				}

				fn peek(node: &SceneNode) -> Option<&Self> {
					match node {
						SceneNode::$variant(value) => Some(value),
						_ => None,
					}
				}

				fn peek_mut(node: &mut SceneNode) -> Option<&mut Self> {
					match node {
						SceneNode::$variant(value) => Some(value),
						_ => None,
					}
				}
			}
		)*
	};
}

scene_member! {
	Box<Scene> => Scene,
	Base => Base,
	Box<Object> => Object,
	Box<Mesh> => Mesh,
	Box<Material> => Material,
	Box<Image> => Image,
	PackedFile => PackedFile,
	Box<Tex> => Tex,
	Box<MTex> => MTex,
	Box<Library> => Library,
	Box<Camera> => Camera,
	Box<Lamp> => Lamp,
	Box<World> => World,
	Box<Collection> => Collection,
	CollectionObject => CollectionObject,
	CollectionChild => CollectionChild,
	Box<SubsurfModifierData> => Subsurf,
	Box<MirrorModifierData> => Mirror,
	Box<OtherModifierData> => OtherModifier,
	Vec<MVert> => Verts,
	Vec<MDeformVert> => DeformVerts,
	Vec<MEdge> => Edges,
	Vec<MFace> => Faces,
	Vec<MTFace> => TexFaces,
	Vec<MCol> => FaceColors,
	Vec<MTexPoly> => TexPolys,
	Vec<MLoopUV> => LoopUvs,
	Vec<MLoopCol> => LoopColors,
	Vec<MPoly> => Polys,
	Vec<MLoop> => Loops,
}

impl SceneNode {
	/// Datablock header for ID types.
	pub fn id(&self) -> Option<&Id> {
		match self {
			Self::Scene(item) => Some(&item.id),
			Self::Object(item) => Some(&item.id),
			Self::Mesh(item) => Some(&item.id),
			Self::Material(item) => Some(&item.id),
			Self::Image(item) => Some(&item.id),
			Self::Tex(item) => Some(&item.id),
			Self::Library(item) => Some(&item.id),
			Self::Camera(item) => Some(&item.id),
			Self::Lamp(item) => Some(&item.id),
			Self::World(item) => Some(&item.id),
			Self::Collection(item) => Some(&item.id),
			_ => None,
		}
	}

	/// Shared header of modifier records.
	pub fn modifier(&self) -> Option<&ModifierData> {
		match self {
			Self::Subsurf(item) => Some(&item.modifier),
			Self::Mirror(item) => Some(&item.modifier),
			Self::OtherModifier(item) => Some(&item.modifier),
			_ => None,
		}
	}
}

/// Registry with every scene converter and the custom data layer tag table.
pub fn scene_registry() -> Registry<SceneNode> {
	let mut registry = Registry::new();
	registry
		.register::<Box<Scene>>("Scene")
		.register::<Base>("Base")
		.register::<Box<Object>>("Object")
		.register::<Box<Mesh>>("Mesh")
		.register::<Box<Material>>("Material")
		.register::<Box<Image>>("Image")
		.register::<PackedFile>("PackedFile")
		.register::<Box<Tex>>("Tex")
		.register::<Box<MTex>>("MTex")
		.register::<Box<Library>>("Library")
		.register::<Box<Camera>>("Camera")
		.register::<Box<Lamp>>("Lamp")
		.register::<Box<World>>("World")
		.register::<Box<Collection>>("Collection")
		.register::<CollectionObject>("CollectionObject")
		.register::<CollectionChild>("CollectionChild")
		.register::<Box<SubsurfModifierData>>("SubsurfModifierData")
		.register::<Box<MirrorModifierData>>("MirrorModifierData")
		.register_fallback::<Box<OtherModifierData>>(modifier::embeds_modifier_header);
	custom_data::register_layer_types(&mut registry);
	registry
}

/// Decoded scene: the object graph, its root `Scene`, and decode counters.
#[derive(Debug)]
pub struct SceneGraph {
	/// Every object reached from the scene.
	pub graph: ObjectGraph<SceneNode>,
	/// Handle of the root `Scene`.
	pub root: ObjectId,
	/// Counters of the decode pass.
	pub stats: DecodeStats,
}

impl SceneGraph {
	/// The root scene.
	pub fn scene(&self) -> Result<&Scene> {
		self.graph.expect_as::<Box<Scene>>(self.root).map(|scene| &**scene)
	}

	/// Borrow a node as `T` through an optional handle.
	pub fn follow<T: Member<SceneNode>>(&self, id: Option<ObjectId>) -> Option<&T> {
		self.graph.follow(id)
	}

	/// Objects linked from the scene's `Base` list, in list order.
	///
	/// Stops at the first repeated entry, so circular lists terminate.
	pub fn base_objects(&self) -> Result<Vec<ObjectId>> {
		let mut out = Vec::new();
		let mut seen = HashSet::new();
		let mut cursor = self.scene()?.base.first;
		while let Some(id) = cursor {
			if !seen.insert(id) {
				break;
			}
			let Some(base) = self.graph.get_as::<Base>(id) else {
				break;
			};
			out.extend(base.object);
			cursor = base.next;
		}
		Ok(out)
	}

	/// Every decoded object, in decode order.
	pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &Object)> + '_ {
		self.graph.iter().filter_map(|(id, node)| match node {
			SceneNode::Object(object) => Some((id, &**object)),
			_ => None,
		})
	}

	/// Header of every modifier on `object`, in stack order.
	///
	/// Records that are not modifiers end the walk, as do repeats.
	pub fn modifiers(&self, object: &Object) -> Vec<&ModifierData> {
		let mut out = Vec::new();
		let mut seen = HashSet::new();
		let mut cursor = object.modifiers.first;
		while let Some(id) = cursor {
			if !seen.insert(id) {
				break;
			}
			let Some(header) = self.graph.get(id).and_then(SceneNode::modifier) else {
				break;
			};
			out.push(header);
			cursor = header.next;
		}
		out
	}

	/// Images sampled by `material`'s texture slots, in slot order.
	pub fn material_images(&self, material: &Material) -> Vec<&Image> {
		material
			.mtex
			.iter()
			.filter_map(|slot| self.follow::<Box<MTex>>(*slot))
			.filter_map(|mtex| self.follow::<Box<Tex>>(mtex.tex))
			.filter_map(|tex| self.follow::<Box<Image>>(tex.ima))
			.map(|image| &**image)
			.collect()
	}

	/// Every decoded mesh, in decode order.
	pub fn meshes(&self) -> impl Iterator<Item = (ObjectId, &Mesh)> + '_ {
		self.graph.iter().filter_map(|(id, node)| match node {
			SceneNode::Mesh(mesh) => Some((id, &**mesh)),
			_ => None,
		})
	}
}

/// Decode the first `Scene` record of `file` with default budgets.
pub fn extract_scene(file: &BlendFile) -> Result<SceneGraph> {
	extract_scene_with(file, DecodeOptions::default())
}

/// Decode the first `Scene` record of `file` and everything it references.
///
/// The root is located by schema structure, not by chunk code. A missing
/// `Scene` structure or record is fatal.
pub fn extract_scene_with(file: &BlendFile, options: DecodeOptions) -> Result<SceneGraph> {
	let registry = scene_registry();
	let mut session = Session::new(file, &registry).with_options(options);
	let root = session.decode_root("Scene")?;
	let (graph, stats) = session.finish();

	info!(
		objects = stats.cached_objects,
		fields_read = stats.fields_read,
		fields_missing = stats.fields_missing,
		pointers_resolved = stats.pointers_resolved,
		cache_hits = stats.cache_hits,
		dangling_pointers = stats.dangling_pointers,
		unknown_types = stats.unknown_types,
		"scene extracted"
	);
	Ok(SceneGraph { graph, root, stats })
}
