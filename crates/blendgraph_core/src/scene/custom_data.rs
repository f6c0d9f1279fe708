use crate::blend::{Convert, ObjectId, Registry, Result, StructReader};
use crate::scene::SceneNode;
use crate::scene::types::{MCol, MDeformVert, MEdge, MFace, MLoop, MLoopCol, MLoopUV, MPoly, MTFace, MTexPoly, MVert};

/// Vertex positions.
pub const CD_MVERT: i32 = 0;
/// Vertex group weights.
pub const CD_MDEFORMVERT: i32 = 2;
/// Edges.
pub const CD_MEDGE: i32 = 3;
/// Legacy tessellated faces.
pub const CD_MFACE: i32 = 4;
/// Legacy per-face UVs and images.
pub const CD_MTFACE: i32 = 5;
/// Legacy face corner colors.
pub const CD_MCOL: i32 = 6;
/// Per-polygon images.
pub const CD_MTEXPOLY: i32 = 15;
/// Per-loop UV coordinates.
pub const CD_MLOOPUV: i32 = 16;
/// Per-loop byte colors.
pub const CD_MLOOPCOL: i32 = 17;
/// Polygons.
pub const CD_MPOLY: i32 = 25;
/// Loops.
pub const CD_MLOOP: i32 = 26;
/// Number of layer type slots in `CustomData.typemap`.
pub const CD_NUMTYPES: usize = 42;

/// Register the element structures behind the layer types the importer decodes.
///
/// Other layer types are left unregistered and resolve to `None`.
pub(crate) fn register_layer_types(registry: &mut Registry<SceneNode>) {
	registry
		.register_tag::<MVert>(CD_MVERT, "MVert")
		.register_tag::<MDeformVert>(CD_MDEFORMVERT, "MDeformVert")
		.register_tag::<MEdge>(CD_MEDGE, "MEdge")
		.register_tag::<MFace>(CD_MFACE, "MFace")
		.register_tag::<MTFace>(CD_MTFACE, "MTFace")
		.register_tag::<MCol>(CD_MCOL, "MCol")
		.register_tag::<MTexPoly>(CD_MTEXPOLY, "MTexPoly")
		.register_tag::<MLoopUV>(CD_MLOOPUV, "MLoopUV")
		.register_tag::<MLoopCol>(CD_MLOOPCOL, "MLoopCol")
		.register_tag::<MPoly>(CD_MPOLY, "MPoly")
		.register_tag::<MLoop>(CD_MLOOP, "MLoop");
}

/// Set of typed per-element layers attached to one mesh domain.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomData {
	/// Layers in storage order.
	pub layers: Vec<CustomDataLayer>,
	/// Index of the first layer of each type, `-1` when absent.
	pub typemap: [i32; CD_NUMTYPES],
	/// Number of used layers.
	pub totlayer: i32,
	/// Allocated layer capacity.
	pub maxlayer: i32,
	/// Interleaved element size of all layers.
	pub totsize: i32,
}

impl Default for CustomData {
	fn default() -> Self {
		Self {
			layers: Vec::new(),
			typemap: [-1; CD_NUMTYPES],
			totlayer: 0,
			maxlayer: 0,
			totsize: 0,
		}
	}
}

impl CustomData {
	/// First layer of type `kind` named `name`.
	pub fn layer(&self, kind: i32, name: &str) -> Option<&CustomDataLayer> {
		self.layers.iter().find(|layer| layer.kind == kind && layer.name == name)
	}

	/// Every layer of type `kind`, in storage order.
	pub fn layers_of(&self, kind: i32) -> impl Iterator<Item = &CustomDataLayer> + '_ {
		self.layers.iter().filter(move |layer| layer.kind == kind)
	}
}

impl Convert<SceneNode> for CustomData {
	fn convert(&mut self, reader: &mut StructReader<'_, '_, SceneNode>) -> Result<()> {
		reader.read_into("typemap", &mut self.typemap)?;
		self.totlayer = reader.read("totlayer")?;
		self.maxlayer = reader.read("maxlayer")?;
		self.totsize = reader.read("totsize")?;
		self.layers = reader.read_ptr_array("layers")?;
		Ok(())
	}
}

/// One layer: its type code, name, and element data resolved through the tag table.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CustomDataLayer {
	/// Layer type code (`CD_*`).
	pub kind: i32,
	/// Byte offset inside interleaved element storage.
	pub offset: i32,
	/// Layer flags.
	pub flag: i32,
	/// Active layer index of this type.
	pub active: i32,
	/// Active render layer index.
	pub active_rnd: i32,
	/// Active clone layer index.
	pub active_clone: i32,
	/// Active mask layer index.
	pub active_mask: i32,
	/// Unique id.
	pub uid: i32,
	/// Layer name.
	pub name: String,
	/// Element array decoded as `Vec` of the type's element structure.
	pub data: Option<ObjectId>,
}

impl Convert<SceneNode> for CustomDataLayer {
	fn convert(&mut self, reader: &mut StructReader<'_, '_, SceneNode>) -> Result<()> {
		self.kind = reader.read("type")?;
		self.offset = reader.read("offset")?;
		self.flag = reader.read("flag")?;
		self.active = reader.read("active")?;
		self.active_rnd = reader.read("active_rnd")?;
		self.active_clone = reader.read("active_clone")?;
		self.active_mask = reader.read("active_mask")?;
		self.uid = reader.read("uid")?;
		self.name = reader.read_string("name")?;
		self.data = reader.read_ptr_tagged("data", self.kind)?;
		Ok(())
	}
}
