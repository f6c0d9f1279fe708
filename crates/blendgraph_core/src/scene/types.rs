use crate::blend::{Address, BlendFile, Convert, ObjectId, Result, StructReader};
use crate::scene::SceneNode;
use crate::scene::custom_data::CustomData;

type Reader<'s, 'a> = StructReader<'s, 'a, SceneNode>;

/// Common datablock header embedded at the start of every ID type.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Id {
	/// Two-letter type prefix followed by the datablock name (`OBCube`).
	pub name: String,
	/// ID flags.
	pub flag: i16,
	/// Library the datablock is linked from; `None` for local data.
	pub lib: Option<ObjectId>,
}

impl Id {
	/// Datablock name without its two-letter type prefix.
	pub fn display_name(&self) -> &str {
		self.name.get(2..).unwrap_or_default()
	}
}

impl Convert<SceneNode> for Id {
	fn convert(&mut self, reader: &mut Reader<'_, '_>) -> Result<()> {
		self.name = reader.read_string("name")?;
		self.flag = reader.read("flag")?;
		self.lib = reader.read_ptr("lib")?;
		Ok(())
	}
}

/// External library a linked datablock comes from.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Library {
	/// Datablock header.
	pub id: Id,
	/// Library path as written by the user.
	pub name: String,
	/// Absolute library path.
	pub filename: String,
	/// Library that linked this one indirectly.
	pub parent: Option<ObjectId>,
}

impl Convert<SceneNode> for Library {
	fn convert(&mut self, reader: &mut Reader<'_, '_>) -> Result<()> {
		self.id = reader.read_struct("id")?;
		self.name = reader.read_string("name")?;
		self.filename = if reader.has_field("filename") {
			reader.read_string("filename")?
		} else {
			reader.read_string("filepath")?
		};
		self.parent = reader.read_ptr("parent")?;
		Ok(())
	}
}

/// Intrusive doubly linked list header.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ListBase {
	/// First element.
	pub first: Option<ObjectId>,
	/// Last element.
	pub last: Option<ObjectId>,
}

impl Convert<SceneNode> for ListBase {
	fn convert(&mut self, reader: &mut Reader<'_, '_>) -> Result<()> {
		self.first = reader.read_ptr("first")?;
		self.last = reader.read_ptr("last")?;
		Ok(())
	}
}

/// Top-level scene datablock.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Scene {
	/// Datablock header.
	pub id: Id,
	/// Active camera object.
	pub camera: Option<ObjectId>,
	/// World settings.
	pub world: Option<ObjectId>,
	/// Active base.
	pub basact: Option<ObjectId>,
	/// Root collection (2.8+ files).
	pub master_collection: Option<ObjectId>,
	/// Legacy list of [`Base`] entries.
	pub base: ListBase,
}

impl Convert<SceneNode> for Scene {
	fn convert(&mut self, reader: &mut Reader<'_, '_>) -> Result<()> {
		self.id = reader.read_struct("id")?;
		self.camera = reader.read_ptr("camera")?;
		self.world = reader.read_ptr("world")?;
		self.basact = reader.read_ptr("basact")?;
		self.master_collection = reader.read_ptr("master_collection")?;
		self.base = reader.read_struct("base")?;
		Ok(())
	}
}

/// One entry of the scene's legacy object list.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Base {
	/// Previous entry.
	pub prev: Option<ObjectId>,
	/// Next entry.
	pub next: Option<ObjectId>,
	/// Linked object.
	pub object: Option<ObjectId>,
}

impl Convert<SceneNode> for Base {
	fn convert(&mut self, reader: &mut Reader<'_, '_>) -> Result<()> {
		self.object = reader.read_ptr("object")?;
		self.next = reader.read_ptr("next")?;
		self.prev = reader.read_ptr("prev")?;
		Ok(())
	}
}

/// Object type codes stored in `Object.type`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
	/// Empty.
	#[default]
	Empty,
	/// Mesh.
	Mesh,
	/// Curve.
	Curve,
	/// NURBS surface.
	Surface,
	/// Text.
	Font,
	/// Metaball.
	MetaBall,
	/// Light.
	Lamp,
	/// Camera.
	Camera,
	/// Lattice.
	Lattice,
	/// Any other code.
	Other(i16),
}

impl ObjectType {
	/// Map a raw `Object.type` code.
	pub fn from_code(code: i16) -> Self {
		match code {
			0 => Self::Empty,
			1 => Self::Mesh,
			2 => Self::Curve,
			3 => Self::Surface,
			4 => Self::Font,
			5 => Self::MetaBall,
			10 => Self::Lamp,
			11 => Self::Camera,
			22 => Self::Lattice,
			other => Self::Other(other),
		}
	}

	/// Lowercase label for listings; unrecognized codes read as `other`.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Empty => "empty",
			Self::Mesh => "mesh",
			Self::Curve => "curve",
			Self::Surface => "surface",
			Self::Font => "font",
			Self::MetaBall => "metaball",
			Self::Lamp => "lamp",
			Self::Camera => "camera",
			Self::Lattice => "lattice",
			Self::Other(_) => "other",
		}
	}
}

/// Scene object with transform, hierarchy, data link, and modifier stack.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Object {
	/// Datablock header.
	pub id: Id,
	/// Object kind.
	pub kind: ObjectType,
	/// World matrix, row-major as stored.
	pub obmat: [[f32; 4]; 4],
	/// Inverse parent matrix at parenting time.
	pub parentinv: [[f32; 4]; 4],
	/// Parent sub-target name (bone or vertex group).
	pub parsubstr: String,
	/// Parent object.
	pub parent: Option<ObjectId>,
	/// Tracking target.
	pub track: Option<ObjectId>,
	/// Proxy object.
	pub proxy: Option<ObjectId>,
	/// Object this proxy was made from.
	pub proxy_from: Option<ObjectId>,
	/// Proxy group object.
	pub proxy_group: Option<ObjectId>,
	/// Object data; its concrete type follows the target block's structure.
	pub data: Option<ObjectId>,
	/// Modifier stack.
	pub modifiers: ListBase,
}

impl Convert<SceneNode> for Object {
	fn convert(&mut self, reader: &mut Reader<'_, '_>) -> Result<()> {
		self.id = reader.read_struct("id")?;
		self.kind = ObjectType::from_code(reader.read("type")?);
		self.obmat = reader.read_matrix("obmat")?;
		self.parentinv = reader.read_matrix("parentinv")?;
		self.parsubstr = reader.read_string("parsubstr")?;
		self.parent = reader.read_ptr("parent")?;
		self.track = reader.read_ptr("track")?;
		self.proxy = reader.read_ptr("proxy")?;
		self.proxy_from = reader.read_ptr("proxy_from")?;
		self.proxy_group = reader.read_ptr("proxy_group")?;
		self.data = reader.read_ptr("data")?;
		self.modifiers = reader.read_struct("modifiers")?;
		Ok(())
	}
}

/// Legacy vertex.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct MVert {
	/// Position.
	pub co: [f32; 3],
	/// Normal, decoded from packed shorts to unit range.
	pub no: [f32; 3],
	/// Selection and hide flags.
	pub flag: u8,
	/// Material slot.
	pub mat_nr: i32,
	/// Bevel weight.
	pub bweight: i32,
}

impl Convert<SceneNode> for MVert {
	fn convert(&mut self, reader: &mut Reader<'_, '_>) -> Result<()> {
		self.co = reader.read_array("co")?;
		let no: [i16; 3] = reader.read_array("no")?;
		self.no = no.map(|value| f32::from(value) / 32767.0);
		self.flag = reader.read("flag")?;
		self.mat_nr = reader.read("mat_nr")?;
		self.bweight = reader.read("bweight")?;
		Ok(())
	}
}

/// Legacy edge.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MEdge {
	/// First vertex index.
	pub v1: i32,
	/// Second vertex index.
	pub v2: i32,
	/// Subdivision crease.
	pub crease: u8,
	/// Bevel weight.
	pub bweight: u8,
	/// Edge flags.
	pub flag: i16,
}

impl Convert<SceneNode> for MEdge {
	fn convert(&mut self, reader: &mut Reader<'_, '_>) -> Result<()> {
		self.v1 = reader.read("v1")?;
		self.v2 = reader.read("v2")?;
		self.crease = reader.read("crease")?;
		self.bweight = reader.read("bweight")?;
		self.flag = reader.read("flag")?;
		Ok(())
	}
}

/// Face-corner reference into vertices and edges.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MLoop {
	/// Vertex index.
	pub v: i32,
	/// Edge index.
	pub e: i32,
}

impl Convert<SceneNode> for MLoop {
	fn convert(&mut self, reader: &mut Reader<'_, '_>) -> Result<()> {
		self.v = reader.read("v")?;
		self.e = reader.read("e")?;
		Ok(())
	}
}

/// Per-corner texture coordinate.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct MLoopUV {
	/// UV coordinate.
	pub uv: [f32; 2],
	/// Selection flags.
	pub flag: i32,
}

impl Convert<SceneNode> for MLoopUV {
	fn convert(&mut self, reader: &mut Reader<'_, '_>) -> Result<()> {
		self.uv = reader.read_array("uv")?;
		self.flag = reader.read("flag")?;
		Ok(())
	}
}

/// Per-corner byte color; channels are stored in RGBA order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MLoopCol {
	/// Red.
	pub r: u8,
	/// Green.
	pub g: u8,
	/// Blue.
	pub b: u8,
	/// Alpha.
	pub a: u8,
}

impl Convert<SceneNode> for MLoopCol {
	fn convert(&mut self, reader: &mut Reader<'_, '_>) -> Result<()> {
		self.r = reader.read("r")?;
		self.g = reader.read("g")?;
		self.b = reader.read("b")?;
		self.a = reader.read("a")?;
		Ok(())
	}
}

/// Polygon as a run of loops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MPoly {
	/// First loop index.
	pub loopstart: i32,
	/// Number of loops.
	pub totloop: i32,
	/// Material slot.
	pub mat_nr: i16,
	/// Smooth and selection flags.
	pub flag: u8,
}

impl Convert<SceneNode> for MPoly {
	fn convert(&mut self, reader: &mut Reader<'_, '_>) -> Result<()> {
		self.loopstart = reader.read("loopstart")?;
		self.totloop = reader.read("totloop")?;
		self.mat_nr = reader.read("mat_nr")?;
		self.flag = reader.read("flag")?;
		Ok(())
	}
}

/// Legacy tessellated face; `v4 == 0` marks a triangle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MFace {
	/// Vertex indices.
	pub v: [i32; 4],
	/// Material slot.
	pub mat_nr: i32,
	/// Face flags.
	pub flag: u8,
}

impl MFace {
	/// Number of corners, 3 or 4.
	pub fn corner_count(&self) -> usize {
		if self.v[3] == 0 { 3 } else { 4 }
	}
}

impl Convert<SceneNode> for MFace {
	fn convert(&mut self, reader: &mut Reader<'_, '_>) -> Result<()> {
		self.v = [reader.read("v1")?, reader.read("v2")?, reader.read("v3")?, reader.read("v4")?];
		self.mat_nr = reader.read("mat_nr")?;
		self.flag = reader.read("flag")?;
		Ok(())
	}
}

/// Legacy per-face UVs with the face's texture image.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct MTFace {
	/// Corner UVs; the fourth is unused on triangles.
	pub uv: [[f32; 2]; 4],
	/// Texture image.
	pub tpage: Option<ObjectId>,
	/// Selection flags.
	pub flag: u8,
	/// Transparency mode.
	pub transp: u8,
	/// Face mode flags.
	pub mode: i16,
	/// Tile index.
	pub tile: i16,
	/// Unwrap flags.
	pub unwrap: i16,
}

impl Convert<SceneNode> for MTFace {
	fn convert(&mut self, reader: &mut Reader<'_, '_>) -> Result<()> {
		self.uv = reader.read_matrix("uv")?;
		self.tpage = reader.read_ptr("tpage")?;
		self.flag = reader.read("flag")?;
		self.transp = reader.read("transp")?;
		self.mode = reader.read("mode")?;
		self.tile = reader.read("tile")?;
		self.unwrap = reader.read("unwrap")?;
		Ok(())
	}
}

/// Pre-2.5 face with UVs and packed corner colors.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct TFace {
	/// Corner UVs.
	pub uv: [[f32; 2]; 4],
	/// Corner colors packed as `0xAABBGGRR`.
	pub col: [u32; 4],
	/// Selection flags.
	pub flag: u8,
	/// Face mode flags.
	pub mode: i16,
	/// Tile index.
	pub tile: i16,
	/// Unwrap flags.
	pub unwrap: i16,
}

impl Convert<SceneNode> for TFace {
	fn convert(&mut self, reader: &mut Reader<'_, '_>) -> Result<()> {
		self.uv = reader.read_matrix("uv")?;
		self.col = reader.read_array("col")?;
		self.flag = reader.read("flag")?;
		self.mode = reader.read("mode")?;
		self.tile = reader.read("tile")?;
		self.unwrap = reader.read("unwrap")?;
		Ok(())
	}
}

/// Per-polygon texture image assignment.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct MTexPoly {
	/// Texture image.
	pub tpage: Option<ObjectId>,
	/// Selection flags.
	pub flag: u8,
	/// Transparency mode.
	pub transp: u8,
	/// Face mode flags.
	pub mode: i16,
	/// Tile index.
	pub tile: i16,
}

impl Convert<SceneNode> for MTexPoly {
	fn convert(&mut self, reader: &mut Reader<'_, '_>) -> Result<()> {
		self.tpage = reader.read_ptr("tpage")?;
		self.flag = reader.read("flag")?;
		self.transp = reader.read("transp")?;
		self.mode = reader.read("mode")?;
		self.tile = reader.read("tile")?;
		Ok(())
	}
}

/// Legacy per-face-corner color, four per face.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MCol {
	/// Alpha.
	pub a: u8,
	/// Red.
	pub r: u8,
	/// Green.
	pub g: u8,
	/// Blue.
	pub b: u8,
}

impl Convert<SceneNode> for MCol {
	fn convert(&mut self, reader: &mut Reader<'_, '_>) -> Result<()> {
		self.a = reader.read("a")?;
		self.r = reader.read("r")?;
		self.g = reader.read("g")?;
		self.b = reader.read("b")?;
		Ok(())
	}
}

/// One vertex group weight.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct MDeformWeight {
	/// Vertex group index on the owning object.
	pub def_nr: i32,
	/// Weight in `0..=1`.
	pub weight: f32,
}

impl Convert<SceneNode> for MDeformWeight {
	fn convert(&mut self, reader: &mut Reader<'_, '_>) -> Result<()> {
		self.def_nr = reader.read("def_nr")?;
		self.weight = reader.read("weight")?;
		Ok(())
	}
}

/// Vertex group weights of one vertex.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MDeformVert {
	/// Weights, one per group the vertex belongs to.
	pub dw: Vec<MDeformWeight>,
	/// Declared weight count.
	pub totweight: i32,
}

impl Convert<SceneNode> for MDeformVert {
	fn convert(&mut self, reader: &mut Reader<'_, '_>) -> Result<()> {
		self.totweight = reader.read("totweight")?;
		self.dw = reader.read_ptr_array("dw")?;
		self.dw.truncate(usize::try_from(self.totweight).unwrap_or(0));
		Ok(())
	}
}

/// Mesh datablock with legacy and polygon topology plus custom data layers.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Mesh {
	/// Datablock header.
	pub id: Id,
	/// Declared legacy face count.
	pub totface: i32,
	/// Declared edge count.
	pub totedge: i32,
	/// Declared vertex count.
	pub totvert: i32,
	/// Declared loop count.
	pub totloop: i32,
	/// Declared polygon count.
	pub totpoly: i32,
	/// Subdivision level.
	pub subdiv: i16,
	/// Render subdivision level.
	pub subdivr: i16,
	/// Subdivision type.
	pub subsurftype: i16,
	/// Auto-smooth angle.
	pub smoothresh: i16,
	/// Vertices.
	pub mvert: Vec<MVert>,
	/// Edges.
	pub medge: Vec<MEdge>,
	/// Legacy faces.
	pub mface: Vec<MFace>,
	/// Loops.
	pub mloop: Vec<MLoop>,
	/// Active UV layer.
	pub mloopuv: Vec<MLoopUV>,
	/// Active color layer.
	pub mloopcol: Vec<MLoopCol>,
	/// Polygons.
	pub mpoly: Vec<MPoly>,
	/// Legacy per-face UVs and images.
	pub mtface: Vec<MTFace>,
	/// Pre-2.5 textured faces.
	pub tface: Vec<TFace>,
	/// Per-polygon images.
	pub mtpoly: Vec<MTexPoly>,
	/// Legacy face corner colors.
	pub mcol: Vec<MCol>,
	/// Vertex group weights.
	pub dvert: Vec<MDeformVert>,
	/// Material slots.
	pub mat: Vec<Option<ObjectId>>,
	/// Vertex custom data.
	pub vdata: CustomData,
	/// Edge custom data.
	pub edata: CustomData,
	/// Legacy face custom data.
	pub fdata: CustomData,
	/// Polygon custom data.
	pub pdata: CustomData,
	/// Loop custom data.
	pub ldata: CustomData,
}

impl Convert<SceneNode> for Mesh {
	fn convert(&mut self, reader: &mut Reader<'_, '_>) -> Result<()> {
		self.id = reader.read_struct("id")?;
		self.totface = reader.read("totface")?;
		self.totedge = reader.read("totedge")?;
		self.totvert = reader.read("totvert")?;
		self.totloop = reader.read("totloop")?;
		self.totpoly = reader.read("totpoly")?;
		self.subdiv = reader.read("subdiv")?;
		self.subdivr = reader.read("subdivr")?;
		self.subsurftype = reader.read("subsurftype")?;
		self.smoothresh = reader.read("smoothresh")?;

		self.mvert = reader.read_ptr_array("mvert")?;
		self.medge = reader.read_ptr_array("medge")?;
		self.mface = reader.read_ptr_array("mface")?;
		self.mloop = reader.read_ptr_array("mloop")?;
		self.mloopuv = reader.read_ptr_array("mloopuv")?;
		self.mloopcol = reader.read_ptr_array("mloopcol")?;
		self.mpoly = reader.read_ptr_array("mpoly")?;
		self.mtface = reader.read_ptr_array("mtface")?;
		self.tface = reader.read_ptr_array("tface")?;
		self.mtpoly = reader.read_ptr_array("mtpoly")?;
		self.mcol = reader.read_ptr_array("mcol")?;
		self.dvert = reader.read_ptr_array("dvert")?;
		self.mat = reader.read_ptr_list("mat")?;

		self.vdata = reader.read_struct("vdata")?;
		self.edata = reader.read_struct("edata")?;
		self.fdata = reader.read_struct("fdata")?;
		self.pdata = reader.read_struct("pdata")?;
		self.ldata = reader.read_struct("ldata")?;
		Ok(())
	}
}

/// Legacy (pre-node) material settings.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Material {
	/// Datablock header.
	pub id: Id,
	/// Diffuse color.
	pub diffuse: [f32; 3],
	/// Specular color.
	pub specular: [f32; 3],
	/// Ambient color.
	pub ambient: [f32; 3],
	/// Mirror color.
	pub mirror: [f32; 3],
	/// Specular hardness.
	pub har: i16,
	/// Emission strength.
	pub emit: f32,
	/// Mirror reflectivity.
	pub ray_mirror: f32,
	/// Opacity.
	pub alpha: f32,
	/// Diffuse reflectivity.
	pub reflect: f32,
	/// Translucency.
	pub translucency: f32,
	/// Mode flags.
	pub mode: i32,
	/// Oren-Nayar roughness.
	pub roughness: f32,
	/// Minnaert darkness.
	pub darkness: f32,
	/// Toon refraction.
	pub refrac: f32,
	/// Ambient factor.
	pub amb: f32,
	/// Specular intensity.
	pub spec: f32,
	/// Diffuse shader model.
	pub diff_shader: i16,
	/// Specular shader model.
	pub spec_shader: i16,
	/// Texture slots (`MTex`), empty slots as `None`.
	pub mtex: Vec<Option<ObjectId>>,
}

impl Material {
	/// Mode bit for ray-traced transparency.
	pub const RAYTRANSP: i32 = 0x20000;
	/// Mode bit for ray-traced mirror.
	pub const RAYMIRROR: i32 = 0x40000;
	/// Mode bit for z-buffer transparency.
	pub const ZTRANSP: i32 = 0x40;
}

impl Convert<SceneNode> for Material {
	fn convert(&mut self, reader: &mut Reader<'_, '_>) -> Result<()> {
		self.id = reader.read_struct("id")?;
		self.diffuse = [reader.read("r")?, reader.read("g")?, reader.read("b")?];
		self.specular = [reader.read("specr")?, reader.read("specg")?, reader.read("specb")?];
		self.ambient = [reader.read("ambr")?, reader.read("ambg")?, reader.read("ambb")?];
		self.mirror = [reader.read("mirr")?, reader.read("mirg")?, reader.read("mirb")?];
		self.har = reader.read("har")?;
		self.emit = reader.read("emit")?;
		self.ray_mirror = reader.read("ray_mirror")?;
		self.alpha = reader.read("alpha")?;
		self.reflect = reader.read("ref")?;
		self.translucency = reader.read("translucency")?;
		self.mode = reader.read("mode")?;
		self.roughness = reader.read("roughness")?;
		self.darkness = reader.read("darkness")?;
		self.refrac = reader.read("refrac")?;
		self.amb = reader.read("amb")?;
		self.spec = reader.read("spec")?;
		self.diff_shader = reader.read("diff_shader")?;
		self.spec_shader = reader.read("spec_shader")?;
		self.mtex = reader.read_ptrs("mtex")?;
		Ok(())
	}
}

/// Image datablock; pixels stay external or packed.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Image {
	/// Datablock header.
	pub id: Id,
	/// File path, `//`-relative to the container.
	pub name: String,
	/// Load state.
	pub ok: i16,
	/// Image flags.
	pub flag: i16,
	/// Source kind (file, sequence, movie, generated).
	pub source: i16,
	/// Image type.
	pub kind: i16,
	/// Last displayed frame.
	pub lastframe: i32,
	/// Tiling repeat.
	pub repeat: [i16; 2],
	/// Animation speed.
	pub animspeed: i16,
	/// Generated image size.
	pub gen_size: [i16; 2],
	/// Generated image pattern.
	pub gen_type: i16,
	/// Embedded file contents, when packed.
	pub packedfile: Option<ObjectId>,
}

impl Convert<SceneNode> for Image {
	fn convert(&mut self, reader: &mut Reader<'_, '_>) -> Result<()> {
		self.id = reader.read_struct("id")?;
		self.name = reader.read_string("name")?;
		self.ok = reader.read("ok")?;
		self.flag = reader.read("flag")?;
		self.source = reader.read("source")?;
		self.kind = reader.read("type")?;
		self.lastframe = reader.read("lastframe")?;
		self.repeat = [reader.read("xrep")?, reader.read("yrep")?];
		self.animspeed = reader.read("animspeed")?;
		self.gen_size = [reader.read("gen_x")?, reader.read("gen_y")?];
		self.gen_type = reader.read("gen_type")?;
		self.packedfile = reader.read_ptr("packedfile")?;
		Ok(())
	}
}

/// File contents embedded in the container.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PackedFile {
	/// Byte length of the packed data.
	pub size: i32,
	/// Read position kept by the writer.
	pub seek: i32,
	/// Address of the block holding the data.
	pub data: Address,
}

impl PackedFile {
	/// Packed bytes, clipped to the covering block.
	pub fn bytes<'f>(&self, file: &'f BlendFile) -> Option<&'f [u8]> {
		let block = file.directory().find(self.data)?;
		let payload = file.payload(block);
		let start = usize::try_from(self.data.0 - block.address.0).ok()?;
		let len = usize::try_from(self.size).unwrap_or(0);
		payload.get(start..start.saturating_add(len).min(payload.len()))
	}
}

impl Convert<SceneNode> for PackedFile {
	fn convert(&mut self, reader: &mut Reader<'_, '_>) -> Result<()> {
		self.size = reader.read("size")?;
		self.seek = reader.read("seek")?;
		self.data = reader.read_address("data")?;
		Ok(())
	}
}

/// Legacy texture datablock; only image textures carry data the importer uses.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Tex {
	/// Datablock header.
	pub id: Id,
	/// Image sampling flags.
	pub imaflag: i16,
	/// Texture kind.
	pub kind: i16,
	/// Source image for image textures.
	pub ima: Option<ObjectId>,
}

impl Tex {
	/// `kind` of an image texture.
	pub const TYPE_IMAGE: i16 = 8;

	/// Return whether this texture samples an image.
	pub fn is_image(&self) -> bool {
		self.kind == Self::TYPE_IMAGE
	}
}

impl Convert<SceneNode> for Tex {
	fn convert(&mut self, reader: &mut Reader<'_, '_>) -> Result<()> {
		self.id = reader.read_struct("id")?;
		self.imaflag = reader.read("imaflag")?;
		self.kind = reader.read("type")?;
		self.ima = reader.read_ptr("ima")?;
		Ok(())
	}
}

/// One material texture slot: which texture, how it is mapped, and what it drives.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MTex {
	/// Channels the texture affects (`MAP_*` bits).
	pub mapto: i16,
	/// Blend mode against the underlying channel.
	pub blendtype: i16,
	/// Object used for object-space coordinates.
	pub object: Option<ObjectId>,
	/// Texture datablock.
	pub tex: Option<ObjectId>,
	/// UV layer used for UV coordinates.
	pub uvname: String,
	/// Axis projections.
	pub proj: [i8; 3],
	/// Mapping mode.
	pub mapping: u8,
	/// Coordinate offset.
	pub ofs: [f32; 3],
	/// Coordinate scale.
	pub size: [f32; 3],
	/// Rotation.
	pub rot: f32,
	/// Slot flags.
	pub texflag: i32,
	/// Color model.
	pub colormodel: i16,
	/// Particle channel mask.
	pub pmapto: i16,
	/// Negated particle channel mask.
	pub pmaptoneg: i16,
	/// Blend color.
	pub color: [f32; 3],
	/// Blend intensity.
	pub k: f32,
	/// Normal influence.
	pub norfac: f32,
	/// Specular color influence.
	pub colspecfac: f32,
	/// Mirror color influence.
	pub mirrfac: f32,
	/// Alpha influence.
	pub alphafac: f32,
	/// Diffuse influence.
	pub difffac: f32,
	/// Specular influence.
	pub specfac: f32,
	/// Emission influence.
	pub emitfac: f32,
	/// Hardness influence.
	pub hardfac: f32,
}

impl MTex {
	/// Drives diffuse color.
	pub const MAP_COL: i16 = 1;
	/// Drives the normal.
	pub const MAP_NORM: i16 = 2;
	/// Drives specular color.
	pub const MAP_COLSPEC: i16 = 4;
	/// Drives specular intensity.
	pub const MAP_SPEC: i16 = 32;
	/// Drives emission.
	pub const MAP_EMIT: i16 = 64;
	/// Drives alpha.
	pub const MAP_ALPHA: i16 = 128;

	/// Return whether the slot drives any channel in `mask`.
	pub fn maps_to(&self, mask: i16) -> bool {
		self.mapto & mask != 0
	}
}

impl Convert<SceneNode> for MTex {
	fn convert(&mut self, reader: &mut Reader<'_, '_>) -> Result<()> {
		self.mapto = reader.read("mapto")?;
		self.blendtype = reader.read("blendtype")?;
		self.object = reader.read_ptr("object")?;
		self.tex = reader.read_ptr("tex")?;
		self.uvname = reader.read_string("uvname")?;
		self.proj = [reader.read("projx")?, reader.read("projy")?, reader.read("projz")?];
		self.mapping = reader.read("mapping")?;
		self.ofs = reader.read_array("ofs")?;
		self.size = reader.read_array("size")?;
		self.rot = reader.read("rot")?;
		self.texflag = reader.read("texflag")?;
		self.colormodel = reader.read("colormodel")?;
		self.pmapto = reader.read("pmapto")?;
		self.pmaptoneg = reader.read("pmaptoneg")?;
		self.color = [reader.read("r")?, reader.read("g")?, reader.read("b")?];
		self.k = reader.read("k")?;
		self.norfac = reader.read("norfac")?;
		self.colspecfac = reader.read("colspecfac")?;
		self.mirrfac = reader.read("mirrfac")?;
		self.alphafac = reader.read("alphafac")?;
		self.difffac = reader.read("difffac")?;
		self.specfac = reader.read("specfac")?;
		self.emitfac = reader.read("emitfac")?;
		self.hardfac = reader.read("hardfac")?;
		Ok(())
	}
}

/// Camera datablock.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Camera {
	/// Datablock header.
	pub id: Id,
	/// `0` perspective, `1` orthographic.
	pub kind: i32,
	/// Camera flags.
	pub flag: i32,
	/// Focal length in millimeters.
	pub lens: f32,
	/// Sensor width in millimeters.
	pub sensor_x: f32,
	/// Near clip distance.
	pub clipsta: f32,
	/// Far clip distance.
	pub clipend: f32,
}

impl Camera {
	/// Return whether the camera uses an orthographic projection.
	pub fn is_orthographic(&self) -> bool {
		self.kind == 1
	}
}

impl Convert<SceneNode> for Camera {
	fn convert(&mut self, reader: &mut Reader<'_, '_>) -> Result<()> {
		self.id = reader.read_struct("id")?;
		self.kind = reader.read("type")?;
		self.flag = reader.read("flag")?;
		self.lens = reader.read("lens")?;
		self.sensor_x = reader.read("sensor_x")?;
		self.clipsta = reader.read("clipsta")?;
		self.clipend = reader.read("clipend")?;
		Ok(())
	}
}

/// Light datablock (`Lamp` in the schema).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Lamp {
	/// Datablock header.
	pub id: Id,
	/// Light kind: local, sun, spot, hemi, area.
	pub kind: i16,
	/// Light flags.
	pub flag: i16,
	/// Color.
	pub color: [f32; 3],
	/// Energy.
	pub energy: f32,
	/// Falloff distance.
	pub dist: f32,
	/// Spot cone angle.
	pub spotsize: f32,
	/// Spot edge softness.
	pub spotblend: f32,
	/// Constant, linear, and quadratic attenuation coefficients.
	pub coefficients: [f32; 3],
	/// Falloff curve selector.
	pub falloff_type: i16,
	/// Area light shape.
	pub area_shape: i16,
	/// Area light extent.
	pub area_size: [f32; 3],
	/// Sun brightness.
	pub sun_brightness: f32,
}

impl Convert<SceneNode> for Lamp {
	fn convert(&mut self, reader: &mut Reader<'_, '_>) -> Result<()> {
		self.id = reader.read_struct("id")?;
		self.kind = reader.read("type")?;
		self.flag = reader.read("flag")?;
		self.color = [reader.read("r")?, reader.read("g")?, reader.read("b")?];
		self.energy = reader.read("energy")?;
		self.dist = reader.read("dist")?;
		self.spotsize = reader.read("spotsize")?;
		self.spotblend = reader.read("spotblend")?;
		self.coefficients = [reader.read("coeff_const")?, reader.read("coeff_lin")?, reader.read("coeff_quad")?];
		self.falloff_type = reader.read("falloff_type")?;
		self.area_shape = reader.read("area_shape")?;
		self.area_size = [reader.read("area_size")?, reader.read("area_sizey")?, reader.read("area_sizez")?];
		self.sun_brightness = reader.read("sun_brightness")?;
		Ok(())
	}
}

/// World datablock.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct World {
	/// Datablock header.
	pub id: Id,
}

impl Convert<SceneNode> for World {
	fn convert(&mut self, reader: &mut Reader<'_, '_>) -> Result<()> {
		self.id = reader.read_struct("id")?;
		Ok(())
	}
}

/// Collection datablock (2.8+).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Collection {
	/// Datablock header.
	pub id: Id,
	/// List of [`CollectionObject`] entries.
	pub gobject: ListBase,
	/// List of [`CollectionChild`] entries.
	pub children: ListBase,
}

impl Convert<SceneNode> for Collection {
	fn convert(&mut self, reader: &mut Reader<'_, '_>) -> Result<()> {
		self.id = reader.read_struct("id")?;
		self.gobject = reader.read_struct("gobject")?;
		self.children = reader.read_struct("children")?;
		Ok(())
	}
}

/// Object membership entry of a collection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CollectionObject {
	/// Next entry.
	pub next: Option<ObjectId>,
	/// Member object.
	pub ob: Option<ObjectId>,
}

impl Convert<SceneNode> for CollectionObject {
	fn convert(&mut self, reader: &mut Reader<'_, '_>) -> Result<()> {
		self.next = reader.read_ptr("next")?;
		self.ob = reader.read_ptr("ob")?;
		Ok(())
	}
}

/// Child collection entry of a collection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CollectionChild {
	/// Next entry.
	pub next: Option<ObjectId>,
	/// Previous entry.
	pub prev: Option<ObjectId>,
	/// Child collection.
	pub collection: Option<ObjectId>,
}

impl Convert<SceneNode> for CollectionChild {
	fn convert(&mut self, reader: &mut Reader<'_, '_>) -> Result<()> {
		self.next = reader.read_ptr("next")?;
		self.prev = reader.read_ptr("prev")?;
		self.collection = reader.read_ptr("collection")?;
		Ok(())
	}
}
