use tracing::warn;

use crate::blend::{Convert, ObjectId, Result, StructReader, StructureDescriptor};
use crate::scene::SceneNode;

/// `ModifierData.type` of a subdivision surface modifier.
pub const MODIFIER_SUBSURF: i32 = 1;
/// `ModifierData.type` of a mirror modifier.
pub const MODIFIER_MIRROR: i32 = 5;

/// Header shared by every modifier record.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ModifierData {
	/// Next modifier in the object's stack.
	pub next: Option<ObjectId>,
	/// Previous modifier.
	pub prev: Option<ObjectId>,
	/// Modifier type code.
	pub kind: i32,
	/// Enable flags (viewport, render, edit mode).
	pub mode: i32,
	/// User-visible name.
	pub name: String,
}

impl Convert<SceneNode> for ModifierData {
	fn convert(&mut self, reader: &mut StructReader<'_, '_, SceneNode>) -> Result<()> {
		self.next = reader.read_ptr("next")?;
		self.prev = reader.read_ptr("prev")?;
		self.kind = reader.read("type")?;
		self.mode = reader.read("mode")?;
		self.name = reader.read_string("name")?;
		Ok(())
	}
}

/// Whether `structure` opens with an inline `ModifierData modifier` header.
pub(crate) fn embeds_modifier_header(structure: &StructureDescriptor) -> bool {
	structure
		.fields
		.first()
		.is_some_and(|field| &*field.name == "modifier" && &*field.type_name == "ModifierData" && !field.is_pointer)
}

/// Modifier of a kind with no dedicated converter; only the shared header is decoded.
///
/// Keeps the `next` chain intact so modifiers after it are still reached.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct OtherModifierData {
	/// Shared modifier header.
	pub modifier: ModifierData,
	/// Schema structure of the record (`ArrayModifierData`).
	pub structure: String,
}

impl Convert<SceneNode> for OtherModifierData {
	fn convert(&mut self, reader: &mut StructReader<'_, '_, SceneNode>) -> Result<()> {
		self.structure = reader.structure_name().to_owned();
		self.modifier = reader.read_struct("modifier")?;
		warn!(structure = %self.structure, name = %self.modifier.name, "no converter for modifier; decoded shared header only");
		Ok(())
	}
}

/// Subdivision surface modifier.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SubsurfModifierData {
	/// Shared modifier header.
	pub modifier: ModifierData,
	/// `0` Catmull-Clark, `1` simple.
	pub subdiv_type: i16,
	/// Viewport levels.
	pub levels: i16,
	/// Render levels.
	pub render_levels: i16,
	/// Option flags.
	pub flags: i16,
}

impl SubsurfModifierData {
	/// Flag bit requesting UV subdivision.
	pub const FLAG_SUBSURF_UV: i16 = 1 << 3;
}

impl Convert<SceneNode> for SubsurfModifierData {
	fn convert(&mut self, reader: &mut StructReader<'_, '_, SceneNode>) -> Result<()> {
		self.modifier = reader.read_struct("modifier")?;
		self.subdiv_type = reader.read("subdivType")?;
		self.levels = reader.read("levels")?;
		self.render_levels = reader.read("renderLevels")?;
		self.flags = reader.read("flags")?;
		Ok(())
	}
}

/// Mirror modifier.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MirrorModifierData {
	/// Shared modifier header.
	pub modifier: ModifierData,
	/// Legacy single mirror axis.
	pub axis: i16,
	/// Axis and option flags.
	pub flag: i16,
	/// Merge distance.
	pub tolerance: f32,
	/// Object used as the mirror center.
	pub mirror_ob: Option<ObjectId>,
}

impl MirrorModifierData {
	/// Clip vertices at the mirror plane.
	pub const FLAG_CLIPPING: i16 = 1 << 0;
	/// Mirror across X.
	pub const FLAG_AXIS_X: i16 = 1 << 3;
	/// Mirror across Y.
	pub const FLAG_AXIS_Y: i16 = 1 << 4;
	/// Mirror across Z.
	pub const FLAG_AXIS_Z: i16 = 1 << 5;

	/// Mirrored axes as `[x, y, z]`.
	pub fn axes(&self) -> [bool; 3] {
		[Self::FLAG_AXIS_X, Self::FLAG_AXIS_Y, Self::FLAG_AXIS_Z].map(|bit| self.flag & bit != 0)
	}
}

impl Convert<SceneNode> for MirrorModifierData {
	fn convert(&mut self, reader: &mut StructReader<'_, '_, SceneNode>) -> Result<()> {
		self.modifier = reader.read_struct("modifier")?;
		self.axis = reader.read("axis")?;
		self.flag = reader.read("flag")?;
		self.tolerance = reader.read("tolerance")?;
		self.mirror_ob = reader.read_ptr("mirror_ob")?;
		Ok(())
	}
}
