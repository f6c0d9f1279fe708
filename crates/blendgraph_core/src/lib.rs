//! Schema-driven decoding of Blender `.blend` containers into identity-preserving object graphs.

/// Container scanning, SDNA schema parsing, field reading, and pointer graph resolution.
pub mod blend;
/// Typed converters for the scene structures the importer understands.
pub mod scene;
