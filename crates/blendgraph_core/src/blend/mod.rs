mod bhead;
mod block;
mod bytes;
mod compression;
mod decl;
mod dna;
mod error;
mod file;
mod header;
mod inspect;
mod pointer;
mod reader;
mod registry;
mod scalar;
mod session;
mod value;

/// Parsed chunk header record.
pub use bhead::BHead;
/// Block scanning, directory, and iterator types.
pub use block::{Block, BlockDirectory, BlockIter, ContainerScan, RawBlock, scan_container};
/// Compression detection result.
pub use compression::Compression;
/// SDNA schema representation.
pub use dna::{FieldDescriptor, Schema, StructureDescriptor, TypeDescriptor};
/// Error and result aliases.
pub use error::{BlendError, ErrorKind, Result, code_label};
/// File abstraction and block statistics.
pub use file::{BlendFile, BlockStats};
/// File header representation.
pub use header::{BlendHeader, ChunkLayout, Endianness};
/// Generic schema-driven inspection.
pub use inspect::{InspectOptions, inspect_block, inspect_struct};
/// Address and decoded graph types.
pub use pointer::{Address, ObjectGraph, ObjectId};
/// Name-based record reader handed to converters.
pub use reader::StructReader;
/// Type dispatch traits and tables.
pub use registry::{Convert, Converter, Fallback, Member, Registry, TagEntry};
/// Primitive coercion.
pub use scalar::{RawScalar, Scalar, ScalarKind};
/// Decode session, budgets, and counters.
pub use session::{DecodeOptions, DecodeStats, Session};
/// Decoded runtime value types.
pub use value::{FieldValue, StructValue, Value};
