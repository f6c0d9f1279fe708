/// Generic block decode command.
pub mod decode;
/// SDNA inspection command.
pub mod dna;
/// File-level information command.
pub mod info;
/// Scene graph extraction command.
pub mod scene;

mod util;
