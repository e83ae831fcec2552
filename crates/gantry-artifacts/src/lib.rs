//! Gantry Artifacts - Symbol archives and publication assembly
//!
//! This crate packs the per-target build outputs of a variant into the
//! files that get published: the binary bundle, header, source and
//! documentation bundles, the debug symbol archive and the POM descriptor.

pub mod archive;
pub mod assembler;
pub mod pom;
pub mod symbols;

pub use archive::ArchiveWriter;
pub use assembler::{Assembler, AssemblyOptions};
pub use pom::render_pom;
pub use symbols::{collect_symbols, SymbolOptions};
