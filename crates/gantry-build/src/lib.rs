//! Gantry Build - Native build driver
//!
//! This crate runs the external toolchain once per (variant, target) pair,
//! bounds how many builds run at once and hands each variant its outputs as
//! soon as that variant's builds have all finished.

pub mod driver;
pub mod reporter;
pub mod scheduler;
pub mod toolchain;

pub use driver::BuildDriver;
pub use reporter::{BuildEvent, BuildReporter, CollectingReporter, TracingReporter};
pub use scheduler::{BuildScheduler, VariantBuildResult, VariantBuilds};
pub use toolchain::{CommandToolchain, Invocation, Toolchain};
