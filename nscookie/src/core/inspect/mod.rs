//! # Inspection helpers
//!
//! Provides support for inspecting kernel type information (BTF).

pub mod btf;
pub use btf::*;
