//! # nscookie
//!
//! Attributes in-flight kernel packets to the network namespace owning them,
//! using the kernel-assigned netns cookie: a stable, globally unique 64-bit
//! identifier that, unlike namespace pointers or inode numbers, is never
//! reused.
//!
//! Kernel structure layouts move between versions, so nothing here hardcodes
//! an offset: access paths are compiled from the running kernel's BTF once
//! per load, and the per-packet lookup is a pair of fault-absorbing chained
//! reads that collapse every failure to the reserved "unknown" value, 0.

pub mod cookie;
pub use cookie::*;

pub mod core;
pub mod helpers;

#[cfg(test)]
pub(crate) mod test_utils;
